//! JSON API for browser-side scripts.

use axum::Json;
use serde::Serialize;
use tower_sessions::Session;

use marigold_core::{AccessGrant, Capabilities};

use crate::error::{AppError, Result};
use crate::models::session_keys;

/// The subset of negotiated endpoints a page script may ask about.
#[derive(Debug, Serialize)]
pub struct EndpointsResponse {
    /// The server's media endpoint, when its configuration advertises one.
    #[serde(rename = "media-endpoint", skip_serializing_if = "Option::is_none")]
    pub media_endpoint: Option<String>,
}

/// Report the signed-in user's media endpoint.
///
/// # Route
///
/// `GET /api/endpoints`
pub async fn endpoints(session: Session) -> Result<Json<EndpointsResponse>> {
    let _grant: AccessGrant = session
        .get(session_keys::ACCESS_GRANT)
        .await?
        .ok_or(AppError::Unauthorized)?;
    let capabilities: Capabilities = session
        .get(session_keys::CAPABILITIES)
        .await?
        .unwrap_or_default();

    Ok(Json(EndpointsResponse {
        media_endpoint: capabilities.media_endpoint().map(str::to_owned),
    }))
}
