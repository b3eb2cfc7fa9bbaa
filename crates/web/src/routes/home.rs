//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use tower_sessions::Session;

use crate::error::Result;
use crate::models::{CurrentUser, session_keys};

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub user: Option<CurrentUser>,
    pub signed_in: bool,
}

/// Render the home page.
///
/// # Route
///
/// `GET /`
pub async fn home(session: Session) -> Result<IndexTemplate> {
    let user: Option<CurrentUser> = session.get(session_keys::CURRENT_USER).await?;
    // Publishing needs a grant, not just an identity.
    let signed_in = user.is_some()
        && session
            .get::<marigold_core::AccessGrant>(session_keys::ACCESS_GRANT)
            .await?
            .is_some();

    Ok(IndexTemplate { user, signed_in })
}
