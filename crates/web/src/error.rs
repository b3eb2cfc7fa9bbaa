//! Unified error handling for route handlers.
//!
//! Every protocol error bubbles up into one `AppError` that renders the
//! error page with the underlying message. All route handlers should return
//! `Result<T, AppError>`.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use thiserror::Error;

use marigold_client::{DiscoveryError, QueryError, TokenError};
use marigold_client::publish::PublishError;
use marigold_core::UrlError;

/// Application-level error type for the web front-end.
#[derive(Debug, Error)]
pub enum AppError {
    /// The submitted identifier is not a usable profile URL.
    #[error("{0}")]
    Url(#[from] UrlError),

    /// Profile resolution or endpoint discovery failed.
    #[error("{0}")]
    Discovery(#[from] DiscoveryError),

    /// Token exchange failed or returned an incomplete grant.
    #[error("{0}")]
    Token(#[from] TokenError),

    /// A Micropub query failed.
    #[error("{0}")]
    Query(#[from] QueryError),

    /// Publish preparation or submission failed.
    #[error("{0}")]
    Publish(#[from] PublishError),

    /// Session store operation failed.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Discovery finished without a required endpoint.
    #[error("your website does not advertise {0} endpoint, which we need to log you in")]
    MissingEndpoint(&'static str),

    /// The callback's state parameter did not match the session.
    #[error("the authorization response state does not match this login attempt")]
    StateMismatch,

    /// The authorization server reported an error instead of a code.
    #[error("the authorization server reported an error: {0}")]
    AuthorizationDenied(String),

    /// The request requires a signed-in session.
    #[error("not signed in")]
    Unauthorized,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Error page template.
#[derive(Template, WebTemplate)]
#[template(path = "error.html")]
struct ErrorTemplate {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // An unauthenticated request is not an error page, just a detour.
        if matches!(self, Self::Unauthorized) {
            return Redirect::to("/login").into_response();
        }

        let status = match &self {
            Self::Url(_)
            | Self::MissingEndpoint(_)
            | Self::StateMismatch
            | Self::AuthorizationDenied(_) => StatusCode::BAD_REQUEST,
            Self::Publish(err) => match err {
                PublishError::MissingVocabulary | PublishError::Date(_) => StatusCode::BAD_REQUEST,
                PublishError::Http(_) | PublishError::Server { .. } => StatusCode::BAD_GATEWAY,
            },
            Self::Discovery(_) | Self::Token(_) | Self::Query(_) => StatusCode::BAD_GATEWAY,
            Self::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::SEE_OTHER,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request error");
        } else {
            tracing::warn!(error = %self, "Request failed");
        }

        let template = ErrorTemplate {
            message: self.to_string(),
        };

        (status, template).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::MissingEndpoint("an authorization")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(get_status(AppError::StateMismatch), StatusCode::BAD_REQUEST);
        assert_eq!(
            get_status(AppError::Publish(PublishError::MissingVocabulary)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Publish(PublishError::Server {
                error: "invalid_request".to_string(),
                description: String::new(),
            })),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_unauthorized_redirects_to_login() {
        let response = AppError::Unauthorized.into_response();
        assert!(response.status().is_redirection());
    }
}
