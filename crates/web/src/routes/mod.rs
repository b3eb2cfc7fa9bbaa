//! HTTP route handlers for the web front-end.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                  - Home page
//! GET  /health            - Health check
//!
//! # Auth
//! GET  /login             - Identifier form
//! POST /login             - Resolve profile, discover endpoints, redirect to
//!                           the authorization endpoint
//! GET  /login/callback    - Verify state, exchange the code, negotiate
//!                           Micropub capabilities
//! POST /logout            - Clear the session
//!
//! # Publishing (requires auth)
//! GET  /publish/{kind}    - Publish form (note, article, reply, like, repost,
//!                           event, rsvp)
//! POST /publish/create    - Submit a publish request
//! GET  /publish/success   - Show the created post's permalink
//!
//! # API (requires auth)
//! GET  /api/endpoints     - Media endpoint as JSON, for page scripts
//! ```

pub mod api;
pub mod auth;
pub mod home;
pub mod publish;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/login/callback", get(auth::callback))
        .route("/logout", post(auth::logout))
}

/// Create the publish routes router.
pub fn publish_routes() -> Router<AppState> {
    Router::new()
        .route("/create", post(publish::create))
        .route("/success", get(publish::success))
        .route("/{kind}", get(publish::form_page))
}

/// Create the JSON API router.
pub fn api_routes() -> Router<AppState> {
    Router::new().route("/endpoints", get(api::endpoints))
}

/// Create all routes for the web front-end.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .merge(auth_routes())
        .nest("/publish", publish_routes())
        .nest("/api", api_routes())
}
