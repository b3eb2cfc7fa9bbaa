//! IndieAuth login route handlers.
//!
//! Handles the full sign-in flow:
//! - Login: normalize the identifier, resolve redirects, discover endpoints,
//!   redirect to the user's authorization endpoint
//! - Callback: verify the state, exchange the code for an access grant,
//!   negotiate Micropub capabilities
//! - Logout: clear the session

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::Redirect,
};
use rand::Rng;
use serde::Deserialize;
use tower_sessions::Session;

use marigold_client::EndpointSet;
use marigold_client::discovery::EndpointRel;
use marigold_core::{AccessGrant, Capabilities, ProfileUrl, auth::DEFAULT_TOKEN_TYPE};

use crate::error::{AppError, Result};
use crate::models::{CurrentUser, LoginAttempt, Preferences, session_keys};
use crate::state::AppState;

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    /// The identifier the user typed (domain or full URL).
    pub url: String,
    /// IANA timezone reported by the browser.
    pub timezone: Option<String>,
}

/// Query parameters from the authorization endpoint callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// Authorization code to exchange for a token.
    pub code: Option<String>,
    /// State parameter for CSRF protection.
    pub state: Option<String>,
    /// Error code if authorization failed.
    pub error: Option<String>,
    /// Error description.
    pub error_description: Option<String>,
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "login.html")]
pub struct LoginTemplate {}

/// Generate a cryptographically secure random string.
fn generate_random_string(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            char::from(CHARSET[idx])
        })
        .collect()
}

/// Render the identifier form.
///
/// # Route
///
/// `GET /login`
pub async fn login_page() -> LoginTemplate {
    LoginTemplate {}
}

/// Start a login from a submitted identifier.
///
/// Normalizes and validates the identifier, resolves it through redirects,
/// discovers endpoints, stores everything learned in the session, and
/// redirects the browser to the user's authorization endpoint.
///
/// # Route
///
/// `POST /login`
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Redirect> {
    let profile = ProfileUrl::parse(&form.url)?;
    tracing::info!(profile = %profile, "starting login");

    let resolved = state.discoverer().resolve_profile(profile.as_url()).await?;
    let discovery = state.discoverer().discover(&resolved.discovery_url).await?;

    // Login cannot proceed without these two; the micropub endpoint is only
    // needed later, at publish time.
    let authorization_endpoint = discovery
        .endpoints
        .get(EndpointRel::Authorization)
        .ok_or(AppError::MissingEndpoint("an authorization"))?
        .clone();
    if discovery.endpoints.get(EndpointRel::Token).is_none() {
        return Err(AppError::MissingEndpoint("a token"));
    }

    let user = CurrentUser {
        profile_url: resolved.profile_url.clone(),
        discovery_url: resolved.discovery_url,
        name: discovery.card.name,
        photo: discovery.card.photo,
    };
    let preferences = Preferences {
        timezone: form.timezone.unwrap_or_else(|| "UTC".to_string()),
    };
    let attempt = LoginAttempt {
        state: generate_random_string(32),
    };

    let redirect = state
        .indieauth()
        .authorization_url(&authorization_endpoint, &resolved.profile_url, &attempt.state);

    session.insert(session_keys::CURRENT_USER, &user).await?;
    session
        .insert(session_keys::ENDPOINTS, &discovery.endpoints)
        .await?;
    session
        .insert(session_keys::PREFERENCES, &preferences)
        .await?;
    session.insert(session_keys::LOGIN_ATTEMPT, &attempt).await?;

    Ok(Redirect::to(redirect.as_str()))
}

/// Handle the authorization endpoint callback.
///
/// Verifies the state parameter against the stored login attempt, exchanges
/// the one-time code for an access grant, then negotiates Micropub
/// capabilities so the publish forms can render without further queries.
///
/// # Route
///
/// `GET /login/callback`
pub async fn callback(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<CallbackQuery>,
) -> Result<Redirect> {
    if let Some(error) = query.error {
        let description = query.error_description.unwrap_or_default();
        tracing::warn!(%error, %description, "authorization was refused");
        return Err(AppError::AuthorizationDenied(error));
    }

    let code = query.code.ok_or_else(|| {
        AppError::AuthorizationDenied("no authorization code was returned".to_string())
    })?;

    // The attempt is one-time use: remove it before touching the network so
    // a replayed callback cannot race a second exchange.
    let attempt: LoginAttempt = session
        .remove(session_keys::LOGIN_ATTEMPT)
        .await?
        .ok_or(AppError::StateMismatch)?;
    if query.state.as_deref() != Some(attempt.state.as_str()) {
        tracing::warn!("authorization state mismatch");
        return Err(AppError::StateMismatch);
    }

    let user: CurrentUser = session
        .get(session_keys::CURRENT_USER)
        .await?
        .ok_or(AppError::Unauthorized)?;
    let endpoints: EndpointSet = session
        .get(session_keys::ENDPOINTS)
        .await?
        .ok_or(AppError::Unauthorized)?;
    let token_endpoint = endpoints
        .get(EndpointRel::Token)
        .ok_or(AppError::MissingEndpoint("a token"))?;

    let mut grant: AccessGrant = state
        .indieauth()
        .exchange_code(token_endpoint, &user.profile_url, &code)
        .await?;
    // Some token endpoints send an empty token_type instead of omitting it.
    if grant.token_type.is_empty() {
        grant.token_type = DEFAULT_TOKEN_TYPE.to_string();
    }

    let mut capabilities = Capabilities::default();
    if let Some(micropub_endpoint) = endpoints.get(EndpointRel::Micropub) {
        state
            .micropub()
            .negotiate(micropub_endpoint, &grant, &mut capabilities)
            .await?;
    }

    session.insert(session_keys::ACCESS_GRANT, &grant).await?;
    session
        .insert(session_keys::CAPABILITIES, &capabilities)
        .await?;

    tracing::info!(me = %grant.me, "login complete");
    Ok(Redirect::to("/"))
}

/// Log out.
///
/// # Route
///
/// `POST /logout`
pub async fn logout(session: Session) -> Result<Redirect> {
    session.flush().await?;
    Ok(Redirect::to("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_string_has_requested_length_and_charset() {
        let value = generate_random_string(32);
        assert_eq!(value.len(), 32);
        assert!(value.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
