//! Publishing route handlers.
//!
//! Renders one parameterized form per post type, turns the submitted form
//! into a protocol-correct Micropub request, and shows the created post's
//! permalink.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::Redirect,
};
use chrono::{TimeDelta, Utc};
use tower_sessions::Session;
use url::Url;

use marigold_client::EndpointSet;
use marigold_client::discovery::EndpointRel;
use marigold_core::{AccessGrant, Capabilities, QueryType, SyndicationTarget};

use crate::error::{AppError, Result};
use crate::models::{CurrentUser, Preferences, session_keys};
use crate::state::AppState;

/// How long negotiated capabilities stay fresh before the publish form
/// re-queries them.
const CAPABILITY_MAX_AGE_MINUTES: i64 = 10;

/// The post types a form is served for.
///
/// Photo and video posts are not served: they need a media upload to the
/// media endpoint first, which this client cannot send yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostKind {
    Note,
    Article,
    Reply,
    Like,
    Repost,
    Event,
    Rsvp,
}

impl PostKind {
    fn from_path(kind: &str) -> Option<Self> {
        match kind {
            "note" => Some(Self::Note),
            "article" => Some(Self::Article),
            "reply" => Some(Self::Reply),
            "like" => Some(Self::Like),
            "repost" => Some(Self::Repost),
            "event" => Some(Self::Event),
            "rsvp" => Some(Self::Rsvp),
            _ => None,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Article => "article",
            Self::Reply => "reply",
            Self::Like => "like",
            Self::Repost => "repost",
            Self::Event => "event",
            Self::Rsvp => "rsvp",
        }
    }

    const fn title(self) -> &'static str {
        match self {
            Self::Note => "Post a note",
            Self::Article => "Write an article",
            Self::Reply => "Reply to a post",
            Self::Like => "Like a post",
            Self::Repost => "Repost a post",
            Self::Event => "Create an event",
            Self::Rsvp => "RSVP to an event",
        }
    }

    /// The `h` vocabulary this kind publishes under.
    const fn vocabulary(self) -> &'static str {
        match self {
            Self::Event => "event",
            _ => "entry",
        }
    }

    /// Whether the form carries a required content body.
    const fn has_content(self) -> bool {
        matches!(self, Self::Note | Self::Article | Self::Reply)
    }
}

/// Publish form template, parameterized over the post type.
#[derive(Template, WebTemplate)]
#[template(path = "publish.html")]
pub struct PublishTemplate {
    pub kind: &'static str,
    pub title: &'static str,
    pub vocabulary: &'static str,
    pub has_content: bool,
    pub user_name: String,
    pub categories: Vec<String>,
    pub targets: Vec<SyndicationTarget>,
}

/// Success page template.
#[derive(Template, WebTemplate)]
#[template(path = "success.html")]
pub struct SuccessTemplate {
    pub permalink: Option<String>,
}

/// The signed-in publishing context a handler needs.
struct PublishContext {
    grant: AccessGrant,
    micropub_endpoint: Url,
}

/// Load the grant and micropub endpoint, or bail out of the handler.
async fn publish_context(session: &Session) -> Result<PublishContext> {
    let grant: AccessGrant = session
        .get(session_keys::ACCESS_GRANT)
        .await?
        .ok_or(AppError::Unauthorized)?;
    let endpoints: EndpointSet = session
        .get(session_keys::ENDPOINTS)
        .await?
        .ok_or(AppError::Unauthorized)?;
    let micropub_endpoint = endpoints
        .get(EndpointRel::Micropub)
        .ok_or(AppError::MissingEndpoint("a micropub"))?
        .clone();

    Ok(PublishContext {
        grant,
        micropub_endpoint,
    })
}

/// Re-query capabilities whose data has gone stale.
///
/// A failed refresh keeps the stale data; the form renders with what we
/// have rather than blocking publishing on a flaky query endpoint.
async fn refresh_stale_capabilities(
    state: &AppState,
    context: &PublishContext,
    capabilities: &mut Capabilities,
) -> bool {
    let threshold = TimeDelta::minutes(CAPABILITY_MAX_AGE_MINUTES);
    let mut changed = false;

    for query in [QueryType::SyndicationTargets, QueryType::Categories] {
        let relevant = query
            .capability_key()
            .is_some_and(|key| capabilities.has(key));
        if !relevant || !capabilities.is_stale(query, threshold, Utc::now()) {
            continue;
        }

        match state
            .micropub()
            .query_server(&context.micropub_endpoint, &context.grant, query)
            .await
        {
            Ok(data) => {
                capabilities.merge(data, query, Utc::now());
                changed = true;
            }
            Err(error) => {
                tracing::warn!(%query, %error, "capability refresh failed; keeping stale data");
            }
        }
    }

    changed
}

/// Render a publish form.
///
/// # Route
///
/// `GET /publish/{kind}`
pub async fn form_page(
    State(state): State<AppState>,
    session: Session,
    Path(kind): Path<String>,
) -> Result<PublishTemplate> {
    let kind = PostKind::from_path(&kind).ok_or_else(|| AppError::NotFound(kind))?;

    let user: CurrentUser = session
        .get(session_keys::CURRENT_USER)
        .await?
        .ok_or(AppError::Unauthorized)?;
    let context = publish_context(&session).await?;

    let mut capabilities: Capabilities = session
        .get(session_keys::CAPABILITIES)
        .await?
        .unwrap_or_default();
    if refresh_stale_capabilities(&state, &context, &mut capabilities).await {
        session
            .insert(session_keys::CAPABILITIES, &capabilities)
            .await?;
    }

    Ok(PublishTemplate {
        kind: kind.as_str(),
        title: kind.title(),
        vocabulary: kind.vocabulary(),
        has_content: kind.has_content(),
        user_name: user.display_name().to_string(),
        categories: capabilities.categories().unwrap_or_default(),
        targets: capabilities.syndication_targets().unwrap_or_default(),
    })
}

/// Submit a publish request.
///
/// The form arrives as raw key/value pairs so repeated fields (categories,
/// syndication targets) survive; they are collapsed or expanded by the
/// parameter builder, not here.
///
/// # Route
///
/// `POST /publish/create`
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<Vec<(String, String)>>,
) -> Result<Redirect> {
    let context = publish_context(&session).await?;
    let preferences: Preferences = session
        .get(session_keys::PREFERENCES)
        .await?
        .unwrap_or_default();

    let params = marigold_client::prepare_params(&form, &preferences.timezone)?;
    let permalink = state
        .micropub()
        .create_post(&context.micropub_endpoint, &context.grant, &params)
        .await?;

    tracing::info!(
        permalink = permalink.as_ref().map(Url::as_str).unwrap_or("(none)"),
        "post created"
    );
    session
        .insert(
            session_keys::LAST_POST,
            permalink.as_ref().map(Url::as_str),
        )
        .await?;

    Ok(Redirect::to("/publish/success"))
}

/// Show the permalink of the post that was just created.
///
/// # Route
///
/// `GET /publish/success`
pub async fn success(session: Session) -> Result<SuccessTemplate> {
    let permalink: Option<String> = session
        .get(session_keys::LAST_POST)
        .await?
        .unwrap_or_default();

    Ok(SuccessTemplate { permalink })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_served_kind_parses_from_its_path() {
        let served = [
            ("note", PostKind::Note),
            ("article", PostKind::Article),
            ("reply", PostKind::Reply),
            ("like", PostKind::Like),
            ("repost", PostKind::Repost),
            ("event", PostKind::Event),
            ("rsvp", PostKind::Rsvp),
        ];

        for (path, kind) in served {
            assert_eq!(PostKind::from_path(path), Some(kind), "{path}");
            assert_eq!(kind.as_str(), path);
        }

        assert_eq!(PostKind::from_path("photo"), None);
        assert_eq!(PostKind::from_path("video"), None);
    }

    #[test]
    fn events_publish_under_their_own_vocabulary() {
        assert_eq!(PostKind::Event.vocabulary(), "event");

        for kind in [
            PostKind::Note,
            PostKind::Article,
            PostKind::Reply,
            PostKind::Like,
            PostKind::Repost,
            PostKind::Rsvp,
        ] {
            assert_eq!(kind.vocabulary(), "entry", "{}", kind.as_str());
        }
    }

    #[test]
    fn only_body_kinds_require_content() {
        assert!(PostKind::Note.has_content());
        assert!(PostKind::Article.has_content());
        assert!(PostKind::Reply.has_content());
        assert!(!PostKind::Event.has_content());
        assert!(!PostKind::Rsvp.has_content());
    }
}
