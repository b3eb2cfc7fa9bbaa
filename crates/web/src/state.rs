//! Application state shared across handlers.

use std::sync::Arc;

use marigold_client::{Discoverer, IndieAuthClient, MicropubClient};

use crate::config::WebConfig;
use crate::error::AppError;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. The three protocol clients each hold their
/// own reqwest client because they need different redirect policies.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    discoverer: Discoverer,
    indieauth: IndieAuthClient,
    micropub: MicropubClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if one of the HTTP clients fails to build.
    pub fn new(config: &WebConfig) -> Result<Self, AppError> {
        let discoverer = Discoverer::new()?;
        let indieauth = IndieAuthClient::new(&config.client_id, &config.redirect_uri())?;
        let micropub = MicropubClient::new()?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                discoverer,
                indieauth,
                micropub,
            }),
        })
    }

    /// Get a reference to the profile/endpoint discoverer.
    #[must_use]
    pub fn discoverer(&self) -> &Discoverer {
        &self.inner.discoverer
    }

    /// Get a reference to the IndieAuth client.
    #[must_use]
    pub fn indieauth(&self) -> &IndieAuthClient {
        &self.inner.indieauth
    }

    /// Get a reference to the Micropub client.
    #[must_use]
    pub fn micropub(&self) -> &MicropubClient {
        &self.inner.micropub
    }
}
