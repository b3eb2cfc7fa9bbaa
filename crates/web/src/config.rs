//! Web front-end configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `MARIGOLD_HOST` - Bind address (default: 127.0.0.1)
//! - `MARIGOLD_PORT` - Listen port (default: 3000)
//! - `MARIGOLD_BASE_URL` - Public URL for this instance
//!   (default: `http://localhost:<port>`)
//! - `MARIGOLD_CLIENT_ID` - `client_id` presented to authorization servers
//!   (default: `<base_url>/`)

use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Web application configuration.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for this instance, without a trailing slash
    pub base_url: String,
    /// `client_id` presented to authorization servers
    pub client_id: String,
}

impl WebConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present. Every
    /// variable has a development default, so an empty environment yields a
    /// working localhost instance.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a set variable fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("MARIGOLD_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("MARIGOLD_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("MARIGOLD_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("MARIGOLD_PORT".to_string(), e.to_string()))?;

        let base_url = get_optional_env("MARIGOLD_BASE_URL")
            .unwrap_or_else(|| format!("http://localhost:{port}"))
            .trim_end_matches('/')
            .to_string();

        // IndieAuth expects the client_id to be a URL, conventionally the
        // app's own home page with a trailing slash.
        let client_id =
            get_optional_env("MARIGOLD_CLIENT_ID").unwrap_or_else(|| format!("{base_url}/"));

        Ok(Self {
            host,
            port,
            base_url,
            client_id,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// The redirect URI registered with authorization servers.
    #[must_use]
    pub fn redirect_uri(&self) -> String {
        format!("{}/login/callback", self.base_url)
    }
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_addr() {
        let config = WebConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            client_id: "http://localhost:3000/".to_string(),
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_redirect_uri_joins_base_url() {
        let config = WebConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "https://marigold.example".to_string(),
            client_id: "https://marigold.example/".to_string(),
        };

        assert_eq!(
            config.redirect_uri(),
            "https://marigold.example/login/callback"
        );
    }
}
