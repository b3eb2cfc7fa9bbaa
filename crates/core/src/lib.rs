//! Marigold Core - Shared protocol types and algorithms.
//!
//! This crate provides the I/O-free building blocks used across the Marigold
//! components:
//! - `client` - IndieAuth/Micropub protocol engine
//! - `web` - User-facing publishing front-end
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no HTTP clients,
//! no session storage, no async. Everything here can be tested without a
//! network in sight.
//!
//! # Modules
//!
//! - [`profile`] - Canonical profile URL normalization and validation
//! - [`auth`] - Access grants issued by an IndieAuth token endpoint
//! - [`micropub`] - Micropub capability model and query vocabulary
//! - [`publish`] - Slug and publish-date derivation for outgoing posts

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod micropub;
pub mod profile;
pub mod publish;

pub use auth::AccessGrant;
pub use micropub::{Capabilities, QueryType, SyndicationTarget};
pub use profile::{ProfileUrl, UrlError};
pub use publish::{DateTimeError, derive_date, slugify};
