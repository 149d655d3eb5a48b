//! Core shared types for the connector hub.
//!
//! Every other crate in the workspace speaks in terms of these identifiers and
//! access levels, so they are kept dependency-light.

#![warn(missing_docs, clippy::pedantic)]

mod access;
mod capability;
mod error;
mod ids;
mod slug;

/// Operation access classes and the per-user grants that cover them.
pub use access::{Access, AccessLevel};
/// Per-user snapshot of connected integrations.
pub use capability::{CapabilityProfile, ProviderConnection};
/// Error type and result alias shared across the workspace.
pub use error::{Error, Result};
/// Identifiers for providers, users, and asynchronous tasks.
pub use ids::{ProviderId, TaskId, UserId};
/// Identifier-safe normalisation of human-readable names.
pub use slug::{dedupe_slugs, to_slug};
