//! Declarative descriptions of third-party REST APIs.
//!
//! A [`Manifest`] is pure data: base URL, auth mode, rate limit, blocklist,
//! and a list of [`Operation`]s. Manifests are validated when loaded so that
//! the executor can rely on their structural invariants.

#![warn(missing_docs, clippy::pedantic)]

pub mod catalog;
pub mod error;
pub mod model;
pub mod path;
mod validate;

pub use catalog::ManifestCatalog;
pub use error::{ManifestError, ManifestResult};
pub use model::{
    AuthMode, HttpMethod, Manifest, Operation, ParamSpec, ParamStyle, ParamType,
    RateLimit,
};
