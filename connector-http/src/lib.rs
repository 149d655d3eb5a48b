//! Generic interpreter that turns a manifest operation into one HTTP call.
//!
//! [`ManifestExecutor`] is parameterised by a [`connector_manifest::Manifest`]
//! value rather than by per-provider code: access checks, path resolution,
//! parameter placement, blocklisting, auth, and rate limiting are all driven
//! by the manifest. Collaborators are traits so they can be swapped for fakes
//! in tests or shared stores in production.

#![warn(missing_docs, clippy::pedantic)]

pub mod credentials;
pub mod error;
pub mod executor;
pub mod limiter;
pub mod outcome;
pub mod transport;

mod auth;
mod http_client;
mod request;

pub use credentials::{Credential, CredentialProvider};
pub use error::{ErrorClass, ExecutionError, ExecutionResult};
pub use executor::{Caller, ExecutorConfig, ManifestExecutor};
pub use limiter::{RateLimitKey, RateLimiter, TokenBucketLimiter};
pub use outcome::{ExecutionOutcome, ResponseBody};
pub use transport::{DEFAULT_MAX_BODY_BYTES, HttpTransport, HyperTransport};
