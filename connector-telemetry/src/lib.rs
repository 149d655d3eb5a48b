//! Structured logging for the connector hub.

#![warn(missing_docs, clippy::pedantic)]

use connector_config::TelemetryConfig;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The filter directives did not parse.
    #[error("invalid log filter `{filter}`: {reason}")]
    InvalidFilter {
        /// Offending directives.
        filter: String,
        /// Parser message.
        reason: String,
    },
    /// A global subscriber is already installed.
    #[error("tracing subscriber already installed: {0}")]
    AlreadyInstalled(String),
}

/// Builds the filter: `RUST_LOG` when set, otherwise the configured directives.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] when the directives do not parse.
pub fn env_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    build_filter(rust_log.as_deref(), &config.filter)
}

fn build_filter(rust_log: Option<&str>, configured: &str) -> Result<EnvFilter, TelemetryError> {
    let directives = rust_log
        .filter(|value| !value.trim().is_empty())
        .unwrap_or(configured);
    EnvFilter::try_new(directives).map_err(|err| TelemetryError::InvalidFilter {
        filter: directives.to_owned(),
        reason: err.to_string(),
    })
}

/// Installs a global `fmt` subscriber.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] for bad directives and
/// [`TelemetryError::AlreadyInstalled`] when called a second time.
pub fn init_tracing(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = env_filter(config)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.ansi)
        .with_target(true)
        .try_init()
        .map_err(|err| TelemetryError::AlreadyInstalled(err.to_string()))?;
    tracing::debug!(filter = %config.filter, "tracing initialised");
    Ok(())
}
