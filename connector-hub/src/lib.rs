//! Manifest-driven REST tool gateway.
//!
//! Depend on this crate to get the whole stack. Optional tool families sit
//! behind feature flags; [`Hub`] wires configuration and collaborators into
//! a per-session tool registrar.

#![warn(missing_docs, clippy::pedantic)]

mod hub;

pub use hub::{Hub, HubBuilder, HubError, HubResult};

/// Identifiers, access levels and capability profiles.
pub use connector_primitives as primitives;

/// Manifest model and catalog.
pub use connector_manifest as manifest;

/// Manifest executor and HTTP plumbing.
pub use connector_http as http;

/// Tool contract and per-session registry.
pub use connector_tools as tools;

/// Capability-gated registration.
pub use connector_registrar as registrar;

/// TOML configuration.
pub use connector_config as config;

/// Tabular store tools (enabled by `tabular` feature).
#[cfg(feature = "tabular")]
pub use connector_tabular as tabular;

/// Async scrape tasks (enabled by `tasks` feature).
#[cfg(feature = "tasks")]
pub use connector_tasks as tasks;

/// Skill catalog tools (enabled by `skills` feature).
#[cfg(feature = "skills")]
pub use connector_skills as skills;

/// Tracing setup (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use connector_telemetry as telemetry;
