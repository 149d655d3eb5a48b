//! Configuration for the connector hub.
//!
//! Every section has defaults, so an empty file yields a usable
//! [`HubConfig`]. Loaders validate before returning.

#![warn(missing_docs, clippy::pedantic)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Overrides the telemetry filter.
pub const LOG_ENV: &str = "CONNECTOR_HUB_LOG";
/// Overrides the manifest directory.
pub const MANIFEST_DIR_ENV: &str = "CONNECTOR_HUB_MANIFEST_DIR";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The TOML did not match the schema.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Root configuration document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HubConfig {
    /// Manifest executor settings.
    pub executor: ExecutorSection,
    /// Async task client settings.
    pub tasks: TasksSection,
    /// Where manifests come from.
    pub manifests: ManifestsSection,
    /// Registration settings.
    pub registrar: RegistrarSection,
    /// Logging settings.
    pub telemetry: TelemetryConfig,
}

/// `[executor]`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutorSection {
    /// Per-call HTTP timeout.
    pub request_timeout_secs: u64,
    /// Longest wait for a rate-limit token before failing locally.
    pub max_rate_limit_wait_ms: u64,
    /// Cap on tool result text.
    pub summary_max_chars: usize,
    /// Cap on a buffered upstream response body.
    pub max_response_bytes: usize,
}

impl Default for ExecutorSection {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            max_rate_limit_wait_ms: 2000,
            summary_max_chars: 4000,
            max_response_bytes: 10 * 1024 * 1024,
        }
    }
}

impl ExecutorSection {
    /// Per-call HTTP timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Longest rate-limit wait.
    #[must_use]
    pub const fn max_rate_limit_wait(&self) -> Duration {
        Duration::from_millis(self.max_rate_limit_wait_ms)
    }
}

/// `[tasks]`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TasksSection {
    /// Default `wait_for` timeout.
    pub wait_timeout_secs: u64,
    /// Delay between status polls.
    pub poll_interval_ms: u64,
}

impl Default for TasksSection {
    fn default() -> Self {
        Self {
            wait_timeout_secs: 60,
            poll_interval_ms: 1000,
        }
    }
}

impl TasksSection {
    /// Default `wait_for` timeout.
    #[must_use]
    pub const fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }

    /// Delay between polls.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// `[manifests]`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManifestsSection {
    /// Load the manifests bundled with the hub.
    pub include_builtin: bool,
    /// Directory of additional `*.json` manifests.
    pub dir: Option<PathBuf>,
}

impl Default for ManifestsSection {
    fn default() -> Self {
        Self {
            include_builtin: true,
            dir: None,
        }
    }
}

/// `[registrar]`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistrarSection {
    /// Old tool name to current tool name.
    pub legacy_aliases: BTreeMap<String, String>,
}

/// `[telemetry]`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetryConfig {
    /// `EnvFilter` directives.
    pub filter: String,
    /// Colourised output.
    pub ansi: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_owned(),
            ansi: true,
        }
    }
}

impl HubConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read, otherwise
    /// the same errors as [`HubConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded configuration file");
        Self::from_toml_str(&source)
    }

    /// Applies `CONNECTOR_HUB_LOG` and `CONNECTOR_HUB_MANIFEST_DIR`.
    #[must_use]
    pub fn apply_env(self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(filter) = lookup(LOG_ENV).filter(|value| !value.trim().is_empty()) {
            self.telemetry.filter = filter;
        }
        if let Some(dir) = lookup(MANIFEST_DIR_ENV).filter(|value| !value.trim().is_empty()) {
            self.manifests.dir = Some(PathBuf::from(dir));
        }
        self
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero timeout or interval, an
    /// interval longer than the wait timeout, or a zero summary cap.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.executor.request_timeout_secs == 0 {
            return Err(invalid("executor.request_timeout_secs must be positive"));
        }
        if self.executor.summary_max_chars == 0 {
            return Err(invalid("executor.summary_max_chars must be positive"));
        }
        if self.executor.max_response_bytes == 0 {
            return Err(invalid("executor.max_response_bytes must be positive"));
        }
        if self.tasks.wait_timeout_secs == 0 {
            return Err(invalid("tasks.wait_timeout_secs must be positive"));
        }
        if self.tasks.poll_interval_ms == 0 {
            return Err(invalid("tasks.poll_interval_ms must be positive"));
        }
        if self.tasks.poll_interval() > self.tasks.wait_timeout() {
            return Err(invalid(
                "tasks.poll_interval_ms must not exceed tasks.wait_timeout_secs",
            ));
        }
        for (alias, target) in &self.registrar.legacy_aliases {
            if alias == target {
                return Err(invalid(format!("legacy alias `{alias}` points at itself")));
            }
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(reason.into())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = HubConfig::from_toml_str("").unwrap();
        assert_eq!(config, HubConfig::default());
        assert_eq!(config.executor.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.executor.max_rate_limit_wait(), Duration::from_millis(2000));
        assert_eq!(config.tasks.poll_interval(), Duration::from_secs(1));
        assert!(config.manifests.include_builtin);
        assert_eq!(config.telemetry.filter, "info");
        assert_eq!(config.executor.max_response_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn parses_every_section() {
        let config = HubConfig::from_toml_str(
            r#"
            [executor]
            request_timeout_secs = 10
            summary_max_chars = 500
            max_response_bytes = 65536

            [tasks]
            wait_timeout_secs = 5
            poll_interval_ms = 250

            [manifests]
            include_builtin = false
            dir = "/etc/connector-hub/manifests"

            [registrar]
            legacy_aliases = { "github_list_issues_legacy" = "github_list_issues" }

            [telemetry]
            filter = "connector_http=debug"
            ansi = false
            "#,
        )
        .unwrap();

        assert_eq!(config.executor.request_timeout_secs, 10);
        assert_eq!(config.executor.max_rate_limit_wait_ms, 2000);
        assert_eq!(config.executor.summary_max_chars, 500);
        assert_eq!(config.executor.max_response_bytes, 65_536);
        assert_eq!(config.tasks.poll_interval(), Duration::from_millis(250));
        assert!(!config.manifests.include_builtin);
        assert_eq!(
            config.manifests.dir.as_deref(),
            Some(Path::new("/etc/connector-hub/manifests"))
        );
        assert_eq!(
            config.registrar.legacy_aliases.get("github_list_issues_legacy").map(String::as_str),
            Some("github_list_issues")
        );
        assert!(!config.telemetry.ansi);
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = HubConfig::from_toml_str("[executor]\ntimeout = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_out_of_range_values() {
        for source in [
            "[tasks]\nwait_timeout_secs = 0\n",
            "[tasks]\npoll_interval_ms = 0\n",
            "[tasks]\nwait_timeout_secs = 1\npoll_interval_ms = 1500\n",
            "[executor]\nrequest_timeout_secs = 0\n",
            "[executor]\nmax_response_bytes = 0\n",
            "[registrar]\nlegacy_aliases = { a = \"a\" }\n",
        ] {
            let err = HubConfig::from_toml_str(source).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{source}");
        }
    }

    #[test]
    fn environment_overrides_filter_and_manifest_dir() {
        let config = HubConfig::default().apply_overrides(|key| match key {
            LOG_ENV => Some("debug".to_owned()),
            MANIFEST_DIR_ENV => Some("/srv/manifests".to_owned()),
            _ => None,
        });
        assert_eq!(config.telemetry.filter, "debug");
        assert_eq!(config.manifests.dir, Some(PathBuf::from("/srv/manifests")));

        let untouched = HubConfig::default().apply_overrides(|_| Some("  ".to_owned()));
        assert_eq!(untouched, HubConfig::default());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[telemetry]\nfilter = \"warn\"").unwrap();
        let config = HubConfig::load(file.path()).unwrap();
        assert_eq!(config.telemetry.filter, "warn");

        let missing = HubConfig::load(file.path().with_extension("absent")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }
}
