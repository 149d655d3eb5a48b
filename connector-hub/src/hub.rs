use std::fmt;
use std::sync::Arc;

use connector_config::{ConfigError, HubConfig};
use connector_http::{
    CredentialProvider, ExecutorConfig, HttpTransport, HyperTransport, ManifestExecutor, RateLimiter,
};
use connector_manifest::{Manifest, ManifestCatalog, ManifestError};
use connector_primitives::{ProviderId, UserId};
use connector_registrar::{
    CapabilitySource, Gate, Registrar, RegistrationEntry, RegistrationError, RegistrationTable,
    SessionTools,
};
use connector_tools::ToolBuilder;
use thiserror::Error;
use tracing::info;

/// Errors raised while assembling or using a [`Hub`].
#[derive(Debug, Error)]
pub enum HubError {
    /// A required collaborator was not supplied.
    #[error("missing collaborator: {0}")]
    MissingCollaborator(&'static str),
    /// Configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The manifest directory could not be read.
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    /// Task wait settings were rejected.
    #[cfg(feature = "tasks")]
    #[error(transparent)]
    Tasks(#[from] connector_tasks::TaskError),
    /// Session registration failed.
    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

/// Result alias for hub operations.
pub type HubResult<T> = Result<T, HubError>;

/// Long-lived gateway: one per process, many sessions.
#[derive(Debug)]
pub struct Hub {
    config: HubConfig,
    catalog: ManifestCatalog,
    registrar: Registrar,
}

impl Hub {
    /// Starts assembling a hub.
    #[must_use]
    pub fn builder() -> HubBuilder {
        HubBuilder::default()
    }

    /// Registers the tools `user` may call in a new session.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Registration`] when the capability profile cannot
    /// be fetched.
    pub async fn start_session(&self, user: &UserId) -> HubResult<SessionTools> {
        Ok(self.registrar.register(user).await?)
    }

    /// Effective configuration.
    #[must_use]
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Manifests the hub serves.
    #[must_use]
    pub fn catalog(&self) -> &ManifestCatalog {
        &self.catalog
    }

    /// The registrar behind [`Hub::start_session`].
    #[must_use]
    pub fn registrar(&self) -> &Registrar {
        &self.registrar
    }
}

/// Builder for [`Hub`].
#[derive(Default)]
pub struct HubBuilder {
    config: HubConfig,
    capabilities: Option<Arc<dyn CapabilitySource>>,
    credentials: Option<Arc<dyn CredentialProvider>>,
    transport: Option<Arc<dyn HttpTransport>>,
    limiter: Option<Arc<dyn RateLimiter>>,
    manifests: Vec<Manifest>,
    fallbacks: Vec<(ProviderId, Arc<dyn ToolBuilder>)>,
    entries: Vec<RegistrationEntry>,
    #[cfg(feature = "tabular")]
    tabulars: Vec<TabularSource>,
}

#[cfg(feature = "tabular")]
type TabularSource = (String, Arc<dyn connector_tabular::TabularBackend>, Gate);

impl fmt::Debug for HubBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubBuilder")
            .field("config", &self.config)
            .field("manifests", &self.manifests.len())
            .field("fallbacks", &self.fallbacks.len())
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl HubBuilder {
    /// Replaces the configuration.
    #[must_use]
    pub fn config(mut self, config: HubConfig) -> Self {
        self.config = config;
        self
    }

    /// Supplies capability profiles.
    #[must_use]
    pub fn capabilities(mut self, source: Arc<dyn CapabilitySource>) -> Self {
        self.capabilities = Some(source);
        self
    }

    /// Supplies per-call credentials.
    #[must_use]
    pub fn credentials(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(provider);
        self
    }

    /// Overrides the default `hyper` transport.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Overrides the in-process rate limiter, e.g. with a shared store.
    #[must_use]
    pub fn limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Adds a manifest on top of the configured sources. It replaces any
    /// loaded manifest for the same provider.
    #[must_use]
    pub fn manifest(mut self, manifest: Manifest) -> Self {
        self.manifests.push(manifest);
        self
    }

    /// Registers a hand-written tool set for a provider without a manifest.
    #[must_use]
    pub fn fallback(mut self, provider: ProviderId, builder: Arc<dyn ToolBuilder>) -> Self {
        self.fallbacks.push((provider, builder));
        self
    }

    /// Adds an arbitrary registration entry.
    #[must_use]
    pub fn entry(mut self, entry: RegistrationEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Exposes a tabular backend under `namespace`, registered when `gate`
    /// passes.
    ///
    /// When the gate names a provider, that provider's granted access bounds
    /// the tools: a read-only grant gets the list and search tools only.
    /// Tab slugs never take another entry's prefix.
    #[cfg(feature = "tabular")]
    #[must_use]
    pub fn tabular(
        mut self,
        namespace: impl Into<String>,
        backend: Arc<dyn connector_tabular::TabularBackend>,
        gate: Gate,
    ) -> Self {
        self.tabulars.push((namespace.into(), backend, gate));
        self
    }

    /// Exposes the skill catalog in every session.
    #[cfg(feature = "skills")]
    #[must_use]
    pub fn skills(self, catalog: Arc<dyn connector_skills::SkillCatalog>) -> Self {
        let builder = connector_skills::SkillToolBuilder::new(catalog);
        self.entry(RegistrationEntry::builder("skills", Gate::Always, Arc::new(builder)))
    }

    /// Assembles the hub.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::MissingCollaborator`] without a capability source
    /// or credential provider, and propagates configuration and manifest
    /// directory failures.
    pub fn build(self) -> HubResult<Hub> {
        self.config.validate()?;
        let capabilities = self
            .capabilities
            .ok_or(HubError::MissingCollaborator("capability source"))?;
        let credentials = self
            .credentials
            .ok_or(HubError::MissingCollaborator("credential provider"))?;
        let transport = self.transport.unwrap_or_else(|| {
            Arc::new(
                HyperTransport::new(self.config.executor.request_timeout())
                    .with_max_body_bytes(self.config.executor.max_response_bytes),
            )
        });

        let mut catalog = if self.config.manifests.include_builtin {
            ManifestCatalog::builtin()
        } else {
            ManifestCatalog::new()
        };
        if let Some(dir) = &self.config.manifests.dir {
            catalog.extend(ManifestCatalog::load_dir(dir)?);
        }
        for manifest in self.manifests {
            catalog.insert(manifest);
        }

        let executor_config = ExecutorConfig::new()
            .with_max_rate_limit_wait(self.config.executor.max_rate_limit_wait())
            .with_summary_max_chars(self.config.executor.summary_max_chars);
        let mut executor = ManifestExecutor::new(transport, credentials).with_config(executor_config);
        if let Some(limiter) = self.limiter {
            executor = executor.with_limiter(limiter);
        }

        let resolved = RegistrationTable::resolve(&catalog, self.fallbacks);
        #[cfg(feature = "tabular")]
        let tabular = tabular_entries(self.tabulars, &self.entries, &resolved);

        let mut table = RegistrationTable::new();
        for entry in self.entries {
            table.push(entry);
        }
        #[cfg(feature = "tabular")]
        for entry in tabular {
            table.push(entry);
        }
        for entry in resolved.entries() {
            table.push(entry.clone());
        }

        info!(
            manifests = catalog.len(),
            entries = table.entries().len(),
            "connector hub assembled"
        );
        let registrar = Registrar::new(table, capabilities, Arc::new(executor))
            .with_aliases(self.config.registrar.legacy_aliases.clone());
        Ok(Hub {
            config: self.config,
            catalog,
            registrar,
        })
    }
}

/// Builds the tabular entries, reserving every other entry's label and every
/// tabular namespace as a prefix their tab slugs must avoid.
#[cfg(feature = "tabular")]
fn tabular_entries(
    tabulars: Vec<TabularSource>,
    others: &[RegistrationEntry],
    resolved: &RegistrationTable,
) -> Vec<RegistrationEntry> {
    let reserved: Vec<String> = others
        .iter()
        .chain(resolved.entries())
        .map(|entry| entry.label().to_owned())
        .chain(tabulars.iter().map(|(namespace, _, _)| namespace.clone()))
        .collect();

    tabulars
        .into_iter()
        .map(|(namespace, backend, gate)| {
            let mut builder = connector_tabular::TabularToolBuilder::new(namespace.clone(), backend)
                .with_reserved_prefixes(reserved.iter().cloned());
            if let Some(provider) = gate.provider() {
                builder = builder.with_provider(provider.clone());
            }
            RegistrationEntry::builder(namespace, gate, Arc::new(builder))
        })
        .collect()
}

#[cfg(feature = "tasks")]
impl HubBuilder {
    /// Exposes scrape tools backed by `store` in every session, waiting per
    /// the `[tasks]` configuration.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Tasks`] when the configured wait settings are
    /// inconsistent.
    pub fn task_store(self, store: Arc<dyn connector_tasks::TaskStore>) -> HubResult<Self> {
        let wait = connector_tasks::WaitOptions::new(
            self.config.tasks.wait_timeout(),
            self.config.tasks.poll_interval(),
        )?;
        let client = connector_tasks::AsyncTaskClient::new(store).with_wait_options(wait);
        let builder = connector_tasks::ScrapeToolBuilder::new(Arc::new(client));
        Ok(self.entry(RegistrationEntry::builder("scrape", Gate::Always, Arc::new(builder))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_requires_collaborators() {
        let err = Hub::builder().build().unwrap_err();
        assert!(matches!(err, HubError::MissingCollaborator("capability source")));
    }
}
