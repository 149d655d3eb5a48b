//! The declarative registration table.

use std::fmt;
use std::sync::Arc;

use connector_manifest::{Manifest, ManifestCatalog};
use connector_primitives::{CapabilityProfile, ProviderId};
use connector_tools::ToolBuilder;
use tracing::debug;

/// Predicate deciding whether an entry applies to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    /// Applies to every session.
    Always,
    /// Applies when the provider is connected.
    Connected(ProviderId),
    /// Applies when every inner gate applies.
    AllOf(Vec<Gate>),
}

impl Gate {
    /// Evaluates the gate against a profile.
    #[must_use]
    pub fn allows(&self, profile: &CapabilityProfile) -> bool {
        match self {
            Self::Always => true,
            Self::Connected(provider) => profile.is_connected(provider),
            Self::AllOf(gates) => gates.iter().all(|gate| gate.allows(profile)),
        }
    }

    /// The provider whose access level bounds this gate's tools, if any.
    ///
    /// For [`Gate::AllOf`] this is the last connected-provider gate, which by
    /// convention names the sub-capability itself.
    #[must_use]
    pub fn provider(&self) -> Option<&ProviderId> {
        match self {
            Self::Always => None,
            Self::Connected(provider) => Some(provider),
            Self::AllOf(gates) => gates.iter().rev().find_map(Gate::provider),
        }
    }
}

/// Where an entry's tools come from.
#[derive(Clone)]
pub enum ToolSource {
    /// One tool per operation of a manifest.
    Manifest(Arc<Manifest>),
    /// A hand-written tool set.
    Builder(Arc<dyn ToolBuilder>),
}

impl fmt::Debug for ToolSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manifest(manifest) => f.debug_tuple("Manifest").field(manifest.provider()).finish(),
            Self::Builder(_) => f.write_str("Builder"),
        }
    }
}

/// One row of the table.
#[derive(Debug, Clone)]
pub struct RegistrationEntry {
    label: String,
    gate: Gate,
    source: ToolSource,
}

impl RegistrationEntry {
    /// An entry gated on its manifest's provider being connected.
    #[must_use]
    pub fn manifest(manifest: Arc<Manifest>) -> Self {
        let provider = manifest.provider().clone();
        Self {
            label: provider.to_string(),
            gate: Gate::Connected(provider),
            source: ToolSource::Manifest(manifest),
        }
    }

    /// An entry backed by a builder.
    #[must_use]
    pub fn builder(label: impl Into<String>, gate: Gate, builder: Arc<dyn ToolBuilder>) -> Self {
        Self {
            label: label.into(),
            gate,
            source: ToolSource::Builder(builder),
        }
    }

    /// Replaces the gate.
    #[must_use]
    pub fn gated(mut self, gate: Gate) -> Self {
        self.gate = gate;
        self
    }

    /// Label used in logs and the registration report.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The entry's gate.
    #[must_use]
    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    /// The entry's tool source.
    #[must_use]
    pub fn source(&self) -> &ToolSource {
        &self.source
    }
}

/// Ordered list of registration entries.
#[derive(Debug, Clone, Default)]
pub struct RegistrationTable {
    entries: Vec<RegistrationEntry>,
}

impl RegistrationTable {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the provider rows: a manifest entry for every catalog manifest,
    /// and a static entry for each fallback provider that has no manifest.
    #[must_use]
    pub fn resolve(
        catalog: &ManifestCatalog,
        fallbacks: impl IntoIterator<Item = (ProviderId, Arc<dyn ToolBuilder>)>,
    ) -> Self {
        let mut table = Self::new();
        for manifest in catalog.iter() {
            table.push(RegistrationEntry::manifest(Arc::clone(manifest)));
        }
        for (provider, builder) in fallbacks {
            if catalog.contains(&provider) {
                debug!(provider = %provider, "manifest supersedes static tool set");
                continue;
            }
            table.push(RegistrationEntry::builder(
                provider.as_str(),
                Gate::Connected(provider.clone()),
                builder,
            ));
        }
        table
    }

    /// Appends an entry.
    pub fn push(&mut self, entry: RegistrationEntry) {
        self.entries.push(entry);
    }

    /// Appends an entry, builder style.
    #[must_use]
    pub fn with_entry(mut self, entry: RegistrationEntry) -> Self {
        self.push(entry);
        self
    }

    /// Appends an always-on builder entry.
    #[must_use]
    pub fn always(self, label: impl Into<String>, builder: Arc<dyn ToolBuilder>) -> Self {
        self.with_entry(RegistrationEntry::builder(label, Gate::Always, builder))
    }

    /// All entries in table order.
    #[must_use]
    pub fn entries(&self) -> &[RegistrationEntry] {
        &self.entries
    }

    /// Splits entries into those whose gate passes and those whose gate fails.
    #[must_use]
    pub fn evaluate(&self, profile: &CapabilityProfile) -> (Vec<&RegistrationEntry>, Vec<&RegistrationEntry>) {
        self.entries
            .iter()
            .partition(|entry| entry.gate.allows(profile))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use connector_primitives::{AccessLevel, ProviderConnection};
    use connector_tools::{SessionContext, ToolHandle, ToolResult};
    use serde_json::json;

    use super::*;

    struct Empty;

    #[async_trait]
    impl ToolBuilder for Empty {
        async fn build(&self, _ctx: &SessionContext) -> ToolResult<Vec<ToolHandle>> {
            Ok(Vec::new())
        }
    }

    fn provider(id: &str) -> ProviderId {
        ProviderId::new(id).unwrap()
    }

    fn catalog() -> ManifestCatalog {
        let mut catalog = ManifestCatalog::new();
        catalog.insert(
            Manifest::from_value(json!({
                "provider": "ats",
                "displayName": "ATS",
                "baseUrl": "https://ats.example.com",
                "operations": [{"id": "ping", "method": "GET", "path": "/ping", "access": "read"}]
            }))
            .unwrap(),
        );
        catalog
    }

    #[test]
    fn resolve_prefers_manifest_over_fallback() {
        let table = RegistrationTable::resolve(
            &catalog(),
            [
                (provider("ats"), Arc::new(Empty) as Arc<dyn ToolBuilder>),
                (provider("mailer"), Arc::new(Empty) as Arc<dyn ToolBuilder>),
            ],
        );

        let labels: Vec<_> = table.entries().iter().map(RegistrationEntry::label).collect();
        assert_eq!(labels, vec!["ats", "mailer"]);
        assert!(matches!(table.entries()[0].source(), ToolSource::Manifest(_)));
        assert!(matches!(table.entries()[1].source(), ToolSource::Builder(_)));
    }

    #[test]
    fn sub_capabilities_gate_independently() {
        let workspace = Gate::Connected(provider("google"));
        let drive = Gate::AllOf(vec![workspace.clone(), Gate::Connected(provider("google_drive"))]);
        let tasks = Gate::AllOf(vec![workspace, Gate::Connected(provider("google_tasks"))]);

        let profile = CapabilityProfile::new()
            .with_provider(provider("google"), ProviderConnection::connected(AccessLevel::ReadWrite))
            .with_provider(provider("google_drive"), ProviderConnection::connected(AccessLevel::ReadOnly))
            .with_provider(provider("google_tasks"), ProviderConnection::disconnected());

        assert!(drive.allows(&profile));
        assert!(!tasks.allows(&profile));
        assert_eq!(drive.provider(), Some(&provider("google_drive")));
        assert!(Gate::Always.allows(&CapabilityProfile::new()));
    }

    #[test]
    fn evaluate_partitions_on_gate() {
        let table = RegistrationTable::resolve(&catalog(), [])
            .always("skills", Arc::new(Empty));
        let (active, gated) = table.evaluate(&CapabilityProfile::new());
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].label(), "skills");
        assert_eq!(gated[0].label(), "ats");
    }
}
