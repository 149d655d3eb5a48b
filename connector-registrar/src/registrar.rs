//! Session registration.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use connector_http::{Caller, ManifestExecutor};
use connector_primitives::UserId;
use connector_tools::{SessionContext, ToolHandle, ToolRegistry, ToolResult, Withheld};
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::capability::CapabilitySource;
use crate::error::RegistrationResult;
use crate::manifest_tools::manifest_tools;
use crate::table::{RegistrationEntry, RegistrationTable, ToolSource};

/// Something that did not register, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Skipped {
    /// Entry label or tool name.
    pub name: String,
    /// Why it was skipped.
    pub reason: String,
}

/// Audit record of one registration pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistrationReport {
    registered: Vec<String>,
    skipped: Vec<Skipped>,
}

impl RegistrationReport {
    /// Tool names that registered, in registration order.
    #[must_use]
    pub fn registered(&self) -> &[String] {
        &self.registered
    }

    /// Entries and tools that did not register.
    #[must_use]
    pub fn skipped(&self) -> &[Skipped] {
        &self.skipped
    }

    fn skip(&mut self, name: impl Into<String>, reason: impl Into<String>) {
        self.skipped.push(Skipped {
            name: name.into(),
            reason: reason.into(),
        });
    }
}

/// The outcome of registering a session.
#[derive(Debug)]
pub struct SessionTools {
    registry: ToolRegistry,
    report: RegistrationReport,
}

impl SessionTools {
    /// The session's callable tools.
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// What happened during registration.
    #[must_use]
    pub fn report(&self) -> &RegistrationReport {
        &self.report
    }

    /// Splits into registry and report.
    #[must_use]
    pub fn into_parts(self) -> (ToolRegistry, RegistrationReport) {
        (self.registry, self.report)
    }
}

/// Evaluates a [`RegistrationTable`] for one user at a time.
pub struct Registrar {
    table: RegistrationTable,
    capabilities: Arc<dyn CapabilitySource>,
    executor: Arc<ManifestExecutor>,
    aliases: BTreeMap<String, String>,
}

impl fmt::Debug for Registrar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registrar")
            .field("table", &self.table)
            .field("aliases", &self.aliases)
            .finish_non_exhaustive()
    }
}

type EntryTools = (Vec<ToolHandle>, Vec<(String, String)>);

fn reasons(withheld: Withheld) -> Vec<(String, String)> {
    withheld
        .into_iter()
        .map(|(name, access)| (name, format!("requires {} access", access.as_str())))
        .collect()
}

impl Registrar {
    /// Creates a registrar.
    #[must_use]
    pub fn new(
        table: RegistrationTable,
        capabilities: Arc<dyn CapabilitySource>,
        executor: Arc<ManifestExecutor>,
    ) -> Self {
        Self {
            table,
            capabilities,
            executor,
            aliases: BTreeMap::new(),
        }
    }

    /// Keeps retired tool names callable: each `old -> new` pair registers
    /// `old` as a deprecated forwarder whenever `new` registers.
    #[must_use]
    pub fn with_aliases(mut self, aliases: BTreeMap<String, String>) -> Self {
        self.aliases = aliases;
        self
    }

    /// The registration table.
    #[must_use]
    pub fn table(&self) -> &RegistrationTable {
        &self.table
    }

    /// Registers the tools available to `user` right now.
    ///
    /// Gates are evaluated once against a freshly fetched profile. Passing
    /// entries build concurrently; an entry that fails is logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RegistrationError::CapabilityUnavailable`] when the
    /// profile cannot be fetched. No tools are registered in that case.
    pub async fn register(&self, user: &UserId) -> RegistrationResult<SessionTools> {
        let profile = self.capabilities.capability_profile(user).await?;
        let ctx = SessionContext::new(user.clone(), profile);
        let (active, gated) = self.table.evaluate(ctx.profile());

        let mut report = RegistrationReport::default();
        for entry in gated {
            debug!(entry = entry.label(), "gate closed; entry skipped");
            report.skip(entry.label(), "not connected");
        }

        let results = join_all(active.iter().map(|entry| self.build_entry(entry, &ctx))).await;

        let registry = ToolRegistry::new();
        for (entry, result) in active.iter().zip(results) {
            match result {
                Ok((tools, withheld)) => {
                    for (name, reason) in withheld {
                        report.skip(name, reason);
                    }
                    for tool in tools {
                        let name = tool.name().to_owned();
                        match registry.register(tool) {
                            Ok(()) => report.registered.push(name),
                            Err(err) => {
                                warn!(entry = entry.label(), tool = %name, error = %err, "duplicate tool skipped");
                                report.skip(name, err.to_string());
                            }
                        }
                    }
                }
                Err(err) => {
                    warn!(entry = entry.label(), error = %err, "tool source failed; skipping");
                    report.skip(entry.label(), err.to_string());
                }
            }
        }

        self.register_aliases(&registry, &mut report);

        info!(
            registered = report.registered.len(),
            skipped = report.skipped.len(),
            "session tools registered"
        );
        Ok(SessionTools { registry, report })
    }

    async fn build_entry(&self, entry: &RegistrationEntry, ctx: &SessionContext) -> ToolResult<EntryTools> {
        match entry.source() {
            ToolSource::Manifest(manifest) => {
                let caller = Caller::new(
                    ctx.user().clone(),
                    ctx.profile().granted_access(manifest.provider()),
                );
                let (tools, withheld) = manifest_tools(manifest, &self.executor, &caller)?;
                Ok((tools, reasons(withheld)))
            }
            ToolSource::Builder(builder) => {
                let (tools, withheld) = builder.build_gated(ctx).await?;
                Ok((tools, reasons(withheld)))
            }
        }
    }

    fn register_aliases(&self, registry: &ToolRegistry, report: &mut RegistrationReport) {
        for (alias, target) in &self.aliases {
            let Some(handle) = registry.get(target) else {
                continue;
            };
            let description = format!(
                "Deprecated: use `{target}` instead. {}",
                handle.metadata().description()
            );
            let metadata = match connector_tools::ToolMetadata::new(alias.as_str(), description) {
                Ok(metadata) => metadata.with_input_schema(handle.metadata().input_schema().clone()),
                Err(err) => {
                    warn!(alias = %alias, error = %err, "invalid legacy alias");
                    report.skip(alias.as_str(), err.to_string());
                    continue;
                }
            };
            match registry.register(handle.renamed(metadata)) {
                Ok(()) => report.registered.push(alias.clone()),
                Err(err) => {
                    warn!(alias = %alias, error = %err, "legacy alias collides with a live tool");
                    report.skip(alias.as_str(), err.to_string());
                }
            }
        }
    }
}
