//! Registration-time builder for a tabular store.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use connector_primitives::{Access, ProviderId};
use connector_tools::{SessionContext, ToolBuilder, ToolError, ToolHandle, ToolResult, Withheld};
use tracing::debug;

use crate::backend::TabularBackend;
use crate::fields::tab_slugs;
use crate::management::management_tools;
use crate::tab_tools::tab_tools;

/// Tools paired with the access class each one requires.
pub type GatedTools = Vec<(ToolHandle, Access)>;

/// Builds the per-tab and management tools of one tabular store.
///
/// Tabs are fetched fresh on every build; nothing is cached between passes.
/// When the store belongs to a provider, only the tools that provider's
/// grant covers are built.
pub struct TabularToolBuilder {
    namespace: String,
    backend: Arc<dyn TabularBackend>,
    provider: Option<ProviderId>,
    reserved: Vec<String>,
}

impl fmt::Debug for TabularToolBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TabularToolBuilder")
            .field("namespace", &self.namespace)
            .field("provider", &self.provider)
            .field("reserved", &self.reserved)
            .finish_non_exhaustive()
    }
}

impl TabularToolBuilder {
    /// Creates a builder. `namespace` prefixes the management tools and is
    /// never used as a tab slug.
    #[must_use]
    pub fn new(namespace: impl Into<String>, backend: Arc<dyn TabularBackend>) -> Self {
        let namespace = namespace.into();
        Self {
            reserved: vec![namespace.clone()],
            namespace,
            backend,
            provider: None,
        }
    }

    /// Limits the tools to the access granted for `provider` in each session.
    /// Without a provider every tool is built.
    #[must_use]
    pub fn with_provider(mut self, provider: ProviderId) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Adds tool-name prefixes owned by other tool sets in the session. A tab
    /// whose slug would match one is suffixed instead.
    #[must_use]
    pub fn with_reserved_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for prefix in prefixes {
            let prefix = prefix.into();
            if !self.reserved.contains(&prefix) {
                self.reserved.push(prefix);
            }
        }
        self
    }

    /// The management tool prefix.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn granted(&self, ctx: &SessionContext) -> Option<Access> {
        match &self.provider {
            Some(provider) => ctx.profile().granted_access(provider),
            None => Some(Access::Delete),
        }
    }
}

#[async_trait]
impl ToolBuilder for TabularToolBuilder {
    async fn build(&self, ctx: &SessionContext) -> ToolResult<Vec<ToolHandle>> {
        Ok(self.build_gated(ctx).await?.0)
    }

    async fn build_gated(&self, ctx: &SessionContext) -> ToolResult<(Vec<ToolHandle>, Withheld)> {
        let granted = self.granted(ctx);
        let tabs = self.backend.list_tabs().await.map_err(ToolError::from)?;

        let mut gated = management_tools(&self.namespace, &self.backend, &self.reserved)?;
        for (tab, slug) in tabs.iter().zip(tab_slugs(&tabs, &self.reserved)) {
            gated.extend(tab_tools(&self.backend, tab, &slug)?);
        }

        let mut tools = Vec::new();
        let mut withheld = Withheld::new();
        for (tool, required) in gated {
            if granted.is_some_and(|granted| granted.covers(required)) {
                tools.push(tool);
            } else {
                withheld.push((tool.name().to_owned(), required));
            }
        }
        debug!(
            namespace = %self.namespace,
            tabs = tabs.len(),
            tools = tools.len(),
            withheld = withheld.len(),
            "tabular tools built"
        );
        Ok((tools, withheld))
    }
}

#[cfg(test)]
mod tests {
    use connector_primitives::{AccessLevel, CapabilityProfile, ProviderConnection, UserId};
    use connector_tools::ToolRegistry;
    use serde_json::json;

    use super::*;
    use crate::memory::InMemoryTabularBackend;
    use crate::model::TabConfig;

    fn ctx() -> SessionContext {
        SessionContext::new(UserId::new("u1").unwrap(), CapabilityProfile::new())
    }

    async fn register(builder: &TabularToolBuilder) -> ToolRegistry {
        let registry = ToolRegistry::new();
        for tool in builder.build(&ctx()).await.unwrap() {
            registry.register(tool).unwrap();
        }
        registry
    }

    fn builder() -> TabularToolBuilder {
        let backend = InMemoryTabularBackend::with_tabs([TabConfig::new(
            "Contacts",
            "People",
            vec!["Name".into(), "Email".into()],
        )
        .unwrap()]);
        TabularToolBuilder::new("sheets", Arc::new(backend))
    }

    #[tokio::test]
    async fn builds_management_and_tab_tools() {
        let registry = register(&builder()).await;
        assert_eq!(
            registry.names(),
            [
                "contacts_add",
                "contacts_delete",
                "contacts_list",
                "contacts_search",
                "contacts_update",
                "sheets_create_tab",
                "sheets_delete_tab",
                "sheets_list_tabs",
                "sheets_update_tab_columns",
            ]
        );
    }

    #[tokio::test]
    async fn schema_changes_need_a_new_pass() {
        let builder = builder();
        let registry = register(&builder).await;

        let output = registry
            .call(
                "sheets_create_tab",
                json!({"title": "Leads", "purpose": "Sales", "columns": ["Company", "Stage"]}),
            )
            .await;
        assert!(!output.is_error(), "{}", output.content());
        assert!(output.content().contains("leads_add"));
        assert!(output.content().contains("re-registered"));
        assert!(!registry.contains("leads_add"));

        let registry = register(&builder).await;
        assert!(registry.contains("leads_add"));
        let listing = registry.call("sheets_list_tabs", json!({})).await;
        assert!(listing.content().contains("\"Leads\" - Sales\n  Columns: Company, Stage"));
    }

    #[tokio::test]
    async fn rewriting_the_same_columns_keeps_tool_names() {
        let builder = builder();
        let before = register(&builder).await;

        let output = before
            .call(
                "sheets_update_tab_columns",
                json!({"title": "Contacts", "columns": ["Name", "Email"]}),
            )
            .await;
        assert!(!output.is_error());

        let after = register(&builder).await;
        assert_eq!(before.list(), after.list());
    }

    #[tokio::test]
    async fn management_rejects_bad_definitions() {
        let registry = register(&builder()).await;

        let dup = registry
            .call("sheets_create_tab", json!({"title": "Contacts", "columns": ["X"]}))
            .await;
        assert!(dup.is_error());
        assert!(dup.content().contains("already exists"));

        let blank = registry
            .call("sheets_update_tab_columns", json!({"title": "Contacts", "columns": ["Name", ""]}))
            .await;
        assert!(blank.is_error());

        let missing = registry.call("sheets_delete_tab", json!({"title": "Nope"})).await;
        assert!(missing.is_error());
    }

    #[tokio::test]
    async fn deleting_a_tab_drops_its_tools_next_pass() {
        let builder = builder();
        let registry = register(&builder).await;
        let output = registry.call("sheets_delete_tab", json!({"title": "Contacts"})).await;
        assert!(output.content().contains("re-registered"));

        let registry = register(&builder).await;
        assert!(!registry.contains("contacts_add"));
        assert_eq!(
            registry.call("sheets_list_tabs", json!({})).await.content(),
            "No tabs yet."
        );
    }

    fn sheets() -> ProviderId {
        ProviderId::new("sheets").unwrap()
    }

    fn ctx_with(level: AccessLevel) -> SessionContext {
        let profile = CapabilityProfile::new()
            .with_provider(sheets(), ProviderConnection::connected(level));
        SessionContext::new(UserId::new("u1").unwrap(), profile)
    }

    #[tokio::test]
    async fn read_only_grant_builds_only_reads() {
        let builder = builder().with_provider(sheets());
        let (tools, withheld) = builder.build_gated(&ctx_with(AccessLevel::ReadOnly)).await.unwrap();

        let names: Vec<&str> = tools.iter().map(ToolHandle::name).collect();
        assert_eq!(names, ["sheets_list_tabs", "contacts_list", "contacts_search"]);
        assert!(withheld.contains(&("contacts_add".to_owned(), Access::Write)));
        assert!(withheld.contains(&("contacts_delete".to_owned(), Access::Delete)));
        assert!(withheld.contains(&("sheets_create_tab".to_owned(), Access::Write)));
        assert_eq!(withheld.len(), 6);
    }

    #[tokio::test]
    async fn no_grant_builds_nothing() {
        let builder = builder().with_provider(sheets());
        let (tools, withheld) = builder.build_gated(&ctx_with(AccessLevel::None)).await.unwrap();
        assert!(tools.is_empty());
        assert_eq!(withheld.len(), 9);

        let (tools, _) = builder.build_gated(&ctx()).await.unwrap();
        assert!(tools.is_empty());
    }

    #[tokio::test]
    async fn read_write_grant_builds_everything() {
        let builder = builder().with_provider(sheets());
        let (tools, withheld) = builder.build_gated(&ctx_with(AccessLevel::ReadWrite)).await.unwrap();
        assert_eq!(tools.len(), 9);
        assert!(withheld.is_empty());
    }

    #[tokio::test]
    async fn tabs_avoid_reserved_prefixes() {
        let backend = InMemoryTabularBackend::with_tabs([
            TabConfig::new("Skills", "", vec!["Name".into()]).unwrap(),
            TabConfig::new("Sheets", "", vec!["Name".into()]).unwrap(),
        ]);
        let builder = TabularToolBuilder::new("sheets", Arc::new(backend))
            .with_reserved_prefixes(["skills", "scrape"]);
        let registry = register(&builder).await;

        for suffix in ["add", "list", "search", "update", "delete"] {
            assert!(registry.contains(&format!("skills_2_{suffix}")), "skills_2_{suffix}");
            assert!(registry.contains(&format!("sheets_2_{suffix}")), "sheets_2_{suffix}");
        }
        assert!(!registry.contains("skills_list"));

        let listing = registry.call("sheets_list_tabs", json!({})).await;
        assert!(listing.content().contains("Tools: skills_2_add"));

        let created = registry
            .call("sheets_create_tab", json!({"title": "Scrape", "columns": ["Url"]}))
            .await;
        assert!(created.content().contains("New tools: scrape_2_add"), "{}", created.content());
    }
}
