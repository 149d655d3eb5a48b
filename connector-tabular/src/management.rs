//! Tools that edit the tabs themselves.

use std::future::Future;
use std::sync::Arc;

use connector_primitives::Access;
use connector_tools::args;
use connector_tools::{
    ObjectSchema, Property, Tool, ToolError, ToolHandle, ToolMetadata, ToolOutput, ToolResult,
};
use serde_json::{Map, Value};
use tracing::info;

use crate::backend::TabularBackend;
use crate::builder::GatedTools;
use crate::fields::tab_slugs;
use crate::model::TabConfig;
use crate::tab_tools::tool_names;

const REREGISTER_NOTICE: &str =
    "Tool changes take effect only after the session's tools are re-registered.";

/// What the management tools share: the store and the prefixes tab slugs
/// must avoid.
struct TabAdmin {
    backend: Arc<dyn TabularBackend>,
    reserved: Vec<String>,
}

/// Builds `{ns}_list_tabs`, `{ns}_create_tab`, `{ns}_update_tab_columns`
/// and `{ns}_delete_tab`, each paired with the access it requires.
///
/// `reserved` must be the prefixes the per-tab tools were derived with, so
/// the tool names these tools report match the registered ones.
///
/// # Errors
///
/// Returns [`ToolError::InvalidMetadata`] if `namespace` makes an invalid
/// tool name.
pub fn management_tools(
    namespace: &str,
    backend: &Arc<dyn TabularBackend>,
    reserved: &[String],
) -> ToolResult<GatedTools> {
    let admin = Arc::new(TabAdmin {
        backend: Arc::clone(backend),
        reserved: reserved.to_vec(),
    });
    let title = || Property::string().description("Tab title, exactly as listed");
    let columns = || Property::array_of("string").description("The complete, ordered column list");

    let list = ToolMetadata::new(
        format!("{namespace}_list_tabs"),
        "List tabs with their purpose, columns and tool names.",
    )?;
    let create = ToolMetadata::new(
        format!("{namespace}_create_tab"),
        "Create a tab with a title, purpose and initial columns.",
    )?
    .with_input_schema(
        ObjectSchema::new()
            .required("title", Property::string().description("Title of the new tab"))
            .optional("purpose", Property::string().description("What the tab is for"))
            .required("columns", columns())
            .into_value(),
    );
    let update = ToolMetadata::new(
        format!("{namespace}_update_tab_columns"),
        "Replace a tab's columns with a new complete list. Adds, removes, renames and \
         reorders are all expressed this way. Existing rows are not rewritten.",
    )?
    .with_input_schema(
        ObjectSchema::new()
            .required("title", title())
            .required("columns", columns())
            .into_value(),
    );
    let delete = ToolMetadata::new(
        format!("{namespace}_delete_tab"),
        "Delete a tab and all of its rows.",
    )?
    .with_input_schema(ObjectSchema::new().required("title", title()).into_value());

    Ok(vec![
        (
            ToolHandle::new(list, bind(&admin, |a, args| async move { a.list_tabs(args).await })),
            Access::Read,
        ),
        (
            ToolHandle::new(create, bind(&admin, |a, args| async move { a.create_tab(args).await })),
            Access::Write,
        ),
        (
            ToolHandle::new(
                update,
                bind(&admin, |a, args| async move { a.update_tab_columns(args).await }),
            ),
            Access::Write,
        ),
        (
            ToolHandle::new(delete, bind(&admin, |a, args| async move { a.delete_tab(args).await })),
            Access::Delete,
        ),
    ])
}

fn bind<F, Fut>(admin: &Arc<TabAdmin>, op: F) -> impl Tool + 'static
where
    F: Fn(Arc<TabAdmin>, Map<String, Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ToolResult<ToolOutput>> + Send + 'static,
{
    let admin = Arc::clone(admin);
    move |input: Value| {
        let call = args::into_object(input).map(|args| op(Arc::clone(&admin), args));
        async move { call?.await }
    }
}

impl TabAdmin {
    fn slugs(&self, tabs: &[TabConfig]) -> Vec<String> {
        tab_slugs(tabs, &self.reserved)
    }

    async fn slug_of(&self, title: &str) -> ToolResult<Option<String>> {
        let tabs = self.backend.list_tabs().await?;
        Ok(tabs
            .iter()
            .position(|tab| tab.title() == title)
            .map(|i| self.slugs(&tabs).swap_remove(i)))
    }

    async fn list_tabs(&self, _args: Map<String, Value>) -> ToolResult<ToolOutput> {
        let tabs = self.backend.list_tabs().await?;
        if tabs.is_empty() {
            return Ok(ToolOutput::text("No tabs yet."));
        }
        let lines: Vec<String> = tabs
            .iter()
            .zip(self.slugs(&tabs))
            .map(|(tab, slug)| {
                let purpose = if tab.purpose().is_empty() {
                    String::new()
                } else {
                    format!(" - {}", tab.purpose())
                };
                format!(
                    "\"{}\"{purpose}\n  Columns: {}\n  Tools: {}",
                    tab.title(),
                    tab.columns().join(", "),
                    tool_names(&slug).join(", ")
                )
            })
            .collect();
        Ok(ToolOutput::text(lines.join("\n")))
    }

    async fn create_tab(&self, args: Map<String, Value>) -> ToolResult<ToolOutput> {
        let title = args::required_str(&args, "title")?;
        let purpose = args::optional_str(&args, "purpose")?.unwrap_or_default();
        let columns = args::optional_string_list(&args, "columns")?
            .ok_or_else(|| ToolError::invalid_input("`columns` is required"))?;

        let tab = TabConfig::new(title, purpose, columns)?;
        self.backend.create_tab(tab.clone()).await?;
        info!(tab = tab.title(), "tab created");

        let tools = self
            .slug_of(tab.title())
            .await?
            .map(|slug| tool_names(&slug).join(", "))
            .unwrap_or_default();
        Ok(ToolOutput::text(format!(
            "Created tab \"{}\" with columns: {}. New tools: {tools}. {REREGISTER_NOTICE}",
            tab.title(),
            tab.columns().join(", ")
        )))
    }

    async fn update_tab_columns(&self, args: Map<String, Value>) -> ToolResult<ToolOutput> {
        let title = args::required_str(&args, "title")?;
        let columns = args::optional_string_list(&args, "columns")?
            .ok_or_else(|| ToolError::invalid_input("`columns` is required"))?;

        let tab = self.backend.update_tab_schema(title, columns).await?;
        info!(tab = tab.title(), columns = tab.columns().len(), "tab columns replaced");
        Ok(ToolOutput::text(format!(
            "Columns of \"{}\" are now: {}. Existing rows were not rewritten, so renamed or \
             reordered columns may no longer line up with older rows. {REREGISTER_NOTICE}",
            tab.title(),
            tab.columns().join(", ")
        )))
    }

    async fn delete_tab(&self, args: Map<String, Value>) -> ToolResult<ToolOutput> {
        let title = args::required_str(&args, "title")?;
        self.backend.delete_tab(title).await?;
        info!(tab = title, "tab deleted");
        Ok(ToolOutput::text(format!(
            "Deleted tab \"{title}\" and its rows. {REREGISTER_NOTICE}"
        )))
    }
}
