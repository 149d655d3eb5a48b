//! The five CRUD tools generated for each tab.

use std::future::Future;
use std::sync::Arc;

use connector_primitives::Access;
use connector_tools::args::{self, scalar_text};
use connector_tools::{
    ObjectSchema, Property, Tool, ToolError, ToolHandle, ToolMetadata, ToolOutput, ToolResult,
};
use serde_json::{Map, Value};
use tracing::debug;

use crate::backend::TabularBackend;
use crate::builder::GatedTools;
use crate::error::TabularError;
use crate::fields::{FieldMap, ROW_NUMBER};
use crate::model::{FieldValues, Row, TabConfig};

const DEFAULT_LIST_LIMIT: u64 = 50;
const DEFAULT_SEARCH_LIMIT: u64 = 20;

/// Suffixes of the per-tab tools, in registration order.
pub const TOOL_SUFFIXES: [&str; 5] = ["add", "list", "search", "update", "delete"];

/// Names of the tools generated for a tab slug.
#[must_use]
pub fn tool_names(slug: &str) -> Vec<String> {
    TOOL_SUFFIXES.iter().map(|s| format!("{slug}_{s}")).collect()
}

/// Everything the five tools of one tab share.
struct TabBinding {
    backend: Arc<dyn TabularBackend>,
    tab: TabConfig,
    slug: String,
    fields: FieldMap,
}

/// Builds the add/list/search/update/delete tools for one tab, each paired
/// with the access it requires.
///
/// The field map is derived once here and captured by every tool.
///
/// # Errors
///
/// Returns [`ToolError::InvalidMetadata`] if a derived tool name is invalid.
pub fn tab_tools(
    backend: &Arc<dyn TabularBackend>,
    tab: &TabConfig,
    slug: &str,
) -> ToolResult<GatedTools> {
    let binding = Arc::new(TabBinding {
        backend: Arc::clone(backend),
        tab: tab.clone(),
        slug: slug.to_owned(),
        fields: FieldMap::derive(tab.columns()),
    });
    let title = tab.title();
    let purpose = if tab.purpose().trim().is_empty() {
        String::new()
    } else {
        format!(" Purpose: {}.", tab.purpose().trim().trim_end_matches('.'))
    };

    let add = ToolMetadata::new(
        format!("{slug}_add"),
        format!(
            "Add a row to the \"{title}\" tab.{purpose} Supply at least one column value; \
             an empty row is rejected. Returns the new row number."
        ),
    )?
    .with_input_schema(binding.column_schema(ObjectSchema::new()));

    let list = ToolMetadata::new(
        format!("{slug}_list"),
        format!("List rows of the \"{title}\" tab with their row numbers."),
    )?
    .with_input_schema(
        ObjectSchema::new()
            .optional("limit", Property::integer().minimum(1).default_value(DEFAULT_LIST_LIMIT.into()))
            .optional("offset", Property::integer().minimum(0).default_value(0.into()))
            .into_value(),
    );

    let search = ToolMetadata::new(
        format!("{slug}_search"),
        format!("Search every column of the \"{title}\" tab for text (case-insensitive)."),
    )?
    .with_input_schema(
        ObjectSchema::new()
            .required("query", Property::string().description("Text to look for"))
            .optional("limit", Property::integer().minimum(1).default_value(DEFAULT_SEARCH_LIMIT.into()))
            .into_value(),
    );

    let update = ToolMetadata::new(
        format!("{slug}_update"),
        format!("Update cells of one row in the \"{title}\" tab. Only the supplied fields change."),
    )?
    .with_input_schema(binding.column_schema(ObjectSchema::new().required(ROW_NUMBER, row_number())));

    let delete = ToolMetadata::new(
        format!("{slug}_delete"),
        format!("Delete one row from the \"{title}\" tab. Rows below it move up by one."),
    )?
    .with_input_schema(ObjectSchema::new().required(ROW_NUMBER, row_number()).into_value());

    Ok(vec![
        (
            ToolHandle::new(add, bind(&binding, |b, input| async move { b.add(input).await })),
            Access::Write,
        ),
        (
            ToolHandle::new(list, bind(&binding, |b, input| async move { b.list(input).await })),
            Access::Read,
        ),
        (
            ToolHandle::new(search, bind(&binding, |b, input| async move { b.search(input).await })),
            Access::Read,
        ),
        (
            ToolHandle::new(update, bind(&binding, |b, input| async move { b.update(input).await })),
            Access::Write,
        ),
        (
            ToolHandle::new(delete, bind(&binding, |b, input| async move { b.delete(input).await })),
            Access::Delete,
        ),
    ])
}

fn row_number() -> Property {
    Property::integer()
        .minimum(1)
        .description("1-based row number as shown by the list and search tools")
}

fn bind<F, Fut>(binding: &Arc<TabBinding>, run: F) -> impl Tool + 'static
where
    F: Fn(Arc<TabBinding>, Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ToolResult<ToolOutput>> + Send + 'static,
{
    let binding = Arc::clone(binding);
    move |input: Value| run(Arc::clone(&binding), input)
}

impl TabBinding {
    fn title(&self) -> &str {
        self.tab.title()
    }

    fn column_schema(&self, schema: ObjectSchema) -> Value {
        self.fields
            .iter()
            .fold(schema, |schema, (column, field)| {
                schema.optional(field, Property::string().description(format!("Column \"{column}\"")))
            })
            .into_value()
    }

    /// Maps field names back to columns. Unknown fields are rejected.
    fn collect_fields(&self, args: &Map<String, Value>) -> ToolResult<FieldValues> {
        let mut values = FieldValues::new();
        for (field, value) in args {
            if field == ROW_NUMBER {
                continue;
            }
            let column = self.fields.column(field).ok_or_else(|| {
                let accepted: Vec<&str> = self.fields.iter().map(|(_, f)| f).collect();
                ToolError::invalid_input(format!(
                    "`{field}` is not a column of \"{}\"; accepted fields: {}",
                    self.title(),
                    accepted.join(", ")
                ))
            })?;
            match value {
                Value::Null => {}
                Value::Array(_) | Value::Object(_) => {
                    return Err(ToolError::invalid_input(format!("`{field}` must be a single value")));
                }
                scalar => {
                    values.insert(column.to_owned(), scalar_text(scalar));
                }
            }
        }
        Ok(values)
    }

    fn render(&self, row: &Row) -> String {
        let cells: Vec<String> = self
            .tab
            .columns()
            .iter()
            .zip(&row.cells)
            .filter(|(_, cell)| !cell.is_empty())
            .map(|(column, cell)| format!("{column}: {cell}"))
            .collect();
        if cells.is_empty() {
            format!("Row {}: (empty)", row.number)
        } else {
            format!("Row {}: {}", row.number, cells.join(" | "))
        }
    }

    async fn add(&self, input: Value) -> ToolResult<ToolOutput> {
        let args = args::into_object(input)?;
        let values = self.collect_fields(&args)?;
        if values.is_empty() {
            return Err(ToolError::invalid_input(format!(
                "provide at least one column value for \"{}\"",
                self.title()
            )));
        }
        let row = self.backend.append_row(self.title(), values).await?;
        debug!(tab = self.title(), row, "row added");
        Ok(ToolOutput::text(format!("Added row {row} to \"{}\".", self.title())))
    }

    async fn list(&self, input: Value) -> ToolResult<ToolOutput> {
        let args = args::into_object(input)?;
        let limit = positive_limit(&args, DEFAULT_LIST_LIMIT)?;
        let offset = args::optional_u64(&args, "offset")?.unwrap_or(0);

        let page = self.backend.read_rows(self.title(), limit, offset).await?;
        if page.total == 0 {
            return Ok(ToolOutput::text(format!("No entries in \"{}\".", self.title())));
        }
        let (Some(first), Some(last)) = (page.rows.first(), page.rows.last()) else {
            return Ok(ToolOutput::text(format!(
                "No entries in \"{}\" at offset {offset} ({} total).",
                self.title(),
                page.total
            )));
        };

        let mut text = format!(
            "Rows {}-{} of {} in \"{}\":",
            first.number,
            last.number,
            page.total,
            self.title()
        );
        for row in &page.rows {
            text.push('\n');
            text.push_str(&self.render(row));
        }
        Ok(ToolOutput::text(text))
    }

    async fn search(&self, input: Value) -> ToolResult<ToolOutput> {
        let args = args::into_object(input)?;
        let query = args::required_str(&args, "query")?;
        let limit = positive_limit(&args, DEFAULT_SEARCH_LIMIT)?;

        let page = self.backend.search_rows(self.title(), query, limit).await?;
        if page.rows.is_empty() {
            return Ok(ToolOutput::text(format!(
                "No entries in \"{}\" match \"{query}\".",
                self.title()
            )));
        }

        let mut text = format!(
            "{} matching rows in \"{}\" (showing {}):",
            page.total,
            self.title(),
            page.rows.len()
        );
        for row in &page.rows {
            text.push('\n');
            text.push_str(&self.render(row));
        }
        Ok(ToolOutput::text(text))
    }

    async fn update(&self, input: Value) -> ToolResult<ToolOutput> {
        let args = args::into_object(input)?;
        let row = args::required_positive(&args, ROW_NUMBER)?;
        let values = self.collect_fields(&args)?;
        if values.is_empty() {
            let accepted: Vec<&str> = self.fields.iter().map(|(_, f)| f).collect();
            return Err(ToolError::invalid_input(format!(
                "no fields to update; supply at least one of: {}",
                accepted.join(", ")
            )));
        }
        let count = values.len();
        self.backend
            .update_row(self.title(), row, values)
            .await
            .map_err(|err| self.row_error(err))?;
        Ok(ToolOutput::text(format!(
            "Updated row {row} in \"{}\" ({count} field{}).",
            self.title(),
            if count == 1 { "" } else { "s" }
        )))
    }

    async fn delete(&self, input: Value) -> ToolResult<ToolOutput> {
        let args = args::into_object(input)?;
        let row = args::required_positive(&args, ROW_NUMBER)?;
        self.backend
            .delete_row(self.title(), row)
            .await
            .map_err(|err| self.row_error(err))?;
        Ok(ToolOutput::text(format!(
            "Deleted row {row} from \"{}\". Rows below it moved up by one.",
            self.title()
        )))
    }

    fn row_error(&self, err: TabularError) -> ToolError {
        match err {
            TabularError::RowNotFound { .. } => ToolError::with_suggestion(
                err.to_string(),
                format!(
                    "Row numbers shift after deletions; call `{}_list` to see current row numbers.",
                    self.slug
                ),
            ),
            other => other.into(),
        }
    }
}

fn positive_limit(args: &Map<String, Value>, default: u64) -> ToolResult<u64> {
    match args::optional_u64(args, "limit")? {
        Some(0) => Err(ToolError::invalid_input("`limit` must be at least 1")),
        Some(limit) => Ok(limit),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use connector_tools::ToolRegistry;
    use serde_json::json;

    use super::*;
    use crate::error::TabularResult;
    use crate::memory::InMemoryTabularBackend;
    use crate::model::RowPage;

    /// Counts writes, delegating to an in-memory store.
    #[derive(Default)]
    struct SpyBackend {
        inner: InMemoryTabularBackend,
        writes: AtomicUsize,
    }

    #[async_trait]
    impl TabularBackend for SpyBackend {
        async fn list_tabs(&self) -> TabularResult<Vec<TabConfig>> {
            self.inner.list_tabs().await
        }
        async fn create_tab(&self, tab: TabConfig) -> TabularResult<()> {
            self.inner.create_tab(tab).await
        }
        async fn update_tab_schema(&self, title: &str, columns: Vec<String>) -> TabularResult<TabConfig> {
            self.inner.update_tab_schema(title, columns).await
        }
        async fn delete_tab(&self, title: &str) -> TabularResult<()> {
            self.inner.delete_tab(title).await
        }
        async fn append_row(&self, title: &str, fields: FieldValues) -> TabularResult<u64> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.append_row(title, fields).await
        }
        async fn read_rows(&self, title: &str, limit: u64, offset: u64) -> TabularResult<RowPage> {
            self.inner.read_rows(title, limit, offset).await
        }
        async fn search_rows(&self, title: &str, query: &str, limit: u64) -> TabularResult<RowPage> {
            self.inner.search_rows(title, query, limit).await
        }
        async fn update_row(&self, title: &str, row_number: u64, fields: FieldValues) -> TabularResult<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.update_row(title, row_number, fields).await
        }
        async fn delete_row(&self, title: &str, row_number: u64) -> TabularResult<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.delete_row(title, row_number).await
        }
    }

    fn contacts() -> TabConfig {
        TabConfig::new("Contacts", "People we met", vec!["Name".into(), "Email".into()]).unwrap()
    }

    async fn setup(tab: TabConfig) -> (Arc<SpyBackend>, ToolRegistry) {
        let spy = Arc::new(SpyBackend::default());
        spy.create_tab(tab.clone()).await.unwrap();
        let backend: Arc<dyn TabularBackend> = spy.clone();
        let registry = ToolRegistry::new();
        for (tool, _) in tab_tools(&backend, &tab, "contacts").unwrap() {
            registry.register(tool).unwrap();
        }
        (spy, registry)
    }

    #[tokio::test]
    async fn contacts_scenario() {
        let (_, registry) = setup(contacts()).await;
        assert_eq!(
            registry.names(),
            ["contacts_add", "contacts_delete", "contacts_list", "contacts_search", "contacts_update"]
        );

        let output = registry
            .call("contacts_add", json!({"name": "Ada", "email": "a@example.com"}))
            .await;
        assert!(!output.is_error());
        assert_eq!(output.content(), "Added row 1 to \"Contacts\".");

        let output = registry.call("contacts_list", Value::Null).await;
        assert_eq!(
            output.content(),
            "Rows 1-1 of 1 in \"Contacts\":\nRow 1: Name: Ada | Email: a@example.com"
        );

        let output = registry.call("contacts_search", json!({"query": "EXAMPLE"})).await;
        assert!(output.content().starts_with("1 matching rows in \"Contacts\" (showing 1):"));
    }

    #[tokio::test]
    async fn update_without_fields_never_writes() {
        let (spy, registry) = setup(contacts()).await;

        let output = registry.call("contacts_update", json!({"row_number": 1})).await;
        assert!(output.is_error());
        assert!(output.content().contains("no fields to update"));

        let output = registry
            .call("contacts_update", json!({"row_number": 1, "name": null}))
            .await;
        assert!(output.is_error());
        assert_eq!(spy.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn colliding_columns_share_one_field_map() {
        let tab = TabConfig::new("Contacts", "", vec!["First Name".into(), "first-name".into()]).unwrap();
        let (spy, registry) = setup(tab).await;

        let add = registry.get("contacts_add").unwrap();
        let update = registry.get("contacts_update").unwrap();
        let add_fields: Vec<_> = add.metadata().input_schema()["properties"]
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(add_fields, ["first_name", "first_name_2"]);
        assert_eq!(
            update.metadata().input_schema()["properties"]["first_name_2"],
            add.metadata().input_schema()["properties"]["first_name_2"]
        );

        registry
            .call("contacts_add", json!({"first_name": "Ada", "first_name_2": "Lovelace"}))
            .await;
        let page = spy.read_rows("Contacts", 10, 0).await.unwrap();
        assert_eq!(page.rows[0].cells, ["Ada", "Lovelace"]);
    }

    #[tokio::test]
    async fn second_delete_of_last_row_is_an_error() {
        let (_, registry) = setup(contacts()).await;
        registry.call("contacts_add", json!({"name": "Ada"})).await;

        assert!(!registry.call("contacts_delete", json!({"row_number": 1})).await.is_error());
        let output = registry.call("contacts_delete", json!({"row_number": 1})).await;
        assert!(output.is_error());
        assert!(output.content().contains("call `contacts_list`"));
    }

    #[tokio::test]
    async fn empty_tab_lists_explicitly() {
        let (_, registry) = setup(contacts()).await;
        assert_eq!(
            registry.call("contacts_list", Value::Null).await.content(),
            "No entries in \"Contacts\"."
        );
        assert_eq!(
            registry.call("contacts_search", json!({"query": "x"})).await.content(),
            "No entries in \"Contacts\" match \"x\"."
        );
    }

    #[tokio::test]
    async fn unknown_fields_are_rejected_before_writing() {
        let (spy, registry) = setup(contacts()).await;
        let output = registry.call("contacts_add", json!({"phone": "555"})).await;
        assert!(output.is_error());
        assert!(output.content().contains("accepted fields: name, email"));
        assert_eq!(spy.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn tools_carry_their_access_class() {
        let backend: Arc<dyn TabularBackend> = Arc::new(InMemoryTabularBackend::new());
        let classes: Vec<(String, Access)> = tab_tools(&backend, &contacts(), "contacts")
            .unwrap()
            .into_iter()
            .map(|(tool, access)| (tool.name().to_owned(), access))
            .collect();
        assert_eq!(
            classes,
            [
                ("contacts_add".to_owned(), Access::Write),
                ("contacts_list".to_owned(), Access::Read),
                ("contacts_search".to_owned(), Access::Read),
                ("contacts_update".to_owned(), Access::Write),
                ("contacts_delete".to_owned(), Access::Delete),
            ]
        );
    }

    #[tokio::test]
    async fn add_description_says_a_value_is_required() {
        let (_, registry) = setup(contacts()).await;
        let add = registry.get("contacts_add").unwrap();
        assert!(add.metadata().description().contains("Supply at least one column value"));

        let output = registry.call("contacts_add", json!({})).await;
        assert!(output.is_error());
        assert!(output.content().contains("provide at least one column value"));
    }
}
