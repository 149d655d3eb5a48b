//! The tabular store collaborator.

use async_trait::async_trait;

use crate::error::TabularResult;
use crate::model::{FieldValues, RowPage, TabConfig};

/// A store of user-defined tabs, such as a spreadsheet.
///
/// Row numbers are 1-based positions among data rows; deleting a row shifts
/// every later row up by one. Schema edits rewrite header metadata only and
/// never touch existing rows.
#[async_trait]
pub trait TabularBackend: Send + Sync {
    /// Lists every tab in display order.
    async fn list_tabs(&self) -> TabularResult<Vec<TabConfig>>;

    /// Creates a tab.
    async fn create_tab(&self, tab: TabConfig) -> TabularResult<()>;

    /// Replaces a tab's column list wholesale and returns the new definition.
    async fn update_tab_schema(&self, title: &str, columns: Vec<String>) -> TabularResult<TabConfig>;

    /// Deletes a tab and its rows.
    async fn delete_tab(&self, title: &str) -> TabularResult<()>;

    /// Appends a row and returns its row number.
    async fn append_row(&self, title: &str, fields: FieldValues) -> TabularResult<u64>;

    /// Reads up to `limit` rows starting after `offset` rows.
    async fn read_rows(&self, title: &str, limit: u64, offset: u64) -> TabularResult<RowPage>;

    /// Case-insensitive substring search across every cell.
    async fn search_rows(&self, title: &str, query: &str, limit: u64) -> TabularResult<RowPage>;

    /// Overwrites the supplied cells of one row.
    async fn update_row(&self, title: &str, row_number: u64, fields: FieldValues) -> TabularResult<()>;

    /// Deletes one row.
    async fn delete_row(&self, title: &str, row_number: u64) -> TabularResult<()>;
}
