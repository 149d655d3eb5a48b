//! Column and tab slug maps.

use connector_primitives::dedupe_slugs;

use crate::model::TabConfig;

/// Parameter name the update and delete tools reserve for the row number.
pub const ROW_NUMBER: &str = "row_number";

/// Column display name to tool field name, for one tab and one pass.
///
/// Computed once and shared by every tool of the tab, so a field name means
/// the same column in the add and update schemas.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldMap {
    entries: Vec<(String, String)>,
}

impl FieldMap {
    /// Derives field names for `columns`, in column order.
    #[must_use]
    pub fn derive(columns: &[String]) -> Self {
        let slugs = dedupe_slugs(columns, &[ROW_NUMBER], "field");
        Self {
            entries: columns.iter().cloned().zip(slugs).collect(),
        }
    }

    /// `(column, field)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(c, f)| (c.as_str(), f.as_str()))
    }

    /// Field name for a column.
    #[must_use]
    pub fn field(&self, column: &str) -> Option<&str> {
        self.iter().find(|(c, _)| *c == column).map(|(_, f)| f)
    }

    /// Column for a field name.
    #[must_use]
    pub fn column(&self, field: &str) -> Option<&str> {
        self.iter().find(|(_, f)| *f == field).map(|(c, _)| c)
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the tab has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Tool-name prefixes for `tabs`, deduplicated in tab order.
///
/// `reserved` holds prefixes already used by other tool sets in the session;
/// a tab slugging to one of them is suffixed like any other collision.
#[must_use]
pub fn tab_slugs<S: AsRef<str>>(tabs: &[TabConfig], reserved: &[S]) -> Vec<String> {
    let titles: Vec<&str> = tabs.iter().map(TabConfig::title).collect();
    let reserved: Vec<&str> = reserved.iter().map(|prefix| prefix.as_ref()).collect();
    dedupe_slugs(&titles, &reserved, "tab")
}
