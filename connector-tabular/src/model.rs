//! Tab and row types.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{TabularError, TabularResult};

/// Column display name to cell text.
pub type FieldValues = BTreeMap<String, String>;

/// A user-defined table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabConfig {
    title: String,
    #[serde(default)]
    purpose: String,
    columns: Vec<String>,
}

impl TabConfig {
    /// Creates a validated tab definition.
    ///
    /// # Errors
    ///
    /// Returns [`TabularError::InvalidTab`] for a blank title or an invalid
    /// column list (see [`TabConfig::validate_columns`]).
    pub fn new(
        title: impl Into<String>,
        purpose: impl Into<String>,
        columns: Vec<String>,
    ) -> TabularResult<Self> {
        let title = title.into().trim().to_owned();
        if title.is_empty() {
            return Err(TabularError::invalid_tab("tab title cannot be blank"));
        }
        let columns = Self::validate_columns(columns)?;
        Ok(Self {
            title,
            purpose: purpose.into(),
            columns,
        })
    }

    /// Trims column names and rejects blank or duplicate ones.
    ///
    /// # Errors
    ///
    /// Returns [`TabularError::InvalidTab`] when the list is empty, holds a
    /// blank name, or repeats a name.
    pub fn validate_columns(columns: Vec<String>) -> TabularResult<Vec<String>> {
        if columns.is_empty() {
            return Err(TabularError::invalid_tab("a tab needs at least one column"));
        }
        let mut seen = HashSet::new();
        columns
            .into_iter()
            .map(|column| {
                let column = column.trim().to_owned();
                if column.is_empty() {
                    return Err(TabularError::invalid_tab("column names cannot be blank"));
                }
                if !seen.insert(column.clone()) {
                    return Err(TabularError::invalid_tab(format!("column `{column}` appears twice")));
                }
                Ok(column)
            })
            .collect()
    }

    /// Returns a copy with a replaced column list.
    #[must_use]
    pub fn with_columns(&self, columns: Vec<String>) -> Self {
        Self {
            title: self.title.clone(),
            purpose: self.purpose.clone(),
            columns,
        }
    }

    /// The tab title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// What the tab is for.
    #[must_use]
    pub fn purpose(&self) -> &str {
        &self.purpose
    }

    /// Ordered column display names.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

/// One data row, aligned with the tab's current columns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Row {
    /// 1-based position among data rows.
    pub number: u64,
    /// Cell text per column, in column order. Short rows are padded with "".
    pub cells: Vec<String>,
}

/// A window of rows plus the size of the full result.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RowPage {
    /// Rows in this window.
    pub rows: Vec<Row>,
    /// Total rows (for reads) or total matches (for searches).
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| (*n).to_owned()).collect()
    }

    #[test]
    fn trims_and_accepts_valid_columns() {
        let tab = TabConfig::new(" Contacts ", "people", cols(&[" Name", "Email "])).unwrap();
        assert_eq!(tab.title(), "Contacts");
        assert_eq!(tab.columns(), ["Name", "Email"]);
    }

    #[test]
    fn rejects_bad_columns() {
        assert!(TabConfig::new("T", "", Vec::new()).is_err());
        assert!(TabConfig::new("T", "", cols(&["Name", " "])).is_err());
        assert!(TabConfig::new("T", "", cols(&["Name", "Name "])).is_err());
        assert!(TabConfig::new("  ", "", cols(&["Name"])).is_err());
    }

    #[test]
    fn case_variants_are_distinct_columns() {
        let tab = TabConfig::new("T", "", cols(&["First Name", "first-name"])).unwrap();
        assert_eq!(tab.columns().len(), 2);
    }
}
