//! In-memory tabular backend.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::backend::TabularBackend;
use crate::error::{TabularError, TabularResult};
use crate::model::{FieldValues, Row, RowPage, TabConfig};

#[derive(Debug)]
struct Sheet {
    config: TabConfig,
    rows: Vec<Vec<String>>,
}

impl Sheet {
    fn row(&self, index: usize) -> Row {
        let mut cells = self.rows[index].clone();
        cells.resize(self.config.columns().len().max(cells.len()), String::new());
        Row {
            number: index as u64 + 1,
            cells,
        }
    }

    fn position(&self, column: &str) -> TabularResult<usize> {
        self.config
            .columns()
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| TabularError::UnknownColumn {
                title: self.config.title().to_owned(),
                column: column.to_owned(),
            })
    }

    fn index(&self, row_number: u64) -> TabularResult<usize> {
        let total = self.rows.len() as u64;
        if row_number == 0 || row_number > total {
            return Err(TabularError::RowNotFound {
                title: self.config.title().to_owned(),
                row_number,
                total,
            });
        }
        usize::try_from(row_number - 1).map_err(|_| TabularError::backend("row number overflow"))
    }

    fn write(&self, row: &mut Vec<String>, fields: FieldValues) -> TabularResult<()> {
        for (column, value) in fields {
            let at = self.position(&column)?;
            if row.len() <= at {
                row.resize(at + 1, String::new());
            }
            row[at] = value;
        }
        Ok(())
    }
}

/// Tabs and rows held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryTabularBackend {
    sheets: RwLock<Vec<Sheet>>,
}

impl InMemoryTabularBackend {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the supplied tabs, without rows.
    #[must_use]
    pub fn with_tabs(tabs: impl IntoIterator<Item = TabConfig>) -> Self {
        let sheets = tabs
            .into_iter()
            .map(|config| Sheet {
                config,
                rows: Vec::new(),
            })
            .collect();
        Self {
            sheets: RwLock::new(sheets),
        }
    }
}

fn find<'a>(sheets: &'a [Sheet], title: &str) -> TabularResult<&'a Sheet> {
    sheets
        .iter()
        .find(|s| s.config.title() == title)
        .ok_or_else(|| TabularError::TabNotFound {
            title: title.to_owned(),
        })
}

fn find_mut<'a>(sheets: &'a mut [Sheet], title: &str) -> TabularResult<&'a mut Sheet> {
    sheets
        .iter_mut()
        .find(|s| s.config.title() == title)
        .ok_or_else(|| TabularError::TabNotFound {
            title: title.to_owned(),
        })
}

fn window(len: usize, limit: u64, offset: u64) -> std::ops::Range<usize> {
    let start = usize::try_from(offset).unwrap_or(usize::MAX).min(len);
    let take = usize::try_from(limit).unwrap_or(usize::MAX);
    start..start.saturating_add(take).min(len)
}

#[async_trait]
impl TabularBackend for InMemoryTabularBackend {
    async fn list_tabs(&self) -> TabularResult<Vec<TabConfig>> {
        let sheets = self.sheets.read().await;
        Ok(sheets.iter().map(|s| s.config.clone()).collect())
    }

    async fn create_tab(&self, tab: TabConfig) -> TabularResult<()> {
        let mut sheets = self.sheets.write().await;
        if sheets.iter().any(|s| s.config.title() == tab.title()) {
            return Err(TabularError::DuplicateTab {
                title: tab.title().to_owned(),
            });
        }
        debug!(tab = tab.title(), columns = tab.columns().len(), "tab created");
        sheets.push(Sheet {
            config: tab,
            rows: Vec::new(),
        });
        Ok(())
    }

    async fn update_tab_schema(&self, title: &str, columns: Vec<String>) -> TabularResult<TabConfig> {
        let columns = TabConfig::validate_columns(columns)?;
        let mut sheets = self.sheets.write().await;
        let sheet = find_mut(&mut sheets, title)?;
        sheet.config = sheet.config.with_columns(columns);
        Ok(sheet.config.clone())
    }

    async fn delete_tab(&self, title: &str) -> TabularResult<()> {
        let mut sheets = self.sheets.write().await;
        let before = sheets.len();
        sheets.retain(|s| s.config.title() != title);
        if sheets.len() == before {
            return Err(TabularError::TabNotFound {
                title: title.to_owned(),
            });
        }
        Ok(())
    }

    async fn append_row(&self, title: &str, fields: FieldValues) -> TabularResult<u64> {
        let mut sheets = self.sheets.write().await;
        let sheet = find_mut(&mut sheets, title)?;
        let mut row = vec![String::new(); sheet.config.columns().len()];
        sheet.write(&mut row, fields)?;
        sheet.rows.push(row);
        Ok(sheet.rows.len() as u64)
    }

    async fn read_rows(&self, title: &str, limit: u64, offset: u64) -> TabularResult<RowPage> {
        let sheets = self.sheets.read().await;
        let sheet = find(&sheets, title)?;
        Ok(RowPage {
            rows: window(sheet.rows.len(), limit, offset).map(|i| sheet.row(i)).collect(),
            total: sheet.rows.len() as u64,
        })
    }

    async fn search_rows(&self, title: &str, query: &str, limit: u64) -> TabularResult<RowPage> {
        let needle = query.to_lowercase();
        let sheets = self.sheets.read().await;
        let sheet = find(&sheets, title)?;
        let matches: Vec<usize> = (0..sheet.rows.len())
            .filter(|&i| {
                sheet.rows[i]
                    .iter()
                    .any(|cell| cell.to_lowercase().contains(&needle))
            })
            .collect();
        Ok(RowPage {
            rows: matches[window(matches.len(), limit, 0)]
                .iter()
                .map(|&i| sheet.row(i))
                .collect(),
            total: matches.len() as u64,
        })
    }

    async fn update_row(&self, title: &str, row_number: u64, fields: FieldValues) -> TabularResult<()> {
        let mut sheets = self.sheets.write().await;
        let sheet = find_mut(&mut sheets, title)?;
        let index = sheet.index(row_number)?;
        let mut row = sheet.rows[index].clone();
        sheet.write(&mut row, fields)?;
        sheet.rows[index] = row;
        Ok(())
    }

    async fn delete_row(&self, title: &str, row_number: u64) -> TabularResult<()> {
        let mut sheets = self.sheets.write().await;
        let sheet = find_mut(&mut sheets, title)?;
        let index = sheet.index(row_number)?;
        sheet.rows.remove(index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contacts() -> InMemoryTabularBackend {
        InMemoryTabularBackend::with_tabs([TabConfig::new(
            "Contacts",
            "people we met",
            vec!["Name".into(), "Email".into()],
        )
        .unwrap()])
    }

    fn fields(pairs: &[(&str, &str)]) -> FieldValues {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[tokio::test]
    async fn append_read_and_search() {
        let backend = contacts();
        assert_eq!(backend.append_row("Contacts", fields(&[("Name", "Ada")])).await.unwrap(), 1);
        assert_eq!(
            backend
                .append_row("Contacts", fields(&[("Name", "Grace"), ("Email", "G@Navy.mil")]))
                .await
                .unwrap(),
            2
        );

        let page = backend.read_rows("Contacts", 1, 1).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.rows, vec![Row { number: 2, cells: vec!["Grace".into(), "G@Navy.mil".into()] }]);

        let found = backend.search_rows("Contacts", "navy", 20).await.unwrap();
        assert_eq!(found.total, 1);
        assert_eq!(found.rows[0].number, 2);
    }

    #[tokio::test]
    async fn deleting_shifts_rows_and_rejects_stale_numbers() {
        let backend = contacts();
        for name in ["A", "B", "C"] {
            backend.append_row("Contacts", fields(&[("Name", name)])).await.unwrap();
        }

        backend.delete_row("Contacts", 3).await.unwrap();
        let err = backend.delete_row("Contacts", 3).await.unwrap_err();
        assert!(matches!(err, TabularError::RowNotFound { row_number: 3, total: 2, .. }));

        backend.delete_row("Contacts", 1).await.unwrap();
        let page = backend.read_rows("Contacts", 50, 0).await.unwrap();
        assert_eq!(page.rows[0], Row { number: 1, cells: vec!["B".into(), String::new()] });
    }

    #[tokio::test]
    async fn schema_edits_keep_rows_untouched() {
        let backend = contacts();
        backend
            .append_row("Contacts", fields(&[("Name", "Ada"), ("Email", "a@example.com")]))
            .await
            .unwrap();

        backend
            .update_tab_schema("Contacts", vec!["Email".into(), "Name".into(), "Phone".into()])
            .await
            .unwrap();

        let page = backend.read_rows("Contacts", 50, 0).await.unwrap();
        assert_eq!(page.rows[0].cells, ["Ada", "a@example.com", ""]);
    }

    #[tokio::test]
    async fn rejects_unknown_columns_and_duplicate_tabs() {
        let backend = contacts();
        let err = backend
            .append_row("Contacts", fields(&[("Phone", "1")]))
            .await
            .unwrap_err();
        assert!(matches!(err, TabularError::UnknownColumn { .. }));

        let dup = TabConfig::new("Contacts", "", vec!["X".into()]).unwrap();
        assert!(matches!(backend.create_tab(dup).await, Err(TabularError::DuplicateTab { .. })));
        assert!(matches!(backend.delete_tab("Nope").await, Err(TabularError::TabNotFound { .. })));
    }
}
