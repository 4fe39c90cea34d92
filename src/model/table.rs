//! Table types.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::CellValue;
use crate::error::{Error, Result};

/// A ragged grid of cells as produced by a detector.
///
/// Rows may have different lengths; [`RawTable::column_count`] reports the
/// widest row.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    /// Page the table was found on (1-indexed)
    pub page_number: u32,

    /// Detection order on that page (0-indexed)
    pub index_on_page: usize,

    /// Rows of cells, top to bottom
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    /// Create a raw table.
    pub fn new(page_number: u32, index_on_page: usize, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            page_number,
            index_on_page,
            rows,
        }
    }

    /// Build from string rows (page 1, first table).
    pub fn from_strings<R, S>(rows: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(|s| CellValue::text(s)).collect())
            .collect();
        Self::new(1, 0, rows)
    }

    /// Get the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Width of the widest row.
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Whether rows disagree on their length.
    pub fn is_ragged(&self) -> bool {
        let width = self.column_count();
        self.rows.iter().any(|r| r.len() != width)
    }

    /// Check if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A rectangular table with unique, non-empty column names.
///
/// Every row has exactly `columns.len()` cells and no row is entirely blank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TableParts")]
pub struct NormalizedTable {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

#[derive(Deserialize)]
struct TableParts {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl TryFrom<TableParts> for NormalizedTable {
    type Error = Error;

    fn try_from(parts: TableParts) -> Result<Self> {
        NormalizedTable::new(parts.columns, parts.rows)
    }
}

impl NormalizedTable {
    /// Create a table, reconciling every row to the column count.
    ///
    /// Short rows are padded with [`CellValue::Empty`], long rows lose their
    /// trailing cells, and rows left entirely blank are dropped. Fails when a
    /// column name is empty or repeated.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(columns.len());
        for name in &columns {
            if name.trim().is_empty() {
                return Err(Error::TableParse("empty column name".to_string()));
            }
            if !seen.insert(name.as_str()) {
                return Err(Error::TableParse(format!("duplicate column name {:?}", name)));
            }
        }

        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|row| reconcile_row(row, width))
            .filter(|row| !row.iter().all(CellValue::is_blank))
            .collect();

        Ok(Self { columns, rows })
    }

    /// Column names in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Data rows.
    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    /// Consume the table into its parts.
    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<CellValue>>) {
        (self.columns, self.rows)
    }

    /// Get the number of data rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get the number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Index of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&CellValue>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Check if the table has no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Pad with empty cells or truncate trailing cells to exactly `width`.
fn reconcile_row(mut row: Vec<CellValue>, width: usize) -> Vec<CellValue> {
    row.resize(width, CellValue::Empty);
    row
}
