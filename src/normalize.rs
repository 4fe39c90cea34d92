//! Table normalization.
//!
//! Turns a ragged [`RawTable`] into a [`NormalizedTable`]:
//!
//! 1. rows whose cells are all blank are dropped;
//! 2. a sparse first row (too many missing cells) is treated as noise and
//!    dropped, and the next row becomes the header candidate;
//! 3. the header row provides column names, with `Column_<i>` for blank
//!    cells and a positional suffix on collisions;
//! 4. the header row is removed from the data;
//! 5. data rows are padded or truncated to the column count.

use std::collections::HashSet;

use serde::Deserialize;

use crate::model::{CellValue, NormalizedTable, RawTable};

/// Normalization options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NormalizeOptions {
    /// A first row with more than `ratio × width` missing cells is not a header
    pub sparse_header_ratio: f32,

    /// How many sparse leading rows may be dropped
    pub max_dropped_header_rows: usize,

    /// Trim surrounding whitespace from every cell
    pub trim_cells: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            sparse_header_ratio: 0.5,
            max_dropped_header_rows: 1,
            trim_cells: true,
        }
    }
}

impl NormalizeOptions {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sparse header ratio.
    pub fn with_sparse_header_ratio(mut self, ratio: f32) -> Self {
        self.sparse_header_ratio = ratio;
        self
    }

    /// Set how many sparse leading rows may be dropped.
    pub fn with_max_dropped_header_rows(mut self, rows: usize) -> Self {
        self.max_dropped_header_rows = rows;
        self
    }

    /// Enable or disable cell trimming.
    pub fn with_trim_cells(mut self, trim: bool) -> Self {
        self.trim_cells = trim;
        self
    }
}

/// Normalizes raw tables.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    options: NormalizeOptions,
}

impl Normalizer {
    /// Create a normalizer with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a normalizer with custom options.
    pub fn with_options(options: NormalizeOptions) -> Self {
        Self { options }
    }

    /// Normalize a raw table.
    ///
    /// Returns `None` when the grid has no columns at all.
    pub fn normalize(&self, raw: &RawTable) -> Option<NormalizedTable> {
        let width = raw.column_count();
        if width == 0 {
            log::debug!(
                "Skipping table {} on page {}: no columns",
                raw.index_on_page + 1,
                raw.page_number
            );
            return None;
        }

        let mut rows: Vec<Vec<CellValue>> = raw
            .rows
            .iter()
            .filter(|row| !row.iter().all(CellValue::is_blank))
            .map(|row| {
                if self.options.trim_cells {
                    row.iter().map(CellValue::trimmed).collect()
                } else {
                    row.clone()
                }
            })
            .collect();

        let limit = self.options.sparse_header_ratio * width as f32;
        let mut dropped = 0;
        while dropped < self.options.max_dropped_header_rows
            && rows.first().map_or(false, |row| missing_cells(row, width) as f32 > limit)
        {
            rows.remove(0);
            dropped += 1;
        }
        if dropped > 0 {
            log::debug!(
                "Dropped {} sparse header row(s) from table {} on page {}",
                dropped,
                raw.index_on_page + 1,
                raw.page_number
            );
        }

        let header = if rows.is_empty() {
            Vec::new()
        } else {
            rows.remove(0)
        };
        let columns = column_names(&header, width);

        match NormalizedTable::new(columns, rows) {
            Ok(table) => Some(table),
            Err(e) => {
                log::warn!("Failed to normalize table on page {}: {}", raw.page_number, e);
                None
            }
        }
    }
}

/// Missing cells in a row, counting absent trailing cells.
fn missing_cells(row: &[CellValue], width: usize) -> usize {
    row.iter().filter(|c| c.is_missing()).count() + width.saturating_sub(row.len())
}

/// Column names from a header row.
///
/// Blank cells become `Column_<i>`; a name already taken gets `_<i>`
/// appended, then `_<i>_<n>` until it is unique.
pub fn column_names(header: &[CellValue], width: usize) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::with_capacity(width);
    let mut names = Vec::with_capacity(width);

    for i in 0..width {
        let base = match header.get(i) {
            Some(cell) if !cell.is_blank() => cell.as_str().trim().to_string(),
            _ => format!("Column_{}", i),
        };

        let mut name = base.clone();
        if used.contains(&name) {
            name = format!("{}_{}", base, i);
            let mut n = 1;
            while used.contains(&name) {
                name = format!("{}_{}_{}", base, i, n);
                n += 1;
            }
        }

        used.insert(name.clone());
        names.push(name);
    }

    names
}

/// Normalize with default options.
pub fn normalize(raw: &RawTable) -> Option<NormalizedTable> {
    Normalizer::new().normalize(raw)
}
