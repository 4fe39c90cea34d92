//! Table detection using text position analysis (stream mode).
//!
//! Detects tables by analyzing text alignment patterns without relying on
//! graphical lines: spans are grouped into rows by baseline, column left
//! edges are found where they align across rows, and contiguous runs of
//! aligned rows become tables.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::Deserialize;

use crate::model::{BoundingBox, CellValue, Page, TableRegion, TextSpan};

use super::TableDetector;

/// Cells with at least this many words read as running text.
const PROSE_MIN_WORDS: usize = 3;

/// A row of text spans in a table.
#[derive(Debug, Clone)]
pub(crate) struct RowData {
    /// Spans in this row, sorted by X
    pub spans: Vec<TextSpan>,
}

/// Stream detector configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Minimum number of rows to consider as table
    pub min_rows: usize,
    /// Minimum number of columns to consider as table
    pub min_columns: usize,
    /// Maximum number of columns (above this, likely word-level splitting)
    pub max_columns: usize,
    /// Y tolerance for grouping spans into rows (fraction of font size)
    pub y_tolerance_factor: f32,
    /// Minimum column alignment ratio (0.0-1.0)
    pub min_alignment_ratio: f32,
    /// Minimum gap between columns (points)
    pub min_column_gap: f32,
    /// Width of the buckets left edges are snapped to (points)
    pub edge_bucket: f32,
    /// Distance within which a span counts as aligned with a column (points)
    pub alignment_tolerance: f32,
    /// Reject regions where every column holds running text
    pub reject_prose: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            min_rows: 2,
            min_columns: 2,
            max_columns: 8,
            y_tolerance_factor: 0.4,
            min_alignment_ratio: 0.3,
            min_column_gap: 15.0,
            edge_bucket: 5.0,
            alignment_tolerance: 5.0,
            reject_prose: false,
        }
    }
}

impl StreamConfig {
    /// Stricter variant used as a fallback on pages without ruling lines.
    pub fn strict(&self) -> Self {
        Self {
            min_rows: self.min_rows.max(3),
            min_alignment_ratio: self.min_alignment_ratio.max(0.6),
            reject_prose: true,
            ..self.clone()
        }
    }
}

/// Detects tables from text alignment alone.
#[derive(Debug, Clone, Default)]
pub struct StreamDetector {
    config: StreamConfig,
}

impl StreamDetector {
    /// Create a new stream detector with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new stream detector with custom configuration.
    pub fn with_config(config: StreamConfig) -> Self {
        Self { config }
    }

    /// Find table regions among the given spans.
    pub(crate) fn detect_spans(&self, spans: &[TextSpan]) -> Vec<TableRegion> {
        log::debug!("StreamDetector: starting with {} spans", spans.len());

        if spans.len() < self.config.min_rows * self.config.min_columns {
            log::debug!(
                "StreamDetector: not enough spans ({} < {})",
                spans.len(),
                self.config.min_rows * self.config.min_columns
            );
            return vec![];
        }

        // Step 1: Group spans into rows by Y position
        let rows = self.group_into_rows(spans);
        if rows.len() < self.config.min_rows {
            log::debug!("StreamDetector: not enough rows ({})", rows.len());
            return vec![];
        }

        // Step 2: Detect column boundaries from text edges
        let columns = self.detect_columns(&rows);
        log::debug!("StreamDetector: column edges {:?}", columns);
        if columns.len() < self.config.min_columns {
            return vec![];
        }

        // Step 3: Find contiguous rows with consistent column alignment
        let table_regions = self.find_table_regions(&rows, &columns);
        log::debug!("StreamDetector: found {} candidate regions", table_regions.len());

        // Step 4: Build a grid for each region
        let mut regions = Vec::new();
        for (start_row, end_row) in table_regions {
            let table_rows = &rows[start_row..=end_row];

            // Re-detect columns for this specific table region
            let table_columns = self.detect_columns(table_rows);
            if table_columns.len() < self.config.min_columns {
                continue;
            }

            // Reject tables with too many columns (likely word-level splitting)
            if table_columns.len() > self.config.max_columns {
                log::debug!(
                    "StreamDetector: skipping region, too many columns ({} > {})",
                    table_columns.len(),
                    self.config.max_columns
                );
                continue;
            }

            if is_list_pattern(table_rows, &table_columns) {
                log::debug!("StreamDetector: skipping region, detected as list pattern");
                continue;
            }

            let grid = assign_cells(table_rows, &table_columns);
            if self.config.reject_prose && is_prose_grid(&grid) {
                log::debug!("StreamDetector: skipping region, columns hold running text");
                continue;
            }

            regions.push(build_region(table_rows, grid));
        }

        regions
    }

    /// Group spans into rows by Y position, top to bottom.
    pub(crate) fn group_into_rows(&self, spans: &[TextSpan]) -> Vec<RowData> {
        if spans.is_empty() {
            return vec![];
        }

        // Sort by Y (descending for PDF coords) then X
        let mut sorted_spans = spans.to_vec();
        sorted_spans.sort_by(|a, b| match b.y.partial_cmp(&a.y).unwrap_or(Ordering::Equal) {
            Ordering::Equal => a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal),
            other => other,
        });

        let mut rows: Vec<RowData> = Vec::new();
        let mut current: Vec<TextSpan> = Vec::new();
        let mut current_y: Option<f32> = None;

        for span in sorted_spans {
            let y_tolerance = span.font_size * self.config.y_tolerance_factor;

            match current_y {
                Some(y) if (span.y - y).abs() <= y_tolerance => current.push(span),
                _ => {
                    if !current.is_empty() {
                        rows.push(RowData {
                            spans: std::mem::take(&mut current),
                        });
                    }
                    current_y = Some(span.y);
                    current.push(span);
                }
            }
        }

        if !current.is_empty() {
            rows.push(RowData { spans: current });
        }

        rows
    }

    /// Detect column left edges.
    ///
    /// Rows with two or more spans are the evidence; when too few exist
    /// every row is counted instead.
    pub(crate) fn detect_columns(&self, rows: &[RowData]) -> Vec<f32> {
        if rows.is_empty() {
            return vec![];
        }

        let multi_span_rows: Vec<&RowData> = rows.iter().filter(|r| r.spans.len() >= 2).collect();
        let evidence: Vec<&RowData> = if multi_span_rows.len() >= self.config.min_rows {
            multi_span_rows
        } else {
            rows.iter().collect()
        };

        // Count each bucket once per row
        let bucket_size = self.config.edge_bucket;
        let mut edge_counts: HashMap<i32, usize> = HashMap::new();
        for row in &evidence {
            let row_buckets: HashSet<i32> = row
                .spans
                .iter()
                .map(|span| (span.x / bucket_size).round() as i32)
                .collect();
            for bucket in row_buckets {
                *edge_counts.entry(bucket).or_insert(0) += 1;
            }
        }

        let min_occurrences =
            ((evidence.len() as f32 * self.config.min_alignment_ratio) as usize).max(2);

        let mut column_edges: Vec<f32> = edge_counts
            .iter()
            .filter(|(_, count)| **count >= min_occurrences)
            .map(|(bucket, _)| *bucket as f32 * bucket_size)
            .collect();
        column_edges.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

        // Merge close edges
        let mut merged: Vec<f32> = Vec::new();
        for edge in column_edges {
            match merged.last() {
                Some(&last) if edge - last < self.config.min_column_gap => {}
                _ => merged.push(edge),
            }
        }

        merged
    }

    /// Find contiguous row ranges that form tables.
    fn find_table_regions(&self, rows: &[RowData], columns: &[f32]) -> Vec<(usize, usize)> {
        if rows.is_empty() || columns.len() < self.config.min_columns {
            return vec![];
        }

        let mut regions = Vec::new();
        let mut current_start: Option<usize> = None;

        for (i, row) in rows.iter().enumerate() {
            let score = self.alignment_score(row, columns);

            if score >= self.config.min_alignment_ratio {
                current_start.get_or_insert(i);
            } else if let Some(start) = current_start.take() {
                if i - start >= self.config.min_rows {
                    regions.push((start, i - 1));
                }
            }
        }

        if let Some(start) = current_start {
            if rows.len() - start >= self.config.min_rows {
                regions.push((start, rows.len() - 1));
            }
        }

        regions
    }

    /// Fraction of a row's spans that start on a column edge.
    fn alignment_score(&self, row: &RowData, columns: &[f32]) -> f32 {
        if row.spans.is_empty() || columns.is_empty() {
            return 0.0;
        }

        let tolerance = self.config.alignment_tolerance;
        let aligned = row
            .spans
            .iter()
            .filter(|span| columns.iter().any(|col| (span.x - col).abs() <= tolerance))
            .count();

        aligned as f32 / row.spans.len() as f32
    }
}

impl TableDetector for StreamDetector {
    fn name(&self) -> &'static str {
        "whitespace"
    }

    fn find_regions(&self, page: &Page) -> Vec<TableRegion> {
        let spans: Vec<TextSpan> = page.spans().filter(|s| s.upright).cloned().collect();
        self.detect_spans(&spans)
    }
}

/// Assign each span to a column by its left edge.
fn assign_cells(rows: &[RowData], columns: &[f32]) -> Vec<Vec<CellValue>> {
    let right = rows
        .iter()
        .flat_map(|r| r.spans.iter())
        .map(TextSpan::right)
        .fold(f32::MIN, f32::max);

    rows.iter()
        .map(|row| {
            let mut contents: Vec<Vec<&str>> = vec![Vec::new(); columns.len()];
            for span in &row.spans {
                let col = find_column_for_span(span.x, columns, right);
                contents[col].push(span.text.trim());
            }
            contents
                .into_iter()
                .map(|parts| CellValue::from_extracted(&parts.join(" ")))
                .collect()
        })
        .collect()
}

/// Region around the spans of `rows`.
fn build_region(rows: &[RowData], grid: Vec<Vec<CellValue>>) -> TableRegion {
    let all_spans = || rows.iter().flat_map(|r| r.spans.iter());
    let left = all_spans().map(|s| s.x).fold(f32::MAX, f32::min);
    let right = all_spans().map(TextSpan::right).fold(f32::MIN, f32::max);
    let top = all_spans().map(TextSpan::top).fold(f32::MIN, f32::max);
    let bottom = all_spans().map(TextSpan::bottom).fold(f32::MAX, f32::min);

    TableRegion::grid(BoundingBox::new(left, bottom, right, top), grid)
}

/// Check if every column is mostly multi-word text, as in a two-column page layout.
///
/// Real tables nearly always have at least one column of short labels or numbers.
fn is_prose_grid(grid: &[Vec<CellValue>]) -> bool {
    let width = grid.iter().map(Vec::len).max().unwrap_or(0);
    if width == 0 {
        return false;
    }

    (0..width).all(|col| {
        let cells: Vec<&str> = grid
            .iter()
            .filter_map(|row| row.get(col))
            .filter(|cell| !cell.is_blank())
            .map(CellValue::as_str)
            .collect();
        let long = cells
            .iter()
            .filter(|text| text.split_whitespace().count() >= PROSE_MIN_WORDS)
            .count();
        !cells.is_empty() && long * 2 > cells.len()
    })
}

/// Find which column a span belongs to based on its left edge.
fn find_column_for_span(span_x: f32, columns: &[f32], right_x: f32) -> usize {
    // Allow some tolerance (10pt) for spans slightly before column start
    for (i, &col_start) in columns.iter().enumerate() {
        let col_end = columns.get(i + 1).copied().unwrap_or(right_x + 100.0);
        if span_x >= col_start - 10.0 && span_x < col_end - 10.0 {
            return i;
        }
    }

    // Otherwise the closest column
    columns
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            (span_x - **a)
                .abs()
                .partial_cmp(&(span_x - **b).abs())
                .unwrap_or(Ordering::Equal)
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Check if detected table rows actually represent a numbered or bulleted list.
///
/// Numbered list markers and their text often become separate spans at
/// different X positions, which looks like a two-column table.
fn is_list_pattern(rows: &[RowData], columns: &[f32]) -> bool {
    if columns.len() < 2 || rows.is_empty() {
        return false;
    }

    let mut bullet_count = 0;
    let mut number_count = 0;

    for row in rows {
        let first_span = row
            .spans
            .iter()
            .min_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));

        if let Some(span) = first_span {
            let text = span.text.trim();
            if is_bullet_marker(text) {
                bullet_count += 1;
            } else if is_number_marker(text) {
                number_count += 1;
            }
        }
    }

    let bullet_ratio = bullet_count as f32 / rows.len() as f32;
    let total_ratio = (bullet_count + number_count) as f32 / rows.len() as f32;

    // Bullet markers are almost never real table data
    if bullet_ratio >= 0.5 {
        return true;
    }

    // Numbered first columns are common in real tables; only reject two columns
    columns.len() == 2 && total_ratio >= 0.5
}

/// Check if text is a bullet marker (•, -, etc.).
fn is_bullet_marker(text: &str) -> bool {
    matches!(
        text.trim(),
        "-" | "–" | "—" | "•" | "·" | "*" | "○" | "▪" | "◦" | "▸" | "►" | "■" | "●" | "□" | "◆" | "▶"
    )
}

/// Check if text is a number-style list marker (1., 2), a., etc.).
fn is_number_marker(text: &str) -> bool {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return false;
    }

    // Digits followed by "." or ")"
    if let Some(pos) = cleaned.find(|c: char| !c.is_ascii_digit()) {
        let (prefix, suffix) = cleaned.split_at(pos);
        if !prefix.is_empty() && (suffix == "." || suffix == ")") {
            return true;
        }
    }

    // Letter marker: "a.", "B)"
    let chars: Vec<char> = cleaned.chars().collect();
    chars.len() == 2 && chars[0].is_alphabetic() && (chars[1] == '.' || chars[1] == ')')
}
