//! Plain text rendering.
//!
//! Columns are right-aligned under their names with a leading row index,
//! the way a dataframe prints:
//!
//! ```text
//!     Name  Age
//! 0  Alice   30
//! 1    Bob   25
//! ```

use crate::model::{CellValue, ExtractionReport, SummaryOutcome};

use super::TableView;

/// Render a table as aligned plain text.
pub fn to_plain<T: TableView + ?Sized>(table: &T) -> String {
    let columns = table.columns();
    let rows = table.rows();
    let index_width = rows.len().saturating_sub(1).to_string().len();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            rows.iter()
                .map(|row| row.get(i).map_or(0, |c| cell_text(c).chars().count()))
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut output = String::new();

    output.push_str(&" ".repeat(index_width));
    for (name, width) in columns.iter().zip(&widths) {
        output.push_str("  ");
        output.push_str(&pad_left(name, *width));
    }

    for (idx, row) in rows.iter().enumerate() {
        output.push('\n');
        output.push_str(&pad_right(&idx.to_string(), index_width));
        for (cell, width) in row.iter().zip(&widths) {
            output.push_str("  ");
            output.push_str(&pad_left(&cell_text(cell), *width));
        }
    }

    output
}

/// Render every table of a report with its summary.
pub fn report_to_text(report: &ExtractionReport) -> String {
    let mut output = String::new();

    for record in &report.tables {
        output.push_str(&format!(
            "Table {} (page {})\n",
            record.table_index + 1,
            record.page_index
        ));
        output.push_str(&to_plain(record));
        output.push_str("\n\n");

        match &record.summary {
            SummaryOutcome::Ok { text } => {
                output.push_str(&format!("Summary: {}\n\n", text));
            }
            SummaryOutcome::Failed { error } => {
                output.push_str(&format!("Summary unavailable: {}\n\n", error));
            }
            SummaryOutcome::Skipped => {}
        }
    }

    if report.tables.is_empty() {
        output.push_str("No tables found.\n");
    }

    output
}

fn cell_text(cell: &CellValue) -> String {
    cell.as_str().replace('\n', " ")
}

fn pad_left(text: &str, width: usize) -> String {
    let len = text.chars().count();
    format!("{}{}", " ".repeat(width.saturating_sub(len)), text)
}

fn pad_right(text: &str, width: usize) -> String {
    let len = text.chars().count();
    format!("{}{}", text, " ".repeat(width.saturating_sub(len)))
}
