//! Rendering of extracted tables and reports.

mod csv;
mod html;
mod json;
mod markdown;
mod text;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{CellValue, NormalizedTable, TableRecord};

pub use self::csv::{report_to_csv, to_csv};
pub use html::to_html;
pub use json::{table_to_json, to_json, JsonFormat};
pub use markdown::{report_to_markdown, to_markdown};
pub use text::{report_to_text, to_plain};

/// Read access to a rectangular table.
pub trait TableView {
    /// Column names.
    fn columns(&self) -> &[String];

    /// Data rows, each as wide as [`TableView::columns`].
    fn rows(&self) -> &[Vec<CellValue>];
}

impl TableView for NormalizedTable {
    fn columns(&self) -> &[String] {
        NormalizedTable::columns(self)
    }

    fn rows(&self) -> &[Vec<CellValue>] {
        NormalizedTable::rows(self)
    }
}

impl TableView for TableRecord {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }
}

/// Output format for a single table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    /// Aligned columns with a row index
    #[default]
    Plain,
    /// Markdown pipe table
    Markdown,
    /// Comma-separated values
    Csv,
    /// HTML `<table>`
    Html,
}

impl TableFormat {
    /// Format name.
    pub fn as_str(&self) -> &'static str {
        match self {
            TableFormat::Plain => "plain",
            TableFormat::Markdown => "markdown",
            TableFormat::Csv => "csv",
            TableFormat::Html => "html",
        }
    }
}

impl fmt::Display for TableFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" | "text" | "txt" => Ok(TableFormat::Plain),
            "markdown" | "md" => Ok(TableFormat::Markdown),
            "csv" => Ok(TableFormat::Csv),
            "html" => Ok(TableFormat::Html),
            other => Err(Error::Config(format!("unknown table format: {}", other))),
        }
    }
}

/// Render a table in the given format.
pub fn render_table<T: TableView + ?Sized>(table: &T, format: TableFormat) -> Result<String> {
    match format {
        TableFormat::Plain => Ok(to_plain(table)),
        TableFormat::Markdown => Ok(to_markdown(table)),
        TableFormat::Csv => to_csv(table),
        TableFormat::Html => Ok(to_html(table)),
    }
}
