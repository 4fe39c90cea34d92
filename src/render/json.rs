//! JSON rendering for extraction reports.

use crate::error::{Error, Result};
use crate::model::ExtractionReport;

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Convert a report to JSON.
pub fn to_json(report: &ExtractionReport, format: JsonFormat) -> Result<String> {
    let result = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(report),
        JsonFormat::Compact => serde_json::to_string(report),
    };

    result.map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))
}

/// Convert a table's columns and rows to a JSON object.
pub fn table_to_json<T: super::TableView + ?Sized>(table: &T) -> Result<String> {
    let value = serde_json::json!({
        "columns": table.columns(),
        "rows": table.rows(),
    });
    serde_json::to_string(&value).map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))
}
