//! Output records produced by the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CellValue, NormalizedTable};

/// Outcome of summarizing one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SummaryOutcome {
    /// Summary text returned by the endpoint
    Ok { text: String },
    /// The endpoint failed for this table
    Failed { error: String },
    /// No summarizer was configured
    Skipped,
}

impl SummaryOutcome {
    pub fn text(&self) -> Option<&str> {
        match self {
            SummaryOutcome::Ok { text } => Some(text),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SummaryOutcome::Failed { .. })
    }
}

/// One extracted table with its summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableRecord {
    /// Position in the whole document (0-indexed, page order then detection order)
    pub table_index: usize,

    /// Page the table came from (1-indexed)
    pub page_index: u32,

    /// Column names
    pub columns: Vec<String>,

    /// Data rows
    pub rows: Vec<Vec<CellValue>>,

    /// Summary or the reason it is missing
    pub summary: SummaryOutcome,
}

impl TableRecord {
    /// Create a record from a normalized table.
    pub fn new(
        table_index: usize,
        page_index: u32,
        table: NormalizedTable,
        summary: SummaryOutcome,
    ) -> Self {
        let (columns, rows) = table.into_parts();
        Self {
            table_index,
            page_index,
            columns,
            rows,
            summary,
        }
    }
}

/// Everything one invocation produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionReport {
    /// Invocation identifier
    pub invocation_id: Uuid,

    /// File name or label of the source document
    pub source: String,

    /// Detection strategy used
    pub strategy: String,

    /// Pages that were processed
    pub pages_processed: u32,

    /// Pages on which no table was found
    pub pages_without_tables: Vec<u32>,

    /// Candidate tables dropped because their content could not be parsed
    pub tables_skipped: usize,

    /// Extracted tables in document order
    pub tables: Vec<TableRecord>,

    /// Time the report was produced
    pub generated_at: DateTime<Utc>,
}

impl ExtractionReport {
    /// Number of tables whose summary failed.
    pub fn failed_summaries(&self) -> usize {
        self.tables.iter().filter(|t| t.summary.is_failed()).count()
    }

    /// Check if no table was extracted.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
