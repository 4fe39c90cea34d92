//! Table cell values.

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// A single table cell.
///
/// Cells coming out of a PDF are either missing entirely (no cell at that
/// position, or a slot covered by a merged cell) or carry some text, possibly
/// empty. Empty and whitespace-only text is kept as-is but reported as blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum CellValue {
    /// Missing cell
    #[default]
    Empty,
    /// Cell with text content
    Text(String),
}

impl CellValue {
    /// Create a text cell.
    pub fn text(text: impl Into<String>) -> Self {
        CellValue::Text(text.into())
    }

    /// Create a cell from extracted text: NFC-normalized, whitespace collapsed.
    ///
    /// Text that collapses to nothing becomes [`CellValue::Empty`].
    pub fn from_extracted(raw: &str) -> Self {
        let normalized: String = raw.nfc().collect();
        let collapsed = normalized.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(collapsed)
        }
    }

    /// True only for missing cells.
    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// True for missing cells and for whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(t) => t.trim().is_empty(),
        }
    }

    /// Text content, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(t) => Some(t),
        }
    }

    /// Text content or the empty string.
    pub fn as_str(&self) -> &str {
        self.as_text().unwrap_or("")
    }

    /// Trimmed copy; missing cells stay missing.
    pub fn trimmed(&self) -> Self {
        match self {
            CellValue::Empty => CellValue::Empty,
            CellValue::Text(t) => Self::text(t.trim()),
        }
    }
}

impl From<Option<String>> for CellValue {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(text) => CellValue::text(text),
            None => CellValue::Empty,
        }
    }
}

impl From<CellValue> for Option<String> {
    fn from(value: CellValue) -> Self {
        match value {
            CellValue::Empty => None,
            CellValue::Text(text) => Some(text),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::text(value)
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::text(value)
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
