//! HTML table serialization and parsing.
//!
//! Parsing follows the usual dataframe semantics: a cell spanning several
//! rows or columns has its value repeated into every slot it covers.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use crate::error::{Error, Result};
use crate::model::CellValue;

/// Upper bound for `colspan`/`rowspan` attributes.
const MAX_SPAN: usize = 256;

static TABLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table").expect("Failed to compile TABLE_SELECTOR"));

static ROW_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tr").expect("Failed to compile ROW_SELECTOR"));

/// A cell to be written as `<td>`.
#[derive(Debug, Clone, PartialEq)]
pub struct HtmlCell {
    pub text: String,
    pub colspan: usize,
    pub rowspan: usize,
}

impl HtmlCell {
    /// A 1x1 cell.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            colspan: 1,
            rowspan: 1,
        }
    }

    /// Set the spans.
    pub fn with_span(mut self, colspan: usize, rowspan: usize) -> Self {
        self.colspan = colspan.max(1);
        self.rowspan = rowspan.max(1);
        self
    }
}

/// Parse the first `<table>` in `html` into a grid of cells.
///
/// Rows keep document order and cells keep left-to-right order. Blank cells
/// become [`CellValue::Empty`].
pub fn parse_html_table(html: &str) -> Result<Vec<Vec<CellValue>>> {
    let fragment = Html::parse_fragment(html);
    let table = fragment
        .select(&TABLE_SELECTOR)
        .next()
        .ok_or_else(|| Error::TableParse("no <table> element".to_string()))?;

    // Columns still covered by a rowspan from above: (rows left, value)
    let mut pending: Vec<Option<(usize, CellValue)>> = Vec::new();
    let mut grid = Vec::new();

    for row in table.select(&ROW_SELECTOR) {
        // Skip rows of nested tables
        if !belongs_to(row, table) {
            continue;
        }

        let mut out: Vec<CellValue> = Vec::new();
        let mut col = 0;

        for cell in row
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|e| matches!(e.value().name(), "td" | "th"))
        {
            let value = CellValue::from_extracted(&cell.text().collect::<String>());
            let colspan = span_attr(cell, "colspan");
            let rowspan = span_attr(cell, "rowspan");

            for _ in 0..colspan {
                // A rowspan from above keeps its slot; this cell moves right
                fill_pending(&mut pending, &mut out, &mut col, false);
                if rowspan > 1 {
                    if pending.len() <= col {
                        pending.resize(col + 1, None);
                    }
                    pending[col] = Some((rowspan - 1, value.clone()));
                }
                out.push(value.clone());
                col += 1;
            }
        }

        // Rowspans reaching past the last cell of this row
        fill_pending(&mut pending, &mut out, &mut col, true);

        if !out.is_empty() {
            grid.push(out);
        }
    }

    if grid.is_empty() {
        return Err(Error::TableParse("table has no rows".to_string()));
    }

    Ok(grid)
}

/// Copy values of active rowspans into `out` starting at `col`.
///
/// Stops at the first free column unless `to_end` is set.
fn fill_pending(
    pending: &mut [Option<(usize, CellValue)>],
    out: &mut Vec<CellValue>,
    col: &mut usize,
    to_end: bool,
) {
    while *col < pending.len() {
        match pending[*col].take() {
            Some((left, value)) => {
                out.push(value.clone());
                if left > 1 {
                    pending[*col] = Some((left - 1, value));
                }
                *col += 1;
            }
            None if to_end => {
                if pending[*col..].iter().all(Option::is_none) {
                    break;
                }
                out.push(CellValue::Empty);
                *col += 1;
            }
            None => break,
        }
    }
}

fn belongs_to(row: ElementRef<'_>, table: ElementRef<'_>) -> bool {
    row.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "table")
        .map(|t| t.id() == table.id())
        .unwrap_or(false)
}

fn span_attr(cell: ElementRef<'_>, name: &str) -> usize {
    cell.value()
        .attr(name)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(1)
        .clamp(1, MAX_SPAN)
}

/// Serialize rows of cells as an HTML `<table>`.
pub fn write_html_table(rows: &[Vec<HtmlCell>]) -> String {
    let mut html = String::from("<table>");
    for row in rows {
        html.push_str("<tr>");
        for cell in row {
            html.push_str("<td");
            if cell.colspan > 1 {
                html.push_str(&format!(" colspan=\"{}\"", cell.colspan));
            }
            if cell.rowspan > 1 {
                html.push_str(&format!(" rowspan=\"{}\"", cell.rowspan));
            }
            html.push('>');
            html.push_str(&escape_html(&cell.text));
            html.push_str("</td>");
        }
        html.push_str("</tr>");
    }
    html.push_str("</table>");
    html
}

/// Escape HTML special characters.
pub(crate) fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
