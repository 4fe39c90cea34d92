//! Markdown rendering for tables and reports.

use crate::model::{ExtractionReport, SummaryOutcome};

use super::TableView;

/// Render a table as a Markdown pipe table.
pub fn to_markdown<T: TableView + ?Sized>(table: &T) -> String {
    let columns = table.columns();
    if columns.is_empty() {
        return String::new();
    }

    let mut output = String::new();

    output.push('|');
    for name in columns {
        output.push_str(&format!(" {} |", escape_markdown(name.trim())));
    }
    output.push('\n');

    output.push('|');
    for _ in columns {
        output.push_str(" --- |");
    }
    output.push('\n');

    for row in table.rows() {
        output.push('|');
        for cell in row {
            let content = cell.as_str().replace('\n', " ");
            output.push_str(&format!(" {} |", escape_markdown(content.trim())));
        }
        output.push('\n');
    }

    output
}

/// Render a report as a Markdown document: one section per table with its summary.
pub fn report_to_markdown(report: &ExtractionReport) -> String {
    let mut output = format!("# Tables in {}\n\n", escape_markdown(&report.source));

    if report.tables.is_empty() {
        output.push_str("_No tables found._\n");
        return output;
    }

    for record in &report.tables {
        output.push_str(&format!(
            "## Table {} (page {})\n\n",
            record.table_index + 1,
            record.page_index
        ));
        output.push_str(&to_markdown(record));
        output.push('\n');

        match &record.summary {
            SummaryOutcome::Ok { text } => {
                output.push_str(&format!("**Summary:** {}\n\n", text.trim()));
            }
            SummaryOutcome::Failed { error } => {
                output.push_str(&format!("**Summary unavailable:** {}\n\n", error));
            }
            SummaryOutcome::Skipped => {}
        }
    }

    output
}

/// Escape special Markdown characters.
/// Only escape characters that could be misinterpreted as Markdown syntax.
fn escape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            // Core formatting, brackets for links, pipe for tables
            '\\' | '`' | '*' | '_' | '[' | ']' | '|' => {
                result.push('\\');
                result.push(c);
            }
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CellValue, NormalizedTable, TableRecord};
    use chrono::Utc;
    use uuid::Uuid;

    fn sample() -> NormalizedTable {
        NormalizedTable::new(
            vec!["Item".to_string(), "Cost".to_string()],
            vec![
                vec![CellValue::text("A|B"), CellValue::text("10")],
                vec![CellValue::text("C"), CellValue::Empty],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("a*b_c"), "a\\*b\\_c");
        assert_eq!(escape_markdown("1. plain"), "1. plain");
    }

    #[test]
    fn test_to_markdown() {
        assert_eq!(
            to_markdown(&sample()),
            "| Item | Cost |\n| --- | --- |\n| A\\|B | 10 |\n| C |  |\n"
        );
    }

    #[test]
    fn test_report_to_markdown() {
        let report = ExtractionReport {
            invocation_id: Uuid::new_v4(),
            source: "report.pdf".to_string(),
            strategy: "layout".to_string(),
            pages_processed: 1,
            pages_without_tables: vec![],
            tables_skipped: 0,
            tables: vec![
                TableRecord::new(
                    0,
                    1,
                    sample(),
                    SummaryOutcome::Ok {
                        text: "Two items.".to_string(),
                    },
                ),
                TableRecord::new(
                    1,
                    2,
                    sample(),
                    SummaryOutcome::Failed {
                        error: "timeout".to_string(),
                    },
                ),
            ],
            generated_at: Utc::now(),
        };

        let md = report_to_markdown(&report);
        assert!(md.starts_with("# Tables in report.pdf\n"));
        assert!(md.contains("## Table 1 (page 1)"));
        assert!(md.contains("**Summary:** Two items."));
        assert!(md.contains("## Table 2 (page 2)"));
        assert!(md.contains("**Summary unavailable:** timeout"));
    }
}
