//! CSV rendering.

use crate::error::{Error, Result};
use crate::model::ExtractionReport;

use super::TableView;

/// Render a table as CSV with a header record.
///
/// Missing cells are written as empty fields.
pub fn to_csv<T: TableView + ?Sized>(table: &T) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(table.columns()).map_err(csv_error)?;
    for row in table.rows() {
        writer
            .write_record(row.iter().map(|cell| cell.as_str()))
            .map_err(csv_error)?;
    }

    finish(writer)
}

/// Render all tables of a report in long form, one record per cell:
/// `table,page,row,column,value`.
pub fn report_to_csv(report: &ExtractionReport) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(["table", "page", "row", "column", "value"])
        .map_err(csv_error)?;

    for record in &report.tables {
        let table = (record.table_index + 1).to_string();
        let page = record.page_index.to_string();
        for (row_idx, row) in record.rows.iter().enumerate() {
            let row_num = row_idx.to_string();
            for (column, cell) in record.columns.iter().zip(row) {
                writer
                    .write_record([
                        table.as_str(),
                        page.as_str(),
                        row_num.as_str(),
                        column.as_str(),
                        cell.as_str(),
                    ])
                    .map_err(csv_error)?;
            }
        }
    }

    finish(writer)
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| Error::Render(format!("CSV write error: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| Error::Render(format!("CSV encoding error: {}", e)))
}

fn csv_error(e: csv::Error) -> Error {
    Error::Render(format!("CSV write error: {}", e))
}
