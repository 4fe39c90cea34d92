//! HTML rendering.

use crate::detector::escape_html;

use super::TableView;

/// Render a table as an HTML `<table>` with a `<thead>` row of column names.
pub fn to_html<T: TableView + ?Sized>(table: &T) -> String {
    let mut html = String::from("<table>\n<thead>\n<tr>");
    for name in table.columns() {
        html.push_str(&format!("<th>{}</th>", escape_html(name)));
    }
    html.push_str("</tr>\n</thead>\n<tbody>\n");

    for row in table.rows() {
        html.push_str("<tr>");
        for cell in row {
            html.push_str(&format!("<td>{}</td>", escape_html(cell.as_str())));
        }
        html.push_str("</tr>\n");
    }

    html.push_str("</tbody>\n</table>\n");
    html
}
