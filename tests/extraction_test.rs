//! End-to-end tests on PDFs built with lopdf.

use std::io::Write;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use untable::render::{self, JsonFormat};
use untable::{
    extract_tables, CellValue, DetectionStrategy, Error, PageSelection, Result, SummaryOutcome,
    Summarizer, Untable,
};

/// Text placed at (x, y) in Helvetica.
fn text_ops(ops: &mut Vec<Operation>, text: &str, x: f32, y: f32, size: f32) {
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new("Tf", vec!["F1".into(), size.into()]));
    ops.push(Operation::new("Td", vec![x.into(), y.into()]));
    ops.push(Operation::new("Tj", vec![Object::string_literal(text)]));
    ops.push(Operation::new("ET", vec![]));
}

fn line_ops(ops: &mut Vec<Operation>, x0: f32, y0: f32, x1: f32, y1: f32) {
    ops.push(Operation::new("m", vec![x0.into(), y0.into()]));
    ops.push(Operation::new("l", vec![x1.into(), y1.into()]));
    ops.push(Operation::new("S", vec![]));
}

/// Ruled grid with one text row per entry of `rows`; the first row is the header.
fn ruled_table_ops(rows: &[[&str; 3]]) -> Vec<Operation> {
    let xs = [100.0, 200.0, 300.0, 400.0];
    let top = 700.0;
    let row_height = 20.0;
    let bottom = top - row_height * rows.len() as f32;

    let mut ops = vec![Operation::new("w", vec![0.5.into()])];
    for i in 0..=rows.len() {
        let y = top - row_height * i as f32;
        line_ops(&mut ops, xs[0], y, xs[3], y);
    }
    for x in xs {
        line_ops(&mut ops, x, top, x, bottom);
    }

    for (r, row) in rows.iter().enumerate() {
        let baseline = top - row_height * (r as f32 + 1.0) + 6.0;
        for (c, text) in row.iter().enumerate() {
            text_ops(&mut ops, text, xs[c] + 5.0, baseline, 10.0);
        }
    }
    ops
}

/// Unruled columns aligned on their left edges.
fn aligned_table_ops(rows: &[[&str; 3]]) -> Vec<Operation> {
    let xs = [72.0, 180.0, 290.0];
    let mut ops = Vec::new();
    for (r, row) in rows.iter().enumerate() {
        let y = 700.0 - 15.0 * r as f32;
        for (c, text) in row.iter().enumerate() {
            text_ops(&mut ops, text, xs[c], y, 12.0);
        }
    }
    ops
}

/// Build a PDF with one page per operation list.
fn build_pdf(pages: Vec<Vec<Operation>>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for operations in pages {
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(Object::from(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut data = Vec::new();
    doc.save_to(&mut data).unwrap();
    data
}

fn people() -> [[&'static str; 3]; 3] {
    [
        ["Name", "Age", "City"],
        ["Alice", "30", "Paris"],
        ["Bob", "25", "Lyon"],
    ]
}

fn texts(row: &[CellValue]) -> Vec<&str> {
    row.iter().map(|c| c.as_str()).collect()
}

struct CountingSummarizer;

impl Summarizer for CountingSummarizer {
    fn summarize(&self, table_text: &str) -> Result<String> {
        if table_text.contains("Zed") {
            return Err(Error::SummarizationUnavailable("rate limited".to_string()));
        }
        Ok(format!("{} rows", table_text.lines().count() - 1))
    }
}

#[test]
fn test_extract_ruled_table_from_file() {
    let data = build_pdf(vec![ruled_table_ops(&people())]);
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&data).unwrap();

    let tables = extract_tables(file.path()).unwrap();
    assert_eq!(tables.len(), 1);

    let (page, table) = &tables[0];
    assert_eq!(*page, 1);
    assert_eq!(table.columns(), &["Name", "Age", "City"]);
    assert_eq!(texts(&table.rows()[0]), vec!["Alice", "30", "Paris"]);
    assert_eq!(texts(&table.rows()[1]), vec!["Bob", "25", "Lyon"]);
}

#[test]
fn test_whitespace_strategy() {
    let rows = [
        ["Region", "Units", "Revenue"],
        ["North", "120", "4800"],
        ["South", "95", "3610"],
        ["West", "143", "5720"],
    ];
    let data = build_pdf(vec![aligned_table_ops(&rows)]);

    let report = Untable::new()
        .with_strategy(DetectionStrategy::Whitespace)
        .run_bytes("sales.pdf", data)
        .unwrap();

    assert_eq!(report.strategy, "whitespace");
    assert_eq!(report.tables.len(), 1);
    assert_eq!(report.tables[0].columns, vec!["Region", "Units", "Revenue"]);
    assert_eq!(report.tables[0].rows.len(), 3);
    assert_eq!(texts(&report.tables[0].rows[2]), vec!["West", "143", "5720"]);
}

#[test]
fn test_tables_keep_page_order() {
    let pages = ["Ann", "Ben", "Cal", "Dee"]
        .into_iter()
        .map(|name| ruled_table_ops(&[["Name", "Age", "City"], [name, "40", "Oslo"]]))
        .collect();
    let data = build_pdf(pages);

    let report = Untable::new().run_bytes("staff.pdf", data).unwrap();
    assert_eq!(report.pages_processed, 4);
    assert_eq!(report.tables.len(), 4);
    for (i, (record, name)) in report.tables.iter().zip(["Ann", "Ben", "Cal", "Dee"]).enumerate() {
        assert_eq!(record.table_index, i);
        assert_eq!(record.page_index, i as u32 + 1);
        assert_eq!(record.rows[0][0].as_str(), name);
        assert_eq!(record.summary, SummaryOutcome::Skipped);
    }
}

#[test]
fn test_page_without_table_is_reported() {
    let mut prose = Vec::new();
    text_ops(&mut prose, "Quarterly overview", 72.0, 720.0, 14.0);
    let data = build_pdf(vec![prose, ruled_table_ops(&people())]);

    let report = Untable::new().run_bytes("mixed.pdf", data).unwrap();
    assert_eq!(report.pages_without_tables, vec![1]);
    assert_eq!(report.tables.len(), 1);
    assert_eq!(report.tables[0].page_index, 2);
}

#[test]
fn test_summary_failure_only_affects_its_table() {
    let data = build_pdf(vec![
        ruled_table_ops(&people()),
        ruled_table_ops(&[["Name", "Age", "City"], ["Zed", "51", "Rome"]]),
        ruled_table_ops(&people()),
    ]);

    let report = Untable::new()
        .with_summarizer(CountingSummarizer)
        .run_bytes("three.pdf", data)
        .unwrap();

    assert_eq!(report.tables.len(), 3);
    assert_eq!(report.tables[0].summary.text(), Some("2 rows"));
    assert_eq!(
        report.tables[1].summary,
        SummaryOutcome::Failed {
            error: "rate limited".to_string()
        }
    );
    assert_eq!(report.tables[2].summary.text(), Some("2 rows"));
    assert_eq!(report.failed_summaries(), 1);

    let json = render::to_json(&report, JsonFormat::Compact).unwrap();
    assert!(json.contains(r#""summary":{"status":"failed","error":"rate limited"}"#));

    let text = render::report_to_text(&report);
    assert!(text.contains("Summary unavailable: rate limited"));
}

#[test]
fn test_unreadable_document() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"PK\x03\x04 this is a zip, not a pdf").unwrap();

    let result = Untable::new().run(file.path());
    assert!(matches!(result, Err(Error::UnreadableDocument(_))));
}

#[test]
fn test_truncated_pdf_is_unreadable() {
    let data = build_pdf(vec![ruled_table_ops(&people())]);
    let truncated = data[..40].to_vec();

    let result = Untable::new().run_bytes("cut.pdf", truncated);
    assert!(matches!(result, Err(Error::UnreadableDocument(_))));
}

#[test]
fn test_page_selection() {
    let data = build_pdf(vec![
        ruled_table_ops(&people()),
        ruled_table_ops(&[["Name", "Age", "City"], ["Eve", "33", "Nice"]]),
    ]);

    let report = Untable::new()
        .with_pages(PageSelection::parse("2").unwrap())
        .run_bytes("two.pdf", data.clone())
        .unwrap();
    assert_eq!(report.pages_processed, 1);
    assert_eq!(report.tables[0].page_index, 2);
    assert_eq!(report.tables[0].rows[0][0].as_str(), "Eve");

    let result = Untable::new()
        .with_pages(PageSelection::parse("5").unwrap())
        .run_bytes("two.pdf", data);
    assert!(matches!(result, Err(Error::PageOutOfRange(5, 2))));
}
