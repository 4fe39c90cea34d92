//! # untable
//!
//! Table extraction and summarization for PDF documents.
//!
//! Pages are interpreted into positioned text and ruling lines, tables are
//! detected either from ruled grids or from text alignment, normalized into
//! rectangular tables with a header row, and optionally summarized by a
//! chat-completions endpoint.
//!
//! ## Quick Start
//!
//! ```no_run
//! use untable::{extract_tables, render};
//!
//! fn main() -> untable::Result<()> {
//!     for (page, table) in extract_tables("report.pdf")? {
//!         println!("Page {}:\n{}\n", page, render::to_plain(&table));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Two detection strategies**: ruled-grid inference with merged cells, and whitespace alignment
//! - **Normalization**: header promotion, sparse-header dropping, unique column names
//! - **Summaries**: any OpenAI/Mistral-compatible endpoint, failures recorded per table
//! - **Parallel processing**: Uses Rayon for multi-page documents
//! - **Output formats**: plain text, Markdown, CSV, HTML, JSON reports

pub mod detect;
pub mod detector;
pub mod error;
pub mod model;
pub mod normalize;
pub mod parser;
pub mod pipeline;
pub mod render;
pub mod summarize;

// Re-export commonly used types
pub use detect::{detect_format_from_bytes, detect_format_from_path, is_pdf_bytes, PdfFormat};
pub use detector::{create_detector, DetectionStrategy, DetectorConfig, TableDetector};
pub use error::{Error, Result};
pub use model::{
    CellValue, Document, ExtractionReport, Metadata, NormalizedTable, Page, RawTable,
    SummaryOutcome, TableRecord,
};
pub use normalize::{NormalizeOptions, Normalizer};
pub use parser::{DocumentLoader, ErrorMode, LoadOptions, PageSelection};
pub use pipeline::{DocumentSource, Invocation, Pipeline, PipelineOptions, Progress};
pub use render::{JsonFormat, TableFormat};
pub use summarize::{ChatCompletionsSummarizer, Summarizer, SummarizerConfig};

use std::path::Path;

/// Load a PDF file into positioned page layouts.
///
/// # Example
///
/// ```no_run
/// let doc = untable::load_file("report.pdf").unwrap();
/// println!("Pages: {}", doc.page_count());
/// ```
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Document> {
    DocumentLoader::default().open(path)
}

/// Load a PDF from bytes.
pub fn load_bytes(data: &[u8]) -> Result<Document> {
    DocumentLoader::default().from_bytes(data)
}

/// Extract every table of a PDF file with default options.
///
/// Returns `(page number, table)` pairs in document order.
pub fn extract_tables<P: AsRef<Path>>(path: P) -> Result<Vec<(u32, NormalizedTable)>> {
    let doc = load_file(path)?;
    Ok(Pipeline::new(PipelineOptions::default()).extract(&doc))
}

/// Extract every table of an in-memory PDF with default options.
pub fn extract_tables_from_bytes(data: &[u8]) -> Result<Vec<(u32, NormalizedTable)>> {
    let doc = load_bytes(data)?;
    Ok(Pipeline::new(PipelineOptions::default()).extract(&doc))
}

/// Builder for one-off extractions.
///
/// # Example
///
/// ```no_run
/// use untable::{DetectionStrategy, Untable};
///
/// let report = Untable::new()
///     .with_strategy(DetectionStrategy::Whitespace)
///     .sequential()
///     .run("report.pdf")?;
/// println!("{} tables", report.tables.len());
/// # Ok::<(), untable::Error>(())
/// ```
pub struct Untable {
    options: PipelineOptions,
    summarizer: Option<Box<dyn Summarizer>>,
}

impl Untable {
    /// Create a builder with default options.
    pub fn new() -> Self {
        Self {
            options: PipelineOptions::default(),
            summarizer: None,
        }
    }

    /// Replace all options.
    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the detection strategy.
    pub fn with_strategy(mut self, strategy: DetectionStrategy) -> Self {
        self.options.strategy = strategy;
        self
    }

    /// Set page selection.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.options.load = self.options.load.with_pages(pages);
        self
    }

    /// Set the sparse-header ratio.
    pub fn with_header_ratio(mut self, ratio: f32) -> Self {
        self.options.normalize = self.options.normalize.with_sparse_header_ratio(ratio);
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.options.parallel = false;
        self
    }

    /// Summarize tables with `summarizer`.
    pub fn with_summarizer(mut self, summarizer: impl Summarizer + 'static) -> Self {
        self.summarizer = Some(Box::new(summarizer));
        self
    }

    /// Build the pipeline.
    pub fn build(self) -> Pipeline {
        let pipeline = Pipeline::new(self.options);
        match self.summarizer {
            Some(summarizer) => pipeline.with_summarizer(summarizer),
            None => pipeline,
        }
    }

    /// Run on a PDF file.
    pub fn run<P: AsRef<Path>>(self, path: P) -> Result<ExtractionReport> {
        let invocation = Invocation::from_path(path);
        self.build().run(&invocation)
    }

    /// Run on an in-memory PDF.
    pub fn run_bytes(self, name: impl Into<String>, data: Vec<u8>) -> Result<ExtractionReport> {
        let invocation = Invocation::from_bytes(name, data);
        self.build().run(&invocation)
    }
}

impl Default for Untable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untable_builder() {
        let builder = Untable::new()
            .with_strategy(DetectionStrategy::Whitespace)
            .with_header_ratio(0.8)
            .with_pages(PageSelection::Range(1..=5))
            .sequential();

        assert_eq!(builder.options.strategy, DetectionStrategy::Whitespace);
        assert_eq!(builder.options.normalize.sparse_header_ratio, 0.8);
        assert!(builder.options.load.pages.includes(5));
        assert!(!builder.options.load.pages.includes(6));
        assert!(!builder.options.parallel);
    }

    #[test]
    fn test_untable_builder_default() {
        let builder = Untable::default();
        assert_eq!(builder.options.strategy, DetectionStrategy::LayoutInference);
        assert!(builder.options.parallel);
        assert!(builder.summarizer.is_none());
    }

    #[test]
    fn test_load_bytes_empty_data() {
        assert!(matches!(load_bytes(&[]), Err(Error::UnreadableDocument(_))));
    }

    #[test]
    fn test_load_bytes_unknown_magic() {
        let data = [0xFF, 0xFE, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
        assert!(load_bytes(&data).is_err());
    }

    #[test]
    fn test_extract_tables_from_html_bytes() {
        let result = extract_tables_from_bytes(b"<!DOCTYPE html><html></html>");
        assert!(matches!(result, Err(Error::UnreadableDocument(_))));
    }

    #[test]
    fn test_run_bytes_invalid() {
        let result = Untable::new().run_bytes("upload.pdf", b"not a pdf".to_vec());
        assert!(result.is_err());
    }
}
