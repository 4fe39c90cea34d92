//! End-to-end extraction: load, detect, normalize, summarize.

use std::path::{Path, PathBuf};

use chrono::Utc;
use rayon::prelude::*;
use serde::Deserialize;
use uuid::Uuid;

use crate::detector::{create_detector, DetectionStrategy, DetectorConfig, TableDetector};
use crate::error::{Error, Result};
use crate::model::{Document, ExtractionReport, NormalizedTable, RawTable, SummaryOutcome, TableRecord};
use crate::normalize::{NormalizeOptions, Normalizer};
use crate::parser::{DocumentLoader, LoadOptions};
use crate::render::{render_table, TableFormat};
use crate::summarize::Summarizer;

/// Where the document of an invocation comes from.
#[derive(Debug, Clone)]
pub enum DocumentSource {
    /// A file on disk
    Path(PathBuf),
    /// An in-memory upload
    Bytes { name: String, data: Vec<u8> },
}

impl DocumentSource {
    /// Label used in reports: the file name, or the upload name.
    pub fn label(&self) -> String {
        match self {
            DocumentSource::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            DocumentSource::Bytes { name, .. } => name.clone(),
        }
    }
}

/// One extraction request. Owns its input; nothing outlives it.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub id: Uuid,
    pub source: DocumentSource,
}

impl Invocation {
    /// Invocation for a file on disk.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: DocumentSource::Path(path.as_ref().to_path_buf()),
        }
    }

    /// Invocation for an in-memory document.
    pub fn from_bytes(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: DocumentSource::Bytes {
                name: name.into(),
                data,
            },
        }
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Detection strategy
    pub strategy: DetectionStrategy,

    /// Detector tuning
    pub detector: DetectorConfig,

    /// Normalization rules
    pub normalize: NormalizeOptions,

    /// Loading options
    pub load: LoadOptions,

    /// Table rendering sent to the summarizer
    pub summary_format: TableFormat,

    /// Detect pages in parallel
    pub parallel: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            strategy: DetectionStrategy::default(),
            detector: DetectorConfig::default(),
            normalize: NormalizeOptions::default(),
            load: LoadOptions::default(),
            summary_format: TableFormat::Plain,
            parallel: true,
        }
    }
}

impl PipelineOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read options from a TOML file.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Set the detection strategy.
    pub fn with_strategy(mut self, strategy: DetectionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set normalization rules.
    pub fn with_normalize(mut self, normalize: NormalizeOptions) -> Self {
        self.normalize = normalize;
        self
    }

    /// Set loading options.
    pub fn with_load(mut self, load: LoadOptions) -> Self {
        self.load = load;
        self
    }

    /// Set the rendering used for summaries.
    pub fn with_summary_format(mut self, format: TableFormat) -> Self {
        self.summary_format = format;
        self
    }

    /// Process pages one after another.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

/// Progress notifications emitted by [`Pipeline::run_with_progress`].
#[derive(Debug)]
pub enum Progress<'a> {
    /// The document loaded with this many pages
    Loaded { pages: u32 },
    /// Detection and normalization finished
    TablesFound(usize),
    /// A table finished, summary included
    TableDone(&'a TableRecord),
}

/// Tables of a document before summarization.
#[derive(Debug, Default)]
pub struct Extraction {
    /// Normalized tables with their page numbers, in document order
    pub tables: Vec<(u32, NormalizedTable)>,

    /// Pages that produced no table
    pub pages_without_tables: Vec<u32>,

    /// Regions that could not be parsed
    pub regions_skipped: usize,
}

/// Table extraction pipeline.
pub struct Pipeline {
    options: PipelineOptions,
    detector: Box<dyn TableDetector>,
    normalizer: Normalizer,
    summarizer: Option<Box<dyn Summarizer>>,
}

impl Pipeline {
    /// Build a pipeline without a summarizer.
    pub fn new(options: PipelineOptions) -> Self {
        let detector = create_detector(options.strategy, &options.detector);
        let normalizer = Normalizer::with_options(options.normalize.clone());
        Self {
            options,
            detector,
            normalizer,
            summarizer: None,
        }
    }

    /// Summarize every extracted table with `summarizer`.
    pub fn with_summarizer(mut self, summarizer: Box<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    /// Options in use.
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Run one invocation.
    pub fn run(&self, invocation: &Invocation) -> Result<ExtractionReport> {
        self.run_with_progress(invocation, &mut |_| {})
    }

    /// Run one invocation, reporting progress.
    ///
    /// Fails only when the document cannot be loaded; per-table problems
    /// end up in the report.
    pub fn run_with_progress(
        &self,
        invocation: &Invocation,
        on_progress: &mut dyn FnMut(Progress<'_>),
    ) -> Result<ExtractionReport> {
        let source = invocation.source.label();
        log::info!("Invocation {} started for {}", invocation.id, source);

        let document = self.load(&invocation.source)?;
        log::info!("PDF loaded: {} pages", document.page_count());
        on_progress(Progress::Loaded {
            pages: document.page_count(),
        });

        let extraction = self.extract_detailed(&document);
        if extraction.tables.is_empty() {
            log::info!("No tables found in {}", source);
        }
        on_progress(Progress::TablesFound(extraction.tables.len()));

        let mut records = Vec::with_capacity(extraction.tables.len());
        for (table_index, (page, table)) in extraction.tables.into_iter().enumerate() {
            let summary = self.summarize(table_index, &table);
            let record = TableRecord::new(table_index, page, table, summary);
            on_progress(Progress::TableDone(&record));
            records.push(record);
        }

        Ok(ExtractionReport {
            invocation_id: invocation.id,
            source,
            strategy: self.options.strategy.as_str().to_string(),
            pages_processed: document.page_count(),
            pages_without_tables: extraction.pages_without_tables,
            tables_skipped: extraction.regions_skipped,
            tables: records,
            generated_at: Utc::now(),
        })
    }

    /// Detect and normalize every table of a loaded document.
    pub fn extract(&self, document: &Document) -> Vec<(u32, NormalizedTable)> {
        self.extract_detailed(document).tables
    }

    /// Like [`Pipeline::extract`], with per-page diagnostics.
    pub fn extract_detailed(&self, document: &Document) -> Extraction {
        let detect = |page: &crate::model::Page| {
            let (raw, skipped) = self.detector.detect_with_stats(page);
            (page.number, raw, skipped)
        };

        // Collecting an indexed parallel iterator keeps page order
        let detected: Vec<(u32, Vec<RawTable>, usize)> = if self.options.parallel {
            document.pages().par_iter().map(detect).collect()
        } else {
            document.pages().iter().map(detect).collect()
        };

        let mut extraction = Extraction::default();
        for (page, raw_tables, skipped) in detected {
            extraction.regions_skipped += skipped;

            let before = extraction.tables.len();
            for raw in &raw_tables {
                match self.normalizer.normalize(raw) {
                    Some(table) => {
                        log::info!(
                            "Table {} extracted successfully",
                            extraction.tables.len() + 1
                        );
                        extraction.tables.push((page, table));
                    }
                    None => log::debug!(
                        "Dropped empty table {} on page {}",
                        raw.index_on_page + 1,
                        page
                    ),
                }
            }

            if extraction.tables.len() == before {
                extraction.pages_without_tables.push(page);
            }
        }

        extraction
    }

    fn load(&self, source: &DocumentSource) -> Result<Document> {
        let loader = DocumentLoader::new(self.options.load.clone());
        match source {
            DocumentSource::Path(path) => loader.open(path),
            DocumentSource::Bytes { data, .. } => loader.from_bytes(data),
        }
    }

    fn summarize(&self, table_index: usize, table: &NormalizedTable) -> SummaryOutcome {
        let Some(summarizer) = &self.summarizer else {
            return SummaryOutcome::Skipped;
        };

        let outcome = render_table(table, self.options.summary_format)
            .and_then(|text| summarizer.summarize(&text));

        match outcome {
            Ok(text) => SummaryOutcome::Ok { text },
            Err(e) => {
                log::warn!("Summary failed for table {}: {}", table_index + 1, e);
                SummaryOutcome::Failed {
                    error: summary_error(e),
                }
            }
        }
    }
}

fn summary_error(e: Error) -> String {
    match e {
        Error::SummarizationUnavailable(msg) => msg,
        other => other.to_string(),
    }
}
