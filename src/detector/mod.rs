//! Table detection.
//!
//! A [`TableDetector`] looks at one page's layout elements and returns the
//! table regions it finds, either as a cell grid or as an HTML `<table>`.
//! The provided [`TableDetector::detect`] turns those regions into
//! [`RawTable`]s, parsing HTML on the way and skipping regions that do not
//! parse.

mod html;
mod lattice;
mod stream;

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::Error;
use crate::model::{Page, RawTable, RegionContent, TableRegion};

pub use html::{parse_html_table, write_html_table, HtmlCell};
pub(crate) use html::escape_html;
pub use lattice::{LatticeConfig, LatticeDetector};
pub use stream::{StreamConfig, StreamDetector};

/// Finds table regions on a page.
pub trait TableDetector: Send + Sync {
    /// Short strategy name for diagnostics.
    fn name(&self) -> &'static str;

    /// Find candidate table regions, top to bottom.
    fn find_regions(&self, page: &Page) -> Vec<TableRegion>;

    /// Detect tables on a page.
    ///
    /// Returns an empty `Vec` when the page has no tables.
    fn detect(&self, page: &Page) -> Vec<RawTable> {
        self.detect_with_stats(page).0
    }

    /// Detect tables and also report how many regions were skipped because
    /// their content could not be parsed.
    fn detect_with_stats(&self, page: &Page) -> (Vec<RawTable>, usize) {
        let regions = self.find_regions(page);
        let mut tables = Vec::with_capacity(regions.len());
        let mut skipped = 0;

        for (idx, region) in regions.into_iter().enumerate() {
            match region_to_rows(region) {
                Ok(rows) => {
                    log::info!(
                        "Table {} extracted from page {} ({} rows)",
                        idx + 1,
                        page.number,
                        rows.len()
                    );
                    tables.push(RawTable::new(page.number, tables.len(), rows));
                }
                Err(e) => {
                    skipped += 1;
                    log::warn!(
                        "Failed to parse table {} on page {}: {}",
                        idx + 1,
                        page.number,
                        e
                    );
                }
            }
        }

        if tables.is_empty() {
            log::info!("No tables found on page {} ({})", page.number, self.name());
        }

        (tables, skipped)
    }
}

fn region_to_rows(region: TableRegion) -> crate::error::Result<Vec<Vec<crate::model::CellValue>>> {
    match region.content {
        RegionContent::Grid(rows) => Ok(rows),
        RegionContent::Html(html) => parse_html_table(&html),
    }
}

/// Detection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionStrategy {
    /// Ruling-line grids with HTML serialization; strict text alignment
    /// fallback on pages without rules
    #[default]
    LayoutInference,
    /// Text alignment only; works without ruling lines
    Whitespace,
}

impl DetectionStrategy {
    /// Strategy name as used in reports and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionStrategy::LayoutInference => "layout",
            DetectionStrategy::Whitespace => "whitespace",
        }
    }
}

impl fmt::Display for DetectionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetectionStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "layout" | "layout_inference" | "lattice" | "hi_res" => {
                Ok(DetectionStrategy::LayoutInference)
            }
            "whitespace" | "stream" | "text" => Ok(DetectionStrategy::Whitespace),
            other => Err(Error::Config(format!("unknown detection strategy: {}", other))),
        }
    }
}

/// Configuration for both detectors.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub stream: StreamConfig,
    pub lattice: LatticeConfig,
}

/// Build the detector for a strategy.
pub fn create_detector(
    strategy: DetectionStrategy,
    config: &DetectorConfig,
) -> Box<dyn TableDetector> {
    match strategy {
        DetectionStrategy::LayoutInference => Box::new(LatticeDetector::with_config(
            config.lattice.clone(),
            config.stream.strict(),
        )),
        DetectionStrategy::Whitespace => Box::new(StreamDetector::with_config(config.stream.clone())),
    }
}
