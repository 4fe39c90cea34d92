//! Data model for table extraction.
//!
//! Pages carry positioned layout elements, detectors turn them into ragged
//! [`RawTable`]s, and the normalizer produces rectangular
//! [`NormalizedTable`]s that end up in an [`ExtractionReport`].

mod cell;
mod document;
mod page;
mod record;
mod table;

pub use cell::CellValue;
pub use document::{Document, Metadata};
pub use page::{
    estimate_width, BoundingBox, LayoutElement, Orientation, Page, RegionContent, RulingLine,
    TableRegion, TextSpan,
};
pub use record::{ExtractionReport, SummaryOutcome, TableRecord};
pub use table::{NormalizedTable, RawTable};
