//! PDF parsing module.

mod backend;
mod layout;
mod loader;
mod options;

pub use backend::{
    decode_text_simple, BackendFontInfo, ContentOp, LopdfBackend, PageGeometry, PageId, PdfBackend,
    PdfValue,
};
pub use layout::{LayoutConfig, LayoutExtractor};
pub use loader::DocumentLoader;
pub use options::{ErrorMode, LoadOptions, PageSelection};
