//! Document loading.

use std::io::Read;
use std::path::Path;

use crate::detect::{detect_format_from_bytes, detect_format_from_path};
use crate::error::{Error, Result};
use crate::model::{Document, Page};

use super::backend::{LopdfBackend, PdfBackend};
use super::layout::{LayoutConfig, LayoutExtractor};
use super::options::{ErrorMode, LoadOptions};

/// Loads PDF documents into pages of layout elements.
#[derive(Debug, Clone, Default)]
pub struct DocumentLoader {
    options: LoadOptions,
}

impl DocumentLoader {
    /// Create a loader with the given options.
    pub fn new(options: LoadOptions) -> Self {
        Self { options }
    }

    /// Loader options.
    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// Open and load a PDF file.
    pub fn open<P: AsRef<Path>>(&self, path: P) -> Result<Document> {
        let path = path.as_ref();

        // Verify it's a PDF
        let format = detect_format_from_path(path)?;
        log::debug!("Loading {} (PDF {})", path.display(), format.version);

        let backend = LopdfBackend::load_file(path)?;
        self.load(&backend)
    }

    /// Load a PDF from bytes.
    pub fn from_bytes(&self, data: &[u8]) -> Result<Document> {
        detect_format_from_bytes(data)?;
        let backend = LopdfBackend::load_bytes(data)?;
        self.load(&backend)
    }

    /// Load a PDF from a reader.
    pub fn from_reader<R: Read>(&self, mut reader: R) -> Result<Document> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        self.from_bytes(&data)
    }

    /// Build a document from any backend.
    pub fn load<B: PdfBackend + ?Sized>(&self, backend: &B) -> Result<Document> {
        let mut document = Document::new();
        document.metadata = backend.metadata();

        if document.metadata.encrypted {
            // lopdf 0.34 cannot decrypt; content streams would be garbage.
            return Err(Error::UnreadableDocument(
                "document is encrypted".to_string(),
            ));
        }

        let page_ids = backend.pages();
        let total_pages = page_ids.len() as u32;
        document.metadata.page_count = total_pages;

        if let Some(first) = self.first_missing_page(total_pages) {
            return Err(Error::PageOutOfRange(first, total_pages));
        }

        let extractor = LayoutExtractor::new(
            backend,
            LayoutConfig {
                rule_tolerance: self.options.rule_tolerance,
                max_rule_thickness: self.options.max_rule_thickness,
            },
        );

        for (&page_num, &page_id) in &page_ids {
            if !self.options.pages.includes(page_num) {
                continue;
            }

            match extractor.extract_page(page_num, page_id) {
                Ok(page) => document.add_page(page),
                Err(e) => {
                    if self.options.error_mode == ErrorMode::Strict {
                        return Err(e);
                    }
                    // In lenient mode, keep the page without layout elements
                    log::warn!("Failed to read page {}: {}", page_num, e);
                    let geometry = backend.page_geometry(page_id);
                    let mut page = Page::new(page_num, geometry.width, geometry.height);
                    page.rotation = geometry.rotation;
                    document.add_page(page);
                }
            }
        }

        Ok(document)
    }

    /// First explicitly requested page beyond the end of the document.
    fn first_missing_page(&self, total_pages: u32) -> Option<u32> {
        use super::options::PageSelection;

        match &self.options.pages {
            PageSelection::All => None,
            PageSelection::Range(range) => {
                (*range.start() > total_pages).then_some(*range.start())
            }
            PageSelection::Pages(pages) => pages.iter().copied().find(|&p| p > total_pages),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Metadata;
    use crate::parser::backend::{
        decode_text_simple, BackendFontInfo, ContentOp, PageGeometry, PageId, PdfValue,
    };
    use crate::parser::options::PageSelection;
    use std::collections::BTreeMap;

    /// Three pages; page 2 has an unreadable content stream.
    struct ThreePages;

    impl PdfBackend for ThreePages {
        fn pages(&self) -> BTreeMap<u32, PageId> {
            BTreeMap::from([(1, (1, 0)), (2, (2, 0)), (3, (3, 0))])
        }
        fn metadata(&self) -> Metadata {
            Metadata::with_version("1.7")
        }
        fn page_geometry(&self, _page: PageId) -> PageGeometry {
            PageGeometry::default()
        }
        fn page_fonts(&self, _page: PageId) -> Result<Vec<BackendFontInfo>> {
            Ok(vec![])
        }
        fn page_content(&self, page: PageId) -> Result<Vec<u8>> {
            if page.0 == 2 {
                Err(Error::UnreadableDocument("bad stream".to_string()))
            } else {
                Ok(vec![page.0 as u8])
            }
        }
        fn decode_content(&self, _data: &[u8]) -> Result<Vec<ContentOp>> {
            Ok(vec![
                ContentOp::new("BT", vec![]),
                ContentOp::new("Tj", vec![PdfValue::Str(b"cell".to_vec())]),
                ContentOp::new("ET", vec![]),
            ])
        }
        fn decode_text(&self, _page: PageId, _font: &[u8], bytes: &[u8]) -> String {
            decode_text_simple(bytes)
        }
    }

    #[test]
    fn test_lenient_keeps_broken_page_empty() {
        let doc = DocumentLoader::default().load(&ThreePages).unwrap();
        assert_eq!(doc.page_count(), 3);
        assert!(doc.get_page(2).unwrap().is_empty());
        assert_eq!(doc.get_page(3).unwrap().spans().count(), 1);
        assert_eq!(doc.metadata.page_count, 3);
    }

    #[test]
    fn test_strict_fails_on_broken_page() {
        let loader = DocumentLoader::new(LoadOptions::new().with_error_mode(ErrorMode::Strict));
        assert!(matches!(
            loader.load(&ThreePages),
            Err(Error::UnreadableDocument(_))
        ));
    }

    #[test]
    fn test_page_selection() {
        let loader = DocumentLoader::new(LoadOptions::new().with_pages(PageSelection::Pages(vec![1, 3])));
        let doc = loader.load(&ThreePages).unwrap();
        let numbers: Vec<u32> = doc.pages().iter().map(|p| p.number).collect();
        assert_eq!(numbers, vec![1, 3]);
    }

    #[test]
    fn test_page_out_of_range() {
        let loader = DocumentLoader::new(LoadOptions::new().with_pages(PageSelection::Range(5..=6)));
        assert!(matches!(
            loader.load(&ThreePages),
            Err(Error::PageOutOfRange(5, 3))
        ));
    }

    #[test]
    fn test_from_bytes_rejects_non_pdf() {
        let result = DocumentLoader::default().from_bytes(b"GIF89a not a pdf");
        assert!(matches!(result, Err(Error::UnreadableDocument(_))));
    }
}
