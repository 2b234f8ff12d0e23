use std::path::Path;

use lopdf::{Dictionary, Document, Object};

use crate::error::ProcessError;
use crate::processor::{DocumentInfo, TextExtractor};

/// Text extraction for PDFs with an embedded text layer, via lopdf.
#[derive(Debug, Default, Clone)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extracts text page by page. Pages whose content cannot be decoded
    /// yield an empty string rather than aborting the document.
    pub fn extract_pages(&self, path: &Path) -> Result<Vec<String>, ProcessError> {
        let _span = tracing::info_span!("processor.pdf").entered();

        let doc = load(path)?;
        let pages = doc
            .get_pages()
            .keys()
            .map(|page_num| match doc.extract_text(&[*page_num]) {
                Ok(text) => text.trim().to_string(),
                Err(e) => {
                    tracing::debug!("Page {} has no extractable text: {}", page_num, e);
                    String::new()
                }
            })
            .collect();
        Ok(pages)
    }

    /// Page count, file size and Info-dictionary metadata.
    pub fn pdf_info(&self, path: &Path) -> Result<DocumentInfo, ProcessError> {
        let size_bytes = std::fs::metadata(path)
            .map_err(|e| ProcessError::ReadDocument {
                path: path.to_path_buf(),
                source: e,
            })?
            .len();
        let doc = load(path)?;
        let info = info_dictionary(&doc);

        Ok(DocumentInfo {
            pages: doc.get_pages().len(),
            size_bytes,
            title: info.and_then(|d| text_entry(d, b"Title")),
            author: info.and_then(|d| text_entry(d, b"Author")),
        })
    }
}

impl TextExtractor for PdfTextExtractor {
    fn extract_text(&self, path: &Path) -> String {
        match self.extract_pages(path) {
            Ok(pages) => pages
                .iter()
                .filter(|p| !p.is_empty())
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join("\n\n"),
            Err(e) => {
                tracing::warn!("Text extraction failed: {}", e);
                String::new()
            }
        }
    }

    fn inspect(&self, path: &Path) -> Option<DocumentInfo> {
        self.pdf_info(path)
            .map_err(|e| tracing::debug!("Could not inspect PDF: {}", e))
            .ok()
    }
}

fn load(path: &Path) -> Result<Document, ProcessError> {
    let bytes = std::fs::read(path).map_err(|e| ProcessError::ReadDocument {
        path: path.to_path_buf(),
        source: e,
    })?;
    Document::load_mem(&bytes)
        .map_err(|e| ProcessError::PdfProcessing(format!("Failed to load PDF: {}", e)))
}

fn info_dictionary(doc: &Document) -> Option<&Dictionary> {
    match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn text_entry(dict: &Dictionary, key: &[u8]) -> Option<String> {
    let bytes = dict.get(key).ok()?.as_str().ok()?;
    let value = String::from_utf8_lossy(bytes).trim().to_string();
    (!value.is_empty()).then_some(value)
}
