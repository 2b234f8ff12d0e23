pub mod pdf;

use std::path::Path;

use serde::Serialize;

pub use pdf::PdfTextExtractor;

/// Basic facts about a stored document, used for logging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentInfo {
    pub pages: usize,
    pub size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

/// Turns a stored document into plain text.
///
/// Extraction never fails outright: unreadable or image-only documents
/// produce an empty string, and callers decide what empty text means.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, path: &Path) -> String;

    /// Optional document facts. Implementations that cannot inspect return `None`.
    fn inspect(&self, _path: &Path) -> Option<DocumentInfo> {
        None
    }
}
