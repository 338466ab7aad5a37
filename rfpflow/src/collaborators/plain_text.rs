//! Extractor for plain-text request documents.

use super::{DocumentExtractor, ExtractedDocument};
use crate::errors::ExtractionError;
use async_trait::async_trait;
use std::path::Path;

const SUPPORTED_EXTENSIONS: [&str; 3] = ["txt", "md", "text"];

/// Reads `.txt` and `.md` requests from disk.
///
/// Plain text carries no OCR layer and no tables, so both come back empty.
/// Anything else (PDF, Office formats) needs a dedicated extractor.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    /// Creates a new extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn is_supported(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                SUPPORTED_EXTENSIONS
                    .iter()
                    .any(|supported| supported.eq_ignore_ascii_case(ext))
            })
    }
}

#[async_trait]
impl DocumentExtractor for PlainTextExtractor {
    async fn extract(&self, path: &Path) -> Result<ExtractedDocument, ExtractionError> {
        if !Self::is_supported(path) {
            return Err(ExtractionError::unsupported(path));
        }

        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ExtractionError::unreadable(path, e.to_string()))?;

        if text.trim().is_empty() {
            return Err(ExtractionError::Empty {
                path: path.to_path_buf(),
            });
        }

        Ok(ExtractedDocument {
            text,
            ocr_text: String::new(),
            tables: Vec::new(),
        })
    }
}
