//! Format dispatch for uploads.

use crate::pdf::PdfExtractor;
use crate::text::TextExtractor;
use paperchat_core::{DocumentError, DocumentExtractor};
use tracing::debug;

/// Picks an extractor by magic bytes first, then by file extension.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentReader {
    pdf: PdfExtractor,
    text: TextExtractor,
}

impl DocumentReader {
    pub fn new() -> Self {
        Self::default()
    }

    fn select(&self, file_name: &str, bytes: &[u8]) -> Option<&dyn DocumentExtractor> {
        if PdfExtractor::sniff(bytes) {
            return Some(&self.pdf);
        }
        if TextExtractor::handles(file_name) {
            return Some(&self.text);
        }
        None
    }
}

impl DocumentExtractor for DocumentReader {
    fn name(&self) -> &str {
        "reader"
    }

    fn extract_text(&self, file_name: &str, bytes: &[u8]) -> Result<String, DocumentError> {
        let Some(extractor) = self.select(file_name, bytes) else {
            return Err(DocumentError::UnsupportedFormat(format!(
                "{file_name}: only PDF and plain-text files are supported"
            )));
        };
        debug!(file = file_name, extractor = extractor.name(), bytes = bytes.len(), "Extracting document");
        extractor.extract_text(file_name, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_files_go_to_text_extractor() {
        let reader = DocumentReader::new();
        assert_eq!(reader.extract_text("a.txt", b"plain").unwrap(), "plain");
    }

    #[test]
    fn pdf_header_wins_over_extension() {
        let reader = DocumentReader::new();
        let chosen = reader.select("mislabelled.txt", b"%PDF-1.4 ...").unwrap();
        assert_eq!(chosen.name(), "pdf");
    }

    #[test]
    fn pdf_extension_without_header_is_unsupported() {
        let err = DocumentReader::new()
            .extract_text("fake.pdf", b"not really a pdf")
            .unwrap_err();
        assert!(matches!(err, DocumentError::UnsupportedFormat(_)));
    }

    #[test]
    fn unknown_formats_are_unsupported() {
        let err = DocumentReader::new()
            .extract_text("photo.png", b"\x89PNG\r\n")
            .unwrap_err();
        assert!(matches!(err, DocumentError::UnsupportedFormat(_)));
    }
}
