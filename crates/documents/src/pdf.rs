//! PDF text extraction backed by lopdf.

use lopdf::Document;
use paperchat_core::{DocumentError, DocumentExtractor};
use tracing::debug;

/// Every PDF starts with this header.
pub const PDF_MAGIC: &[u8] = b"%PDF-";

/// Extracts text page by page, marking each page with `--- Page N ---`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

impl PdfExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Whether `bytes` look like a PDF.
    pub fn sniff(bytes: &[u8]) -> bool {
        bytes.starts_with(PDF_MAGIC)
    }
}

impl DocumentExtractor for PdfExtractor {
    fn name(&self) -> &str {
        "pdf"
    }

    fn extract_text(&self, file_name: &str, bytes: &[u8]) -> Result<String, DocumentError> {
        if !Self::sniff(bytes) {
            return Err(DocumentError::UnsupportedFormat(format!(
                "{file_name} is not a PDF"
            )));
        }

        let doc = Document::load_mem(bytes).map_err(|e| DocumentError::Extraction {
            name: file_name.to_string(),
            reason: e.to_string(),
        })?;

        if doc.is_encrypted() {
            return Err(DocumentError::Encrypted(file_name.to_string()));
        }

        let pages = doc.get_pages();
        if pages.is_empty() {
            return Err(DocumentError::Empty(file_name.to_string()));
        }

        let mut sections = Vec::with_capacity(pages.len());
        for page_num in pages.keys() {
            match doc.extract_text(&[*page_num]) {
                Ok(text) => {
                    let text = text.trim();
                    if !text.is_empty() {
                        sections.push(format!("--- Page {page_num} ---\n{text}"));
                    }
                }
                Err(e) => {
                    debug!(file = file_name, page = page_num, error = %e, "Skipping page without extractable text");
                }
            }
        }

        if sections.is_empty() {
            return Err(DocumentError::Empty(file_name.to_string()));
        }

        debug!(
            file = file_name,
            pages = pages.len(),
            pages_with_text = sections.len(),
            "Extracted PDF text"
        );
        Ok(sections.join("\n\n"))
    }
}
