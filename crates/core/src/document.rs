//! Document context and the extractor trait.
//!
//! A user may attach one file per turn. An extractor turns its bytes into
//! plain text; the text then travels to the prompt as a [`DocumentContext`].

use serde::{Deserialize, Serialize};
use crate::error::DocumentError;

/// A raw file uploaded alongside a message.
#[derive(Debug, Clone)]
pub struct Attachment {
    /// Original file name as supplied by the client
    pub file_name: String,

    /// File contents
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Extracted document text for a single turn. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentContext {
    /// Where the text came from (usually the upload's file name)
    pub source_name: String,

    /// The extracted text, untruncated
    pub extracted_text: String,
}

impl DocumentContext {
    pub fn new(source_name: impl Into<String>, extracted_text: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            extracted_text: extracted_text.into(),
        }
    }

    /// Number of characters (not bytes) of extracted text.
    pub fn char_count(&self) -> usize {
        self.extracted_text.chars().count()
    }
}

/// Turns uploaded bytes into plain text.
///
/// Extraction is CPU-bound and synchronous; async callers should run it on a
/// blocking thread.
pub trait DocumentExtractor: Send + Sync {
    /// A human-readable name for this extractor (e.g., "pdf", "text").
    fn name(&self) -> &str;

    /// Extract the text content of `bytes`. `file_name` is used for format
    /// hints and error messages only.
    fn extract_text(&self, file_name: &str, bytes: &[u8]) -> Result<String, DocumentError>;
}
