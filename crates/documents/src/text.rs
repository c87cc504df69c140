//! Plain-text uploads (`.txt`, `.md`).

use paperchat_core::{DocumentError, DocumentExtractor};

/// File extensions handled as UTF-8 text.
pub const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "markdown", "text"];

#[derive(Debug, Default, Clone, Copy)]
pub struct TextExtractor;

impl TextExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Whether `file_name` carries a known text extension.
    pub fn handles(file_name: &str) -> bool {
        std::path::Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                TEXT_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            })
    }
}

impl DocumentExtractor for TextExtractor {
    fn name(&self) -> &str {
        "text"
    }

    fn extract_text(&self, file_name: &str, bytes: &[u8]) -> Result<String, DocumentError> {
        let text = std::str::from_utf8(bytes).map_err(|e| DocumentError::Extraction {
            name: file_name.to_string(),
            reason: format!("not valid UTF-8: {e}"),
        })?;

        // Strip a UTF-8 byte order mark if present
        let text = text.strip_prefix('\u{feff}').unwrap_or(text).trim();
        if text.is_empty() {
            return Err(DocumentError::Empty(file_name.to_string()));
        }
        Ok(text.to_string())
    }
}
