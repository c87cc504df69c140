//! Document text extraction for Paperchat.
//!
//! [`DocumentReader`] is the extractor the chat engine uses. It sniffs the
//! upload and hands it to [`PdfExtractor`] or [`TextExtractor`].

pub mod pdf;
pub mod reader;
pub mod text;

pub use pdf::PdfExtractor;
pub use reader::DocumentReader;
pub use text::TextExtractor;
