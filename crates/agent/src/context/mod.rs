//! Prompt assembly.
//!
//! The assembled prompt is plain text with up to four parts, always in this
//! order:
//!
//! | Part | Present when |
//! |------|--------------|
//! | System prompt | always |
//! | Document section | a document was extracted this turn |
//! | Previous conversation | memory is non-empty |
//! | `User: {message}` | always |

pub mod assembler;
pub mod guidance;
pub mod token;

pub use assembler::{AssemblerOptions, AssemblyError, ContextAssembler};
pub use guidance::DocumentKind;
