//! # Paperchat Core
//!
//! Domain types, traits, and error definitions for Paperchat, a chat
//! front-end that answers questions about uploaded documents.
//! This crate has **zero framework dependencies**: it defines the domain
//! model that every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here. Implementations live in
//! their respective crates:
//! - [`GenerationBackend`] is implemented by `paperchat-providers`
//! - [`DocumentExtractor`] is implemented by `paperchat-documents`
//!
//! Tests swap in mock implementations without touching the network or disk.

pub mod backend;
pub mod document;
pub mod error;
pub mod exchange;

// Re-export key types at crate root for ergonomics
pub use backend::{GenerationBackend, GenerationRequest, GenerationResponse, Usage};
pub use document::{Attachment, DocumentContext, DocumentExtractor};
pub use error::{BackendError, DocumentError, Error, Result};
pub use exchange::{Exchange, Role, SessionId};
