//! The conversation engine for Paperchat.
//!
//! One turn goes through four steps:
//!
//! 1. **Extract** text from the optional upload
//! 2. **Assemble** system prompt + document + memory + message into one prompt
//! 3. **Generate** a reply through the configured backend, under a timeout
//! 4. **Remember** the exchange, only if generation succeeded
//!
//! Memory belongs to the caller; the engine borrows it for one turn.

pub mod chat;
pub mod context;

pub use chat::{ChatEngine, TurnError, TurnInput, TurnOutcome};
pub use context::{AssemblerOptions, AssemblyError, ContextAssembler, DocumentKind};
