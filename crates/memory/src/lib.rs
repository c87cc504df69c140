//! Conversation memory for Paperchat.
//!
//! [`ConversationMemory`] is the bounded rolling window of exchanges kept for
//! one session. [`SessionStore`] owns one window per session.

pub mod sessions;
pub mod window;

pub use sessions::{SessionStore, SharedMemory};
pub use window::{ConversationMemory, MemoryStats, DEFAULT_MAX_MESSAGES};
