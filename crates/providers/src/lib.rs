//! Generation backends for Paperchat.
//!
//! All backends implement `paperchat_core::GenerationBackend`.
//! [`build_from_config`] picks one from configuration.

pub mod openai_compat;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use router::{build_from_config, default_base_url};
