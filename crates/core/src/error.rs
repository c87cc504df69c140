//! Error types for the Paperchat domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each collaborator has its own error enum; [`Error`] is what server
//! startup reports.

use thiserror::Error;

/// Errors that stop the server from starting or keep it from serving.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Collaborator errors ---

/// Failures reported by a generation backend.
///
/// Callers decide what to do with a failure by asking [`BackendError::is_transient`]:
/// transient failures may succeed if the user simply tries again, fatal ones
/// (bad credentials, exhausted quota, unknown model) will not.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by backend, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response from backend: {0}")]
    InvalidResponse(String),

    #[error("Backend not configured: {0}")]
    NotConfigured(String),
}

impl BackendError {
    /// Whether the same request may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Timeout(_) | Self::Network(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            Self::AuthenticationFailed(_)
            | Self::QuotaExceeded(_)
            | Self::ModelNotFound(_)
            | Self::InvalidResponse(_)
            | Self::NotConfigured(_) => false,
        }
    }

    /// Short label used in API responses and logs.
    pub fn kind(&self) -> &'static str {
        if self.is_transient() {
            "transient"
        } else {
            "fatal"
        }
    }
}

/// Failures while turning uploaded bytes into text.
#[derive(Debug, Clone, Error)]
pub enum DocumentError {
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("Document is encrypted and cannot be read: {0}")]
    Encrypted(String),

    #[error("No extractable text found in {0}")]
    Empty(String),

    #[error("Failed to extract text from {name}: {reason}")]
    Extraction { name: String, reason: String },
}
