//! Turn orchestration.
//!
//! [`ChatEngine::handle_turn`] runs one user turn against a session's memory.
//! Memory is only written after the backend has answered, so a failed,
//! timed-out or cancelled turn leaves it exactly as it was.

use crate::context::assembler::{AssemblerOptions, AssemblyError, ContextAssembler};
use crate::context::token;
use paperchat_config::AppConfig;
use paperchat_core::{
    Attachment, BackendError, DocumentContext, DocumentExtractor, Exchange, GenerationBackend,
    GenerationRequest, Usage,
};
use paperchat_memory::{ConversationMemory, MemoryStats};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default caller-level timeout for one backend call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// What the user sent this turn.
#[derive(Debug, Clone)]
pub struct TurnInput {
    pub message: String,
    pub attachment: Option<Attachment>,
}

impl TurnInput {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            attachment: None,
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }
}

/// Result of a successful turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The model's reply
    pub reply: String,
    /// Recoverable problems the user should see (e.g. an unreadable upload)
    pub warnings: Vec<String>,
    /// Source name of the document used this turn, if any
    pub document: Option<String>,
    /// Memory usage after the turn
    pub stats: MemoryStats,
    /// Token usage reported by the backend
    pub usage: Option<Usage>,
}

/// Why a turn ended without a reply.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TurnError {
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] AssemblyError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl TurnError {
    /// Whether retrying the same turn may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::InvalidInput(_) => false,
            Self::Backend(e) => e.is_transient(),
        }
    }
}

/// Runs turns: extraction, assembly, generation, memory update.
pub struct ChatEngine {
    backend: Arc<dyn GenerationBackend>,
    extractor: Arc<dyn DocumentExtractor>,
    assembler: ContextAssembler,
    model: String,
    system_prompt: String,
    temperature: f32,
    max_tokens: Option<u32>,
    timeout: Duration,
}

impl ChatEngine {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        extractor: Arc<dyn DocumentExtractor>,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            extractor,
            assembler: ContextAssembler::default(),
            model: model.into(),
            system_prompt: system_prompt.into(),
            temperature: 0.7,
            max_tokens: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Build an engine with every tunable taken from `config`.
    pub fn from_config(
        config: &AppConfig,
        backend: Arc<dyn GenerationBackend>,
        extractor: Arc<dyn DocumentExtractor>,
    ) -> Self {
        Self::new(backend, extractor, &config.model_name, &config.system_prompt)
            .with_temperature(config.temperature)
            .with_max_tokens(config.max_output_tokens)
            .with_timeout(config.request_timeout())
            .with_assembler(ContextAssembler::new(AssemblerOptions {
                max_document_chars: config.document_char_limit(),
                document_guidance: config.documents.guidance,
            }))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_assembler(mut self, assembler: ContextAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Run one turn against `memory`.
    ///
    /// On success the user message and the reply are appended, in that
    /// order. On any error `memory` is untouched.
    pub async fn handle_turn(
        &self,
        memory: &mut ConversationMemory,
        input: TurnInput,
    ) -> Result<TurnOutcome, TurnError> {
        let TurnInput {
            message,
            attachment,
        } = input;

        if message.trim().is_empty() {
            return Err(AssemblyError::EmptyUserMessage.into());
        }

        let mut warnings = Vec::new();
        let document = match attachment {
            Some(attachment) => self.extract(attachment, &mut warnings).await,
            None => None,
        };

        let history = memory.get_all();
        let prompt =
            self.assembler
                .build_prompt(&self.system_prompt, &history, document.as_ref(), &message)?;

        let mut request = GenerationRequest::new(&self.model, prompt);
        request.temperature = self.temperature;
        request.max_tokens = self.max_tokens;

        debug!(
            backend = self.backend.name(),
            model = %self.model,
            prompt_tokens = token::estimate_tokens(&request.prompt),
            history = history.len(),
            "Calling generation backend"
        );

        let response = match tokio::time::timeout(self.timeout, self.backend.generate(request)).await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(backend = self.backend.name(), error = %e, kind = e.kind(), "Generation failed");
                return Err(e.into());
            }
            Err(_) => {
                warn!(
                    backend = self.backend.name(),
                    timeout_secs = self.timeout.as_secs(),
                    "Generation timed out"
                );
                return Err(BackendError::Timeout(format!(
                    "no response within {}s",
                    self.timeout.as_secs()
                ))
                .into());
            }
        };

        memory.append(Exchange::user(message));
        memory.append(Exchange::assistant(response.text.clone()));

        let stats = memory.stats();
        info!(
            model = %response.model,
            reply_chars = response.text.chars().count(),
            memory = stats.current_messages,
            "Turn complete"
        );

        Ok(TurnOutcome {
            reply: response.text,
            warnings,
            document: document.map(|d| d.source_name),
            stats,
            usage: response.usage,
        })
    }

    /// Extract an attachment off the async executor. Failures become warnings.
    async fn extract(
        &self,
        attachment: Attachment,
        warnings: &mut Vec<String>,
    ) -> Option<DocumentContext> {
        let extractor = Arc::clone(&self.extractor);
        let file_name = attachment.file_name.clone();

        let result = tokio::task::spawn_blocking(move || {
            extractor
                .extract_text(&attachment.file_name, &attachment.bytes)
                .map(|text| DocumentContext::new(attachment.file_name, text))
        })
        .await;

        match result {
            Ok(Ok(doc)) => {
                debug!(file = %file_name, chars = doc.char_count(), "Document extracted");
                Some(doc)
            }
            Ok(Err(e)) => {
                warn!(file = %file_name, error = %e, "Continuing without document");
                warnings.push(format!("Could not read {file_name}: {e}"));
                None
            }
            Err(e) => {
                warn!(file = %file_name, error = %e, "Extraction task failed");
                warnings.push(format!("Could not read {file_name}: extraction failed"));
                None
            }
        }
    }
}
