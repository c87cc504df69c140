//! Context assembly: one deterministic prompt per turn.
//!
//! The assembler is pure. It reads the system prompt, the memory snapshot,
//! the optional document and the user's message, and returns a string. No
//! clock, no randomness, no I/O. Identical inputs give identical prompts.

use crate::context::guidance::DocumentKind;
use crate::context::token;
use paperchat_core::{DocumentContext, Exchange};

// ── Layout ────────────────────────────────────────────────────────────────

/// Header line preceding the rendered conversation.
pub const HISTORY_HEADER: &str = "Previous conversation:";

/// Closing line of the document section.
pub const DOCUMENT_END: &str = "--- END DOCUMENT ---";

/// Document truncation bound used when none is configured.
pub const DEFAULT_MAX_DOCUMENT_CHARS: usize = 50_000;

fn document_begin(source_name: &str) -> String {
    format!("--- BEGIN DOCUMENT: {source_name} ---")
}

// ── Types ─────────────────────────────────────────────────────────────────

/// Tunables for assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblerOptions {
    /// Maximum characters of document text; `None` keeps everything.
    pub max_document_chars: Option<usize>,
    /// Append type-specific reading guidance after the document.
    pub document_guidance: bool,
}

impl Default for AssemblerOptions {
    fn default() -> Self {
        Self {
            max_document_chars: Some(DEFAULT_MAX_DOCUMENT_CHARS),
            document_guidance: true,
        }
    }
}

/// Errors from context assembly.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssemblyError {
    #[error("Message is empty")]
    EmptyUserMessage,

    #[error("System prompt is empty")]
    EmptySystemPrompt,
}

/// The context assembler. Stateless; create one and reuse it.
#[derive(Debug, Clone, Default)]
pub struct ContextAssembler {
    options: AssemblerOptions,
}

impl ContextAssembler {
    pub fn new(options: AssemblerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &AssemblerOptions {
        &self.options
    }

    /// Build the prompt for one turn.
    ///
    /// # Layout
    ///
    /// 1. `system_prompt`
    /// 2. Blank line, then the document between BEGIN/END markers (if any),
    ///    truncated to `max_document_chars` with a marker saying so
    /// 3. Blank line, `Previous conversation:`, then one `Role: text` line
    ///    per exchange, oldest first (if memory is non-empty)
    /// 4. Blank line, then `User: {user_message}`
    pub fn build_prompt(
        &self,
        system_prompt: &str,
        memory: &[Exchange],
        document: Option<&DocumentContext>,
        user_message: &str,
    ) -> Result<String, AssemblyError> {
        if system_prompt.trim().is_empty() {
            return Err(AssemblyError::EmptySystemPrompt);
        }
        if user_message.trim().is_empty() {
            return Err(AssemblyError::EmptyUserMessage);
        }

        let mut prompt = String::with_capacity(
            system_prompt.len()
                + document.map_or(0, |d| d.extracted_text.len().min(self.byte_hint()))
                + memory.iter().map(|e| e.text().len() + 12).sum::<usize>()
                + user_message.len()
                + 128,
        );

        // ── System ─────────────────────────────────────────────────────────
        prompt.push_str(system_prompt);

        // ── Document ───────────────────────────────────────────────────────
        if let Some(doc) = document {
            prompt.push_str("\n\n");
            self.render_document(doc, &mut prompt);
        }

        // ── Conversation history ───────────────────────────────────────────
        if !memory.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(HISTORY_HEADER);
            for exchange in memory {
                prompt.push('\n');
                prompt.push_str(exchange.role().label());
                prompt.push_str(": ");
                prompt.push_str(exchange.text());
            }
        }

        // ── Current message ────────────────────────────────────────────────
        prompt.push_str("\n\nUser: ");
        prompt.push_str(user_message);

        tracing::debug!(
            prompt_chars = prompt.chars().count(),
            prompt_tokens = token::estimate_tokens(&prompt),
            history = memory.len(),
            has_document = document.is_some(),
            "Assembled prompt"
        );

        Ok(prompt)
    }

    fn render_document(&self, doc: &DocumentContext, out: &mut String) {
        out.push_str(&document_begin(&doc.source_name));
        out.push('\n');

        let text = doc.extracted_text.as_str();
        match self.options.max_document_chars {
            Some(limit) => match text.char_indices().nth(limit) {
                Some((cut, _)) => {
                    let total = doc.char_count();
                    out.push_str(&text[..cut]);
                    out.push_str(&format!(
                        "\n[Document truncated: showing {limit} of {total} characters]"
                    ));
                }
                None => out.push_str(text),
            },
            None => out.push_str(text),
        }

        out.push('\n');
        out.push_str(DOCUMENT_END);

        if self.options.document_guidance
            && let Some(kind) = DocumentKind::detect(text)
        {
            out.push_str("\n\n");
            out.push_str(kind.guidance());
        }
    }

    fn byte_hint(&self) -> usize {
        self.options
            .max_document_chars
            .map_or(usize::MAX, |n| n.saturating_mul(4))
    }
}
