//! Backend selection from configuration.

use crate::openai_compat::OpenAiCompatProvider;
use paperchat_config::AppConfig;
use paperchat_core::{BackendError, GenerationBackend};
use std::sync::Arc;

/// Build the configured generation backend.
///
/// The base URL comes from `api_url` when set, otherwise from the provider's
/// well-known endpoint. Local providers run without a key.
pub fn build_from_config(
    config: &AppConfig,
) -> std::result::Result<Arc<dyn GenerationBackend>, BackendError> {
    let name = config.provider.trim().to_lowercase();
    if name.is_empty() {
        return Err(BackendError::NotConfigured("provider name is empty".into()));
    }

    let base_url = match &config.api_url {
        Some(url) => url.clone(),
        None => default_base_url(&name).ok_or_else(|| {
            BackendError::NotConfigured(format!(
                "unknown provider '{name}': set API_URL to its OpenAI-compatible endpoint"
            ))
        })?,
    };

    let api_key = match config.api_key.as_deref() {
        Some(key) if !key.trim().is_empty() => key.to_string(),
        _ if config.is_local_provider() => name.clone(),
        _ => {
            return Err(BackendError::NotConfigured(format!(
                "no API key for provider '{name}'"
            )));
        }
    };

    tracing::info!(provider = %name, base_url = %base_url, model = %config.model_name, "Generation backend configured");

    Ok(Arc::new(
        OpenAiCompatProvider::new(name, base_url, api_key).with_timeout(config.request_timeout()),
    ))
}

/// Get the default base URL for well-known providers.
pub fn default_base_url(provider_name: &str) -> Option<String> {
    let url = match provider_name {
        "gemini" | "google" => "https://generativelanguage.googleapis.com/v1beta/openai",
        "openai" => "https://api.openai.com/v1",
        "openrouter" => "https://openrouter.ai/api/v1",
        "groq" => "https://api.groq.com/openai/v1",
        "deepseek" => "https://api.deepseek.com/v1",
        "together" => "https://api.together.xyz/v1",
        "ollama" => "http://localhost:11434/v1",
        "vllm" => "http://localhost:8000/v1",
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1",
        _ => return None,
    };
    Some(url.into())
}
