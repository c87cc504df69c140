//! Configuration loading, validation, and management for Paperchat.
//!
//! Sources, lowest priority first:
//! 1. Built-in defaults
//! 2. `~/.paperchat/config.toml` (or the path given on the command line)
//! 3. Environment variables, after loading a `.env` file from the working
//!    directory if one exists
//!
//! Validation runs once all sources are merged.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.paperchat/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Credential for the generation backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Backend name ("gemini", "openai", "openrouter", "ollama", ...)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Override the backend's base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Model identifier sent to the backend
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Optional cap on generated tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,

    /// Caller-level timeout for a single backend call
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// System prompt placed at the top of every request
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Conversation memory configuration
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Document handling configuration
    #[serde(default)]
    pub documents: DocumentConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_provider() -> String {
    "gemini".into()
}
fn default_model_name() -> String {
    "gemini-2.5-flash-lite".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_request_timeout() -> u64 {
    60
}

/// Built-in system prompt, used unless `SYSTEM_PROMPT` or the config file
/// provides one.
pub fn default_system_prompt() -> String {
    "You are a helpful and knowledgeable assistant.\n\
     \n\
     You answer questions on a wide range of topics and discuss documents the \
     user uploads. When document content is provided, prefer it over general \
     knowledge, say when you are quoting it, and give page references when the \
     text has page markers. If the document does not contain the answer, say so. \
     If the document and your knowledge disagree, present both.\n\
     \n\
     Be concise yet complete, ask a clarifying question when a request is \
     ambiguous, and use the previous conversation to keep continuity."
        .into()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("api_url", &self.api_url)
            .field("model_name", &self.model_name)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .field("system_prompt_chars", &self.system_prompt.chars().count())
            .field("memory", &self.memory)
            .field("documents", &self.documents)
            .field("gateway", &self.gateway)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Exchanges kept per session
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,

    /// Concurrent sessions kept before the least recently used is dropped
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_max_messages() -> usize {
    10
}
fn default_max_sessions() -> usize {
    1_000
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
            max_sessions: default_max_sessions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentConfig {
    /// Characters of document text sent to the model; 0 means unbounded
    #[serde(default = "default_max_document_chars")]
    pub max_document_chars: usize,

    /// Append document-type reading guidance to the prompt
    #[serde(default = "default_true")]
    pub guidance: bool,

    /// Largest accepted upload, in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_max_document_chars() -> usize {
    50_000
}
fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024
}
fn default_true() -> bool {
    true
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            max_document_chars: default_max_document_chars(),
            guidance: true,
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    7860
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

impl AppConfig {
    /// Load configuration from all sources and validate it.
    ///
    /// Reads `.env` from the working directory first (if present), then the
    /// config file at `path` (default `~/.paperchat/config.toml`), then
    /// applies environment overrides:
    /// - `API_KEY`, falling back to `GOOGLE_API_KEY`
    /// - `PROVIDER`, `API_URL`, `MODEL_NAME`, `SYSTEM_PROMPT`
    /// - `MAX_MESSAGES`, `MAX_DOCUMENT_CHARS`, `REQUEST_TIMEOUT_SECONDS`
    /// - `HOST`, `PORT`
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(env_path) => tracing::debug!("Loaded environment from {}", env_path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!("Ignoring unreadable .env file: {e}"),
        }

        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| Self::config_dir().join("config.toml"));

        let mut config = Self::read_file(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path, without environment
    /// overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::read_file(path)?;
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Apply environment overrides using `lookup` to read variables.
    ///
    /// Empty values count as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("API_KEY").or_else(|| get("GOOGLE_API_KEY")) {
            self.api_key = Some(key);
        }
        if let Some(provider) = get("PROVIDER") {
            self.provider = provider;
        }
        if let Some(url) = get("API_URL") {
            self.api_url = Some(url);
        }
        if let Some(model) = get("MODEL_NAME") {
            self.model_name = model;
        }
        if let Some(prompt) = get("SYSTEM_PROMPT") {
            self.system_prompt = prompt;
        }
        if let Some(raw) = get("MAX_MESSAGES") {
            self.memory.max_messages = parse_env("MAX_MESSAGES", &raw)?;
        }
        if let Some(raw) = get("MAX_DOCUMENT_CHARS") {
            self.documents.max_document_chars = if raw.trim().eq_ignore_ascii_case("none") {
                0
            } else {
                parse_env("MAX_DOCUMENT_CHARS", &raw)?
            };
        }
        if let Some(raw) = get("REQUEST_TIMEOUT_SECONDS") {
            self.request_timeout_seconds = parse_env("REQUEST_TIMEOUT_SECONDS", &raw)?;
        }
        if let Some(host) = get("HOST") {
            self.gateway.host = host;
        }
        if let Some(raw) = get("PORT") {
            self.gateway.port = parse_env("PORT", &raw)?;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".paperchat")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.temperature < 0.0 || self.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.memory.max_messages == 0 {
            return Err(ConfigError::ValidationError(
                "max_messages must be at least 1".into(),
            ));
        }

        if self.memory.max_sessions == 0 {
            return Err(ConfigError::ValidationError(
                "max_sessions must be at least 1".into(),
            ));
        }

        if self.request_timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "request_timeout_seconds must be at least 1".into(),
            ));
        }

        if self.system_prompt.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "system_prompt must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Return the API key or fail with [`ConfigError::MissingApiKey`].
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }

    /// Whether the configured provider runs locally and needs no API key.
    pub fn is_local_provider(&self) -> bool {
        matches!(
            self.provider.trim().to_lowercase().as_str(),
            "ollama" | "vllm" | "llamacpp" | "llama.cpp"
        )
    }

    /// Character bound for document text, `None` when unbounded.
    pub fn document_char_limit(&self) -> Option<usize> {
        match self.documents.max_document_chars {
            0 => None,
            n => Some(n),
        }
    }

    /// Backend call timeout as a `Duration`.
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: default_provider(),
            api_url: None,
            model_name: default_model_name(),
            temperature: default_temperature(),
            max_output_tokens: None,
            request_timeout_seconds: default_request_timeout(),
            system_prompt: default_system_prompt(),
            memory: MemoryConfig::default(),
            documents: DocumentConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No API key configured: set API_KEY (or GOOGLE_API_KEY) in the environment or a .env file")]
    MissingApiKey,

    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
