//! Configuration loading, validation, and management for agentbox.
//!
//! Loads configuration from `~/.agentbox/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.agentbox/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the model endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Name used for the provider in logs
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model requested on every call
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per model response (provider default when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Agent loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Working directory and tool limits
    #[serde(default)]
    pub sandbox: SandboxConfig,

    /// Conversation persistence
    #[serde(default)]
    pub history: HistoryConfig,
}

fn default_api_url() -> String {
    "http://localhost:1234/v1".into()
}
fn default_provider() -> String {
    "openai-compatible".into()
}
fn default_model() -> String {
    "qwen/qwen3-8b".into()
}
fn default_temperature() -> f32 {
    0.7
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
            .field("api_url", &self.api_url)
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("agent", &self.agent)
            .field("sandbox", &self.sandbox)
            .field("history", &self.history)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Model calls allowed per prompt
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Model calls that must happen before a text answer is accepted
    #[serde(default)]
    pub min_iterations: u32,

    /// Replaces the built-in system prompt when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

fn default_max_iterations() -> u32 {
    20
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            min_iterations: 0,
            system_prompt: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Directory every tool is confined to
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,

    /// Characters returned by get_file_content before truncation
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    #[serde(default)]
    pub script: ScriptConfig,
}

fn default_working_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_max_chars() -> usize {
    10_000
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            working_dir: default_working_dir(),
            max_chars: default_max_chars(),
            script: ScriptConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptConfig {
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Required script extension, without the dot
    #[serde(default = "default_extension")]
    pub extension: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_interpreter() -> String {
    "python3".into()
}
fn default_extension() -> String {
    "py".into()
}
fn default_timeout_secs() -> u64 {
    30
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            extension: default_extension(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Persist the conversation between invocations
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// History file; `~/.agentbox/history/conversation.json` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.agentbox/config.toml),
    /// then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(&Self::default_path())
    }

    /// `~/.agentbox/config.toml`
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load from `path`, then apply environment overrides:
    /// - `AGENTBOX_API_KEY` (falls back to `OPENAI_API_KEY`)
    /// - `AGENTBOX_API_URL`
    /// - `AGENTBOX_MODEL`
    /// - `AGENTBOX_WORKING_DIR`
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::read_from(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a file without validating the values in it.
    pub fn read_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("AGENTBOX_API_KEY").or_else(|| {
            self.api_key
                .is_none()
                .then(|| non_empty("OPENAI_API_KEY"))
                .flatten()
        }) {
            self.api_key = Some(key);
        }
        if let Some(url) = non_empty("AGENTBOX_API_URL") {
            self.api_url = url;
        }
        if let Some(model) = non_empty("AGENTBOX_MODEL") {
            self.model = model;
        }
        if let Some(dir) = non_empty("AGENTBOX_WORKING_DIR") {
            self.sandbox.working_dir = PathBuf::from(dir);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".agentbox")
    }

    /// Where the conversation history lives.
    pub fn history_path(&self) -> PathBuf {
        self.history
            .path
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("history").join("conversation.json"))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be > 0".into(),
            ));
        }

        if self.agent.min_iterations >= self.agent.max_iterations {
            return Err(ConfigError::ValidationError(format!(
                "agent.min_iterations ({}) must be less than agent.max_iterations ({})",
                self.agent.min_iterations, self.agent.max_iterations
            )));
        }

        if self.sandbox.max_chars == 0 {
            return Err(ConfigError::ValidationError(
                "sandbox.max_chars must be > 0".into(),
            ));
        }

        if self.sandbox.script.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "sandbox.script.timeout_secs must be > 0".into(),
            ));
        }

        if self.sandbox.script.interpreter.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "sandbox.script.interpreter must not be empty".into(),
            ));
        }

        let extension = self.sandbox.script.extension.trim();
        if extension.is_empty() || extension.starts_with('.') {
            return Err(ConfigError::ValidationError(
                "sandbox.script.extension must be a bare extension such as \"py\"".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            provider: default_provider(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: None,
            agent: AgentConfig::default(),
            sandbox: SandboxConfig::default(),
            history: HistoryConfig::default(),
        }
    }
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
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
