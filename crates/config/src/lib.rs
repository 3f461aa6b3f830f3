//! Configuration loading, validation, and management for Gongbu.
//!
//! Loads configuration from `~/.gongbu/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use gongbu_core::UserRole;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.gongbu/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the chat-completion endpoint (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// HTTP timeout for provider calls, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Relational store configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Study guide and tutor chat settings
    #[serde(default)]
    pub guide: GuideConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Role lookup settings
    #[serde(default)]
    pub auth: AuthConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_request_timeout() -> u64 {
    120
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
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("database", &self.database)
            .field("guide", &self.guide)
            .field("gateway", &self.gateway)
            .field("auth", &self.auth)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &redact(&self.url))
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection string. Defaults to `~/.gongbu/gongbu.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    4
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

/// Study guide generation and tutor chat settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuideConfig {
    /// Concept cap for subjects without an entry in `subject_caps`
    #[serde(default = "default_cap")]
    pub default_cap: usize,

    /// Temperature for study guide generation
    #[serde(default = "default_guide_temperature")]
    pub guide_temperature: f32,

    /// Temperature for tutor chat and admin drafts
    #[serde(default = "default_temperature")]
    pub chat_temperature: f32,

    /// Maximum live chat sessions kept in memory by the gateway
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Per-subject concept caps, bounding the prompt payload
    #[serde(default = "default_subject_caps")]
    pub subject_caps: HashMap<String, usize>,
}

fn default_cap() -> usize {
    25
}
fn default_subject_caps() -> HashMap<String, usize> {
    HashMap::from([
        ("과학".to_string(), 40),
        ("사회".to_string(), 35),
        ("역사".to_string(), 35),
        ("수학".to_string(), 30),
    ])
}
fn default_guide_temperature() -> f32 {
    0.3
}
fn default_max_sessions() -> usize {
    1_000
}

impl GuideConfig {
    /// How many ranked concepts a guide for `subject` may carry.
    pub fn cap_for(&self, subject: &str) -> usize {
        self.subject_caps
            .get(subject.trim())
            .copied()
            .unwrap_or(self.default_cap)
    }
}

impl Default for GuideConfig {
    fn default() -> Self {
        Self {
            default_cap: default_cap(),
            subject_caps: default_subject_caps(),
            guide_temperature: default_guide_temperature(),
            chat_temperature: default_temperature(),
            max_sessions: default_max_sessions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Extra origins allowed by CORS (the web front end)
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_port() -> u16 {
    8787
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            allowed_origins: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// How long a role lookup may take before falling back
    #[serde(default = "default_role_timeout")]
    pub role_timeout_secs: u64,

    /// Role assumed when nothing is known about a user
    #[serde(default)]
    pub default_role: UserRole,
}

fn default_role_timeout() -> u64 {
    5
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            role_timeout_secs: default_role_timeout(),
            default_role: UserRole::Student,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.gongbu/config.toml).
    ///
    /// Also checks environment variables:
    /// - `GONGBU_API_KEY` (highest priority), then `OPENAI_API_KEY`
    /// - `GONGBU_PROVIDER`, `GONGBU_MODEL`
    /// - `GONGBU_DATABASE_URL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
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

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through a lookup function.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("GONGBU_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        }
        if let Some(provider) = lookup("GONGBU_PROVIDER") {
            self.default_provider = provider;
        }
        if let Some(model) = lookup("GONGBU_MODEL") {
            self.default_model = model;
        }
        if let Some(url) = lookup("GONGBU_DATABASE_URL") {
            self.database.url = Some(url);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".gongbu")
    }

    /// The database connection string, falling back to a file in the config dir.
    pub fn database_url(&self) -> String {
        self.database.url.clone().unwrap_or_else(|| {
            format!("sqlite://{}", Self::config_dir().join("gongbu.db").display())
        })
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        for (label, temperature) in [
            ("default_temperature", self.default_temperature),
            ("guide.guide_temperature", self.guide.guide_temperature),
            ("guide.chat_temperature", self.guide.chat_temperature),
        ] {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ConfigError::ValidationError(format!(
                    "{label} must be between 0.0 and 2.0"
                )));
            }
        }

        if self.guide.default_cap == 0 {
            return Err(ConfigError::ValidationError(
                "guide.default_cap must be > 0".into(),
            ));
        }

        if let Some((subject, _)) = self.guide.subject_caps.iter().find(|(_, cap)| **cap == 0) {
            return Err(ConfigError::ValidationError(format!(
                "guide.subject_caps.{subject} must be > 0"
            )));
        }

        if self.auth.role_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "auth.role_timeout_secs must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some() || self.providers.values().any(|p| p.api_key.is_some())
    }

    /// Generate a default config TOML string (for `init-config`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout(),
            database: DatabaseConfig::default(),
            guide: GuideConfig::default(),
            gateway: GatewayConfig::default(),
            auth: AuthConfig::default(),
            providers: HashMap::new(),
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
