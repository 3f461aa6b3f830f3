//! Error types for the Gongbu domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Gongbu operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Store errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Guide errors ---
    #[error("Guide error: {0}")]
    Guide(#[from] GuideError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Constraint violated: {0}")]
    Constraint(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

/// Classified failures surfaced to callers of the study-guide pipeline.
///
/// The string keys from [`GuideError::code`] are what API clients match on.
#[derive(Debug, Clone, Error)]
pub enum GuideError {
    #[error("Too many requests to the tutor model, try again shortly")]
    RateLimited,

    #[error("No study material found for this selection")]
    NotFound,

    #[error("Tutor API error: {0}")]
    Api(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Data error: {0}")]
    Store(#[from] StoreError),
}

impl GuideError {
    /// Stable, string-keyed classification.
    pub fn code(&self) -> &'static str {
        match self {
            GuideError::RateLimited => "rate_limit_exceeded",
            GuideError::NotFound => "not_found",
            GuideError::Api(_) => "api_error",
            GuideError::InvalidRequest(_) => "invalid_request",
            GuideError::Store(_) => "store_error",
        }
    }
}

impl From<ProviderError> for GuideError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::RateLimited { .. } => GuideError::RateLimited,
            other => GuideError::Api(other.to_string()),
        }
    }
}
