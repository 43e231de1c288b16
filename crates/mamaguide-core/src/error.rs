//! Error types shared across MamaGuide crates.

use thiserror::Error;

/// Result alias used by every library crate.
pub type Result<T> = std::result::Result<T, MamaGuideError>;

#[derive(Debug, Error)]
pub enum MamaGuideError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("API key missing for provider: {0}")]
    ApiKeyMissing(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Knowledge base error: {0}")]
    Knowledge(String),

    #[error("Memory error: {0}")]
    Memory(String),

    #[error("Timed out after {0}s")]
    Timeout(u64),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}
