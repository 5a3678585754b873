//! Error types for the financial query orchestrator

use thiserror::Error;

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, OrchestrationError>;

/// Failures that surface to the caller of `handle` / `get_market_brief`.
///
/// Provider signals and missing data are *not* errors; they travel as
/// [`ProviderReply`](crate::models::ProviderReply) values and end up as text.
#[derive(Error, Debug)]
pub enum OrchestrationError {

    // =============================
    // Collaborator Failures
    // =============================

    #[error("Collaborator error: {0}")]
    CollaboratorError(String),

    #[error("Generation error: {0}")]
    GenerationError(String),

    #[error("Retrieval error: {0}")]
    RetrievalError(String),

    #[error("Timed out waiting for {0}")]
    Timeout(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    // =============================
    // Input & Configuration
    // =============================

    #[error("Invalid ticker symbol: {0}")]
    InvalidTicker(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl OrchestrationError {
    /// Whether the failure came from the caller rather than a collaborator.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            OrchestrationError::InvalidTicker(_) | OrchestrationError::InvalidInput(_)
        )
    }
}
