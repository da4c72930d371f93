//! Error types for embedding operations

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EmbeddingError>;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("OpenAI API error: {0}")]
    OpenAI(#[from] async_openai::error::OpenAIError),

    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Provider returned {actual} embeddings for {expected} inputs")]
    CountMismatch { expected: usize, actual: usize },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<EmbeddingError> for pulse_core::PulseError {
    fn from(err: EmbeddingError) -> Self {
        pulse_core::PulseError::UpstreamFetch(format!("embedding provider: {}", err))
    }
}
