//! Storage error type shared by the article store and result cache

use pulse_core::PulseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Embedding encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("Invalid timestamp {value:?} in column {column}")]
    InvalidTimestamp { column: &'static str, value: String },
}

impl From<StoreError> for PulseError {
    fn from(err: StoreError) -> Self {
        PulseError::Storage(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
