//! Error types for the news module

use thiserror::Error;

/// Errors that can occur while fetching headlines
#[derive(Debug, Error)]
pub enum NewsError {
    /// HTTP request failed
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// API returned an error response
    #[error("API error (status {status}, code {}): {message}", .code.as_deref().unwrap_or("none"))]
    ApiError {
        /// HTTP status code
        status: u16,
        /// NewsAPI error code (e.g. "apiKeyInvalid"), when the body was JSON
        code: Option<String>,
        /// Error message from API
        message: String,
    },

    /// Failed to parse API response
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<NewsError> for pulse_core::PulseError {
    fn from(err: NewsError) -> Self {
        match err {
            NewsError::InvalidConfig(msg) => pulse_core::PulseError::Config(msg),
            other => pulse_core::PulseError::UpstreamFetch(other.to_string()),
        }
    }
}
