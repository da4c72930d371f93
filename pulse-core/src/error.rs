//! Error types for the signal pipeline

use thiserror::Error;

/// Pipeline-wide error type
///
/// Nothing in the pipeline is fatal: callers decide per variant whether to
/// degrade (one signal kind comes out empty) or to report a message.
#[derive(Error, Debug)]
pub enum PulseError {
    /// A headline fetch or signal-provider call failed
    #[error("Upstream fetch error: {0}")]
    UpstreamFetch(String),

    /// A signal provider could not produce a result for one signal kind
    #[error("Computation error ({kind}): {message}")]
    Computation { kind: String, message: String },

    /// Not enough articles for a computation; a normal early exit
    #[error("Need at least {required} articles (found {found})")]
    InsufficientData { required: usize, found: usize },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PulseError {
    pub fn upstream(msg: impl Into<String>) -> Self {
        PulseError::UpstreamFetch(msg.into())
    }

    pub fn computation(kind: impl Into<String>, message: impl Into<String>) -> Self {
        PulseError::Computation {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn insufficient(required: usize, found: usize) -> Self {
        PulseError::InsufficientData { required, found }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        PulseError::Storage(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        PulseError::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        PulseError::Internal(msg.into())
    }

    /// Stable machine-readable code for structured error bodies
    pub fn code(&self) -> &'static str {
        match self {
            PulseError::UpstreamFetch(_) => "upstream_fetch",
            PulseError::Computation { .. } => "computation",
            PulseError::InsufficientData { .. } => "insufficient_data",
            PulseError::Storage(_) => "storage",
            PulseError::Config(_) => "config",
            PulseError::Internal(_) => "internal",
        }
    }
}

/// Result type alias for pipeline operations
pub type PulseResult<T> = Result<T, PulseError>;
