//! Error types shared across the monitoring pipeline

use thiserror::Error;

/// A storage or device-registry collaborator call failed.
///
/// Always transient from the pipeline's point of view: the unit of work is
/// skipped and logged, never escalated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("write rejected: {0}")]
    Rejected(String),
}

/// Delivery of one event to one subscriber failed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("subscriber connection closed")]
    Closed,
    #[error("subscriber did not accept the event within {0:?}")]
    TimedOut(std::time::Duration),
    #[error("transport error: {0}")]
    Transport(String),
}

/// Failure of a single reading at the ingest boundary
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IngestError {
    /// The reading is malformed and never reaches the evaluator
    #[error("invalid reading: {0}")]
    InvalidInput(String),
    /// Persisting the raw reading failed; the caller owns the retry policy
    #[error("failed to persist reading: {0}")]
    Persistence(#[from] StoreError),
}

impl IngestError {
    /// Short machine-readable reason
    pub fn code(&self) -> &'static str {
        match self {
            IngestError::InvalidInput(_) => "invalid_input",
            IngestError::Persistence(_) => "persistence_failed",
        }
    }
}

/// A threshold table could not be loaded
#[derive(Debug, Error)]
pub enum ThresholdConfigError {
    #[error("failed to read threshold file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse threshold table: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid envelope for {class}/{metric}: {reason}")]
    InvalidEnvelope {
        class: String,
        metric: String,
        reason: String,
    },
}
