//! Error types for the seat pipeline.

use thiserror::Error;

/// Failure of the durable snapshot log.
#[derive(Debug, Error)]
pub enum StorageFault {
    /// The backing store could not be reached or the statement failed.
    #[error("snapshot log unavailable: {0:#}")]
    Unavailable(anyhow::Error),

    /// A stored entry could not be decoded.
    #[error("snapshot log entry {id} is corrupt: {reason}")]
    Corrupt { id: i64, reason: String },
}

/// Reasons an inbound packet is not accepted.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("malformed packet: {0}")]
    Malformed(String),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] StorageFault),
}

impl IngestError {
    pub fn is_malformed(&self) -> bool {
        matches!(self, IngestError::Malformed(_) | IngestError::Json(_))
    }
}
