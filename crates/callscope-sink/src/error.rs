//! Error types for sink implementations.

use thiserror::Error;

/// Errors surfaced by a [`crate::RecordSink`] when a record cannot be shipped.
///
/// The forwarder never propagates these to callers; they are logged and
/// counted, and the record is discarded. The variants exist so sink
/// implementations can report *what* went wrong with enough precision
/// for local diagnostics.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The transport to the collector failed (connection refused, broken
    /// pipe, timeout).
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// The collector accepted the connection but refused the record.
    #[error("record rejected for tag {tag}: {reason}")]
    Rejected { tag: String, reason: String },

    /// The record could not be encoded into the sink's wire format.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The sink has been shut down and accepts no further records.
    #[error("sink is closed")]
    Closed,
}

impl From<std::io::Error> for SinkError {
    fn from(err: std::io::Error) -> Self {
        SinkError::Delivery(err.to_string())
    }
}

/// Result alias for sink operations.
pub type SinkResult<T> = std::result::Result<T, SinkError>;
