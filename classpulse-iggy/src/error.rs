//! Error types for the event log.

use iggy::prelude::IggyError;

/// Error type for event log operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The Iggy server rejected a request.
    #[error("iggy error: {0}")]
    Iggy(String),

    /// The connection to the server could not be established or was lost.
    #[error("connection error: {0}")]
    Connection(String),

    /// An event could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Partition assignment for the consumer group changed; the consumer
    /// must rejoin before polling again.
    #[error("consumer group '{0}' was rebalanced")]
    Rebalanced(String),

    /// A position referenced a partition the topic does not have.
    #[error("partition {partition} out of range (topic has {count})")]
    InvalidPartition { partition: u32, count: u32 },
}

impl Error {
    /// Whether retrying the same operation may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Iggy(_) | Self::Connection(_))
    }
}

impl From<IggyError> for Error {
    fn from(e: IggyError) -> Self {
        let message = e.to_string();
        let lower = message.to_lowercase();
        if lower.contains("connection")
            || lower.contains("disconnected")
            || lower.contains("not connected")
            || lower.contains("broken pipe")
            || lower.contains("reset")
        {
            Self::Connection(message)
        } else {
            Self::Iggy(message)
        }
    }
}

/// Result type alias for event log operations.
pub type Result<T> = std::result::Result<T, Error>;
