//! Error types for event processing and delivery.

use chrono::{DateTime, Utc};
use classpulse_store::{QuestionId, SessionId};

/// Why an event was rejected.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// Malformed or missing fields, unparsable identifiers, unknown answers.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unknown event type: {0}")]
    UnknownEventType(String),

    /// The answer arrived after the question's timer ran out.
    #[error("answer submitted after deadline: submitted at {submitted_at}, deadline was {deadline}")]
    DeadlineExceeded {
        submitted_at: DateTime<Utc>,
        deadline: DateTime<Utc>,
    },

    /// No publication exists for the answered question.
    #[error("question {question_id} was not published in session {session_id}")]
    NotFound {
        session_id: SessionId,
        question_id: QuestionId,
    },

    #[error("storage error: {0}")]
    Storage(#[from] classpulse_store::Error),
}

/// Coarse classification of a [`ProcessError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    DeadlineExceeded,
    NotFound,
    TransientInfra,
}

impl ProcessError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) | Self::UnknownEventType(_) => ErrorKind::InvalidInput,
            Self::DeadlineExceeded { .. } => ErrorKind::DeadlineExceeded,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Storage(_) => ErrorKind::TransientInfra,
        }
    }

    /// Whether the same event may succeed on a later attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::TransientInfra
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

/// Errors from the queue producer and consumer.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("event log error: {0}")]
    Log(#[from] classpulse_iggy::Error),

    #[error("send failed after {attempts} attempts: {reason}")]
    RetriesExhausted { attempts: u32, reason: String },

    /// The producer's flusher has stopped.
    #[error("producer is closed")]
    Closed,
}
