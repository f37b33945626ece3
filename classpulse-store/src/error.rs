//! Storage errors.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] libsql::Error),

    /// A stored identifier column does not hold a UUID.
    #[error("invalid {column}: {value}")]
    InvalidId { column: String, value: String },

    /// A stored epoch-millisecond timestamp cannot be represented.
    #[error("timestamp out of range: {0}")]
    TimestampOutOfRange(i64),

    #[error("invalid date: {0}")]
    InvalidDate(String),
}
