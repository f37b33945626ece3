//! Error types for analytics queries and reports.

use thiserror::Error;

/// Result type for analytics operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Nothing in the request matched the cube.
    #[error("no valid measures or dimensions specified")]
    NoSelection,

    #[error("invalid order direction: {0:?}")]
    InvalidOrderDirection(String),

    /// A filter literal does not fit the dimension's value type.
    #[error("invalid value {value:?} for dimension {dimension}")]
    InvalidFilterValue { dimension: String, value: String },

    #[error(transparent)]
    Storage(#[from] classpulse_store::Error),
}

impl Error {
    /// Whether the caller sent a bad request, as opposed to a storage failure.
    #[must_use]
    pub fn is_caller_error(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_selection_message() {
        assert_eq!(
            Error::NoSelection.to_string(),
            "no valid measures or dimensions specified"
        );
        assert!(Error::NoSelection.is_caller_error());
    }
}
