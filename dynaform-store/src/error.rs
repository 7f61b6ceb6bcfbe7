//! Error types for store adapters

use thiserror::Error;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in a store adapter
#[derive(Debug, Error)]
pub enum StoreError {
    /// Record not found
    #[error("record not found: {id}")]
    RecordNotFound { id: String },

    /// The record is gone (deleted or never saved) and cannot be written
    #[error("record is detached and cannot be {operation}")]
    Detached { operation: String },

    /// Backend failure (connection, serialization, lock poisoning, ...)
    #[error("store backend error: {message}")]
    Backend { message: String },
}

impl StoreError {
    /// Create a backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::RecordNotFound { id: "abc".into() };
        assert_eq!(err.to_string(), "record not found: abc");
    }

    #[test]
    fn test_backend_error() {
        let err = StoreError::backend("lock poisoned");
        assert!(err.to_string().contains("lock poisoned"));
    }
}
