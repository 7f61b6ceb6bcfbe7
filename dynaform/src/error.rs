//! Error types for the form engine

use thiserror::Error;

/// Result type for form engine operations
pub type Result<T> = std::result::Result<T, DynaformError>;

/// Errors that can occur in form engine operations.
///
/// Validation failures are not errors: they come back as per-field message
/// lists from `check()` so the caller can re-prompt.
#[derive(Debug, Error)]
pub enum DynaformError {
    /// Field type tag or custom type class does not resolve
    #[error("unknown field type: {type_id}")]
    UnknownFieldType { type_id: String },

    /// Field configuration is malformed (missing per-type key, duplicate name)
    #[error("invalid config for field '{field}': {message}")]
    InvalidConfig { field: String, message: String },

    /// Caller supplied a value the field type cannot accept
    #[error("invalid input for field '{field}': {message}")]
    InvalidInput { field: String, message: String },

    /// Referenced user or record does not exist
    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    /// Store adapter failure
    #[error(transparent)]
    Store(#[from] dynaform_store::StoreError),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DynaformError {
    /// Create an unknown field type error
    pub fn unknown_field_type(type_id: impl Into<String>) -> Self {
        Self::UnknownFieldType {
            type_id: type_id.into(),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }
}
