//! Error types for database operations

use thiserror::Error;

/// Result type alias using the store's error type
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors raised by the client and its collections
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Collection {0} already exists")]
    CollectionExists(String),

    #[error("Collection {0} does not exist")]
    CollectionNotFound(String),

    #[error("Invalid collection name '{name}': {reason}")]
    InvalidCollectionName { name: String, reason: String },

    #[error("Expected IDs to be unique, found duplicates of: {0}")]
    DuplicateIds(String),

    #[error("Expected IDs to be non-empty strings")]
    EmptyId,

    #[error("Unequal lengths for fields: {0}")]
    LengthMismatch(String),

    #[error("Delete requires at least one of ids, where or where_document")]
    UnboundedDelete,

    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("Invalid where clause: {0}")]
    InvalidWhere(String),

    #[error("Invalid where_document clause: {0}")]
    InvalidWhereDocument(String),

    #[error("Embedding dimension {got} does not match collection dimensionality {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Embedding function '{name}' failed: {message}")]
    Embedding { name: String, message: String },

    #[error("Vector index error: {0}")]
    Index(String),

    #[error("Corrupted collection data in {path}: {message}")]
    Corrupted { path: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// Wrap an error coming out of the usearch bindings
    pub fn index(err: impl std::fmt::Display) -> Self {
        StoreError::Index(err.to_string())
    }
}
