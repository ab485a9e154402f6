//! Document store error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocStoreError {
    /// Connectivity or transport failure; the database could not be reached.
    #[error("Document store unavailable: {message}")]
    StoreUnavailable { message: String },

    /// The database rejected the operation (e.g. a uniqueness violation).
    #[error("Operation failed: {message}")]
    OperationFailed { message: String },

    /// A single-result lookup matched more than one document.
    #[error("Ambiguous result: {matched} documents in {collection} matched a single-result lookup")]
    AmbiguousResult { collection: String, matched: usize },

    #[error("Serialization error: {0}")]
    Serialization(#[from] bson::ser::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] bson::de::Error),
}

impl DocStoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable { message: message.into() }
    }

    pub fn operation_failed(message: impl Into<String>) -> Self {
        Self::OperationFailed { message: message.into() }
    }

    pub fn ambiguous(collection: impl Into<String>, matched: usize) -> Self {
        Self::AmbiguousResult {
            collection: collection.into(),
            matched,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. })
    }
}

pub type Result<T> = std::result::Result<T, DocStoreError>;
