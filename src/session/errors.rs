//! # Session Errors
//!
//! Error types for the store contract and the unit of work.

use thiserror::Error;

use crate::schema::SchemaError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors reported by a `DocumentStore`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Database was never ensured
    #[error("Unknown database: {0}")]
    UnknownDatabase(String),

    /// Table was never ensured in the database
    #[error("Unknown table '{table}' in database '{database}'")]
    UnknownTable { database: String, table: String },

    /// The store refused the write
    #[error("Store rejected the write: {0}")]
    Rejected(String),
}

/// Errors reported by a `Session`
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    // ==================
    // Document Errors
    // ==================

    /// Externalizing or rebuilding a document failed
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A tracked document is mutably borrowed at commit time
    #[error("A tracked document is mutably borrowed")]
    DocumentInUse,

    /// Another live instance already represents this document
    #[error("Another live instance of {model} {key} is already tracked")]
    DuplicateIdentity { model: String, key: String },

    // ==================
    // Store Errors
    // ==================

    /// The store failed; carried unchanged
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SessionError {
    /// Whether the failure came from the store rather than the documents
    pub fn is_store_error(&self) -> bool {
        matches!(self, SessionError::Store(_))
    }
}
