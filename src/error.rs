//! Error types for minisql
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using DbError
pub type Result<T> = std::result::Result<T, DbError>;

/// Unified error type for minisql operations
#[derive(Debug, Error)]
pub enum DbError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Statement Errors
    // -------------------------------------------------------------------------
    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("Schema error: {0}")]
    Schema(String),

    // -------------------------------------------------------------------------
    // Value Errors
    // -------------------------------------------------------------------------
    #[error("Cannot coerce '{literal}' to {kind}")]
    ValueCoercion { literal: String, kind: String },

    #[error("Value count mismatch: expected {expected}, got {actual}")]
    Arity { expected: usize, actual: usize },

    // -------------------------------------------------------------------------
    // Constraint Errors
    // -------------------------------------------------------------------------
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Not found: {0}")]
    NotFound(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}
