//! Store Errors
//!
//! Everything that can go wrong below the services: opening the node file,
//! creating the `nodes`/`users` schema, running a statement, or decoding a
//! row that no longer satisfies the node invariants.

use std::path::PathBuf;
use thiserror::Error;

/// Failures of the libsql node store
///
/// The services wrap these as `StorageError`; a value-rule rejection never
/// reaches this layer.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// The database file could not be opened
    #[error("Failed to open node store at {path}: {source}")]
    ConnectionFailed {
        path: PathBuf,
        source: libsql::Error,
    },

    /// Creating the `users`/`nodes` tables or their indexes failed
    #[error("Failed to create node store schema: {0}")]
    InitializationFailed(String),

    /// The directory for the node file is not writable
    #[error("Node store directory not writable: {path}")]
    PermissionDenied { path: PathBuf },

    /// The directory for the node file could not be created
    #[error("Failed to create node store directory: {0}")]
    DirectoryCreationFailed(#[from] std::io::Error),

    /// Error surfaced by libsql while reading a column or connecting
    #[error("libsql error: {0}")]
    LibsqlError(#[from] libsql::Error),

    /// A statement failed; `context` names the query
    #[error("Query failed: {context}")]
    SqlExecutionError { context: String },

    /// A stored row could not be turned back into a model
    #[error("Corrupt row in '{table}': {reason}")]
    CorruptRow { table: &'static str, reason: String },

    /// Unique constraint violated (duplicate id or username)
    #[error("Duplicate record: {0}")]
    Duplicate(String),
}

impl DatabaseError {
    pub fn connection_failed(path: PathBuf, source: libsql::Error) -> Self {
        Self::ConnectionFailed { path, source }
    }

    pub fn initialization_failed(msg: impl Into<String>) -> Self {
        Self::InitializationFailed(msg.into())
    }

    pub fn permission_denied(path: PathBuf) -> Self {
        Self::PermissionDenied { path }
    }

    pub fn sql_execution(context: impl Into<String>) -> Self {
        Self::SqlExecutionError {
            context: context.into(),
        }
    }

    /// A `table` row that violates a node or user invariant
    pub fn corrupt_row(table: &'static str, reason: impl Into<String>) -> Self {
        Self::CorruptRow {
            table,
            reason: reason.into(),
        }
    }
}
