//! Service Layer Error Types
//!
//! This module defines error types for service-layer operations. Every
//! failure of a create operation is reported before anything is written, so
//! an error always means "no effect".

use crate::db::DatabaseError;
use crate::models::ValueError;
use thiserror::Error;

/// Service operation errors
#[derive(Error, Debug)]
pub enum NodeServiceError {
    /// The value rule rejected the reply (division by zero, unknown operator,
    /// non-finite result)
    #[error("Invalid operation: {0}")]
    InvalidOperation(#[from] ValueError),

    /// A root value is not a finite number
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Reply target does not exist
    #[error("Parent node not found: {parent_id}")]
    ParentNotFound { parent_id: String },

    /// Node not found by ID
    #[error("Node not found: {id}")]
    NodeNotFound { id: String },

    /// Tree has no nodes or no root
    #[error("Tree not found: {tree_id}")]
    TreeNotFound { tree_id: String },

    /// User not found by ID or username
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// Username already registered
    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    /// Username failed validation
    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    /// Password failed validation at registration
    #[error("Invalid password: {0}")]
    InvalidPassword(String),

    /// Unknown username or wrong password (deliberately indistinguishable)
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Hashing or parsing a stored hash failed
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    /// Underlying persistence failure; not retried by the core
    #[error("Storage error: {0}")]
    StorageError(#[from] DatabaseError),
}

impl NodeServiceError {
    /// Create a parent not found error
    pub fn parent_not_found(parent_id: impl Into<String>) -> Self {
        Self::ParentNotFound {
            parent_id: parent_id.into(),
        }
    }

    /// Create a node not found error
    pub fn node_not_found(id: impl Into<String>) -> Self {
        Self::NodeNotFound { id: id.into() }
    }

    /// Create a tree not found error
    pub fn tree_not_found(tree_id: impl Into<String>) -> Self {
        Self::TreeNotFound {
            tree_id: tree_id.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(msg: impl Into<String>) -> Self {
        Self::InvalidValue(msg.into())
    }

    /// True for failures caused by the request rather than the system
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::StorageError(_) | Self::PasswordHash(_))
    }
}
