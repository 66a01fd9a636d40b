//! NodeStore Trait - Persistence Abstraction
//!
//! `NodeStore` is the seam between the services (value rule, invariants,
//! aggregation) and the storage backend. Services hold an
//! `Arc<dyn NodeStore>` injected at startup; nothing in the core reaches for
//! a global connection.
//!
//! # Design Decisions
//!
//! 1. **Async-first**: every method is async so embedded and networked
//!    backends share one contract
//! 2. **Whole records**: `insert_node` receives a fully built `Node`
//!    (including a root's self-referencing `tree_id`) and writes it in one
//!    statement; there is no insert-then-update path
//! 3. **Ordering**: multi-node reads are ordered by `created_at`, with
//!    insertion order breaking ties, so callers can rely on stable ordering
//!
//! # Examples
//!
//! ```rust,no_run
//! use numtree_core::db::{DatabaseService, NodeStore, TursoStore};
//! use numtree_core::models::Node;
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Arc::new(DatabaseService::new(PathBuf::from("./data/numtree.db")).await?);
//!     let store: Arc<dyn NodeStore> = Arc::new(TursoStore::new(db));
//!
//!     let root = Node::new_root("user-1".to_string(), 42.0);
//!     store.insert_node(&root).await?;
//!     Ok(())
//! }
//! ```

use crate::db::DatabaseError;
use crate::models::{Node, User};
use async_trait::async_trait;
use std::collections::HashMap;

/// Persistence operations for nodes and users
///
/// Implementations must be `Send + Sync` so they can be shared across
/// request handlers.
#[async_trait]
pub trait NodeStore: Send + Sync {
    //
    // NODES
    //

    /// Persist one node atomically
    ///
    /// # Errors
    ///
    /// Fails if the id already exists, the parent is missing, or the record
    /// violates the node constraints. Nothing is stored on failure.
    async fn insert_node(&self, node: &Node) -> Result<(), DatabaseError>;

    /// Get node by ID (`Ok(None)` when absent)
    async fn get_node(&self, id: &str) -> Result<Option<Node>, DatabaseError>;

    /// All nodes of a tree, oldest first; empty for an unknown tree
    async fn get_nodes_by_tree(&self, tree_id: &str) -> Result<Vec<Node>, DatabaseError>;

    /// All root nodes, newest first
    async fn list_roots(&self) -> Result<Vec<Node>, DatabaseError>;

    /// A window of root nodes, newest first
    async fn list_roots_page(&self, offset: u64, limit: u64)
        -> Result<Vec<Node>, DatabaseError>;

    /// The whole node collection, oldest first
    async fn list_nodes(&self) -> Result<Vec<Node>, DatabaseError>;

    /// Nodes of the given trees, oldest first
    async fn list_nodes_in_trees(&self, tree_ids: &[String])
        -> Result<Vec<Node>, DatabaseError>;

    /// Total number of stored nodes
    async fn count_nodes(&self) -> Result<u64, DatabaseError>;

    //
    // USERS
    //

    /// Persist a user with its password hash; fails with
    /// `DatabaseError::Duplicate` on a taken username
    async fn insert_user(&self, user: &User, password_hash: &str) -> Result<(), DatabaseError>;

    async fn get_user(&self, id: &str) -> Result<Option<User>, DatabaseError>;

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError>;

    /// User and stored password hash, for credential checks only
    async fn get_credentials(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, DatabaseError>;

    /// Map of user id to username for the ids that exist
    ///
    /// Any number of ids is accepted; long lists are queried in chunks.
    async fn get_usernames(&self, ids: &[String])
        -> Result<HashMap<String, String>, DatabaseError>;

    //
    // LIFECYCLE
    //

    /// Flush pending writes before shutdown
    async fn close(&self) -> Result<(), DatabaseError>;
}
