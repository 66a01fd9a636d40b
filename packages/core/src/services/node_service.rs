//! Node Service - Creating and Reading Nodes
//!
//! This module provides the business logic layer for node writes and simple
//! reads:
//!
//! - `create_root` - start a new tree with a user-chosen number
//! - `create_reply` - append an operation node under any existing node
//! - `get_by_id`, `get_by_tree`, `list_roots` - reads in storage order
//!
//! # Invariants
//!
//! - A root's `tree_id` is its own id, set before the single insert
//! - A reply's `tree_id` is copied from its parent, never recomputed
//! - A reply's value comes from the value rule; any rejection (including
//!   division by zero) returns before anything is written
//!
//! Author ids are trusted as given; authenticating them is the caller's job.

use crate::db::NodeStore;
use crate::models::{Node, Operator};
use crate::services::error::NodeServiceError;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Node creation and lookup
#[derive(Clone)]
pub struct NodeService {
    store: Arc<dyn NodeStore>,
}

impl NodeService {
    pub fn new(store: Arc<dyn NodeStore>) -> Self {
        Self { store }
    }

    /// Shared store handle (for services built alongside this one)
    pub fn store(&self) -> &Arc<dyn NodeStore> {
        &self.store
    }

    /// Start a new tree
    ///
    /// # Errors
    ///
    /// - `InvalidValue` if `value` is NaN or infinite
    /// - `StorageError` if the insert fails
    #[instrument(skip(self))]
    pub async fn create_root(&self, author_id: &str, value: f64) -> Result<Node, NodeServiceError> {
        if !value.is_finite() {
            warn!("rejected non-finite root value");
            return Err(NodeServiceError::invalid_value(
                "root value must be a finite number",
            ));
        }

        let node = Node::new_root(author_id.to_string(), value);
        self.store.insert_node(&node).await?;

        info!(node_id = %node.id, "created root");
        Ok(node)
    }

    /// Reply to an existing node with one arithmetic step
    ///
    /// `op` is one of `+ - * /`.
    ///
    /// # Errors
    ///
    /// - `ParentNotFound` if `parent_id` does not exist
    /// - `InvalidOperation` for an unknown operator, division by zero or a
    ///   non-finite result
    /// - `StorageError` if a read or the insert fails
    #[instrument(skip(self))]
    pub async fn create_reply(
        &self,
        author_id: &str,
        parent_id: &str,
        op: &str,
        right: f64,
    ) -> Result<Node, NodeServiceError> {
        let parent = self
            .store
            .get_node(parent_id)
            .await?
            .ok_or_else(|| NodeServiceError::parent_not_found(parent_id))?;

        let op: Operator = op.parse().map_err(|e| {
            warn!(error = %e, "rejected reply");
            NodeServiceError::InvalidOperation(e)
        })?;

        self.reply_to(&parent, author_id, op, right).await
    }

    /// Reply to an already loaded parent
    pub async fn reply_to(
        &self,
        parent: &Node,
        author_id: &str,
        op: Operator,
        right: f64,
    ) -> Result<Node, NodeServiceError> {
        let node = Node::new_reply(parent, author_id.to_string(), op, right).map_err(|e| {
            warn!(parent_id = %parent.id, error = %e, "rejected reply");
            NodeServiceError::InvalidOperation(e)
        })?;

        self.store.insert_node(&node).await?;

        info!(
            node_id = %node.id,
            tree_id = %node.tree_id,
            parent_id = %parent.id,
            "created reply"
        );
        Ok(node)
    }

    /// Get a node by ID
    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: &str) -> Result<Node, NodeServiceError> {
        self.store
            .get_node(id)
            .await?
            .ok_or_else(|| NodeServiceError::node_not_found(id))
    }

    /// All nodes of a tree, oldest first
    ///
    /// Returns an empty list (not an error) for an unknown tree.
    #[instrument(skip(self))]
    pub async fn get_by_tree(&self, tree_id: &str) -> Result<Vec<Node>, NodeServiceError> {
        let nodes = self.store.get_nodes_by_tree(tree_id).await?;
        debug!(count = nodes.len(), "loaded tree nodes");
        Ok(nodes)
    }

    /// All root nodes, newest first
    #[instrument(skip(self))]
    pub async fn list_roots(&self) -> Result<Vec<Node>, NodeServiceError> {
        Ok(self.store.list_roots().await?)
    }

    /// Total number of stored nodes
    pub async fn count_nodes(&self) -> Result<u64, NodeServiceError> {
        Ok(self.store.count_nodes().await?)
    }
}

// Comprehensive tests in separate module
#[cfg(test)]
#[path = "node_service_test.rs"]
mod node_service_test;
