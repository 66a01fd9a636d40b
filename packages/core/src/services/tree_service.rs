//! Tree Reconstruction
//!
//! A tree is stored flat: every node carries its `tree_id` and `parent_id`.
//! `TreeService::reconstruct` loads one tree and indexes it as a
//! parent -> children adjacency map. No nested structure is built; callers
//! walk the adjacency (or use [`TreeView::depth_first`]) as deep as they
//! need.

use crate::models::{AuthoredNode, Node};
use crate::services::error::NodeServiceError;
use crate::services::node_service::NodeService;
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument, warn};

/// Indexed view over the nodes of one tree
///
/// Children lists are in creation order because the node list they are
/// built from is.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeView {
    /// All member nodes, oldest first
    nodes: Vec<Node>,
    /// Position of the root in `nodes`
    root: usize,
    /// Node id -> position in `nodes`
    index: HashMap<String, usize>,
    /// Parent id (`None` for the root) -> positions of children
    children: HashMap<Option<String>, Vec<usize>>,
}

impl TreeView {
    /// Index a flat node list belonging to `tree_id`
    ///
    /// Returns `None` when the list holds no root whose id is `tree_id`.
    pub fn from_nodes(tree_id: &str, nodes: Vec<Node>) -> Option<Self> {
        let root = nodes
            .iter()
            .position(|node| node.is_root() && node.id == tree_id)?;

        let mut index = HashMap::with_capacity(nodes.len());
        let mut children: HashMap<Option<String>, Vec<usize>> = HashMap::new();

        for (pos, node) in nodes.iter().enumerate() {
            index.insert(node.id.clone(), pos);
            children
                .entry(node.parent_id().map(str::to_string))
                .or_default()
                .push(pos);
        }

        Some(Self {
            nodes,
            root,
            index,
            children,
        })
    }

    pub fn tree_id(&self) -> &str {
        &self.nodes[self.root].tree_id
    }

    pub fn root(&self) -> &Node {
        &self.nodes[self.root]
    }

    /// All member nodes, oldest first
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&pos| &self.nodes[pos])
    }

    /// Direct children of `id`, oldest first (empty for leaves and unknown ids)
    pub fn children(&self, id: &str) -> Vec<&Node> {
        self.children
            .get(&Some(id.to_string()))
            .map(|positions| positions.iter().map(|&pos| &self.nodes[pos]).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of `OP` nodes
    pub fn reply_count(&self) -> usize {
        self.nodes.iter().filter(|node| !node.is_root()).count()
    }

    /// Lazy pre-order walk from the root, yielding `(depth, node)`
    ///
    /// Uses an explicit stack, so depth is bounded by memory rather than the
    /// call stack. Nodes whose parent is not part of the tree are never
    /// reached.
    pub fn depth_first(&self) -> DepthFirst<'_> {
        DepthFirst {
            view: self,
            stack: vec![(0, self.root)],
        }
    }

    fn child_positions(&self, pos: usize) -> &[usize] {
        self.children
            .get(&Some(self.nodes[pos].id.clone()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Iterator returned by [`TreeView::depth_first`]
pub struct DepthFirst<'a> {
    view: &'a TreeView,
    stack: Vec<(usize, usize)>,
}

impl<'a> Iterator for DepthFirst<'a> {
    type Item = (usize, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, pos) = self.stack.pop()?;
        // Reversed so the oldest child is visited first
        for &child in self.view.child_positions(pos).iter().rev() {
            self.stack.push((depth + 1, child));
        }
        Some((depth, &self.view.nodes[pos]))
    }
}

/// Loads trees and exposes them as [`TreeView`]s
#[derive(Clone)]
pub struct TreeService {
    nodes: NodeService,
}

impl TreeService {
    pub fn new(nodes: NodeService) -> Self {
        Self { nodes }
    }

    /// Load and index one tree
    ///
    /// # Errors
    ///
    /// - `TreeNotFound` when the tree has no nodes, or when nodes exist but
    ///   none of them is its root (reported, not treated as a crash)
    /// - `StorageError` if the read fails
    #[instrument(skip(self))]
    pub async fn reconstruct(&self, tree_id: &str) -> Result<TreeView, NodeServiceError> {
        let nodes = self.nodes.get_by_tree(tree_id).await?;

        if nodes.is_empty() {
            debug!("tree has no nodes");
            return Err(NodeServiceError::tree_not_found(tree_id));
        }

        let count = nodes.len();
        match TreeView::from_nodes(tree_id, nodes) {
            Some(view) => {
                debug!(count, "reconstructed tree");
                Ok(view)
            }
            None => {
                warn!(count, "tree has nodes but no root");
                Err(NodeServiceError::tree_not_found(tree_id))
            }
        }
    }

    /// Every node of a tree, oldest first, with its author's username
    ///
    /// Authors are resolved with a single lookup over the distinct ids.
    ///
    /// # Errors
    ///
    /// Same as [`TreeService::reconstruct`].
    #[instrument(skip(self))]
    pub async fn authored_nodes(&self, tree_id: &str) -> Result<Vec<AuthoredNode>, NodeServiceError> {
        let view = self.reconstruct(tree_id).await?;

        let author_ids: Vec<String> = view
            .nodes()
            .iter()
            .map(|node| node.author_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let usernames = self.nodes.store().get_usernames(&author_ids).await?;

        Ok(view
            .into_nodes()
            .into_iter()
            .map(|node| AuthoredNode {
                author_username: usernames.get(&node.author_id).cloned(),
                node,
            })
            .collect())
    }
}

// Comprehensive tests in separate module
#[cfg(test)]
#[path = "tree_service_test.rs"]
mod tree_service_test;
