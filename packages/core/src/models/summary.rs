//! Tree Summary
//!
//! Overview record for the tree list: the root itself plus reply statistics.

use crate::models::node::Node;
use serde::{Deserialize, Serialize};

/// Number of recent replies carried by each summary
pub const RECENT_REPLY_LIMIT: usize = 3;

/// One entry of the tree list
///
/// Serializes as the root node's fields with `authorUsername`, `replyCount`
/// and `recentReplies` added alongside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeSummary {
    #[serde(flatten)]
    pub root: Node,

    /// Display name of the root's author, if the user record still exists
    pub author_username: Option<String>,

    /// Total number of `OP` nodes in the tree
    pub reply_count: usize,

    /// Most recently created replies, newest first, at most [`RECENT_REPLY_LIMIT`]
    pub recent_replies: Vec<Node>,
}

impl TreeSummary {
    pub fn tree_id(&self) -> &str {
        &self.root.tree_id
    }

    pub fn value(&self) -> f64 {
        self.root.value
    }
}
