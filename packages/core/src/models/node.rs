//! Node Data Structures
//!
//! A tree is a flat set of nodes sharing one `tree_id`. Exactly one of them is
//! the `ROOT` (carrying the starting number); every other node is an `OP`
//! reply whose value was derived from its parent.
//!
//! # Wire Format
//!
//! Nodes serialize flat, with the variant tag stored alongside the shared
//! fields:
//!
//! ```json
//! { "id": "...", "treeId": "...", "authorId": "...", "value": 52.0,
//!   "kind": "OP", "parentId": "...", "op": "+", "right": 10.0,
//!   "createdAt": "2025-01-03T10:00:00.000000Z" }
//! ```
//!
//! # Examples
//!
//! ```rust
//! use numtree_core::models::{Node, Operator};
//!
//! let root = Node::new_root("user-1".to_string(), 42.0);
//! assert_eq!(root.tree_id, root.id);
//!
//! let reply = Node::new_reply(&root, "user-2".to_string(), Operator::Add, 10.0).unwrap();
//! assert_eq!(reply.value, 52.0);
//! assert_eq!(reply.parent_id(), Some(root.id.as_str()));
//! ```

use crate::models::operator::{Operator, ValueError};
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Discriminant stored in the `kind` column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeKind {
    Root,
    Op,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Root => "ROOT",
            NodeKind::Op => "OP",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ROOT" => Ok(NodeKind::Root),
            "OP" => Ok(NodeKind::Op),
            other => Err(format!("unknown node kind '{}'", other)),
        }
    }
}

/// Variant-specific part of a node
///
/// An `OP` node always has a parent, an operator and an operand; a `ROOT`
/// node has none of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum NodeStep {
    #[serde(rename = "ROOT")]
    Root,

    #[serde(rename = "OP", rename_all = "camelCase")]
    Op {
        parent_id: String,
        op: Operator,
        right: f64,
    },
}

/// A single value in a calculation tree
///
/// # Fields
///
/// - `id`: UUID assigned at creation
/// - `tree_id`: equals `id` for the root, copied from the parent otherwise
/// - `author_id`: user who posted the node
/// - `value`: starting number (root) or derived result (reply)
/// - `step`: root marker or the `(parent, op, right)` that produced `value`
/// - `created_at`: creation time, truncated to microseconds so it round-trips
///   through storage unchanged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    pub tree_id: String,
    pub author_id: String,
    pub value: f64,
    #[serde(flatten)]
    pub step: NodeStep,
    pub created_at: DateTime<Utc>,
}

impl Node {
    /// Build a new root node
    ///
    /// The id is allocated first so the record carries its own `tree_id`
    /// before it is ever written.
    pub fn new_root(author_id: String, value: f64) -> Self {
        let id = Uuid::new_v4().to_string();
        Self {
            tree_id: id.clone(),
            id,
            author_id,
            value,
            step: NodeStep::Root,
            created_at: now(),
        }
    }

    /// Build a reply to `parent`, deriving its value with the value rule
    pub fn new_reply(
        parent: &Node,
        author_id: String,
        op: Operator,
        right: f64,
    ) -> Result<Self, ValueError> {
        let value = op.apply(parent.value, right)?;

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            tree_id: parent.tree_id.clone(),
            author_id,
            value,
            step: NodeStep::Op {
                parent_id: parent.id.clone(),
                op,
                right,
            },
            created_at: now(),
        })
    }

    pub fn kind(&self) -> NodeKind {
        match self.step {
            NodeStep::Root => NodeKind::Root,
            NodeStep::Op { .. } => NodeKind::Op,
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self.step, NodeStep::Root)
    }

    pub fn parent_id(&self) -> Option<&str> {
        match &self.step {
            NodeStep::Root => None,
            NodeStep::Op { parent_id, .. } => Some(parent_id),
        }
    }

    pub fn op(&self) -> Option<Operator> {
        match self.step {
            NodeStep::Root => None,
            NodeStep::Op { op, .. } => Some(op),
        }
    }

    pub fn right(&self) -> Option<f64> {
        match self.step {
            NodeStep::Root => None,
            NodeStep::Op { right, .. } => Some(right),
        }
    }
}

/// A node together with its author's display name
///
/// Serializes as the node's own fields plus `authorUsername`, which is
/// `null` when the user record no longer exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthoredNode {
    #[serde(flatten)]
    pub node: Node,
    pub author_username: Option<String>,
}

/// Current time at the precision the store keeps
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_root_is_self_referential() {
        let root = Node::new_root("user-1".to_string(), 42.0);

        assert_eq!(root.tree_id, root.id);
        assert_eq!(root.kind(), NodeKind::Root);
        assert_eq!(root.parent_id(), None);
        assert_eq!(root.op(), None);
        assert_eq!(root.right(), None);
        assert!(Uuid::parse_str(&root.id).is_ok());
    }

    #[test]
    fn test_reply_inherits_tree() {
        let root = Node::new_root("user-1".to_string(), 42.0);
        let reply = Node::new_reply(&root, "user-2".to_string(), Operator::Add, 10.0).unwrap();
        let nested =
            Node::new_reply(&reply, "user-1".to_string(), Operator::Multiply, 2.0).unwrap();

        assert_eq!(reply.value, 52.0);
        assert_eq!(reply.tree_id, root.id);
        assert_eq!(reply.parent_id(), Some(root.id.as_str()));
        assert_eq!(nested.value, 104.0);
        assert_eq!(nested.tree_id, root.id);
        assert_eq!(nested.parent_id(), Some(reply.id.as_str()));
    }

    #[test]
    fn test_reply_rejects_division_by_zero() {
        let root = Node::new_root("user-1".to_string(), 42.0);
        let result = Node::new_reply(&root, "user-2".to_string(), Operator::Divide, 0.0);
        assert_eq!(result, Err(ValueError::DivisionByZero));
    }

    #[test]
    fn test_created_at_has_microsecond_precision() {
        let root = Node::new_root("user-1".to_string(), 1.0);
        assert_eq!(root.created_at.timestamp_subsec_nanos() % 1_000, 0);
    }

    #[test]
    fn test_serialization_shape() {
        let root = Node::new_root("user-1".to_string(), 42.0);
        let reply = Node::new_reply(&root, "user-2".to_string(), Operator::Add, 10.0).unwrap();

        let root_json = serde_json::to_value(&root).unwrap();
        assert_eq!(root_json["kind"], json!("ROOT"));
        assert_eq!(root_json["treeId"], json!(root.id));
        assert_eq!(root_json["value"], json!(42.0));
        assert!(root_json.get("parentId").is_none());
        assert!(root_json.get("op").is_none());

        let reply_json = serde_json::to_value(&reply).unwrap();
        assert_eq!(reply_json["kind"], json!("OP"));
        assert_eq!(reply_json["parentId"], json!(root.id));
        assert_eq!(reply_json["op"], json!("+"));
        assert_eq!(reply_json["right"], json!(10.0));
        assert_eq!(reply_json["authorId"], json!("user-2"));

        let authored = AuthoredNode {
            node: reply.clone(),
            author_username: Some("bob".to_string()),
        };
        let authored_json = serde_json::to_value(&authored).unwrap();
        assert_eq!(authored_json["authorUsername"], json!("bob"));
        assert_eq!(authored_json["parentId"], json!(root.id));
        assert!(authored_json.get("node").is_none());
    }

    #[test]
    fn test_deserialization_round_trip() {
        let root = Node::new_root("user-1".to_string(), 42.0);
        let reply = Node::new_reply(&root, "user-2".to_string(), Operator::Subtract, 5.0).unwrap();

        let text = serde_json::to_string(&reply).unwrap();
        let back: Node = serde_json::from_str(&text).unwrap();
        assert_eq!(back, reply);
    }

    #[test]
    fn test_op_without_operator_is_rejected() {
        let payload = json!({
            "id": "a",
            "treeId": "a",
            "authorId": "u",
            "value": 1.0,
            "kind": "OP",
            "parentId": "b",
            "createdAt": "2025-01-03T10:00:00Z"
        });
        assert!(serde_json::from_value::<Node>(payload).is_err());
    }

    #[test]
    fn test_node_kind_parsing() {
        assert_eq!("ROOT".parse::<NodeKind>(), Ok(NodeKind::Root));
        assert_eq!("OP".parse::<NodeKind>(), Ok(NodeKind::Op));
        assert!("root".parse::<NodeKind>().is_err());
    }
}
