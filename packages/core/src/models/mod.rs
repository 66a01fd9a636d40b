//! Data Models
//!
//! This module contains the data structures used throughout the numbers tree:
//!
//! - `Node` - Root and operation nodes (tagged by `NodeStep`)
//! - `AuthoredNode` - A node with its author's username, for tree detail
//! - `Operator` / `apply` - The value rule deriving a reply's value
//! - `User` - Authors of nodes
//! - `TreeSummary` - Tree list overview records

mod node;
mod operator;
mod summary;
mod user;

pub use node::{AuthoredNode, Node, NodeKind, NodeStep};
pub use operator::{apply, Operator, ValueError};
pub use summary::{TreeSummary, RECENT_REPLY_LIMIT};
pub use user::{
    normalize_username, validate_password, User, MAX_PASSWORD_LEN, MAX_USERNAME_LEN,
    MIN_PASSWORD_LEN, MIN_USERNAME_LEN,
};
