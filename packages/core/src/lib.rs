//! Numbers Tree Core Business Logic Layer
//!
//! This crate provides the data model, persistence and services for a
//! discussion board where every post is a number. A user starts a tree with
//! a root number; replies apply one arithmetic operation to the node they
//! answer, and the result becomes the reply's value.
//!
//! # Architecture
//!
//! - **Flat storage**: every node carries `tree_id` and `parent_id`; trees are
//!   rebuilt on read, never stored nested
//! - **Derived values**: a reply's value is computed once at creation by the
//!   value rule and stored, so reads never recompute
//! - **libsql/Turso**: Embedded SQLite-compatible database
//!
//! # Modules
//!
//! - [`models`] - Data structures (Node, Operator, User, TreeSummary)
//! - [`services`] - Business services (NodeService, TreeService, SummaryService, UserService)
//! - [`db`] - Database layer with libsql integration

pub mod db;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use models::*;
pub use services::*;
