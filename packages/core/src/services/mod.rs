//! Business Services
//!
//! This module contains the core business logic services:
//!
//! - `NodeService` - Root and reply creation, node lookup
//! - `TreeService` - Rebuilds one tree as an indexed `TreeView`
//! - `SummaryService` - Per-tree summaries for the list view
//! - `UserService` - Username registration and lookup
//!
//! Services coordinate between the database layer and application logic,
//! implementing business rules before anything reaches the store.

pub mod error;
pub mod node_service;
pub mod summary_service;
pub mod tree_service;
pub mod user_service;

pub use error::NodeServiceError;
pub use node_service::NodeService;
pub use summary_service::{SummaryService, DEFAULT_MAX_PAGE_SIZE, PAGE_SIZE_LIMIT};
pub use tree_service::{DepthFirst, TreeService, TreeView};
pub use user_service::UserService;
