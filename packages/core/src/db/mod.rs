//! Database Layer
//!
//! This module handles all database interactions using libsql (Turso
//! embedded SQLite):
//!
//! - `DatabaseService` - connection lifecycle, schema, raw SQL
//! - `NodeStore` - async persistence trait consumed by the services
//! - `TursoStore` - `NodeStore` implementation over `DatabaseService`
//!
//! # Architecture
//!
//! The node invariants are enforced twice: by the services before a write,
//! and by CHECK/FOREIGN KEY constraints in the `nodes` table so that no code
//! path can store a root outside its own tree, a reply without a parent, or
//! a division by zero.

pub mod database;
mod error;
pub mod node_store;
mod turso_store;

pub use database::{DatabaseService, DbInsertNodeParams, MAX_BOUND_IDS};
pub use error::DatabaseError;
pub use node_store::NodeStore;
pub use turso_store::TursoStore;
