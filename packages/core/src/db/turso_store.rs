//! TursoStore - NodeStore Implementation for the libsql Backend
//!
//! TursoStore wraps `DatabaseService` and delegates every operation to its
//! `db_*` methods. Its own job is conversion: `Node`/`User` models to bound
//! parameters on the way in, `libsql::Row` back to models on the way out.
//!
//! # Examples
//!
//! ```rust,no_run
//! use numtree_core::db::{DatabaseService, NodeStore, TursoStore};
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Arc::new(DatabaseService::new(PathBuf::from("./data/numtree.db")).await?);
//!     let store: Arc<dyn NodeStore> = Arc::new(TursoStore::new(db));
//!
//!     let roots = store.list_roots().await?;
//!     println!("{} trees", roots.len());
//!     Ok(())
//! }
//! ```

use crate::db::database::{DatabaseService, DbInsertNodeParams, MAX_BOUND_IDS};
use crate::db::node_store::NodeStore;
use crate::db::DatabaseError;
use crate::models::{Node, NodeKind, NodeStep, Operator, User};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Row, Rows};
use std::collections::HashMap;
use std::sync::Arc;

/// TursoStore implements NodeStore for the libsql backend
pub struct TursoStore {
    db: Arc<DatabaseService>,
}

impl TursoStore {
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    /// Underlying database service
    pub fn database(&self) -> &Arc<DatabaseService> {
        &self.db
    }

    /// Fixed-width RFC3339 with microseconds, so text order is time order
    fn format_timestamp(ts: &DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn parse_timestamp(table: &'static str, s: &str) -> Result<DateTime<Utc>, DatabaseError> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| DatabaseError::corrupt_row(table, format!("bad timestamp '{}': {}", s, e)))
    }

    /// Convert a libsql row to a Node
    ///
    /// Expected columns (in order): id, tree_id, parent_id, author_id, kind,
    /// value, op, right_operand, created_at
    fn row_to_node(row: &Row) -> Result<Node, DatabaseError> {
        let id: String = row.get(0)?;
        let tree_id: String = row.get(1)?;
        let parent_id: Option<String> = row.get(2)?;
        let author_id: String = row.get(3)?;
        let kind_str: String = row.get(4)?;
        let value: f64 = row.get(5)?;
        let op_str: Option<String> = row.get(6)?;
        let right: Option<f64> = row.get(7)?;
        let created_at_str: String = row.get(8)?;

        let kind: NodeKind = kind_str
            .parse()
            .map_err(|e: String| DatabaseError::corrupt_row("nodes", e))?;

        let step = match (kind, parent_id, op_str, right) {
            (NodeKind::Root, None, None, None) => NodeStep::Root,
            (NodeKind::Op, Some(parent_id), Some(op_str), Some(right)) => {
                let op: Operator = op_str
                    .parse()
                    .map_err(|e| DatabaseError::corrupt_row("nodes", format!("{}", e)))?;
                NodeStep::Op {
                    parent_id,
                    op,
                    right,
                }
            }
            _ => {
                return Err(DatabaseError::corrupt_row(
                    "nodes",
                    format!("node '{}' has fields inconsistent with kind {}", id, kind),
                ))
            }
        };

        Ok(Node {
            id,
            tree_id,
            author_id,
            value,
            step,
            created_at: Self::parse_timestamp("nodes", &created_at_str)?,
        })
    }

    /// Convert a libsql row to a User (columns: id, username, created_at)
    fn row_to_user(row: &Row) -> Result<User, DatabaseError> {
        let id: String = row.get(0)?;
        let username: String = row.get(1)?;
        let created_at_str: String = row.get(2)?;

        Ok(User {
            id,
            username,
            created_at: Self::parse_timestamp("users", &created_at_str)?,
        })
    }

    async fn collect_nodes(mut rows: Rows) -> Result<Vec<Node>, DatabaseError> {
        let mut nodes = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to fetch row: {}", e)))?
        {
            nodes.push(Self::row_to_node(&row)?);
        }
        Ok(nodes)
    }
}

#[async_trait]
impl NodeStore for TursoStore {
    async fn insert_node(&self, node: &Node) -> Result<(), DatabaseError> {
        let created_at = Self::format_timestamp(&node.created_at);
        let op = node.op().map(Operator::symbol);

        let params = DbInsertNodeParams {
            id: &node.id,
            tree_id: &node.tree_id,
            parent_id: node.parent_id(),
            author_id: &node.author_id,
            kind: node.kind().as_str(),
            value: node.value,
            op,
            right_operand: node.right(),
            created_at: &created_at,
        };

        self.db.db_insert_node(params).await
    }

    async fn get_node(&self, id: &str) -> Result<Option<Node>, DatabaseError> {
        match self.db.db_get_node(id).await? {
            Some(row) => Ok(Some(Self::row_to_node(&row)?)),
            None => Ok(None),
        }
    }

    async fn get_nodes_by_tree(&self, tree_id: &str) -> Result<Vec<Node>, DatabaseError> {
        let rows = self.db.db_get_nodes_by_tree(tree_id).await?;
        Self::collect_nodes(rows).await
    }

    async fn list_roots(&self) -> Result<Vec<Node>, DatabaseError> {
        let rows = self.db.db_list_roots(0, None).await?;
        Self::collect_nodes(rows).await
    }

    async fn list_roots_page(&self, offset: u64, limit: u64) -> Result<Vec<Node>, DatabaseError> {
        let rows = self.db.db_list_roots(offset, Some(limit)).await?;
        Self::collect_nodes(rows).await
    }

    async fn list_nodes(&self) -> Result<Vec<Node>, DatabaseError> {
        let rows = self.db.db_list_nodes().await?;
        Self::collect_nodes(rows).await
    }

    async fn list_nodes_in_trees(&self, tree_ids: &[String]) -> Result<Vec<Node>, DatabaseError> {
        if tree_ids.is_empty() {
            return Ok(Vec::new());
        }
        if tree_ids.len() > MAX_BOUND_IDS {
            return Err(DatabaseError::sql_execution(format!(
                "{} tree ids exceed the {} per query limit",
                tree_ids.len(),
                MAX_BOUND_IDS
            )));
        }
        let rows = self.db.db_list_nodes_in_trees(tree_ids).await?;
        Self::collect_nodes(rows).await
    }

    async fn count_nodes(&self) -> Result<u64, DatabaseError> {
        self.db.db_count_nodes().await
    }

    async fn insert_user(&self, user: &User, password_hash: &str) -> Result<(), DatabaseError> {
        let created_at = Self::format_timestamp(&user.created_at);
        self.db
            .db_insert_user(&user.id, &user.username, password_hash, &created_at)
            .await
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, DatabaseError> {
        match self.db.db_get_user(id).await? {
            Some(row) => Ok(Some(Self::row_to_user(&row)?)),
            None => Ok(None),
        }
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        match self.db.db_get_user_by_username(username).await? {
            Some(row) => Ok(Some(Self::row_to_user(&row)?)),
            None => Ok(None),
        }
    }

    async fn get_credentials(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, DatabaseError> {
        match self.db.db_get_credentials(username).await? {
            Some(row) => {
                let user = Self::row_to_user(&row)?;
                let password_hash: String = row.get(3)?;
                Ok(Some((user, password_hash)))
            }
            None => Ok(None),
        }
    }

    async fn get_usernames(&self, ids: &[String]) -> Result<HashMap<String, String>, DatabaseError> {
        let mut names = HashMap::with_capacity(ids.len());

        for chunk in ids.chunks(MAX_BOUND_IDS) {
            let mut rows = self.db.db_get_usernames(chunk).await?;
            while let Some(row) = rows
                .next()
                .await
                .map_err(|e| DatabaseError::sql_execution(format!("Failed to fetch row: {}", e)))?
            {
                let id: String = row.get(0)?;
                let username: String = row.get(1)?;
                names.insert(id, username);
            }
        }

        Ok(names)
    }

    async fn close(&self) -> Result<(), DatabaseError> {
        self.db.db_close().await
    }
}
