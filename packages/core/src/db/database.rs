//! Database Connection Management
//!
//! This module provides the database connection and schema initialization
//! for the numbers tree using libsql (Turso embedded SQLite).
//!
//! # Architecture
//!
//! - **Injected handle**: one `DatabaseService` is opened at startup and shared
//!   through `Arc`; there is no process-wide connection cache
//! - **WAL mode**: readers never block the writer and vice versa
//! - **Single-row writes**: every node is one `INSERT`, so a record is either
//!   fully visible or absent
//! - **Foreign keys**: a reply's `parent_id` must reference a stored node
//!
//! # Database Connection Patterns
//!
//! **Use `connect_with_timeout()` in async functions.** It sets a 5-second
//! busy timeout so concurrent writers wait instead of failing with
//! `SQLITE_BUSY`, and enables foreign keys on the new connection.
//!
//! ```no_run
//! # use numtree_core::db::DatabaseService;
//! # use std::path::PathBuf;
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let db_service = DatabaseService::new(PathBuf::from("./data/numtree.db")).await?;
//! let conn = db_service.connect_with_timeout().await?;
//! # Ok(())
//! # }
//! ```

use crate::db::error::DatabaseError;
use libsql::params::Params;
use libsql::{Builder, Database, Value};
use std::path::PathBuf;
use std::sync::Arc;

/// Columns selected for every node query, in `row_to_node` order
pub(crate) const NODE_COLUMNS: &str =
    "id, tree_id, parent_id, author_id, kind, value, op, right_operand, created_at";

/// Columns selected for every user query, in `row_to_user` order
pub(crate) const USER_COLUMNS: &str = "id, username, created_at";

/// Most ids bound into one `IN (...)` list; longer lists are split
pub const MAX_BOUND_IDS: usize = 500;

/// Database service for managing the libsql connection and schema
#[derive(Debug, Clone)]
pub struct DatabaseService {
    /// libsql database (wrapped in Arc for sharing)
    pub db: Arc<Database>,

    /// Path to the database file
    pub db_path: PathBuf,
}

/// Parameters for node insertion (avoids too-many-arguments lint)
pub struct DbInsertNodeParams<'a> {
    pub id: &'a str,
    pub tree_id: &'a str,
    pub parent_id: Option<&'a str>,
    pub author_id: &'a str,
    pub kind: &'a str,
    pub value: f64,
    pub op: Option<&'a str>,
    pub right_operand: Option<f64>,
    pub created_at: &'a str,
}

impl DatabaseService {
    /// Open (or create) the database at `db_path` and initialize the schema
    ///
    /// This will:
    /// 1. Ensure the parent directory exists
    /// 2. Open/create the database file
    /// 3. Create tables and indexes (idempotent)
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the directory cannot be created, the
    /// connection fails, or schema initialization fails.
    pub async fn new(db_path: PathBuf) -> Result<Self, DatabaseError> {
        let is_new_database = !db_path.exists();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::PermissionDenied {
                        DatabaseError::permission_denied(db_path.clone())
                    } else {
                        DatabaseError::DirectoryCreationFailed(e)
                    }
                })?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::connection_failed(db_path.clone(), e))?;

        let service = Self {
            db: Arc::new(db),
            db_path,
        };

        service.initialize_schema(is_new_database).await?;

        tracing::info!(path = %service.db_path.display(), "database ready");

        Ok(service)
    }

    /// Execute a PRAGMA statement
    ///
    /// PRAGMA statements may return rows, so they go through `query()`.
    async fn execute_pragma(
        &self,
        conn: &libsql::Connection,
        pragma: &str,
    ) -> Result<(), DatabaseError> {
        let mut stmt = conn.prepare(pragma).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        let _ = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    /// Create tables and indexes
    ///
    /// The `nodes` table encodes the node invariants as CHECK constraints: a
    /// root is its own tree and has no parent or operator, a reply has all
    /// three, and division by zero can never be stored.
    async fn initialize_schema(&self, is_new_database: bool) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        self.execute_pragma(&conn, "PRAGMA journal_mode = WAL")
            .await?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!("Failed to create users table: {}", e))
        })?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS nodes (
                id TEXT PRIMARY KEY,
                tree_id TEXT NOT NULL,
                parent_id TEXT,
                author_id TEXT NOT NULL,
                kind TEXT NOT NULL CHECK (kind IN ('ROOT', 'OP')),
                value REAL NOT NULL,
                op TEXT CHECK (op IS NULL OR op IN ('+', '-', '*', '/')),
                right_operand REAL,
                created_at TEXT NOT NULL,
                CHECK (
                    (kind = 'ROOT' AND tree_id = id AND parent_id IS NULL
                        AND op IS NULL AND right_operand IS NULL)
                    OR
                    (kind = 'OP' AND parent_id IS NOT NULL
                        AND op IS NOT NULL AND right_operand IS NOT NULL)
                ),
                CHECK (NOT (op = '/' AND right_operand = 0)),
                FOREIGN KEY (parent_id) REFERENCES nodes(id)
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!("Failed to create nodes table: {}", e))
        })?;

        self.create_indexes(&conn).await?;

        // Flush the fresh schema so a second handle on the same file sees it
        if is_new_database {
            self.execute_pragma(&conn, "PRAGMA wal_checkpoint(TRUNCATE)")
                .await?;
        }

        Ok(())
    }

    async fn create_indexes(&self, conn: &libsql::Connection) -> Result<(), DatabaseError> {
        let indexes = [
            (
                "idx_nodes_tree",
                "CREATE INDEX IF NOT EXISTS idx_nodes_tree ON nodes(tree_id, created_at)",
            ),
            (
                "idx_nodes_kind_created",
                "CREATE INDEX IF NOT EXISTS idx_nodes_kind_created ON nodes(kind, created_at)",
            ),
            (
                "idx_nodes_parent",
                "CREATE INDEX IF NOT EXISTS idx_nodes_parent ON nodes(parent_id)",
            ),
        ];

        for (name, sql) in indexes {
            conn.execute(sql, ()).await.map_err(|e| {
                DatabaseError::initialization_failed(format!(
                    "Failed to create index '{}': {}",
                    name, e
                ))
            })?;
        }

        Ok(())
    }

    /// Get a synchronous connection handle
    ///
    /// Prefer `connect_with_timeout()` in async code.
    pub fn connect(&self) -> Result<libsql::Connection, DatabaseError> {
        self.db.connect().map_err(DatabaseError::LibsqlError)
    }

    /// Get a connection with busy timeout and foreign keys configured
    pub async fn connect_with_timeout(&self) -> Result<libsql::Connection, DatabaseError> {
        let conn = self.connect()?;

        self.execute_pragma(&conn, "PRAGMA busy_timeout = 5000")
            .await?;
        self.execute_pragma(&conn, "PRAGMA foreign_keys = ON")
            .await?;

        Ok(conn)
    }

    //
    // NODE OPERATIONS
    // Raw SQL only. Row conversion and business rules live in TursoStore and
    // the services.
    //

    /// Insert one fully built node record
    pub async fn db_insert_node(
        &self,
        params: DbInsertNodeParams<'_>,
    ) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute(
            "INSERT INTO nodes (id, tree_id, parent_id, author_id, kind, value, op, right_operand, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            (
                params.id,
                params.tree_id,
                params.parent_id,
                params.author_id,
                params.kind,
                params.value,
                params.op,
                params.right_operand,
                params.created_at,
            ),
        )
        .await
        .map_err(|e| classify_write_error("node", e))?;

        Ok(())
    }

    /// Retrieve a single node row by ID
    pub async fn db_get_node(&self, id: &str) -> Result<Option<libsql::Row>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(&format!("SELECT {} FROM nodes WHERE id = ?", NODE_COLUMNS))
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare get_node query: {}", e))
            })?;

        let mut rows = stmt.query([id]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute get_node query: {}", e))
        })?;

        rows.next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))
    }

    /// All nodes of one tree, oldest first (insertion order breaks ties)
    ///
    /// Caller must consume the rows before the returned iterator is dropped.
    pub async fn db_get_nodes_by_tree(
        &self,
        tree_id: &str,
    ) -> Result<libsql::Rows, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM nodes WHERE tree_id = ? ORDER BY created_at ASC, rowid ASC",
                NODE_COLUMNS
            ))
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare tree query: {}", e))
            })?;

        stmt.query([tree_id]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute tree query: {}", e))
        })
    }

    /// Root nodes, newest first, with an optional page window
    pub async fn db_list_roots(
        &self,
        offset: u64,
        limit: Option<u64>,
    ) -> Result<libsql::Rows, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        // SQLite treats a negative LIMIT as "no limit"
        let limit = limit.map(|l| l as i64).unwrap_or(-1);

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM nodes WHERE kind = 'ROOT'
                 ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?",
                NODE_COLUMNS
            ))
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare roots query: {}", e))
            })?;

        stmt.query((limit, offset as i64)).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute roots query: {}", e))
        })
    }

    /// The whole node collection, oldest first
    pub async fn db_list_nodes(&self) -> Result<libsql::Rows, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM nodes ORDER BY created_at ASC, rowid ASC",
                NODE_COLUMNS
            ))
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare list query: {}", e))
            })?;

        stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute list query: {}", e))
        })
    }

    /// Nodes belonging to any of `tree_ids`, oldest first
    ///
    /// `tree_ids` must not be empty and at most [`MAX_BOUND_IDS`] long.
    pub async fn db_list_nodes_in_trees(
        &self,
        tree_ids: &[String],
    ) -> Result<libsql::Rows, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let query = format!(
            "SELECT {} FROM nodes WHERE tree_id IN ({}) ORDER BY created_at ASC, rowid ASC",
            NODE_COLUMNS,
            placeholders(tree_ids.len())
        );

        let mut stmt = conn.prepare(&query).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to prepare tree batch query: {}", e))
        })?;

        stmt.query(text_params(tree_ids))
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to execute tree batch query: {}", e))
            })
    }

    /// Total number of stored nodes
    pub async fn db_count_nodes(&self) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut rows = conn
            .query("SELECT COUNT(*) FROM nodes", ())
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to count nodes: {}", e)))?;

        let row = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
            .ok_or_else(|| DatabaseError::sql_execution("COUNT(*) returned no row"))?;

        let count: i64 = row.get(0)?;
        Ok(count.max(0) as u64)
    }

    //
    // USER OPERATIONS
    //

    /// Insert a user record
    pub async fn db_insert_user(
        &self,
        id: &str,
        username: &str,
        password_hash: &str,
        created_at: &str,
    ) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute(
            "INSERT INTO users (id, username, password_hash, created_at) VALUES (?, ?, ?, ?)",
            (id, username, password_hash, created_at),
        )
        .await
        .map_err(|e| classify_write_error("user", e))?;

        Ok(())
    }

    /// Retrieve a user row by ID
    pub async fn db_get_user(&self, id: &str) -> Result<Option<libsql::Row>, DatabaseError> {
        self.db_get_user_where("id", id).await
    }

    /// Retrieve a user row by username
    pub async fn db_get_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<libsql::Row>, DatabaseError> {
        self.db_get_user_where("username", username).await
    }

    /// User row by username with `password_hash` appended as the last column
    pub async fn db_get_credentials(
        &self,
        username: &str,
    ) -> Result<Option<libsql::Row>, DatabaseError> {
        let columns = format!("{}, password_hash", USER_COLUMNS);
        self.db_select_user(&columns, "username", username).await
    }

    async fn db_get_user_where(
        &self,
        column: &'static str,
        key: &str,
    ) -> Result<Option<libsql::Row>, DatabaseError> {
        self.db_select_user(USER_COLUMNS, column, key).await
    }

    async fn db_select_user(
        &self,
        columns: &str,
        column: &'static str,
        key: &str,
    ) -> Result<Option<libsql::Row>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM users WHERE {} = ?",
                columns, column
            ))
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare user query: {}", e))
            })?;

        let mut rows = stmt.query([key]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute user query: {}", e))
        })?;

        rows.next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))
    }

    /// `(id, username)` rows for the given user ids
    ///
    /// `ids` must not be empty and at most [`MAX_BOUND_IDS`] long.
    pub async fn db_get_usernames(&self, ids: &[String]) -> Result<libsql::Rows, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let query = format!(
            "SELECT id, username FROM users WHERE id IN ({})",
            placeholders(ids.len())
        );

        let mut stmt = conn.prepare(&query).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to prepare username query: {}", e))
        })?;

        stmt.query(text_params(ids))
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to execute username query: {}", e))
            })
    }

    /// Flush the WAL before shutdown
    pub async fn db_close(&self) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        self.execute_pragma(&conn, "PRAGMA wal_checkpoint(TRUNCATE)")
            .await?;

        tracing::info!(path = %self.db_path.display(), "database checkpointed for shutdown");
        Ok(())
    }
}

/// `?, ?, ?` with `count` placeholders
fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn text_params(values: &[String]) -> Params {
    Params::Positional(values.iter().cloned().map(Value::Text).collect())
}

fn classify_write_error(record: &str, e: libsql::Error) -> DatabaseError {
    let message = e.to_string();
    if message.contains("UNIQUE constraint failed") {
        DatabaseError::Duplicate(format!("{}: {}", record, message))
    } else {
        DatabaseError::sql_execution(format!("Failed to insert {}: {}", record, message))
    }
}
