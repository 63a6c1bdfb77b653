//! Database Connection Management
//!
//! This module provides the database handle, per-connection configuration
//! and the one-time schema installation for the `nodes` table.
//!
//! # Architecture
//!
//! - **Path-agnostic**: Accepts any valid PathBuf
//! - **WAL mode**: Readers proceed while a cascade holds the write lock
//! - **Foreign keys**: Enabled on every connection (`parent_id` must exist)
//! - **Idempotent setup**: Every DDL statement uses `IF NOT EXISTS`
//!
//! # Connections
//!
//! Each operation opens its own connection with `connect_with_timeout()`.
//! The busy timeout lets a writer wait for a concurrent cascade to finish
//! instead of failing immediately with `SQLITE_BUSY`.
//!
//! ```no_run
//! # use nodepath_core::db::DatabaseService;
//! # use std::path::PathBuf;
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let db_service = DatabaseService::new(PathBuf::from("./data/categories.db")).await?;
//! let conn = db_service.connect_with_timeout().await?;
//! # Ok(())
//! # }
//! ```

use crate::config::TreeConfig;
use crate::db::error::DatabaseError;
use crate::db::schema;
use libsql::{Builder, Database};
use std::path::PathBuf;
use std::sync::Arc;

/// Default busy timeout applied to every connection
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Database service for managing the libsql handle and schema
#[derive(Clone)]
pub struct DatabaseService {
    /// libsql database (wrapped in Arc for sharing)
    pub db: Arc<Database>,

    /// Path to the database file
    pub db_path: PathBuf,

    busy_timeout_ms: u64,
}

impl std::fmt::Debug for DatabaseService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseService")
            .field("db_path", &self.db_path)
            .field("busy_timeout_ms", &self.busy_timeout_ms)
            .finish()
    }
}

impl DatabaseService {
    /// Open (or create) the database at `db_path` and install the schema
    ///
    /// This will:
    /// 1. Ensure the parent directory exists (create if needed)
    /// 2. Open/create the database file
    /// 3. Install table, indexes and the no-self-ancestry trigger
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if:
    /// - Parent directory cannot be created
    /// - Database connection fails
    /// - Schema installation fails
    pub async fn new(db_path: PathBuf) -> Result<Self, DatabaseError> {
        Self::open(db_path, DEFAULT_BUSY_TIMEOUT_MS).await
    }

    /// Open the database described by `config`
    pub async fn from_config(config: &TreeConfig) -> Result<Self, DatabaseError> {
        config
            .validate()
            .map_err(DatabaseError::initialization_failed)?;
        Self::open(config.database_path.clone(), config.busy_timeout_ms).await
    }

    async fn open(db_path: PathBuf, busy_timeout_ms: u64) -> Result<Self, DatabaseError> {
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
            busy_timeout_ms,
        };

        service.install_schema(is_new_database).await?;

        Ok(service)
    }

    /// Execute a PRAGMA statement
    ///
    /// PRAGMA statements return rows, so we must use query() instead of execute().
    async fn execute_pragma(
        &self,
        conn: &libsql::Connection,
        pragma: &str,
    ) -> Result<(), DatabaseError> {
        let mut stmt = conn.prepare(pragma).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        let mut rows = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        // Step once so setter pragmas take effect even if rows are lazy
        let _ = rows.next().await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    /// Install table, indexes and constraints
    ///
    /// Safe to call on every start: all statements are `IF NOT EXISTS`.
    ///
    /// - `nodes` table with `CHECK` constraints for self-parenting and key format
    /// - UNIQUE index on `key`, plain indexes on `path` and `parent_id`
    /// - `nodes_no_self_ancestry` trigger rejecting parent assignments into
    ///   the node's own subtree
    async fn install_schema(&self, is_new_database: bool) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        self.execute_pragma(&conn, "PRAGMA journal_mode = WAL")
            .await?;

        conn.execute(schema::CREATE_NODES_TABLE, ())
            .await
            .map_err(|e| {
                DatabaseError::initialization_failed(format!(
                    "Failed to create nodes table: {}",
                    e
                ))
            })?;

        for (name, statement) in schema::CREATE_INDEXES {
            conn.execute(statement, ()).await.map_err(|e| {
                DatabaseError::initialization_failed(format!(
                    "Failed to create index '{}': {}",
                    name, e
                ))
            })?;
        }

        conn.execute(schema::CREATE_ANCESTRY_TRIGGER, ())
            .await
            .map_err(|e| {
                DatabaseError::initialization_failed(format!(
                    "Failed to create trigger 'nodes_no_self_ancestry': {}",
                    e
                ))
            })?;

        if is_new_database {
            self.execute_pragma(&conn, "PRAGMA wal_checkpoint(TRUNCATE)")
                .await?;
        }

        tracing::info!(
            path = %self.db_path.display(),
            new = is_new_database,
            "Installed node path schema"
        );

        Ok(())
    }

    /// Get a raw connection to the database
    ///
    /// Prefer `connect_with_timeout()`; a raw connection has neither the busy
    /// timeout nor foreign key enforcement configured.
    pub fn connect(&self) -> Result<libsql::Connection, DatabaseError> {
        self.db.connect().map_err(DatabaseError::LibsqlError)
    }

    /// Get a connection with busy timeout and foreign keys configured
    pub async fn connect_with_timeout(&self) -> Result<libsql::Connection, DatabaseError> {
        let conn = self.connect()?;

        self.execute_pragma(
            &conn,
            &format!("PRAGMA busy_timeout = {}", self.busy_timeout_ms),
        )
        .await?;

        // Foreign key enforcement is per connection in SQLite
        self.execute_pragma(&conn, "PRAGMA foreign_keys = ON")
            .await?;

        Ok(conn)
    }

    /// Start a write transaction on a fresh connection
    ///
    /// `BEGIN IMMEDIATE` takes the write lock up front, so the snapshot read
    /// by the Mutation Guard is the one the cascade writes against.
    pub async fn begin_immediate(&self) -> Result<libsql::Connection, DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        conn.execute("BEGIN IMMEDIATE", ()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to begin transaction: {}", e))
        })?;
        Ok(conn)
    }

    /// Commit the transaction open on `conn`
    pub async fn commit(&self, conn: &libsql::Connection) -> Result<(), DatabaseError> {
        if let Err(e) = conn.execute("COMMIT", ()).await {
            let _rollback = conn.execute("ROLLBACK", ()).await;
            return Err(DatabaseError::sql_execution(format!(
                "Failed to commit transaction: {}",
                e
            )));
        }
        Ok(())
    }

    /// Roll back the transaction open on `conn`
    pub async fn rollback(&self, conn: &libsql::Connection) {
        if let Err(e) = conn.execute("ROLLBACK", ()).await {
            tracing::warn!("Failed to roll back transaction: {}", e);
        }
    }
}
