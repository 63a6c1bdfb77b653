//! TursoStore - NodeStore Implementation for Turso/libsql Backend
//!
//! This module implements the `NodeStore` trait on top of
//! [`DatabaseService`]. Each transaction handle is a dedicated
//! `libsql::Connection` with busy timeout and foreign keys configured.
//!
//! # Design Principles
//!
//! 1. **Pure SQL**: No tree rules here; the service validates before writing
//! 2. **Row Conversion**: Handles libsql::Row → Node model conversion
//! 3. **Index-friendly predicates**: Subtree selection is a range scan on
//!    `idx_nodes_path`, never a `LIKE` pattern
//! 4. **Single-statement cascades**: A subtree rewrite is one `UPDATE`
//!
//! # Examples
//!
//! ```rust,no_run
//! use nodepath_core::db::{DatabaseService, NodeStore, TursoStore};
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let db = Arc::new(DatabaseService::new(PathBuf::from("./data/test.db")).await?);
//!     let store = TursoStore::new(db);
//!
//!     let conn = store.connect().await?;
//!     let node = store.get_node(&conn, "node-123").await?;
//!
//!     Ok(())
//! }
//! ```

use crate::db::error::DatabaseError;
use crate::db::node_store::{NodeRow, NodeStore};
use crate::db::schema::NODE_COLUMNS;
use crate::db::DatabaseService;
use crate::models::Node;
use crate::operations::{PathRow, TreeRow};
use crate::query::{descendant_range, NodeQuery, PathPredicate};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use libsql::params::Params;
use libsql::{Connection, Row, Rows, Value};
use std::sync::Arc;

/// TursoStore implements NodeStore trait for Turso/libsql backend
#[derive(Debug, Clone)]
pub struct TursoStore {
    db: Arc<DatabaseService>,
}

impl TursoStore {
    /// Create a new TursoStore over an initialized database
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    /// Underlying database service
    pub fn database(&self) -> &Arc<DatabaseService> {
        &self.db
    }

    /// Parse timestamp from database - handles both SQLite and RFC3339 formats
    ///
    /// SQLite CURRENT_TIMESTAMP returns: "YYYY-MM-DD HH:MM:SS"
    fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
            return Ok(naive.and_utc());
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }

        Err(anyhow::anyhow!(
            "Unable to parse timestamp '{}' as SQLite or RFC3339 format",
            s
        ))
    }

    /// Convert libsql::Row to Node model
    ///
    /// Expects the columns of [`NODE_COLUMNS`], in order.
    fn row_to_node(row: &Row) -> Result<Node> {
        let id: String = row.get(0).context("Failed to get id")?;
        let key: String = row.get(1).context("Failed to get key")?;
        let parent_id: Option<String> = row.get(2).context("Failed to get parent_id")?;
        let path: String = row.get(3).context("Failed to get path")?;
        let label: String = row.get(4).context("Failed to get label")?;
        let version: i64 = row.get(5).context("Failed to get version")?;
        let created_at_str: String = row.get(6).context("Failed to get created_at")?;
        let modified_at_str: String = row.get(7).context("Failed to get modified_at")?;

        let created_at =
            Self::parse_timestamp(&created_at_str).context("Failed to parse created_at")?;
        let modified_at =
            Self::parse_timestamp(&modified_at_str).context("Failed to parse modified_at")?;

        Ok(Node {
            id,
            key,
            parent_id,
            path,
            label,
            version,
            created_at,
            modified_at,
        })
    }

    async fn collect_nodes(mut rows: Rows) -> Result<Vec<Node>, DatabaseError> {
        let mut nodes = Vec::new();
        while let Some(row) = next_row(&mut rows).await? {
            nodes.push(decode_node(&row)?);
        }
        Ok(nodes)
    }

    async fn fetch_one(
        conn: &Connection,
        sql: &str,
        value: &str,
    ) -> Result<Option<Node>, DatabaseError> {
        let mut rows = conn.query(sql, [value]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", sql, e))
        })?;

        match next_row(&mut rows).await? {
            Some(row) => Ok(Some(decode_node(&row)?)),
            None => Ok(None),
        }
    }
}

fn decode_node(row: &Row) -> Result<Node, DatabaseError> {
    TursoStore::row_to_node(row)
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to decode node row: {:#}", e)))
}

async fn next_row(rows: &mut Rows) -> Result<Option<Row>, DatabaseError> {
    rows.next()
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to read row: {}", e)))
}

fn text_params(params: Vec<String>) -> Params {
    Params::Positional(params.into_iter().map(Value::Text).collect())
}

#[async_trait]
impl NodeStore for TursoStore {
    type Tx = Connection;

    async fn begin(&self) -> Result<Connection, DatabaseError> {
        self.db.begin_immediate().await
    }

    async fn commit(&self, tx: Connection) -> Result<(), DatabaseError> {
        self.db.commit(&tx).await
    }

    async fn rollback(&self, tx: Connection) {
        self.db.rollback(&tx).await
    }

    async fn connect(&self) -> Result<Connection, DatabaseError> {
        self.db.connect_with_timeout().await
    }

    async fn get_node(&self, tx: &Connection, id: &str) -> Result<Option<Node>, DatabaseError> {
        let sql = format!("SELECT {} FROM nodes WHERE id = ?", NODE_COLUMNS);
        Self::fetch_one(tx, &sql, id).await
    }

    async fn get_node_by_key(
        &self,
        tx: &Connection,
        key: &str,
    ) -> Result<Option<Node>, DatabaseError> {
        let sql = format!("SELECT {} FROM nodes WHERE key = ?", NODE_COLUMNS);
        Self::fetch_one(tx, &sql, key).await
    }

    async fn insert_node(&self, tx: &Connection, row: NodeRow<'_>) -> Result<(), DatabaseError> {
        tx.execute(
            "INSERT INTO nodes (id, key, parent_id, path, label) VALUES (?, ?, ?, ?, ?)",
            (row.id, row.key, row.parent_id, row.path, row.label),
        )
        .await
        .map_err(|e| DatabaseError::from_statement("Failed to insert node", e))?;
        Ok(())
    }

    async fn update_node(&self, tx: &Connection, row: NodeRow<'_>) -> Result<u64, DatabaseError> {
        tx.execute(
            "UPDATE nodes SET key = ?, parent_id = ?, path = ?, label = ?, version = version + 1, modified_at = CURRENT_TIMESTAMP WHERE id = ?",
            (row.key, row.parent_id, row.path, row.label, row.id),
        )
        .await
        .map_err(|e| DatabaseError::from_statement("Failed to update node", e))
    }

    async fn set_path(&self, tx: &Connection, id: &str, path: &str) -> Result<u64, DatabaseError> {
        tx.execute(
            "UPDATE nodes SET path = ?, modified_at = CURRENT_TIMESTAMP WHERE id = ?",
            (path, id),
        )
        .await
        .map_err(|e| DatabaseError::from_statement("Failed to set path", e))
    }

    async fn subtree_rows(&self, tx: &Connection, path: &str) -> Result<Vec<PathRow>, DatabaseError> {
        let (lower, upper) = descendant_range(path);
        let mut rows = tx
            .query(
                "SELECT id, parent_id, path FROM nodes WHERE path >= ? AND path < ? ORDER BY path",
                (lower, upper),
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to select subtree of '{}': {}", path, e))
            })?;

        let mut result = Vec::new();
        while let Some(row) = next_row(&mut rows).await? {
            result.push(PathRow {
                id: row.get(0)?,
                parent_id: row.get(1)?,
                path: row.get(2)?,
            });
        }
        Ok(result)
    }

    async fn child_ids(&self, tx: &Connection, id: &str) -> Result<Vec<String>, DatabaseError> {
        let mut rows = tx
            .query("SELECT id FROM nodes WHERE parent_id = ? ORDER BY key", [id])
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to select children of '{}': {}", id, e))
            })?;

        let mut ids = Vec::new();
        while let Some(row) = next_row(&mut rows).await? {
            ids.push(row.get(0)?);
        }
        Ok(ids)
    }

    async fn rewrite_subtree(
        &self,
        tx: &Connection,
        old_path: &str,
        new_path: &str,
    ) -> Result<u64, DatabaseError> {
        let (lower, upper) = descendant_range(old_path);
        // substr() is 1-based; keep everything from the separator after old_path
        let suffix_start = old_path.chars().count() as i64 + 1;

        tx.execute(
            "UPDATE nodes SET path = ? || substr(path, ?), version = version + 1, modified_at = CURRENT_TIMESTAMP WHERE path >= ? AND path < ?",
            (new_path, suffix_start, lower, upper),
        )
        .await
        .map_err(|e| {
            DatabaseError::from_statement(
                &format!("Failed to rewrite subtree '{}' to '{}'", old_path, new_path),
                e,
            )
        })
    }

    async fn promote_subtree(
        &self,
        tx: &Connection,
        old_path: &str,
        parent_path: Option<&str>,
    ) -> Result<u64, DatabaseError> {
        match parent_path {
            Some(parent_path) => self.rewrite_subtree(tx, old_path, parent_path).await,
            None => {
                let (lower, upper) = descendant_range(old_path);
                // Skip old_path and the separator that follows it
                let suffix_start = old_path.chars().count() as i64 + 2;

                tx.execute(
                    "UPDATE nodes SET path = substr(path, ?), version = version + 1, modified_at = CURRENT_TIMESTAMP WHERE path >= ? AND path < ?",
                    (suffix_start, lower, upper),
                )
                .await
                .map_err(|e| {
                    DatabaseError::from_statement(
                        &format!("Failed to promote subtree of '{}'", old_path),
                        e,
                    )
                })
            }
        }
    }

    async fn reparent_children(
        &self,
        tx: &Connection,
        id: &str,
        new_parent_id: Option<&str>,
    ) -> Result<u64, DatabaseError> {
        tx.execute(
            "UPDATE nodes SET parent_id = ?, modified_at = CURRENT_TIMESTAMP WHERE parent_id = ?",
            (new_parent_id, id),
        )
        .await
        .map_err(|e| {
            DatabaseError::from_statement(&format!("Failed to reparent children of '{}'", id), e)
        })
    }

    async fn delete_subtree(&self, tx: &Connection, path: &str) -> Result<u64, DatabaseError> {
        let filter = PathPredicate::descendant_of(path).to_sql();
        let sql = format!("DELETE FROM nodes WHERE {}", filter.clause);

        tx.execute(&sql, text_params(filter.params))
            .await
            .map_err(|e| {
                DatabaseError::from_statement(&format!("Failed to delete subtree '{}'", path), e)
            })
    }

    async fn tree_rows(&self, tx: &Connection) -> Result<Vec<TreeRow>, DatabaseError> {
        let mut rows = tx
            .query("SELECT id, key, parent_id, path FROM nodes ORDER BY path", ())
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to load tree: {}", e)))?;

        let mut result = Vec::new();
        while let Some(row) = next_row(&mut rows).await? {
            result.push(TreeRow {
                id: row.get(0)?,
                key: row.get(1)?,
                parent_id: row.get(2)?,
                path: row.get(3)?,
            });
        }
        Ok(result)
    }

    async fn query_nodes(
        &self,
        tx: &Connection,
        query: &NodeQuery,
    ) -> Result<Vec<Node>, DatabaseError> {
        let (sql, params) = query.to_sql();
        tracing::debug!(sql = %sql, params = ?params, "Running node query");

        let rows = tx.query(&sql, text_params(params)).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute node query: {}", e))
        })?;

        Self::collect_nodes(rows).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_store() -> (TursoStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = DatabaseService::new(temp_dir.path().join("test.db"))
            .await
            .unwrap();
        (TursoStore::new(Arc::new(db)), temp_dir)
    }

    fn row<'a>(id: &'a str, parent_id: Option<&'a str>, path: &'a str) -> NodeRow<'a> {
        NodeRow {
            id,
            key: path.rsplit('.').next().unwrap(),
            parent_id,
            path,
            label: "",
        }
    }

    async fn seed(store: &TursoStore, conn: &Connection) {
        for (id, parent, path) in [
            ("top", None, "top"),
            ("science", Some("top"), "top.science"),
            ("biology", Some("science"), "top.science.biology"),
            ("genetics", Some("biology"), "top.science.biology.genetics"),
            ("maths", Some("science"), "top.science.maths"),
            ("topology", None, "topology"),
        ] {
            store.insert_node(conn, row(id, parent, path)).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let (store, _temp_dir) = create_test_store().await;
        let conn = store.connect().await.unwrap();
        seed(&store, &conn).await;

        let science = store.get_node(&conn, "science").await.unwrap().unwrap();
        assert_eq!(science.path, "top.science");
        assert_eq!(science.parent_id.as_deref(), Some("top"));
        assert_eq!(science.version, 1);

        let by_key = store.get_node_by_key(&conn, "maths").await.unwrap().unwrap();
        assert_eq!(by_key.id, "maths");

        assert!(store.get_node(&conn, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_key_is_constraint_violation() {
        let (store, _temp_dir) = create_test_store().await;
        let conn = store.connect().await.unwrap();
        seed(&store, &conn).await;

        let err = store
            .insert_node(
                &conn,
                NodeRow {
                    id: "science2",
                    key: "science",
                    parent_id: None,
                    path: "science",
                    label: "",
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_unique_key_violation(), "{}", err);
    }

    #[tokio::test]
    async fn test_missing_parent_is_rejected_by_foreign_key() {
        let (store, _temp_dir) = create_test_store().await;
        let conn = store.connect().await.unwrap();

        let err = store
            .insert_node(&conn, row("orphan", Some("ghost"), "ghost.orphan"))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation { .. }));
    }

    #[tokio::test]
    async fn test_subtree_rows_respect_key_boundary() {
        let (store, _temp_dir) = create_test_store().await;
        let conn = store.connect().await.unwrap();
        seed(&store, &conn).await;

        let rows = store.subtree_rows(&conn, "top").await.unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["science", "biology", "genetics", "maths"]);
    }

    #[tokio::test]
    async fn test_rewrite_subtree_single_statement() {
        let (store, _temp_dir) = create_test_store().await;
        let conn = store.connect().await.unwrap();
        seed(&store, &conn).await;

        let rewritten = store
            .rewrite_subtree(&conn, "top.science", "top.magic")
            .await
            .unwrap();
        assert_eq!(rewritten, 3);

        let genetics = store.get_node(&conn, "genetics").await.unwrap().unwrap();
        assert_eq!(genetics.path, "top.magic.biology.genetics");
        assert_eq!(genetics.version, 2);

        // The subtree root itself is not part of the rewrite
        let science = store.get_node(&conn, "science").await.unwrap().unwrap();
        assert_eq!(science.path, "top.science");
    }

    #[tokio::test]
    async fn test_trigger_rejects_parent_inside_own_subtree() {
        let (store, _temp_dir) = create_test_store().await;
        let conn = store.connect().await.unwrap();
        seed(&store, &conn).await;

        let err = store
            .update_node(
                &conn,
                NodeRow {
                    id: "science",
                    key: "science",
                    parent_id: Some("genetics"),
                    path: "top.science.biology.genetics.science",
                    label: "",
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_ancestry_violation(), "{}", err);
    }

    #[tokio::test]
    async fn test_self_parent_rejected_by_check_constraint() {
        let (store, _temp_dir) = create_test_store().await;
        let conn = store.connect().await.unwrap();
        seed(&store, &conn).await;

        let err = conn
            .execute("UPDATE nodes SET parent_id = id WHERE id = 'maths'", ())
            .await
            .map_err(|e| DatabaseError::from_statement("raw update", e))
            .unwrap_err();
        assert!(err.is_ancestry_violation(), "{}", err);
    }

    #[tokio::test]
    async fn test_promote_subtree_to_roots() {
        let (store, _temp_dir) = create_test_store().await;
        let conn = store.connect().await.unwrap();
        seed(&store, &conn).await;

        let rewritten = store.promote_subtree(&conn, "top", None).await.unwrap();
        assert_eq!(rewritten, 4);
        let moved = store.reparent_children(&conn, "top", None).await.unwrap();
        assert_eq!(moved, 1);

        let genetics = store.get_node(&conn, "genetics").await.unwrap().unwrap();
        assert_eq!(genetics.path, "science.biology.genetics");
        let science = store.get_node(&conn, "science").await.unwrap().unwrap();
        assert_eq!(science.path, "science");
        assert!(science.parent_id.is_none());
    }

    #[tokio::test]
    async fn test_delete_subtree() {
        let (store, _temp_dir) = create_test_store().await;
        let conn = store.connect().await.unwrap();
        seed(&store, &conn).await;

        let removed = store.delete_subtree(&conn, "top.science").await.unwrap();
        assert_eq!(removed, 4);

        let remaining = store.tree_rows(&conn).await.unwrap();
        let ids: Vec<&str> = remaining.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["top", "topology"]);
    }

    #[tokio::test]
    async fn test_query_nodes_descendants_in_path_order() {
        let (store, _temp_dir) = create_test_store().await;
        let conn = store.connect().await.unwrap();
        seed(&store, &conn).await;

        let nodes = store
            .query_nodes(&conn, &NodeQuery::descendants_of("top.science"))
            .await
            .unwrap();
        let paths: Vec<&str> = nodes.iter().map(|n| n.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "top.science",
                "top.science.biology",
                "top.science.biology.genetics",
                "top.science.maths",
            ]
        );
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(TursoStore::parse_timestamp("2026-01-15 10:30:00").is_ok());
        assert!(TursoStore::parse_timestamp("2026-01-15T10:30:00Z").is_ok());
        assert!(TursoStore::parse_timestamp("yesterday").is_err());
    }
}
