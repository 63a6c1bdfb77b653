//! NodeStore Trait - Database Abstraction Layer
//!
//! This module defines the `NodeStore` trait: the row-level storage services
//! the tree engine needs from a relational store. Business rules (cycle
//! checks, path computation, cascade planning) live in
//! [`TreeService`](crate::services::TreeService); implementations only run
//! SQL.
//!
//! # Transactions
//!
//! Every tree mutation reads, validates and writes inside one transaction.
//! The trait therefore exposes a transaction handle (`Tx`): the service calls
//! [`begin`](NodeStore::begin), passes the handle to each row operation, then
//! [`commit`](NodeStore::commit)s or [`rollback`](NodeStore::rollback)s.
//! Reads that need no isolation use [`connect`](NodeStore::connect), which
//! returns a handle in autocommit mode.
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
//!     let db = Arc::new(DatabaseService::new(PathBuf::from("./data/tree.db")).await?);
//!     let store = TursoStore::new(db);
//!
//!     let tx = store.begin().await?;
//!     let top = store.get_node_by_key(&tx, "top").await?;
//!     store.commit(tx).await?;
//!     println!("{:?}", top.map(|n| n.path));
//!     Ok(())
//! }
//! ```

use crate::db::error::DatabaseError;
use crate::models::Node;
use crate::operations::{PathRow, TreeRow};
use crate::query::NodeQuery;
use async_trait::async_trait;

/// Column values written by insert and update
///
/// Borrowed so callers can build it from a `Node` or from parameters
/// without cloning.
#[derive(Debug, Clone, Copy)]
pub struct NodeRow<'a> {
    pub id: &'a str,
    pub key: &'a str,
    pub parent_id: Option<&'a str>,
    pub path: &'a str,
    pub label: &'a str,
}

impl<'a> From<&'a Node> for NodeRow<'a> {
    fn from(node: &'a Node) -> Self {
        Self {
            id: &node.id,
            key: &node.key,
            parent_id: node.parent_id.as_deref(),
            path: &node.path,
            label: &node.label,
        }
    }
}

/// Row-level storage services used by the tree engine
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow usage in async contexts where
/// futures may be moved between threads.
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// Transaction (or autocommit) handle passed to every row operation
    type Tx: Send + Sync;

    //
    // TRANSACTION LIFECYCLE
    //

    /// Start a write transaction holding the store's write lock
    async fn begin(&self) -> Result<Self::Tx, DatabaseError>;

    /// Commit a transaction started with `begin`
    async fn commit(&self, tx: Self::Tx) -> Result<(), DatabaseError>;

    /// Roll back a transaction started with `begin`
    ///
    /// Never fails: a failed rollback is logged and the handle dropped.
    async fn rollback(&self, tx: Self::Tx);

    /// Handle for standalone reads (no explicit transaction)
    async fn connect(&self) -> Result<Self::Tx, DatabaseError>;

    //
    // SINGLE ROW OPERATIONS
    //

    /// Get node by ID (`Ok(None)` if it doesn't exist)
    async fn get_node(&self, tx: &Self::Tx, id: &str) -> Result<Option<Node>, DatabaseError>;

    /// Get node by its unique key
    async fn get_node_by_key(
        &self,
        tx: &Self::Tx,
        key: &str,
    ) -> Result<Option<Node>, DatabaseError>;

    /// Insert a new row with version 1
    ///
    /// # Errors
    ///
    /// `ConstraintViolation` if the id or key is taken, or the parent
    /// doesn't exist.
    async fn insert_node(&self, tx: &Self::Tx, row: NodeRow<'_>) -> Result<(), DatabaseError>;

    /// Overwrite key, parent, path and label of `row.id`, bumping its version
    ///
    /// Returns the number of rows updated (0 if the node doesn't exist).
    async fn update_node(&self, tx: &Self::Tx, row: NodeRow<'_>) -> Result<u64, DatabaseError>;

    /// Overwrite only the stored path of one row
    async fn set_path(&self, tx: &Self::Tx, id: &str, path: &str) -> Result<u64, DatabaseError>;

    //
    // SUBTREE OPERATIONS
    //

    /// Rows strictly below `path`, selected by path prefix
    async fn subtree_rows(&self, tx: &Self::Tx, path: &str)
        -> Result<Vec<PathRow>, DatabaseError>;

    /// IDs of rows whose `parent_id` is `id`
    async fn child_ids(&self, tx: &Self::Tx, id: &str) -> Result<Vec<String>, DatabaseError>;

    /// Replace the `old_path.` prefix with `new_path.` on every row strictly
    /// below `old_path`, in a single statement
    ///
    /// Returns the number of rows rewritten.
    async fn rewrite_subtree(
        &self,
        tx: &Self::Tx,
        old_path: &str,
        new_path: &str,
    ) -> Result<u64, DatabaseError>;

    /// Drop `old_path` from the middle of every descendant's path
    ///
    /// Rows below `old_path` are re-rooted at `parent_path`, or lose the
    /// prefix entirely when `parent_path` is `None`. Single statement.
    async fn promote_subtree(
        &self,
        tx: &Self::Tx,
        old_path: &str,
        parent_path: Option<&str>,
    ) -> Result<u64, DatabaseError>;

    /// Point every child of `id` at `new_parent_id`
    async fn reparent_children(
        &self,
        tx: &Self::Tx,
        id: &str,
        new_parent_id: Option<&str>,
    ) -> Result<u64, DatabaseError>;

    /// Delete the row at `path` and every row below it
    ///
    /// Returns the number of rows deleted.
    async fn delete_subtree(&self, tx: &Self::Tx, path: &str) -> Result<u64, DatabaseError>;

    //
    // WHOLE TREE OPERATIONS
    //

    /// Every row's id, key, parent and stored path
    async fn tree_rows(&self, tx: &Self::Tx) -> Result<Vec<TreeRow>, DatabaseError>;

    /// Run a containment query
    async fn query_nodes(
        &self,
        tx: &Self::Tx,
        query: &NodeQuery,
    ) -> Result<Vec<Node>, DatabaseError>;
}
