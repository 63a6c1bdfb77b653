//! Tree Service - Path-Maintaining Node Operations
//!
//! This module provides the business logic layer of the engine:
//!
//! - CRUD operations (create, read, update, delete)
//! - Structural changes (rename, move) with transactional path cascades
//! - Containment queries (children, ancestors, descendants)
//! - Repair (`verify_integrity`, `rebuild_paths`)
//!
//! # Mutation Flow
//!
//! Every mutating call is one `BEGIN IMMEDIATE` ... `COMMIT` unit:
//!
//! 1. Load the node, the proposed parent and the current holder of the key
//! 2. Mutation Guard: key format, uniqueness, self-parent, ancestor cycle,
//!    expected version
//! 3. Compute the new path from the parent's stored path
//! 4. Plan the cascade (cross-checks the subtree against `parent_id`)
//! 5. Write the node row, then rewrite all descendant paths in one statement
//! 6. Compare the rewritten row count with the plan
//! 7. Commit, then broadcast a [`DomainEvent`]
//!
//! Any error rolls the whole unit back; readers never see a half-cascaded
//! subtree.

use crate::config::{DeletePolicy, TreeConfig};
use crate::db::{DatabaseError, DatabaseService, DomainEvent, NodeRow, NodeStore, TursoStore};
use crate::models::{DeleteResult, Node, NodeUpdate, ValidationError};
use crate::operations::{
    check_rewrite_count, find_drift, path_change, plan_cascade, plan_promotion, CreateNodeParams,
    MutationGuard, PathChange, PathDrift, TreeError, TreeResult,
};
use crate::path::compute_path;
use crate::query::{NodeQuery, OrderBy};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

/// What an update did, decided inside the transaction
enum UpdateOutcome {
    /// Nothing differs from the stored row; nothing written
    Unchanged(Node),
    /// Only the label changed
    Updated(Node),
    /// Key or parent changed and the subtree followed
    Moved {
        node: Node,
        old_path: String,
        new_path: String,
        descendants: u64,
    },
}

/// Path-maintaining tree operations over a [`NodeStore`]
///
/// # Examples
///
/// ```no_run
/// # use nodepath_core::config::TreeConfig;
/// # use nodepath_core::operations::CreateNodeParams;
/// # use nodepath_core::services::TreeService;
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let service = TreeService::open(&TreeConfig::with_database_path("./data/tree.db")).await?;
///
/// let top = service.create_node(CreateNodeParams::root("top", "Top")).await?;
/// let science = service
///     .create_node(CreateNodeParams::child("science", "Science", &top.id))
///     .await?;
/// assert_eq!(science.path, "top.science");
/// # Ok(())
/// # }
/// ```
pub struct TreeService<S: NodeStore = TursoStore> {
    store: Arc<S>,

    guard: MutationGuard,

    delete_policy: DeletePolicy,

    /// Broadcast channel for domain events
    event_tx: broadcast::Sender<DomainEvent>,
}

// Manual Clone implementation because S doesn't need to be Clone
impl<S: NodeStore> Clone for TreeService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            guard: self.guard,
            delete_policy: self.delete_policy,
            event_tx: self.event_tx.clone(),
        }
    }
}

impl TreeService<TursoStore> {
    /// Open the libsql database described by `config` and build a service on it
    ///
    /// Installs the schema on first use.
    pub async fn open(config: &TreeConfig) -> TreeResult<Self> {
        let db = DatabaseService::from_config(config).await?;
        let store = Arc::new(TursoStore::new(Arc::new(db)));
        Ok(Self::new(store, config))
    }
}

impl<S: NodeStore> TreeService<S> {
    /// Create a service over an existing store
    pub fn new(store: Arc<S>, config: &TreeConfig) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_channel_capacity.max(1));

        Self {
            store,
            guard: MutationGuard::new(config.max_key_length),
            delete_policy: config.delete_policy,
            event_tx,
        }
    }

    /// Get access to the underlying store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Delete policy applied by [`delete_node`](Self::delete_node)
    pub fn delete_policy(&self) -> DeletePolicy {
        self.delete_policy
    }

    /// Subscribe to domain events
    ///
    /// Events are sent after the transaction commits. A receiver that falls
    /// more than `event_channel_capacity` events behind gets `Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.event_tx.subscribe()
    }

    /// Ignores errors if no subscribers
    fn emit_event(&self, event: DomainEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Commit on success, roll back on error
    async fn finish<T>(&self, operation: &str, tx: S::Tx, result: TreeResult<T>) -> TreeResult<T> {
        match result {
            Ok(value) => {
                self.store.commit(tx).await?;
                Ok(value)
            }
            Err(err) => {
                self.store.rollback(tx).await;
                if err.is_integrity_violation() {
                    tracing::error!(operation, error = %err, "Tree integrity violation, rolled back");
                } else {
                    tracing::warn!(operation, error = %err, "Rejected tree mutation");
                }
                Err(err)
            }
        }
    }

    //
    // CREATE
    //

    /// Create a node under an existing parent (or as a root)
    ///
    /// The path is computed from the parent's stored path; callers cannot
    /// supply one.
    ///
    /// # Errors
    ///
    /// - `Validation` for a malformed key or empty id
    /// - `Cycle` if a caller-supplied id equals `parent_id`
    /// - `ParentNotFound` if the parent doesn't exist
    /// - `DuplicateKey` if another node holds the key
    pub async fn create_node(&self, params: CreateNodeParams) -> TreeResult<Node> {
        self.guard.check_key_format(&params.key)?;

        let id = match params.id.as_deref() {
            Some(id) if id.trim().is_empty() => {
                return Err(ValidationError::InvalidId(id.to_string()).into());
            }
            Some(id) => id.to_string(),
            None => Uuid::new_v4().to_string(),
        };
        self.guard
            .check_self_parent(&id, params.parent_id.as_deref())?;

        let tx = self.store.begin().await?;
        let result = self.create_in_tx(&tx, &id, &params).await;
        let node = self.finish("create_node", tx, result).await?;

        tracing::info!(id = %node.id, path = %node.path, "Created node");
        self.emit_event(DomainEvent::NodeCreated { node: node.clone() });
        Ok(node)
    }

    async fn create_in_tx(
        &self,
        tx: &S::Tx,
        id: &str,
        params: &CreateNodeParams,
    ) -> TreeResult<Node> {
        let parent = match params.parent_id.as_deref() {
            Some(parent_id) => Some(
                self.store
                    .get_node(tx, parent_id)
                    .await?
                    .ok_or_else(|| TreeError::parent_not_found(parent_id))?,
            ),
            None => None,
        };

        let holder = self.store.get_node_by_key(tx, &params.key).await?;
        self.guard
            .check_key_available(&params.key, holder.as_ref().map(|n| n.id.as_str()), None)?;

        let path = compute_path(parent.as_ref().map(|p| p.path.as_str()), &params.key);

        self.store
            .insert_node(
                tx,
                NodeRow {
                    id,
                    key: &params.key,
                    parent_id: params.parent_id.as_deref(),
                    path: &path,
                    label: &params.label,
                },
            )
            .await
            .map_err(|e| write_error(e, id, &params.key, params.parent_id.as_deref()))?;

        self.store
            .get_node(tx, id)
            .await?
            .ok_or_else(|| TreeError::inconsistent(format!("node '{}' missing after insert", id)))
    }

    //
    // READ
    //

    /// Get node by ID
    pub async fn get_node(&self, id: &str) -> TreeResult<Option<Node>> {
        let conn = self.store.connect().await?;
        Ok(self.store.get_node(&conn, id).await?)
    }

    /// Get node by its unique key
    pub async fn get_node_by_key(&self, key: &str) -> TreeResult<Option<Node>> {
        let conn = self.store.connect().await?;
        Ok(self.store.get_node_by_key(&conn, key).await?)
    }

    async fn require_node(&self, conn: &S::Tx, id: &str) -> TreeResult<Node> {
        self.store
            .get_node(conn, id)
            .await?
            .ok_or_else(|| TreeError::node_not_found(id))
    }

    //
    // UPDATE
    //

    /// Apply a partial update to key, parent and/or label
    ///
    /// A key or parent change rewrites the node's path and the path of every
    /// descendant in the same transaction. An update that changes nothing
    /// writes nothing and keeps the version.
    ///
    /// # Errors
    ///
    /// - `NodeNotFound` / `ParentNotFound`
    /// - `VersionConflict` if `expected_version` is stale
    /// - `Cycle` if the new parent is the node itself or one of its descendants
    /// - `DuplicateKey` if the new key is held by another node
    /// - `InconsistentState` if stored paths have drifted from the parent chain
    pub async fn update_node(&self, id: &str, update: NodeUpdate) -> TreeResult<Node> {
        let tx = self.store.begin().await?;
        let result = self.update_in_tx(&tx, id, &update).await;
        let outcome = self.finish("update_node", tx, result).await?;

        match outcome {
            UpdateOutcome::Unchanged(node) => {
                tracing::debug!(id, "Update left node unchanged");
                Ok(node)
            }
            UpdateOutcome::Updated(node) => {
                tracing::info!(id, version = node.version, "Updated node");
                self.emit_event(DomainEvent::NodeUpdated { node: node.clone() });
                Ok(node)
            }
            UpdateOutcome::Moved {
                node,
                old_path,
                new_path,
                descendants,
            } => {
                tracing::info!(
                    id,
                    old_path = %old_path,
                    new_path = %new_path,
                    descendants,
                    "Moved subtree"
                );
                self.emit_event(DomainEvent::SubtreeMoved {
                    node: node.clone(),
                    old_path,
                    new_path,
                    descendants,
                });
                Ok(node)
            }
        }
    }

    async fn update_in_tx(
        &self,
        tx: &S::Tx,
        id: &str,
        update: &NodeUpdate,
    ) -> TreeResult<UpdateOutcome> {
        let node = self.require_node(tx, id).await?;
        self.guard.check_version(&node, update.expected_version)?;

        let new_key = update.key.as_deref().unwrap_or(&node.key);
        let new_parent_id = match &update.parent_id {
            Some(parent_id) => parent_id.as_deref(),
            None => node.parent_id.as_deref(),
        };
        let new_label = update.label.as_deref().unwrap_or(&node.label);

        if new_key == node.key
            && new_parent_id == node.parent_id.as_deref()
            && new_label == node.label
        {
            return Ok(UpdateOutcome::Unchanged(node));
        }

        if new_key != node.key {
            self.guard.check_key_format(new_key)?;
            let holder = self.store.get_node_by_key(tx, new_key).await?;
            self.guard.check_key_available(
                new_key,
                holder.as_ref().map(|n| n.id.as_str()),
                Some(id),
            )?;
        }

        self.guard.check_self_parent(id, new_parent_id)?;
        let parent = match new_parent_id {
            Some(parent_id) => Some(
                self.store
                    .get_node(tx, parent_id)
                    .await?
                    .ok_or_else(|| TreeError::parent_not_found(parent_id))?,
            ),
            None => None,
        };
        self.guard.check_parent(&node, parent.as_ref())?;

        let new_path = compute_path(parent.as_ref().map(|p| p.path.as_str()), new_key);
        let row = NodeRow {
            id,
            key: new_key,
            parent_id: new_parent_id,
            path: &new_path,
            label: new_label,
        };

        match path_change(&node.path, &new_path) {
            PathChange::Unchanged => {
                self.write_node_row(tx, row).await?;
                let updated = self.require_node(tx, id).await?;
                Ok(UpdateOutcome::Updated(updated))
            }
            PathChange::Moved { old_path, new_path } => {
                let descendants = self.store.subtree_rows(tx, &old_path).await?;
                let children = self.store.child_ids(tx, id).await?;
                let plan = plan_cascade(id, &old_path, &new_path, &descendants, &children)?;

                tracing::debug!(
                    id,
                    old_path = %plan.old_path,
                    new_path = %plan.new_path,
                    descendants = plan.descendant_count(),
                    "Planned path cascade"
                );

                self.write_node_row(tx, row).await?;
                let rewritten = self
                    .store
                    .rewrite_subtree(tx, &old_path, &new_path)
                    .await?;
                check_rewrite_count(&plan, rewritten)?;

                let moved = self.require_node(tx, id).await?;
                Ok(UpdateOutcome::Moved {
                    node: moved,
                    old_path,
                    new_path,
                    descendants: rewritten,
                })
            }
        }
    }

    async fn write_node_row(&self, tx: &S::Tx, row: NodeRow<'_>) -> TreeResult<()> {
        let updated = self
            .store
            .update_node(tx, row)
            .await
            .map_err(|e| write_error(e, row.id, row.key, row.parent_id))?;

        if updated != 1 {
            return Err(TreeError::inconsistent(format!(
                "update of node '{}' touched {} rows",
                row.id, updated
            )));
        }
        Ok(())
    }

    /// Change a node's key; the node's subtree follows
    pub async fn rename_node(&self, id: &str, key: impl Into<String>) -> TreeResult<Node> {
        self.update_node(id, NodeUpdate::new().with_key(key.into()))
            .await
    }

    /// Attach a node to `new_parent_id` (`None` makes it a root); the subtree follows
    pub async fn move_node(&self, id: &str, new_parent_id: Option<&str>) -> TreeResult<Node> {
        self.update_node(
            id,
            NodeUpdate::new().with_parent(new_parent_id.map(str::to_string)),
        )
        .await
    }

    //
    // DELETE
    //

    /// Delete a node according to the configured [`DeletePolicy`]
    ///
    /// Deleting a node that doesn't exist succeeds with `existed == false`.
    pub async fn delete_node(&self, id: &str) -> TreeResult<DeleteResult> {
        let tx = self.store.begin().await?;
        let result = self.delete_in_tx(&tx, id).await;
        let outcome = self.finish("delete_node", tx, result).await?;

        if outcome.existed {
            tracing::info!(
                id,
                removed = outcome.removed,
                policy = ?self.delete_policy,
                "Deleted node"
            );
            self.emit_event(DomainEvent::NodeDeleted {
                id: id.to_string(),
                removed: outcome.removed,
            });
        }
        Ok(outcome)
    }

    async fn delete_in_tx(&self, tx: &S::Tx, id: &str) -> TreeResult<DeleteResult> {
        let Some(node) = self.store.get_node(tx, id).await? else {
            return Ok(DeleteResult::not_found());
        };

        let children = self.store.child_ids(tx, id).await?;
        let descendants = self.store.subtree_rows(tx, &node.path).await?;

        match self.delete_policy {
            DeletePolicy::Forbid if !children.is_empty() => Err(TreeError::HasChildren {
                node_id: id.to_string(),
                children: children.len(),
            }),
            DeletePolicy::Cascade | DeletePolicy::Forbid => {
                // Same-path plan: only verifies the subtree before it is removed
                let plan = plan_cascade(id, &node.path, &node.path, &descendants, &children)?;
                let removed = self.store.delete_subtree(tx, &node.path).await?;
                expect_removed(id, removed, plan.descendant_count() as u64 + 1)?;
                Ok(DeleteResult::existed(removed))
            }
            DeletePolicy::Reparent => {
                let parent_path = match node.parent_id.as_deref() {
                    Some(parent_id) => Some(
                        self.store
                            .get_node(tx, parent_id)
                            .await?
                            .ok_or_else(|| {
                                TreeError::inconsistent(format!(
                                    "parent '{}' of '{}' is missing",
                                    parent_id, id
                                ))
                            })?
                            .path,
                    ),
                    None => None,
                };

                let plan = plan_promotion(
                    id,
                    &node.path,
                    parent_path.as_deref(),
                    &descendants,
                    &children,
                )?;
                tracing::debug!(
                    id,
                    old_path = %node.path,
                    descendants = plan.descendant_count(),
                    "Planned promotion of children"
                );

                let rewritten = self
                    .store
                    .promote_subtree(tx, &node.path, parent_path.as_deref())
                    .await?;
                check_rewrite_count(&plan, rewritten)?;

                let moved = self
                    .store
                    .reparent_children(tx, id, node.parent_id.as_deref())
                    .await?;
                if moved as usize != children.len() {
                    return Err(TreeError::inconsistent(format!(
                        "expected to reparent {} children of '{}', moved {}",
                        children.len(),
                        id,
                        moved
                    )));
                }

                let removed = self.store.delete_subtree(tx, &node.path).await?;
                expect_removed(id, removed, 1)?;
                Ok(DeleteResult::existed(removed))
            }
        }
    }

    //
    // QUERIES
    //

    /// Direct children of a node, ordered by key
    pub async fn get_children(&self, id: &str) -> TreeResult<Vec<Node>> {
        self.query_nodes(NodeQuery::children_of(id)).await
    }

    /// Root nodes, ordered by key
    pub async fn get_roots(&self) -> TreeResult<Vec<Node>> {
        self.query_nodes(NodeQuery {
            roots_only: true,
            order_by: OrderBy::Key,
            ..NodeQuery::default()
        })
        .await
    }

    /// The node and all of its ancestors, root first
    pub async fn ancestors(&self, id: &str) -> TreeResult<Vec<Node>> {
        let conn = self.store.connect().await?;
        let node = self.require_node(&conn, id).await?;
        Ok(self
            .store
            .query_nodes(&conn, &NodeQuery::ancestors_of(node.path))
            .await?)
    }

    /// The node and its whole subtree, in path (pre-order) order
    pub async fn descendants(&self, id: &str) -> TreeResult<Vec<Node>> {
        let conn = self.store.connect().await?;
        let node = self.require_node(&conn, id).await?;
        Ok(self
            .store
            .query_nodes(&conn, &NodeQuery::descendants_of(node.path))
            .await?)
    }

    /// Run an arbitrary containment query
    pub async fn query_nodes(&self, query: NodeQuery) -> TreeResult<Vec<Node>> {
        let conn = self.store.connect().await?;
        Ok(self.store.query_nodes(&conn, &query).await?)
    }

    //
    // REPAIR
    //

    /// Report every stored path that disagrees with the parent chain
    ///
    /// Read-only. An empty result means the tree is consistent.
    pub async fn verify_integrity(&self) -> TreeResult<Vec<PathDrift>> {
        let conn = self.store.connect().await?;
        let rows = self.store.tree_rows(&conn).await?;
        let drift = find_drift(&rows)?;

        if drift.is_empty() {
            tracing::debug!(nodes = rows.len(), "Tree paths consistent");
        } else {
            tracing::warn!(
                nodes = rows.len(),
                drifted = drift.len(),
                "Stored paths drifted from parent chain"
            );
        }
        Ok(drift)
    }

    /// Recompute every path from the parent chain and fix drifted rows
    ///
    /// Runs in one transaction and returns the rows it rewrote.
    pub async fn rebuild_paths(&self) -> TreeResult<Vec<PathDrift>> {
        let tx = self.store.begin().await?;
        let result = self.rebuild_in_tx(&tx).await;
        let repaired = self.finish("rebuild_paths", tx, result).await?;

        if !repaired.is_empty() {
            tracing::info!(repaired = repaired.len(), "Rebuilt drifted paths");
            self.emit_event(DomainEvent::PathsRebuilt {
                repaired: repaired.len() as u64,
            });
        }
        Ok(repaired)
    }

    async fn rebuild_in_tx(&self, tx: &S::Tx) -> TreeResult<Vec<PathDrift>> {
        let rows = self.store.tree_rows(tx).await?;
        let drift = find_drift(&rows)?;

        for fix in &drift {
            let updated = self
                .store
                .set_path(tx, &fix.id, &fix.expected_path)
                .await?;
            if updated != 1 {
                return Err(TreeError::inconsistent(format!(
                    "repair of node '{}' touched {} rows",
                    fix.id, updated
                )));
            }
        }
        Ok(drift)
    }
}

/// Map a store-side constraint failure to the tree error it backstops
fn write_error(err: DatabaseError, node_id: &str, key: &str, parent_id: Option<&str>) -> TreeError {
    if err.is_unique_key_violation() {
        TreeError::duplicate_key(key)
    } else if err.is_ancestry_violation() {
        TreeError::cycle(
            node_id,
            parent_id.unwrap_or_default(),
            "rejected by the store's ancestry constraint",
        )
    } else {
        err.into()
    }
}

fn expect_removed(id: &str, removed: u64, expected: u64) -> TreeResult<()> {
    if removed != expected {
        return Err(TreeError::inconsistent(format!(
            "delete of '{}' planned {} rows but removed {}",
            id, expected, removed
        )));
    }
    Ok(())
}

// Comprehensive tests in separate module
#[cfg(test)]
#[path = "tree_service_test.rs"]
mod tree_service_test;
