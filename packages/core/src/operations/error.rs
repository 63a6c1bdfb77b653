//! Error types for tree mutations
//!
//! Every variant aborts the enclosing transaction: no mutation is ever
//! partially applied.

use crate::db::DatabaseError;
use crate::models::ValidationError;
use thiserror::Error;

/// Errors that can occur while mutating or querying the tree
///
/// # Examples
///
/// ```rust
/// use nodepath_core::operations::TreeError;
///
/// let err = TreeError::cycle("foo-id", "baz-id", "parent lies inside the node's subtree");
/// assert!(matches!(err, TreeError::Cycle { .. }));
/// ```
#[derive(Error, Debug)]
pub enum TreeError {
    /// The mutation would make a node its own ancestor
    ///
    /// Raised for self-parenting and for moving a node under one of its
    /// own descendants.
    #[error("Cycle detected: cannot attach node '{node_id}' to '{parent_id}': {reason}")]
    Cycle {
        node_id: String,
        parent_id: String,
        reason: String,
    },

    /// Another node already uses this key
    #[error("Duplicate key '{key}'")]
    DuplicateKey { key: String },

    /// Stored paths disagree with the parent chain
    ///
    /// Indicates prior corruption. Not retried; run
    /// [`rebuild_paths`](crate::services::TreeService::rebuild_paths) to repair.
    #[error("Inconsistent tree state: {context}")]
    InconsistentState { context: String },

    /// Node being read or mutated does not exist
    #[error("Node '{node_id}' does not exist")]
    NodeNotFound { node_id: String },

    /// Proposed parent does not exist
    #[error("Parent node '{parent_id}' does not exist")]
    ParentNotFound { parent_id: String },

    /// Input failed validation (key format, missing fields)
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Version conflict detected (optimistic concurrency control)
    ///
    /// The node was modified between the caller's read and this write.
    /// Re-read the node and re-validate before retrying.
    #[error("Version conflict for node '{node_id}': expected version {expected_version}, but current version is {actual_version}")]
    VersionConflict {
        node_id: String,
        expected_version: i64,
        actual_version: i64,
    },

    /// Delete refused because the node still has children
    #[error("Node '{node_id}' has {children} children and the delete policy forbids removing it")]
    HasChildren { node_id: String, children: usize },

    /// Storage failure
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),
}

impl TreeError {
    /// Create a cycle error
    pub fn cycle(
        node_id: impl Into<String>,
        parent_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Cycle {
            node_id: node_id.into(),
            parent_id: parent_id.into(),
            reason: reason.into(),
        }
    }

    /// Create a duplicate key error
    pub fn duplicate_key(key: impl Into<String>) -> Self {
        Self::DuplicateKey { key: key.into() }
    }

    /// Create an inconsistent state error
    pub fn inconsistent(context: impl Into<String>) -> Self {
        Self::InconsistentState {
            context: context.into(),
        }
    }

    /// Create a node not found error
    pub fn node_not_found(node_id: impl Into<String>) -> Self {
        Self::NodeNotFound {
            node_id: node_id.into(),
        }
    }

    /// Create a parent not found error
    pub fn parent_not_found(parent_id: impl Into<String>) -> Self {
        Self::ParentNotFound {
            parent_id: parent_id.into(),
        }
    }

    /// Create a version conflict error
    pub fn version_conflict(
        node_id: impl Into<String>,
        expected_version: i64,
        actual_version: i64,
    ) -> Self {
        Self::VersionConflict {
            node_id: node_id.into(),
            expected_version,
            actual_version,
        }
    }

    /// True for errors signalling corrupted stored state
    pub fn is_integrity_violation(&self) -> bool {
        matches!(self, Self::InconsistentState { .. })
    }
}

pub type TreeResult<T> = std::result::Result<T, TreeError>;
