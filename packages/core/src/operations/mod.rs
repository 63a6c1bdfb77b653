//! Tree Operations
//!
//! Store-independent rules of the path-maintenance engine:
//!
//! - [`guard`] - validation run before any key or parent write
//! - [`cascade`] - planning and verification of subtree path rewrites
//! - [`repair`] - recomputing every path from the parent chain
//! - [`error`] - the error taxonomy shared by all tree mutations
//!
//! [`TreeService`](crate::services::TreeService) runs these inside a single
//! database transaction per mutation.

pub mod cascade;
pub mod error;
pub mod guard;
pub mod repair;

pub use cascade::{
    check_rewrite_count, path_change, plan_cascade, plan_promotion, CascadePlan, PathChange,
    PathRow,
};
pub use error::{TreeError, TreeResult};
pub use guard::MutationGuard;
pub use repair::{expected_paths, find_drift, PathDrift, TreeRow};

use serde::{Deserialize, Serialize};

/// Parameters for creating a node
///
/// `path` is not a parameter: it is computed from `key` and the parent.
///
/// # ID Generation
///
/// `id` is normally left as `None` and a UUID v4 is generated. Callers that
/// pre-generate ids (for example to reference a node before it is
/// persisted) can supply one; the primary key constraint still rejects
/// collisions.
///
/// # Examples
///
/// ```rust
/// # use nodepath_core::operations::CreateNodeParams;
/// let top = CreateNodeParams::root("top", "Top");
/// let science = CreateNodeParams::child("science", "Science", "top-id");
/// assert!(top.parent_id.is_none());
/// assert_eq!(science.parent_id.as_deref(), Some("top-id"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNodeParams {
    /// Optional ID for the node. If None, a UUID is generated
    #[serde(default)]
    pub id: Option<String>,
    /// Unique key; becomes the last component of the node's path
    pub key: String,
    /// Optional parent node ID (`None` creates a root)
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Free-text label
    #[serde(default)]
    pub label: String,
}

impl CreateNodeParams {
    /// Parameters for a root node
    pub fn root(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: None,
            key: key.into(),
            parent_id: None,
            label: label.into(),
        }
    }

    /// Parameters for a node under `parent_id`
    pub fn child(
        key: impl Into<String>,
        label: impl Into<String>,
        parent_id: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            key: key.into(),
            parent_id: Some(parent_id.into()),
            label: label.into(),
        }
    }

    /// Use a caller-provided ID
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}
