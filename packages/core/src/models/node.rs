//! Node Data Structures
//!
//! This module defines the `Node` record stored in the `nodes` table and the
//! types used to create, patch and delete it.
//!
//! # Architecture
//!
//! - **Parent chain is the source of truth**: `parent_id` defines the tree
//! - **Materialized path**: `path` is derived from the parent chain and the
//!   node's `key`; clients can read it but never set it
//! - **Globally unique keys**: a path is a chain of unique keys, so paths are
//!   unique as well
//!
//! # Examples
//!
//! ```rust
//! use nodepath_core::models::{validate_key, NodeUpdate};
//!
//! assert!(validate_key("science", 32).is_ok());
//! assert!(validate_key("top.science", 32).is_err());
//!
//! // Move a node to the root without touching its key
//! let update = NodeUpdate::new().with_parent(None);
//! assert!(!update.is_empty());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Default version value for serde deserialization (version 1)
fn default_version() -> i64 {
    1
}

/// Validation errors for Node operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("Invalid node ID format: {0}")]
    InvalidId(String),

    #[error("Invalid parent reference: {0}")]
    InvalidParent(String),
}

impl ValidationError {
    fn invalid_key(key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Check that `key` can be used as one component of a path
///
/// A key is 1 to `max_len` ASCII characters drawn from `[A-Za-z0-9_]`.
/// Every allowed character sorts after the path separator, which keeps
/// lexicographic path order equal to a pre-order walk of the tree.
pub fn validate_key(key: &str, max_len: usize) -> Result<(), ValidationError> {
    if key.is_empty() {
        return Err(ValidationError::MissingField("key".to_string()));
    }

    if key.len() > max_len {
        return Err(ValidationError::invalid_key(
            key,
            format!("longer than {} characters", max_len),
        ));
    }

    if let Some(bad) = key
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
    {
        return Err(ValidationError::invalid_key(
            key,
            format!("character '{}' is not allowed (use A-Z, a-z, 0-9, _)", bad),
        ));
    }

    Ok(())
}

/// One element of the tree
///
/// # Fields
///
/// - `id`: Unique identifier (UUID v4), immutable
/// - `key`: Short, globally unique slug; one component of every descendant's path
/// - `parent_id`: Optional parent reference (`None` means this node is a root)
/// - `path`: Dot-joined keys from the root to this node, maintained by the engine
/// - `label`: Free-text payload, irrelevant to path logic
/// - `version`: Optimistic concurrency counter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Unique identifier
    pub id: String,

    /// Unique key (e.g. "science")
    pub key: String,

    /// Parent node ID (`None` for roots)
    pub parent_id: Option<String>,

    /// Materialized path (e.g. "top.science")
    pub path: String,

    /// Human readable label
    pub label: String,

    /// Optimistic concurrency control version (incremented on each update)
    #[serde(default = "default_version")]
    pub version: i64,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub modified_at: DateTime<Utc>,
}

impl Node {
    /// Check if this node is a root node
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Number of keys in this node's path (roots have depth 1)
    pub fn depth(&self) -> usize {
        crate::path::depth(&self.path)
    }

    /// Keys of this node's ancestors followed by its own key, root first
    pub fn path_keys(&self) -> Vec<String> {
        crate::path::decode(&self.path)
    }

    /// True if `other` lies strictly below this node
    pub fn is_ancestor_of(&self, other: &Node) -> bool {
        crate::path::is_strict_descendant(&other.path, &self.path)
    }
}

/// Custom deserializer for double-Option fields
///
/// Maps three input formats to the double-Option pattern:
/// - Missing field → None (don't update)
/// - null → Some(None) (set to NULL)
/// - "value" → Some(Some("value")) (set to value)
fn deserialize_optional_field<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::<T>::deserialize(deserializer)?))
}

/// Partial node update
///
/// Only provided fields are changed. `path` is deliberately absent: it is
/// recomputed from `key` and `parent_id`.
///
/// `parent_id` uses the double-Option pattern:
///
/// - `None`: Don't change the parent
/// - `Some(None)`: Make the node a root
/// - `Some(Some(id))`: Move the node under `id`
///
/// ```rust
/// # use nodepath_core::models::NodeUpdate;
/// let rename = NodeUpdate::new().with_key("magic".to_string());
///
/// let reparent = NodeUpdate {
///     parent_id: Some(Some("top-id".to_string())),
///     expected_version: Some(3),
///     ..Default::default()
/// };
/// # assert!(!rename.is_empty() && !reparent.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeUpdate {
    /// New key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// New parent reference (double-Option, see type docs)
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub parent_id: Option<Option<String>>,

    /// New label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Version the caller read; the update fails on mismatch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_version: Option<i64>,
}

impl NodeUpdate {
    /// Create a new empty update
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a new key
    pub fn with_key(mut self, key: String) -> Self {
        self.key = Some(key);
        self
    }

    /// Set a new parent (`None` makes the node a root)
    pub fn with_parent(mut self, parent_id: Option<String>) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Set a new label
    pub fn with_label(mut self, label: String) -> Self {
        self.label = Some(label);
        self
    }

    /// Require the stored version to match before applying
    pub fn with_expected_version(mut self, version: i64) -> Self {
        self.expected_version = Some(version);
        self
    }

    /// Check if update contains any changes
    pub fn is_empty(&self) -> bool {
        self.key.is_none() && self.parent_id.is_none() && self.label.is_none()
    }

    /// True if this update may change the node's path
    pub fn touches_path(&self) -> bool {
        self.key.is_some() || self.parent_id.is_some()
    }
}

/// Result of a delete operation
///
/// Deleting a node that does not exist succeeds with `existed = false`.
/// `removed` counts every row the delete took with it (the node itself plus
/// its subtree under the cascade policy).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteResult {
    /// Whether the node existed before deletion
    pub existed: bool,

    /// Number of rows removed
    pub removed: u64,
}

impl DeleteResult {
    /// Create a DeleteResult for a node that existed
    pub fn existed(removed: u64) -> Self {
        Self {
            existed: true,
            removed,
        }
    }

    /// Create a DeleteResult indicating the node didn't exist
    pub fn not_found() -> Self {
        Self {
            existed: false,
            removed: 0,
        }
    }
}
