//! Mutation Guard
//!
//! Validates a proposed key or parent assignment against the current tree
//! snapshot before anything is written. All checks are pure: the caller
//! loads the node, the proposed parent and the current holder of the key
//! inside its transaction and hands them in.
//!
//! The cycle check is a string-prefix test on the node's pre-mutation
//! path: moving a node under a parent whose path equals the node's path or
//! starts with `node.path + "."` would make the node its own ancestor.

use crate::models::{validate_key, Node};
use crate::operations::error::{TreeError, TreeResult};
use crate::path::is_descendant_or_self;

/// Rules applied before every key or parent write
#[derive(Debug, Clone, Copy)]
pub struct MutationGuard {
    max_key_length: usize,
}

impl MutationGuard {
    pub fn new(max_key_length: usize) -> Self {
        Self { max_key_length }
    }

    /// Key format check
    pub fn check_key_format(&self, key: &str) -> TreeResult<()> {
        validate_key(key, self.max_key_length).map_err(TreeError::from)
    }

    /// Reject `parent_id == node_id` without loading the parent
    pub fn check_self_parent(&self, node_id: &str, parent_id: Option<&str>) -> TreeResult<()> {
        match parent_id {
            Some(parent_id) if parent_id == node_id => Err(TreeError::cycle(
                node_id,
                parent_id,
                "a node cannot be its own parent",
            )),
            _ => Ok(()),
        }
    }

    /// Reject a parent that lies inside the subtree rooted at `node`
    ///
    /// `node.path` must be the path stored before this mutation.
    pub fn check_parent(&self, node: &Node, parent: Option<&Node>) -> TreeResult<()> {
        let Some(parent) = parent else {
            return Ok(());
        };

        self.check_self_parent(&node.id, Some(&parent.id))?;

        if is_descendant_or_self(&parent.path, &node.path) {
            return Err(TreeError::cycle(
                &node.id,
                &parent.id,
                format!("'{}' is a descendant of '{}'", parent.path, node.path),
            ));
        }

        Ok(())
    }

    /// Reject a key already held by a different node
    ///
    /// `holder_id` is the id of the node currently using `key`, if any.
    /// `node_id` is `None` when the key is for a node being created.
    pub fn check_key_available(
        &self,
        key: &str,
        holder_id: Option<&str>,
        node_id: Option<&str>,
    ) -> TreeResult<()> {
        match (holder_id, node_id) {
            (None, _) => Ok(()),
            (Some(holder), Some(node)) if holder == node => Ok(()),
            (Some(_), _) => Err(TreeError::duplicate_key(key)),
        }
    }

    /// Optimistic concurrency check
    pub fn check_version(&self, node: &Node, expected_version: Option<i64>) -> TreeResult<()> {
        match expected_version {
            Some(expected) if expected != node.version => Err(TreeError::version_conflict(
                &node.id,
                expected,
                node.version,
            )),
            _ => Ok(()),
        }
    }
}
