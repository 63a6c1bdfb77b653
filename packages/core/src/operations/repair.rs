//! Path reconstruction
//!
//! The parent chain is the source of truth and `path` is a derived index,
//! so every path can be recomputed from scratch. [`expected_paths`] walks
//! the tree top-down from its roots; [`find_drift`] compares the result
//! with what is stored.

use crate::operations::error::{TreeError, TreeResult};
use crate::path::compute_path;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};

/// Row projection needed to rebuild paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    pub id: String,
    pub key: String,
    pub parent_id: Option<String>,
    pub path: String,
}

/// A stored path that disagrees with the parent chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathDrift {
    pub id: String,
    pub stored_path: String,
    pub expected_path: String,
}

/// Compute the correct path of every row from the parent chain
///
/// Fails with `InconsistentState` if a row references a missing parent or
/// if some rows are unreachable from any root (a cycle in `parent_id`).
pub fn expected_paths(rows: &[TreeRow]) -> TreeResult<HashMap<String, String>> {
    let by_id: HashMap<&str, &TreeRow> = rows.iter().map(|r| (r.id.as_str(), r)).collect();
    let mut children: HashMap<&str, Vec<&TreeRow>> = HashMap::new();
    let mut queue: VecDeque<(&TreeRow, String)> = VecDeque::new();

    for row in rows {
        match row.parent_id.as_deref() {
            None => queue.push_back((row, compute_path(None, &row.key))),
            Some(parent) if by_id.contains_key(parent) => {
                children.entry(parent).or_default().push(row)
            }
            Some(parent) => {
                return Err(TreeError::inconsistent(format!(
                    "node '{}' references missing parent '{}'",
                    row.id, parent
                )));
            }
        }
    }

    let mut paths = HashMap::with_capacity(rows.len());
    while let Some((row, path)) = queue.pop_front() {
        if let Some(kids) = children.get(row.id.as_str()) {
            for child in kids {
                queue.push_back((child, compute_path(Some(&path), &child.key)));
            }
        }
        paths.insert(row.id.clone(), path);
    }

    if paths.len() != rows.len() {
        let mut stuck: Vec<&str> = rows
            .iter()
            .filter(|r| !paths.contains_key(&r.id))
            .map(|r| r.id.as_str())
            .collect();
        stuck.sort_unstable();
        return Err(TreeError::inconsistent(format!(
            "nodes unreachable from any root (parent cycle): {}",
            stuck.join(", ")
        )));
    }

    Ok(paths)
}

/// Rows whose stored path differs from the recomputed one, in expected-path order
pub fn find_drift(rows: &[TreeRow]) -> TreeResult<Vec<PathDrift>> {
    let expected = expected_paths(rows)?;
    let mut drift: Vec<PathDrift> = rows
        .iter()
        .filter_map(|row| {
            let expected_path = expected.get(&row.id)?;
            (expected_path != &row.path).then(|| PathDrift {
                id: row.id.clone(),
                stored_path: row.path.clone(),
                expected_path: expected_path.clone(),
            })
        })
        .collect();
    drift.sort_by(|a, b| a.expected_path.cmp(&b.expected_path));
    Ok(drift)
}
