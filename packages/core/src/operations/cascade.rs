//! Cascade planning
//!
//! When a node's key or parent changes, its path and the path of every
//! descendant must move from `old_path` to `new_path` in one step. The
//! store applies the rewrite as a single statement over the whole subtree;
//! this module decides whether a rewrite is needed and cross-checks the
//! subtree before it is touched.
//!
//! The cross-check compares two views of the subtree: rows selected by the
//! path prefix, and direct children selected by `parent_id`. If a direct
//! child is missing from the prefix selection, or a selected row does not
//! carry the expected prefix, stored paths have drifted from the parent
//! chain and the mutation is aborted.

use crate::operations::error::{TreeError, TreeResult};
use crate::path::{compute_path, is_strict_descendant, replace_prefix, SEPARATOR};
use std::collections::HashSet;

/// Minimal projection of a row touched by a cascade
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRow {
    pub id: String,
    pub parent_id: Option<String>,
    pub path: String,
}

/// A validated rewrite of one subtree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadePlan {
    pub node_id: String,
    pub old_path: String,
    pub new_path: String,
    /// Descendants and their rewritten paths, in path order
    pub rewrites: Vec<(String, String)>,
}

impl CascadePlan {
    /// Number of descendant rows the rewrite must touch
    pub fn descendant_count(&self) -> usize {
        self.rewrites.len()
    }
}

/// Outcome of comparing old and new paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathChange {
    /// Paths are identical; nothing to rewrite
    Unchanged,
    /// Path moves; the subtree must follow
    Moved { old_path: String, new_path: String },
}

/// Classify a key/parent mutation
pub fn path_change(old_path: &str, new_path: &str) -> PathChange {
    if old_path == new_path {
        PathChange::Unchanged
    } else {
        PathChange::Moved {
            old_path: old_path.to_string(),
            new_path: new_path.to_string(),
        }
    }
}

/// Build and verify the rewrite of the subtree below `node_id`
///
/// * `descendants` - rows selected by the `old_path.` prefix
/// * `direct_children` - ids of rows whose `parent_id` is `node_id`
pub fn plan_cascade(
    node_id: &str,
    old_path: &str,
    new_path: &str,
    descendants: &[PathRow],
    direct_children: &[String],
) -> TreeResult<CascadePlan> {
    plan_rewrite(node_id, old_path, new_path, descendants, direct_children, |path| {
        replace_prefix(path, old_path, new_path)
    })
}

/// Plan the removal of `node_id` from the middle of its chain
///
/// Every descendant keeps its suffix below `old_path` and is re-rooted at
/// `parent_path` (or becomes part of a root chain when `None`). Used when a
/// node is deleted and its children move up one level.
pub fn plan_promotion(
    node_id: &str,
    old_path: &str,
    parent_path: Option<&str>,
    descendants: &[PathRow],
    direct_children: &[String],
) -> TreeResult<CascadePlan> {
    let prefix = format!("{}{}", old_path, SEPARATOR);
    plan_rewrite(
        node_id,
        old_path,
        parent_path.unwrap_or_default(),
        descendants,
        direct_children,
        |path| {
            path.strip_prefix(prefix.as_str())
                .map(|rest| match parent_path {
                    Some(parent) => compute_path(Some(parent), rest),
                    None => rest.to_string(),
                })
        },
    )
}

fn plan_rewrite(
    node_id: &str,
    old_path: &str,
    new_path: &str,
    descendants: &[PathRow],
    direct_children: &[String],
    rebase: impl Fn(&str) -> Option<String>,
) -> TreeResult<CascadePlan> {
    let mut rewrites = Vec::with_capacity(descendants.len());
    let mut selected: HashSet<&str> = HashSet::with_capacity(descendants.len() + 1);
    selected.insert(node_id);

    for row in descendants {
        if !is_strict_descendant(&row.path, old_path) {
            return Err(TreeError::inconsistent(format!(
                "descendant '{}' has path '{}', expected prefix '{}.'",
                row.id, row.path, old_path
            )));
        }
        selected.insert(&row.id);
    }

    for row in descendants {
        // Every row in the subtree hangs off another row of the same subtree
        match row.parent_id.as_deref() {
            Some(parent) if selected.contains(parent) => {}
            other => {
                return Err(TreeError::inconsistent(format!(
                    "node '{}' at '{}' has parent {:?} outside the subtree of '{}'",
                    row.id, row.path, other, old_path
                )));
            }
        }

        let rewritten = rebase(&row.path).ok_or_else(|| {
            TreeError::inconsistent(format!(
                "cannot rebase '{}' from '{}' to '{}'",
                row.path, old_path, new_path
            ))
        })?;
        rewrites.push((row.id.clone(), rewritten));
    }

    if let Some(missing) = direct_children
        .iter()
        .find(|child| !selected.contains(child.as_str()))
    {
        return Err(TreeError::inconsistent(format!(
            "child '{}' of '{}' is not stored under '{}.'",
            missing, node_id, old_path
        )));
    }

    rewrites.sort_by(|a, b| a.1.cmp(&b.1));

    Ok(CascadePlan {
        node_id: node_id.to_string(),
        old_path: old_path.to_string(),
        new_path: new_path.to_string(),
        rewrites,
    })
}

/// Confirm the store touched exactly the planned rows
pub fn check_rewrite_count(plan: &CascadePlan, rows_affected: u64) -> TreeResult<()> {
    if rows_affected as usize != plan.descendant_count() {
        return Err(TreeError::inconsistent(format!(
            "cascade from '{}' to '{}' planned {} rows but rewrote {}",
            plan.old_path,
            plan.new_path,
            plan.descendant_count(),
            rows_affected
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, parent: &str, path: &str) -> PathRow {
        PathRow {
            id: id.to_string(),
            parent_id: Some(parent.to_string()),
            path: path.to_string(),
        }
    }

    fn biology_subtree() -> Vec<PathRow> {
        vec![
            row("genetics", "biology", "top.science.biology.genetics"),
            row("neuroscience", "biology", "top.science.biology.neuroscience"),
            row("dna", "genetics", "top.science.biology.genetics.dna"),
        ]
    }

    #[test]
    fn test_unchanged_path_is_noop() {
        assert_eq!(path_change("top.science", "top.science"), PathChange::Unchanged);
        assert!(matches!(
            path_change("top.science", "top.magic"),
            PathChange::Moved { .. }
        ));
    }

    #[test]
    fn test_plan_rewrites_whole_subtree() {
        let plan = plan_cascade(
            "biology",
            "top.science.biology",
            "top.biology",
            &biology_subtree(),
            &["genetics".to_string(), "neuroscience".to_string()],
        )
        .unwrap();

        assert_eq!(plan.descendant_count(), 3);
        assert_eq!(
            plan.rewrites,
            vec![
                ("genetics".to_string(), "top.biology.genetics".to_string()),
                ("dna".to_string(), "top.biology.genetics.dna".to_string()),
                (
                    "neuroscience".to_string(),
                    "top.biology.neuroscience".to_string()
                ),
            ]
        );
    }

    #[test]
    fn test_plan_for_leaf() {
        let plan = plan_cascade("maths", "top.science.maths", "top.maths", &[], &[]).unwrap();
        assert_eq!(plan.descendant_count(), 0);
    }

    #[test]
    fn test_plan_rejects_row_without_prefix() {
        let mut rows = biology_subtree();
        rows.push(row("stray", "biology", "top.sport.stray"));

        let err = plan_cascade("biology", "top.science.biology", "top.biology", &rows, &[])
            .unwrap_err();
        assert!(err.is_integrity_violation());
    }

    #[test]
    fn test_plan_rejects_child_stored_elsewhere() {
        // `ecology` points at biology but its path was never updated
        let err = plan_cascade(
            "biology",
            "top.science.biology",
            "top.biology",
            &biology_subtree(),
            &[
                "genetics".to_string(),
                "neuroscience".to_string(),
                "ecology".to_string(),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, TreeError::InconsistentState { .. }));
    }

    #[test]
    fn test_plan_rejects_row_with_foreign_parent() {
        let mut rows = biology_subtree();
        rows.push(row("rugby", "sport", "top.science.biology.rugby"));

        let err = plan_cascade("biology", "top.science.biology", "top.biology", &rows, &[])
            .unwrap_err();
        assert!(err.is_integrity_violation());
    }

    #[test]
    fn test_promotion_under_grandparent() {
        let plan = plan_promotion(
            "biology",
            "top.science.biology",
            Some("top.science"),
            &biology_subtree(),
            &["genetics".to_string(), "neuroscience".to_string()],
        )
        .unwrap();

        assert_eq!(
            plan.rewrites,
            vec![
                ("genetics".to_string(), "top.science.genetics".to_string()),
                ("dna".to_string(), "top.science.genetics.dna".to_string()),
                (
                    "neuroscience".to_string(),
                    "top.science.neuroscience".to_string()
                ),
            ]
        );
    }

    #[test]
    fn test_promotion_to_roots() {
        let rows = vec![
            row("science", "top", "top.science"),
            row("maths", "science", "top.science.maths"),
        ];
        let plan = plan_promotion("top", "top", None, &rows, &["science".to_string()]).unwrap();

        assert_eq!(
            plan.rewrites,
            vec![
                ("science".to_string(), "science".to_string()),
                ("maths".to_string(), "science.maths".to_string()),
            ]
        );
    }

    #[test]
    fn test_rewrite_count_check() {
        let plan = plan_cascade(
            "biology",
            "top.science.biology",
            "top.biology",
            &biology_subtree(),
            &[],
        )
        .unwrap();

        assert!(check_rewrite_count(&plan, 3).is_ok());
        assert!(check_rewrite_count(&plan, 2).unwrap_err().is_integrity_violation());
    }
}
