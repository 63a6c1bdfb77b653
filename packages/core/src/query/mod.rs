//! Containment Query Layer
//!
//! Translates "ancestor of" / "descendant of" into predicates over the
//! materialized `path` column that the `idx_nodes_path` index can serve:
//!
//! - `ancestor-of(p)` becomes `path IN (<each ancestor path of p>)`, a set of
//!   equality probes. Ancestor paths are computed from `p` itself, so no
//!   traversal is needed.
//! - `descendant-of(p)` becomes `path = p OR (path >= 'p.' AND path < 'p/')`,
//!   a single range scan. `/` is the byte right after `.`, so the range holds
//!   exactly the paths starting with `p.`.
//!
//! Both predicates include the node itself. Results come back in arbitrary
//! order unless the query asks for path order; path order is a pre-order
//! walk of the tree.

use crate::db::schema::NODE_COLUMNS;
use crate::path::{ancestor_paths, is_ancestor_or_self, is_descendant_or_self, SEPARATOR};
use serde::{Deserialize, Serialize};

/// Byte immediately after [`SEPARATOR`]; upper bound of descendant ranges
const SEPARATOR_SUCCESSOR: char = '/';

/// Containment predicate over node paths
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "path", rename_all = "camelCase")]
pub enum PathPredicate {
    /// Nodes on the chain from the root down to `path`, inclusive
    AncestorOf(String),
    /// Nodes in the subtree rooted at `path`, inclusive
    DescendantOf(String),
}

/// A WHERE fragment with positional `?` parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlFilter {
    pub clause: String,
    pub params: Vec<String>,
}

impl PathPredicate {
    pub fn ancestor_of(path: impl Into<String>) -> Self {
        Self::AncestorOf(path.into())
    }

    pub fn descendant_of(path: impl Into<String>) -> Self {
        Self::DescendantOf(path.into())
    }

    /// Evaluate the predicate against one candidate path
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            Self::AncestorOf(path) => is_ancestor_or_self(candidate, path),
            Self::DescendantOf(path) => is_descendant_or_self(candidate, path),
        }
    }

    /// Compile to an index-friendly WHERE fragment on `path`
    pub fn to_sql(&self) -> SqlFilter {
        match self {
            Self::AncestorOf(path) => {
                let params: Vec<String> = ancestor_paths(path)
                    .into_iter()
                    .map(str::to_string)
                    .collect();
                let placeholders = vec!["?"; params.len()].join(", ");
                SqlFilter {
                    clause: format!("path IN ({})", placeholders),
                    params,
                }
            }
            Self::DescendantOf(path) => {
                let (lower, upper) = descendant_range(path);
                SqlFilter {
                    clause: "(path = ? OR (path >= ? AND path < ?))".to_string(),
                    params: vec![path.clone(), lower, upper],
                }
            }
        }
    }
}

/// Half-open bounds `[path., path/)` holding exactly the strict descendants of `path`
pub fn descendant_range(path: &str) -> (String, String) {
    (
        format!("{}{}", path, SEPARATOR),
        format!("{}{}", path, SEPARATOR_SUCCESSOR),
    )
}

/// Result ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderBy {
    /// Store order (unspecified)
    #[default]
    Unordered,
    /// Lexicographic path order (pre-order traversal)
    Path,
    /// Key order
    Key,
}

/// Node query
///
/// ```rust
/// use nodepath_core::query::{NodeQuery, OrderBy, PathPredicate};
///
/// let query = NodeQuery::new()
///     .with_predicate(PathPredicate::descendant_of("top"))
///     .with_order_by(OrderBy::Path)
///     .with_limit(50);
/// let (sql, params) = query.to_sql();
/// assert!(sql.ends_with("ORDER BY path LIMIT 50"));
/// assert_eq!(params, vec!["top", "top.", "top/"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeQuery {
    /// Containment predicate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicate: Option<PathPredicate>,

    /// Only direct children of this node
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Only root nodes
    #[serde(default)]
    pub roots_only: bool,

    /// Result ordering
    #[serde(default)]
    pub order_by: OrderBy,

    /// Limit number of results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl NodeQuery {
    /// Create a new empty query (all nodes)
    pub fn new() -> Self {
        Self::default()
    }

    /// Subtree of `path`, in path order
    pub fn descendants_of(path: impl Into<String>) -> Self {
        Self::new()
            .with_predicate(PathPredicate::descendant_of(path))
            .with_order_by(OrderBy::Path)
    }

    /// Chain from the root to `path`, in path order
    pub fn ancestors_of(path: impl Into<String>) -> Self {
        Self::new()
            .with_predicate(PathPredicate::ancestor_of(path))
            .with_order_by(OrderBy::Path)
    }

    /// Direct children of `parent_id`, in key order
    pub fn children_of(parent_id: impl Into<String>) -> Self {
        Self {
            parent_id: Some(parent_id.into()),
            order_by: OrderBy::Key,
            ..Self::default()
        }
    }

    pub fn with_predicate(mut self, predicate: PathPredicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn with_order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = order_by;
        self
    }

    /// Set result limit
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Build the full SELECT statement and its positional parameters
    pub fn to_sql(&self) -> (String, Vec<String>) {
        let mut clauses = Vec::new();
        let mut params = Vec::new();

        if let Some(predicate) = &self.predicate {
            let filter = predicate.to_sql();
            clauses.push(filter.clause);
            params.extend(filter.params);
        }

        if let Some(parent_id) = &self.parent_id {
            clauses.push("parent_id = ?".to_string());
            params.push(parent_id.clone());
        }

        if self.roots_only {
            clauses.push("parent_id IS NULL".to_string());
        }

        let mut sql = format!("SELECT {} FROM nodes", NODE_COLUMNS);
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        match self.order_by {
            OrderBy::Unordered => {}
            OrderBy::Path => sql.push_str(" ORDER BY path"),
            OrderBy::Key => sql.push_str(" ORDER BY key"),
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        (sql, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TREE: &[&str] = &[
        "top",
        "top.science",
        "top.science.biology",
        "top.science.biology.genetics",
        "top.science.maths",
        "top.sport",
        "topology",
    ];

    fn select<'a>(predicate: &PathPredicate) -> Vec<&'a str> {
        TREE.iter().copied().filter(|p| predicate.matches(p)).collect()
    }

    #[test]
    fn test_descendants_include_self_and_respect_boundaries() {
        assert_eq!(
            select(&PathPredicate::descendant_of("top.science")),
            vec![
                "top.science",
                "top.science.biology",
                "top.science.biology.genetics",
                "top.science.maths",
            ]
        );
        assert!(!select(&PathPredicate::descendant_of("top")).contains(&"topology"));
    }

    #[test]
    fn test_ancestors_include_self() {
        assert_eq!(
            select(&PathPredicate::ancestor_of("top.science.biology.genetics")),
            vec![
                "top",
                "top.science",
                "top.science.biology",
                "top.science.biology.genetics",
            ]
        );
        assert_eq!(select(&PathPredicate::ancestor_of("topology")), vec!["topology"]);
    }

    #[test]
    fn test_ancestor_sql_uses_equality_probes() {
        let filter = PathPredicate::ancestor_of("top.science.maths").to_sql();
        assert_eq!(filter.clause, "path IN (?, ?, ?)");
        assert_eq!(filter.params, vec!["top", "top.science", "top.science.maths"]);
    }

    #[test]
    fn test_descendant_sql_uses_range() {
        let filter = PathPredicate::descendant_of("top.science").to_sql();
        assert_eq!(filter.clause, "(path = ? OR (path >= ? AND path < ?))");
        assert_eq!(filter.params, vec!["top.science", "top.science.", "top.science/"]);
    }

    #[test]
    fn test_descendant_range_bounds_match_predicate() {
        // Every path inside ['p.', 'p/') starts with 'p.'
        let (lower, upper) = descendant_range("top");
        for path in TREE {
            let in_range = *path >= lower.as_str() && *path < upper.as_str();
            assert_eq!(in_range, path.starts_with("top."), "{}", path);
        }
    }

    #[test]
    fn test_children_query() {
        let (sql, params) = NodeQuery::children_of("top-id").to_sql();
        assert!(sql.contains("WHERE parent_id = ?"));
        assert!(sql.ends_with("ORDER BY key"));
        assert_eq!(params, vec!["top-id"]);
    }

    #[test]
    fn test_combined_query() {
        let query = NodeQuery {
            roots_only: true,
            ..NodeQuery::ancestors_of("top.sport")
        };
        let (sql, params) = query.to_sql();
        assert!(sql.contains("WHERE path IN (?, ?) AND parent_id IS NULL ORDER BY path"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_unfiltered_query() {
        let (sql, params) = NodeQuery::new().to_sql();
        assert_eq!(sql, format!("SELECT {} FROM nodes", NODE_COLUMNS));
        assert!(params.is_empty());
    }

    #[test]
    fn test_predicate_serde() {
        let json = serde_json::to_value(PathPredicate::descendant_of("top")).unwrap();
        assert_eq!(json, serde_json::json!({"type": "descendantOf", "path": "top"}));
    }
}
