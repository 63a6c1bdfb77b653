//! Path Computer
//!
//! Derives a node's path from its own key and its parent's stored path.
//! The parent's path must already be correct, so paths are always computed
//! top-down from the root.

use super::codec::SEPARATOR;

/// Compute the canonical path for `key` placed under `parent_path`
///
/// A node without a parent is a root and its path is its key.
///
/// ```rust
/// use nodepath_core::path::compute_path;
///
/// assert_eq!(compute_path(None, "top"), "top");
/// assert_eq!(compute_path(Some("top.science"), "maths"), "top.science.maths");
/// ```
pub fn compute_path(parent_path: Option<&str>, key: &str) -> String {
    match parent_path {
        None => key.to_string(),
        Some(parent) => {
            let mut path = String::with_capacity(parent.len() + 1 + key.len());
            path.push_str(parent);
            path.push(SEPARATOR);
            path.push_str(key);
            path
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::codec::{decode, encode};

    #[test]
    fn test_root_path_is_key() {
        assert_eq!(compute_path(None, "bar"), "bar");
    }

    #[test]
    fn test_chain_composition() {
        let top = compute_path(None, "top");
        let science = compute_path(Some(&top), "science");
        let maths = compute_path(Some(&science), "maths");

        assert_eq!(science, "top.science");
        assert_eq!(maths, "top.science.maths");
        assert_eq!(maths, encode(&["top", "science"], "maths"));
        assert_eq!(decode(&maths), vec!["top", "science", "maths"]);
    }
}
