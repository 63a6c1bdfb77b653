//! Path Codec
//!
//! Encodes an ancestor-key chain plus a node's own key into the canonical
//! path string and splits a path back into its component keys.
//!
//! Keys never contain [`SEPARATOR`]. The codec does not escape or check
//! this; key format is enforced by [`crate::models::validate_key`] before a
//! key ever reaches storage.

/// Separator between keys in a materialized path
pub const SEPARATOR: char = '.';

/// Join ancestor keys (root first) and the node's own key into a path
///
/// # Examples
///
/// ```rust
/// use nodepath_core::path::encode;
///
/// assert_eq!(encode(&["top", "science"], "maths"), "top.science.maths");
/// assert_eq!(encode::<&str>(&[], "top"), "top");
/// ```
pub fn encode<S: AsRef<str>>(ancestor_keys: &[S], own_key: &str) -> String {
    let capacity = ancestor_keys
        .iter()
        .map(|k| k.as_ref().len() + 1)
        .sum::<usize>()
        + own_key.len();

    let mut path = String::with_capacity(capacity);
    for key in ancestor_keys {
        path.push_str(key.as_ref());
        path.push(SEPARATOR);
    }
    path.push_str(own_key);
    path
}

/// Split a path into its component keys, root first
///
/// # Examples
///
/// ```rust
/// use nodepath_core::path::decode;
///
/// assert_eq!(decode("top.science.maths"), vec!["top", "science", "maths"]);
/// ```
pub fn decode(path: &str) -> Vec<String> {
    path.split(SEPARATOR).map(str::to_string).collect()
}

/// Number of keys in the path (a root has depth 1)
pub fn depth(path: &str) -> usize {
    path.split(SEPARATOR).count()
}

/// Path of the parent, or `None` for a root path
pub fn parent_path(path: &str) -> Option<&str> {
    path.rfind(SEPARATOR).map(|idx| &path[..idx])
}

/// True if `path` lies strictly below `root` (`root.` prefix)
pub fn is_strict_descendant(path: &str, root: &str) -> bool {
    path.len() > root.len()
        && path.starts_with(root)
        && path[root.len()..].starts_with(SEPARATOR)
}

/// True if `path` equals `root` or lies below it
pub fn is_descendant_or_self(path: &str, root: &str) -> bool {
    path == root || is_strict_descendant(path, root)
}

/// True if `ancestor` equals `path` or is a separator-bounded prefix of it
pub fn is_ancestor_or_self(ancestor: &str, path: &str) -> bool {
    is_descendant_or_self(path, ancestor)
}

/// Every ancestor path of `path`, root first, ending with `path` itself
///
/// ```rust
/// use nodepath_core::path::ancestor_paths;
///
/// assert_eq!(
///     ancestor_paths("top.science.maths"),
///     vec!["top", "top.science", "top.science.maths"]
/// );
/// ```
pub fn ancestor_paths(path: &str) -> Vec<&str> {
    let mut paths: Vec<&str> = path
        .match_indices(SEPARATOR)
        .map(|(idx, _)| &path[..idx])
        .collect();
    paths.push(path);
    paths
}

/// Replace the `old_prefix` of `path` with `new_prefix`, keeping the suffix
///
/// Returns `None` when `path` is neither `old_prefix` nor one of its
/// descendants; the cascade treats that as corruption.
pub fn replace_prefix(path: &str, old_prefix: &str, new_prefix: &str) -> Option<String> {
    if !is_descendant_or_self(path, old_prefix) {
        return None;
    }
    let suffix = &path[old_prefix.len()..];
    let mut rewritten = String::with_capacity(new_prefix.len() + suffix.len());
    rewritten.push_str(new_prefix);
    rewritten.push_str(suffix);
    Some(rewritten)
}
