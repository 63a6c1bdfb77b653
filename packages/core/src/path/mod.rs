//! Materialized Paths
//!
//! A path is the dot-joined chain of keys from a root down to a node,
//! inclusive (`top.science.maths`). This module owns the string format
//! ([`codec`]) and the derivation of a node's path from its parent
//! ([`computer`]). Both are pure; nothing here touches the database.

pub mod codec;
pub mod computer;

pub use codec::{
    ancestor_paths, decode, depth, encode, is_ancestor_or_self, is_descendant_or_self,
    is_strict_descendant, parent_path, replace_prefix, SEPARATOR,
};
pub use computer::compute_path;
