//! Data Models
//!
//! - `Node` - one element of the tree, with its materialized path
//! - `NodeUpdate` - partial update of key, parent and label
//! - `DeleteResult` - outcome of a delete
//!
//! All nodes live in the single `nodes` table.

mod node;

pub use node::{validate_key, DeleteResult, Node, NodeUpdate, ValidationError};
