//! Business Services
//!
//! - `TreeService` - path-maintaining CRUD, structural moves, containment
//!   queries and repair
//!
//! Services coordinate between the database layer and the tree rules in
//! [`crate::operations`], running each mutation as one transaction.

pub mod tree_service;

pub use tree_service::TreeService;
