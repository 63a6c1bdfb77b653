//! NodePath Core - Materialized-Path Tree Engine
//!
//! This crate maintains a materialized path (`top.science.maths`) for every
//! node of a tree stored in a relational table, and answers ancestor /
//! descendant queries with index-backed predicates instead of recursive
//! traversal.
//!
//! # Architecture
//!
//! - **Parent chain is the source of truth**: `path` is a derived index
//! - **Transactional cascades**: a key or parent change rewrites the whole
//!   subtree in one statement inside one transaction
//! - **Guarded writes**: self-parenting, cycles and duplicate keys are
//!   rejected before anything is written, with store-side constraints as a
//!   backstop
//! - **libsql/Turso**: Embedded SQLite-compatible database
//!
//! # Modules
//!
//! - [`path`] - Path codec and path computer (pure)
//! - [`models`] - Node record, updates and key validation
//! - [`operations`] - Mutation guard, cascade planning, repair, errors
//! - [`query`] - Containment predicates compiled to SQL
//! - [`db`] - Database layer with libsql integration
//! - [`services`] - `TreeService`, the transactional entry point
//! - [`config`] - Engine configuration

pub mod config;
pub mod db;
pub mod models;
pub mod operations;
pub mod path;
pub mod query;
pub mod services;

// Re-export commonly used types
pub use config::{DeletePolicy, TreeConfig};
pub use models::*;
pub use operations::{CreateNodeParams, TreeError, TreeResult};
pub use query::{NodeQuery, OrderBy, PathPredicate};
pub use services::TreeService;
