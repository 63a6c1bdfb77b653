//! Database Layer
//!
//! This module handles all database interactions using libsql (embedded SQLite):
//!
//! - Database initialization and connection management
//! - Schema with the materialized `path` column and its indexes
//! - Store-side backstops (unique keys, no self-ancestry trigger)
//! - Row-level operations behind the [`NodeStore`] trait
//! - Domain events broadcast after commits
//!
//! # Architecture
//!
//! The parent chain (`parent_id`) is the source of truth; `path` is a
//! derived, indexed column kept in sync by the service layer. Descendant
//! queries are range scans on `idx_nodes_path`, ancestor queries are
//! equality probes on the same index.

mod database;
mod error;
pub mod events;
pub mod node_store;
pub mod schema;
mod turso_store;

pub use database::DatabaseService;
pub use error::DatabaseError;
pub use events::DomainEvent;
pub use node_store::{NodeRow, NodeStore};
pub use turso_store::TursoStore;
