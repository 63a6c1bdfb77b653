//! Schema Definition
//!
//! DDL installed once per database by [`DatabaseService`](super::DatabaseService).
//! Every statement is idempotent (`IF NOT EXISTS`).
//!
//! # Objects
//!
//! - `nodes` table with the materialized `path` column
//! - `idx_nodes_key` (UNIQUE): enforces globally unique keys
//! - `idx_nodes_path`: serves ancestor (`IN`) and descendant (range) predicates
//! - `idx_nodes_parent`: direct children lookups
//! - `nodes_no_self_ancestry` trigger: store-side backstop rejecting any
//!   parent assignment that points into the node's own subtree
//!
//! The engine validates every mutation before writing; the constraints here
//! only catch writes that bypass it.

/// Message raised by the no-self-ancestry trigger
pub const ANCESTRY_VIOLATION_MESSAGE: &str = "node cannot be its own ancestor";

/// Name of the CHECK constraint forbidding `parent_id = id`
pub const SELF_PARENT_CONSTRAINT: &str = "no_self_parent";

pub(crate) const CREATE_NODES_TABLE: &str = "CREATE TABLE IF NOT EXISTS nodes (
    id TEXT PRIMARY KEY,
    key TEXT NOT NULL,
    parent_id TEXT REFERENCES nodes(id),
    path TEXT NOT NULL,
    label TEXT NOT NULL DEFAULT '',
    version INTEGER NOT NULL DEFAULT 1,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    modified_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    CONSTRAINT no_self_parent CHECK (parent_id IS NULL OR parent_id <> id),
    CONSTRAINT key_is_component CHECK (length(key) > 0 AND instr(key, '.') = 0)
)";

/// (index name, statement)
pub(crate) const CREATE_INDEXES: &[(&str, &str)] = &[
    (
        "idx_nodes_key",
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_nodes_key ON nodes(key)",
    ),
    (
        "idx_nodes_path",
        "CREATE INDEX IF NOT EXISTS idx_nodes_path ON nodes(path)",
    ),
    (
        "idx_nodes_parent",
        "CREATE INDEX IF NOT EXISTS idx_nodes_parent ON nodes(parent_id)",
    ),
];

/// Rejects `UPDATE ... SET parent_id` when the new parent's path is the
/// node's pre-update path or lies below it.
pub(crate) const CREATE_ANCESTRY_TRIGGER: &str = "CREATE TRIGGER IF NOT EXISTS nodes_no_self_ancestry
    BEFORE UPDATE OF parent_id ON nodes
    FOR EACH ROW
    WHEN NEW.parent_id IS NOT NULL AND EXISTS (
        SELECT 1 FROM nodes AS p
        WHERE p.id = NEW.parent_id
          AND (p.path = OLD.path
               OR substr(p.path, 1, length(OLD.path) + 1) = OLD.path || '.')
    )
BEGIN
    SELECT RAISE(ABORT, 'node cannot be its own ancestor');
END";

/// Column list shared by every node SELECT; order matches `row_to_node`
pub(crate) const NODE_COLUMNS: &str =
    "id, key, parent_id, path, label, version, created_at, modified_at";
