//! Database Error Types
//!
//! This module defines error types for database operations, providing
//! clear error handling for connection, schema installation, and query failures.

use std::path::PathBuf;
use thiserror::Error;

/// Database operation errors
///
/// Covers connection, schema installation and statement execution. Tree
/// rule violations (cycles, duplicate keys) are reported by
/// [`crate::operations::TreeError`], which wraps this type.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish database connection
    #[error("Failed to connect to database at {path}: {source}")]
    ConnectionFailed {
        path: PathBuf,
        source: libsql::Error,
    },

    /// Failed to install the schema (tables, indexes, constraints)
    #[error("Failed to initialize database schema: {0}")]
    InitializationFailed(String),

    /// Permission denied when accessing database
    #[error("Permission denied for database path: {path}")]
    PermissionDenied { path: PathBuf },

    /// Failed to create parent directory
    #[error("Failed to create parent directory for database: {0}")]
    DirectoryCreationFailed(#[from] std::io::Error),

    /// libsql operation error
    #[error("Database operation failed: {0}")]
    LibsqlError(#[from] libsql::Error),

    /// SQL execution error with context
    #[error("SQL execution failed: {context}")]
    SqlExecutionError { context: String },

    /// A store-side constraint rejected the statement
    #[error("Constraint violated: {context}")]
    ConstraintViolation { context: String },
}

impl DatabaseError {
    /// Create a connection failed error
    pub fn connection_failed(path: PathBuf, source: libsql::Error) -> Self {
        Self::ConnectionFailed { path, source }
    }

    /// Create an initialization failed error
    pub fn initialization_failed(msg: impl Into<String>) -> Self {
        Self::InitializationFailed(msg.into())
    }

    /// Create a permission denied error
    pub fn permission_denied(path: PathBuf) -> Self {
        Self::PermissionDenied { path }
    }

    /// Create a SQL execution error with context
    pub fn sql_execution(context: impl Into<String>) -> Self {
        Self::SqlExecutionError {
            context: context.into(),
        }
    }

    /// Wrap a libsql error, classifying constraint failures
    pub fn from_statement(context: &str, err: libsql::Error) -> Self {
        let message = err.to_string();
        if is_constraint_message(&message) {
            Self::ConstraintViolation {
                context: format!("{}: {}", context, message),
            }
        } else {
            Self::sql_execution(format!("{}: {}", context, message))
        }
    }

    /// True if the store rejected a duplicate `key`
    pub fn is_unique_key_violation(&self) -> bool {
        match self {
            Self::ConstraintViolation { context } => {
                context.contains("UNIQUE constraint failed") && context.contains("nodes.key")
            }
            _ => false,
        }
    }

    /// True if the store-side no-self-ancestry rule fired
    pub fn is_ancestry_violation(&self) -> bool {
        match self {
            Self::ConstraintViolation { context } => {
                context.contains(crate::db::schema::ANCESTRY_VIOLATION_MESSAGE)
                    || context.contains(crate::db::schema::SELF_PARENT_CONSTRAINT)
            }
            _ => false,
        }
    }
}

fn is_constraint_message(message: &str) -> bool {
    message.contains("constraint failed")
        || message.contains(crate::db::schema::ANCESTRY_VIOLATION_MESSAGE)
}
