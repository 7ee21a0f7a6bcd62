//! # Database Error Types
//!
//! Error types for storage, migration and backup operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  ValidationError (chroma-core)   sqlx::Error        std::io::Error      │
//! │       │                              │                   │              │
//! │       ▼                              ▼                   ▼              │
//! │  DbError::Validation    DbError::{QueryFailed,     DbError::Backup      │
//! │                          ForeignKeyViolation, ...}                      │
//! │       │                              │                   │              │
//! │       └──────────────────────────────┴───────────────────┘              │
//! │                                      │                                  │
//! │                                      ▼                                  │
//! │                              Caller (UI, CLI)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! "Not found" on a lookup is not an error: `get` returns `Ok(None)`.
//! `DbError::NotFound` is reserved for writes aimed at a missing row.

use std::path::PathBuf;

use chroma_core::ValidationError;
use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// A write targeted a row that doesn't exist.
    ///
    /// ## When This Occurs
    /// - `update` with an id that was never inserted or was deleted
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Input was rejected before touching storage.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Unique constraint violation.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - A child row referencing a product or specification that doesn't
    ///   exist. This is a programming error and is never swallowed.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Query execution failed.
    ///
    /// ## When This Occurs
    /// - Missing tables because migrations never ran
    /// - Runtime SQL error
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction could not begin or commit.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// A stored value can't be turned back into a domain value.
    ///
    /// ## When This Occurs
    /// - Unknown material, difficulty or joint type string
    /// - Malformed hex color in `color_specifications`
    #[error("Corrupt data in column {column}: '{value}'")]
    CorruptData { column: String, value: String },

    /// A schema migration step failed.
    #[error(transparent)]
    Migration(#[from] MigrationError),

    /// Copying the data file to the backup directory failed.
    #[error("Backup to {path} failed: {source}")]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a CorruptData error for a stored value.
    pub fn corrupt(column: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::CorruptData {
            column: column.into(),
            value: value.into(),
        }
    }
}

/// A migration step failed; nothing after it was attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "Migration to version {version} ({step}) failed: {reason}{}",
    applied_suffix(.applied)
)]
pub struct MigrationError {
    /// Version the failing step would have produced.
    pub version: i64,
    /// Description of the failing step.
    pub step: String,
    /// Why it failed.
    pub reason: String,
    /// Versions applied successfully in this run, before the failure.
    pub applied: Vec<i64>,
}

fn applied_suffix(applied: &[i64]) -> String {
    if applied.is_empty() {
        String::new()
    } else {
        format!(" (applied before failure: {:?})", applied)
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// sqlx::Error::ColumnDecode   → DbError::CorruptData
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite constraint messages:
                // "UNIQUE constraint failed: <table>.<column>"
                // "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::ColumnDecode { index, source } => DbError::CorruptData {
                column: index,
                value: source.to_string(),
            },

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_error_message_lists_applied_versions() {
        let err = MigrationError {
            version: 3,
            step: "create indexes".to_string(),
            reason: "disk I/O error".to_string(),
            applied: vec![1, 2],
        };
        assert_eq!(
            err.to_string(),
            "Migration to version 3 (create indexes) failed: disk I/O error (applied before failure: [1, 2])"
        );

        let db_err: DbError = err.into();
        assert!(matches!(db_err, DbError::Migration(ref m) if m.version == 3));
    }

    #[test]
    fn test_validation_converts_to_db_error() {
        let err: DbError = ValidationError::required("name").into();
        assert!(matches!(err, DbError::Validation(_)));
        assert_eq!(err.to_string(), "Validation failed: name is required");
    }
}
