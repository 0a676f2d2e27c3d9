//! Error types for the PostgreSQL fixture store.

use dxdeploy_core::SeedError;
use sqlx_core::error::Error as SqlxError;

/// PostgreSQL error code for unique constraint violations (23505).
pub const PG_UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL error code for foreign key violations (23503).
pub const PG_FOREIGN_KEY_VIOLATION: &str = "23503";

/// Checks if a sqlx error has a specific PostgreSQL error code.
pub fn has_pg_error_code(err: &SqlxError, code: &str) -> bool {
    if let SqlxError::Database(db_err) = err {
        db_err.code().as_deref() == Some(code)
    } else {
        false
    }
}

/// Errors specific to the PostgreSQL fixture store.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// A statement failed.
    #[error("Query error: {0}")]
    Query(#[from] SqlxError),

    /// The server could not be reached.
    #[error("Database connection error: {message}")]
    Connection { message: String },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl PostgresError {
    /// Creates a new connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a new configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<PostgresError> for SeedError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::Query(e) if has_pg_error_code(&e, PG_UNIQUE_VIOLATION) => {
                SeedError::database(format!("Duplicate row: {e}"))
            }
            PostgresError::Query(e) if has_pg_error_code(&e, PG_FOREIGN_KEY_VIOLATION) => {
                SeedError::database(format!("Dangling reference: {e}"))
            }
            PostgresError::Query(e) => SeedError::database(e.to_string()),
            PostgresError::Connection { message } => SeedError::connection(message),
            PostgresError::Config { message } => {
                SeedError::connection(format!("Configuration error: {message}"))
            }
        }
    }
}

/// Result type alias for PostgreSQL operations.
pub type Result<T> = std::result::Result<T, PostgresError>;
