//! Error types for the SQLite processor.
//!
//! Covers database access, value conversion and expressions SQLite has no
//! statement for.

use migrator_runner::ProcessorError;
use thiserror::Error;

/// Errors that can occur while rendering or executing expressions.
#[derive(Debug, Error)]
pub enum SqliteError {
    /// SQLite database operation failure.
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    /// The expression has no SQLite equivalent.
    #[error("{kind} is not supported by SQLite: {reason}")]
    Unsupported {
        kind: &'static str,
        reason: &'static str,
    },

    /// A value could not be converted to or from SQL.
    #[error("conversion error: {0}")]
    ConversionError(String),
}

/// Convenience alias for results with [`SqliteError`].
pub type Result<T> = std::result::Result<T, SqliteError>;

impl From<SqliteError> for ProcessorError {
    fn from(err: SqliteError) -> Self {
        let message = match &err {
            SqliteError::DatabaseError(_) => "sqlite statement failed",
            SqliteError::Unsupported { .. } => "unsupported expression",
            SqliteError::ConversionError(_) => "value conversion failed",
        };
        ProcessorError::with_source(message, err)
    }
}
