//! The backend seam.
//!
//! A [`Processor`] turns expressions into effects on a concrete data store.
//! The runner and the version loader only ever talk to the store through
//! this trait.

use std::error::Error as StdError;

use migrator_core::{Expression, Row};
use thiserror::Error;

type BoxedSource = Box<dyn StdError + Send + Sync + 'static>;

/// Failure reported by a processor.
///
/// Carries a message and, optionally, the backend error that caused it.
#[derive(Debug, Error)]
#[error("{message}{}", suffix(.source))]
pub struct ProcessorError {
    message: String,
    #[source]
    source: Option<BoxedSource>,
}

fn suffix(source: &Option<BoxedSource>) -> String {
    source.as_ref().map(|s| format!(": {s}")).unwrap_or_default()
}

impl ProcessorError {
    /// Creates an error with a message only.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an error wrapping a backend error.
    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<BoxedSource>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// The error message, without the source chain.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result alias for processor calls.
pub type ProcessorResult<T> = std::result::Result<T, ProcessorError>;

/// Renders and executes expressions against one backend.
///
/// Existence checks take an optional schema; `None` means the backend's
/// default schema.
pub trait Processor {
    /// Backend name, e.g. `"sqlite"`. Exposed to migrations through
    /// [`MigrationContext`](migrator_core::MigrationContext).
    fn database_type(&self) -> &str;

    /// Whether the processor itself was configured for preview only.
    fn is_preview(&self) -> bool;

    /// Executes one expression.
    fn execute(&mut self, expr: &Expression) -> ProcessorResult<()>;

    /// Renders one expression without changing the store.
    fn preview(&mut self, expr: &Expression) -> ProcessorResult<()>;

    fn schema_exists(&self, schema: &str) -> ProcessorResult<bool>;

    fn table_exists(&self, schema: Option<&str>, table: &str) -> ProcessorResult<bool>;

    fn column_exists(
        &self,
        schema: Option<&str>,
        table: &str,
        column: &str,
    ) -> ProcessorResult<bool>;

    fn index_exists(&self, schema: Option<&str>, table: &str, index: &str)
    -> ProcessorResult<bool>;

    fn constraint_exists(
        &self,
        schema: Option<&str>,
        table: &str,
        constraint: &str,
    ) -> ProcessorResult<bool>;

    fn sequence_exists(&self, schema: Option<&str>, sequence: &str) -> ProcessorResult<bool>;

    /// Reads every row of a table.
    fn read_rows(&self, schema: Option<&str>, table: &str) -> ProcessorResult<Vec<Row>>;

    fn begin_transaction(&mut self) -> ProcessorResult<()>;

    fn commit_transaction(&mut self) -> ProcessorResult<()>;

    fn rollback_transaction(&mut self) -> ProcessorResult<()>;
}
