//! Error types for migration runs.
//!
//! Covers every failure a run can surface: invalid or irreversible
//! expressions, ordering violations, backend failures, bookkeeping problems
//! and migration source loading.

use migrator_core::{ReversalError, ValidationError};
use thiserror::Error;

use crate::processor::ProcessorError;

/// Errors that can occur while loading or running migrations.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// An expression failed structural validation.
    #[error("{kind}{} is invalid: {}", in_version(.version), join(.errors))]
    Validation {
        version: Option<i64>,
        kind: &'static str,
        errors: Vec<ValidationError>,
    },

    /// A migration's down direction could not be derived.
    #[error("cannot reverse migration{}: {source}", in_version(.version))]
    Reversal {
        version: Option<i64>,
        #[source]
        source: ReversalError,
    },

    /// Unapplied migrations are older than the latest applied one.
    #[error("unapplied migrations precede the latest applied version: {}", list(.migrations))]
    VersionOrderInvalid { migrations: Vec<(i64, String)> },

    /// The processor failed to run an expression.
    #[error("{kind} failed{}: {source}", in_version(.version))]
    Execution {
        version: Option<i64>,
        kind: &'static str,
        #[source]
        source: ProcessorError,
    },

    /// Creating the version table (or its schema, index, columns) failed.
    #[error("version table bootstrap failed at {step}: {source}")]
    Bootstrap {
        step: &'static str,
        #[source]
        source: ProcessorError,
    },

    /// Recording a version that is already recorded.
    #[error("version {0} is already applied")]
    VersionAlreadyApplied(i64),

    /// Removing a version that is not recorded.
    #[error("version {0} is not applied")]
    VersionNotApplied(i64),

    /// A breaking migration was about to run without permission.
    #[error("migration {version} is a breaking change; pass allow-breaking to run it")]
    BreakingChange { version: i64 },

    /// Two migrations share a version.
    #[error("duplicate migration version: {0}")]
    DuplicateVersion(i64),

    /// A version is neither known nor applied.
    #[error("unknown migration version: {0}")]
    UnknownVersion(i64),

    /// A version table row could not be interpreted.
    #[error("corrupt version table row: {0}")]
    CorruptVersionRow(String),

    /// A migration source could not be loaded.
    #[error("migration source error: {0}")]
    Source(String),

    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Convenience alias for results with [`MigrateError`].
pub type Result<T> = std::result::Result<T, MigrateError>;

fn in_version(version: &Option<i64>) -> String {
    version.map(|v| format!(" in migration {v}")).unwrap_or_default()
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn list(migrations: &[(i64, String)]) -> String {
    migrations
        .iter()
        .map(|(version, name)| format!("{version} ({name})"))
        .collect::<Vec<_>>()
        .join(", ")
}
