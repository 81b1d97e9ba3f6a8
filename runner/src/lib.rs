//! Version tracking and migration orchestration.
//!
//! This crate runs the migrations described with `migrator-core` against a
//! backend reached through the [`Processor`] trait:
//!
//! - [`MigrationRunner`]: selects migrations by namespace and tags, then
//!   applies or reverts them, one transaction per migration.
//! - [`VersionLoader`]: owns the version table and creates it on demand.
//! - [`MigrationRegistry`] and [`DirectorySource`]: where migrations come
//!   from.
//! - [`RunnerConfig`]: YAML configuration of a run.
//!
//! # Quick start
//!
//! ```no_run
//! # fn demo<P: migrator_runner::Processor>(processor: P) -> migrator_runner::Result<()> {
//! use migrator_runner::{DirectorySource, MigrationRunner, RunnerConfig};
//!
//! let config = RunnerConfig::load("migrate.yml")?;
//! let mut runner = MigrationRunner::builder(processor)
//!     .config(config)
//!     .source(DirectorySource::from_dir("migrations/")?)
//!     .build()?;
//!
//! runner.migrate_up(None, false)?;
//! for status in runner.list_migrations()? {
//!     println!("{} {} applied={}", status.version, status.name, status.applied);
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod processor;
mod runner;
mod source;
mod tags;
mod version;

pub use config::{RunnerConfig, RunnerContext};
pub use error::{MigrateError, Result};
pub use processor::{Processor, ProcessorError, ProcessorResult};
pub use runner::{CapturedError, MigrationRunner, MigrationStatus, RunReport, RunnerBuilder};
pub use source::{
    DirectorySource, DirectorySourceBuilder, MigrationDocument, MigrationEntry,
    MigrationRegistry, MigrationSource, in_namespace,
};
pub use tags::{TagBehavior, TagGroup, tags_match};
pub use version::{AppliedVersion, VersionInfo, VersionLoader, VersionTableMetadata};
