//! The migration runner.
//!
//! [`MigrationRunner`] ties everything together: it loads migrations from
//! its sources, selects them by namespace and tags, compares them with the
//! applied versions and drives the processor. Each migration runs in its
//! own transaction together with its version record.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use migrator_core::{ConventionSet, Expression, Migration, expressions_down, expressions_up};
use tracing::{debug, info, warn};

use crate::config::{RunnerConfig, RunnerContext};
use crate::error::{MigrateError, Result};
use crate::processor::Processor;
use crate::source::{MigrationEntry, MigrationSource};
use crate::tags::{TagGroup, tags_match};
use crate::version::{VersionInfo, VersionLoader, VersionTableMetadata};

/// An expression failure captured in silent-fail mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedError {
    /// Migration version, `None` for [`MigrationRunner::apply_up`] calls.
    pub version: Option<i64>,
    /// [`Expression::kind`] of the failed expression.
    pub kind: &'static str,
    pub message: String,
}

/// Outcome of one runner operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Versions applied (or reverted), in execution order.
    pub applied: Vec<i64>,
    /// Failures captured in silent-fail mode.
    pub captured_errors: Vec<CapturedError>,
}

impl RunReport {
    /// Returns `true` when nothing failed.
    pub fn is_clean(&self) -> bool {
        self.captured_errors.is_empty()
    }
}

/// Status row returned by [`MigrationRunner::list_migrations`].
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationStatus {
    pub version: i64,
    pub name: String,
    pub description: Option<String>,
    pub applied: bool,
    pub applied_on: Option<DateTime<Utc>>,
    pub breaking_change: bool,
    pub tags: Vec<TagGroup>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

/// Builder for [`MigrationRunner`].
pub struct RunnerBuilder<P: Processor> {
    processor: P,
    config: RunnerConfig,
    sources: Vec<Box<dyn MigrationSource>>,
}

impl<P: Processor> RunnerBuilder<P> {
    /// Replaces the whole configuration.
    pub fn config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn context(mut self, context: RunnerContext) -> Self {
        self.config.context = context;
        self
    }

    pub fn conventions(mut self, conventions: ConventionSet) -> Self {
        self.config.conventions = conventions;
        self
    }

    pub fn version_table(mut self, metadata: VersionTableMetadata) -> Self {
        self.config.version_table = metadata;
        self
    }

    /// Adds a migration source. Sources are merged; versions must be unique.
    pub fn source(mut self, source: impl MigrationSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Loads the sources and creates the runner.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::DuplicateVersion`] when two sources provide
    /// the same version, or any error raised by a source.
    pub fn build(self) -> Result<MigrationRunner<P>> {
        let RunnerConfig {
            version_table,
            conventions,
            context,
        } = self.config;

        let mut seen = HashSet::new();
        let mut migrations = Vec::new();
        for source in &self.sources {
            for entry in source.migrations(context.namespace.as_deref(), context.nested_namespaces)? {
                if !seen.insert(entry.version) {
                    return Err(MigrateError::DuplicateVersion(entry.version));
                }
                migrations.push(entry);
            }
        }
        migrations.sort_by_key(|e| e.version);

        let preview = context.preview_only || self.processor.is_preview();
        debug!(count = migrations.len(), preview, "Loaded migrations");

        Ok(MigrationRunner {
            processor: self.processor,
            migrations,
            loader: VersionLoader::new(version_table).with_preview(preview),
            conventions,
            context,
            caught_errors: Vec::new(),
        })
    }
}

/// Applies and reverts migrations through a [`Processor`].
///
/// The runner owns its processor; use [`into_processor`](Self::into_processor)
/// to hand it to the next runner.
///
/// # Examples
///
/// ```no_run
/// # fn demo<P: migrator_runner::Processor>(processor: P) -> migrator_runner::Result<()> {
/// use migrator_runner::{DirectorySource, MigrationRunner};
///
/// let mut runner = MigrationRunner::builder(processor)
///     .source(DirectorySource::from_dir("migrations/")?)
///     .build()?;
/// let report = runner.migrate_up(None, false)?;
/// println!("applied {:?}", report.applied);
/// # Ok(())
/// # }
/// ```
pub struct MigrationRunner<P: Processor> {
    processor: P,
    migrations: Vec<MigrationEntry>,
    loader: VersionLoader,
    conventions: ConventionSet,
    context: RunnerContext,
    caught_errors: Vec<CapturedError>,
}

impl<P: Processor> MigrationRunner<P> {
    /// Starts building a runner around `processor`.
    pub fn builder(processor: P) -> RunnerBuilder<P> {
        RunnerBuilder {
            processor,
            config: RunnerConfig::default(),
            sources: Vec::new(),
        }
    }

    /// Applies unapplied migrations up to `target` (all when `None`).
    ///
    /// # Errors
    ///
    /// [`MigrateError::VersionOrderInvalid`] unless out-of-order runs are
    /// allowed, [`MigrateError::BreakingChange`] before anything runs, or
    /// the first failure of a migration (earlier ones stay committed).
    pub fn migrate_up(&mut self, target: Option<i64>, allow_breaking_change: bool) -> Result<RunReport> {
        let applied = self.loader.load_applied(&mut self.processor)?;
        if !self.context.allow_out_of_order {
            self.check_order(&applied)?;
        }

        let plan: Vec<MigrationEntry> = self
            .in_scope()
            .filter(|e| !applied.has_applied(e.version))
            .filter(|e| target.is_none_or(|t| e.version <= t))
            .cloned()
            .collect();

        self.run_plan(plan, Direction::Up, allow_breaking_change)
    }

    /// Reverts applied migrations above `target`, newest first.
    pub fn migrate_down(&mut self, target: i64, allow_breaking_change: bool) -> Result<RunReport> {
        let applied = self.loader.load_applied(&mut self.processor)?;
        let plan = self.applied_newest_first(&applied, |v| v > target);
        self.run_plan(plan, Direction::Down, allow_breaking_change)
    }

    /// Reverts the `steps` most recent applied migrations.
    pub fn rollback(&mut self, steps: usize) -> Result<RunReport> {
        let applied = self.loader.load_applied(&mut self.processor)?;
        let mut plan = self.applied_newest_first(&applied, |_| true);
        plan.truncate(steps);
        self.run_plan(plan, Direction::Down, false)
    }

    /// Reverts every applied migration above `version`.
    ///
    /// With `0`, the version table itself is dropped once no applied
    /// versions remain.
    ///
    /// # Errors
    ///
    /// [`MigrateError::UnknownVersion`] if `version` is neither `0`, a known
    /// migration nor an applied version.
    pub fn rollback_to_version(&mut self, version: i64) -> Result<RunReport> {
        let applied = self.loader.load_applied(&mut self.processor)?;
        let known = self.migrations.iter().any(|e| e.version == version);
        if version != 0 && !known && !applied.has_applied(version) {
            return Err(MigrateError::UnknownVersion(version));
        }

        let plan = self.applied_newest_first(&applied, |v| v > version);
        let report = self.run_plan(plan, Direction::Down, false)?;

        if version == 0 && self.loader.load_applied(&mut self.processor)?.is_empty() {
            self.loader.drop_bookkeeping(&mut self.processor)?;
        }
        Ok(report)
    }

    /// Checks that no unapplied migration is older than the latest applied.
    ///
    /// # Errors
    ///
    /// [`MigrateError::VersionOrderInvalid`] listing every offending
    /// migration as `(version, name)`.
    pub fn validate_version_order(&mut self) -> Result<()> {
        let applied = self.loader.load_applied(&mut self.processor)?;
        self.check_order(&applied)
    }

    /// Runs one migration's `up` without touching the version table.
    pub fn apply_up(&mut self, migration: &dyn Migration) -> Result<RunReport> {
        let expressions = expressions_up(migration, self.processor.database_type());
        let mut report = RunReport::default();
        self.execute_migration(None, expressions, &mut report)?;
        Ok(report)
    }

    /// Runs one migration's `down` without touching the version table.
    pub fn apply_down(&mut self, migration: &dyn Migration) -> Result<RunReport> {
        let expressions = expressions_down(migration, self.processor.database_type())
            .map_err(|source| MigrateError::Reversal { version: None, source })?;
        let mut report = RunReport::default();
        self.execute_migration(None, expressions, &mut report)?;
        Ok(report)
    }

    /// Status of every migration in scope, ascending.
    pub fn list_migrations(&mut self) -> Result<Vec<MigrationStatus>> {
        let applied = self.loader.load_applied(&mut self.processor)?;
        Ok(self
            .in_scope()
            .map(|e| {
                let record = applied.get(e.version);
                MigrationStatus {
                    version: e.version,
                    name: e.migration.name().to_string(),
                    description: e.description.clone(),
                    applied: record.is_some(),
                    applied_on: record.and_then(|r| r.applied_on),
                    breaking_change: e.breaking_change,
                    tags: e.tags.clone(),
                }
            })
            .collect())
    }

    /// Returns `true` if [`migrate_up`](Self::migrate_up) would apply anything.
    pub fn has_migrations_to_apply_up(&mut self, target: Option<i64>) -> Result<bool> {
        let applied = self.loader.load_applied(&mut self.processor)?;
        Ok(self
            .in_scope()
            .any(|e| !applied.has_applied(e.version) && target.is_none_or(|t| e.version <= t)))
    }

    /// Reads the applied versions.
    pub fn applied_versions(&mut self) -> Result<VersionInfo> {
        self.loader.load_applied(&mut self.processor)
    }

    /// Every failure captured in silent-fail mode over the runner's lifetime.
    pub fn caught_errors(&self) -> &[CapturedError] {
        &self.caught_errors
    }

    /// Loaded migrations, ascending, before tag filtering.
    pub fn migrations(&self) -> &[MigrationEntry] {
        &self.migrations
    }

    pub fn context(&self) -> &RunnerContext {
        &self.context
    }

    /// Conventions applied to every migration before validation.
    pub fn conventions(&self) -> &ConventionSet {
        &self.conventions
    }

    pub fn version_loader(&self) -> &VersionLoader {
        &self.loader
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    pub fn processor_mut(&mut self) -> &mut P {
        &mut self.processor
    }

    /// Consumes the runner, returning its processor.
    pub fn into_processor(self) -> P {
        self.processor
    }

    fn is_preview(&self) -> bool {
        self.context.preview_only || self.processor.is_preview()
    }

    fn in_scope(&self) -> impl Iterator<Item = &MigrationEntry> {
        self.migrations
            .iter()
            .filter(|e| tags_match(&e.tags, &self.context.tags))
    }

    fn applied_newest_first(
        &self,
        applied: &VersionInfo,
        keep: impl Fn(i64) -> bool,
    ) -> Vec<MigrationEntry> {
        let mut plan: Vec<MigrationEntry> = self
            .in_scope()
            .filter(|e| applied.has_applied(e.version) && keep(e.version))
            .cloned()
            .collect();
        plan.reverse();
        plan
    }

    fn check_order(&self, applied: &VersionInfo) -> Result<()> {
        let latest = applied.latest();
        let migrations: Vec<(i64, String)> = self
            .in_scope()
            .filter(|e| e.version < latest && !applied.has_applied(e.version))
            .map(|e| (e.version, e.name().to_string()))
            .collect();
        if migrations.is_empty() {
            Ok(())
        } else {
            Err(MigrateError::VersionOrderInvalid { migrations })
        }
    }

    fn run_plan(
        &mut self,
        plan: Vec<MigrationEntry>,
        direction: Direction,
        allow_breaking_change: bool,
    ) -> Result<RunReport> {
        if !(allow_breaking_change || self.context.allow_breaking_change) {
            if let Some(entry) = plan.iter().find(|e| e.breaking_change) {
                return Err(MigrateError::BreakingChange {
                    version: entry.version,
                });
            }
        }

        let mut report = RunReport::default();
        for entry in &plan {
            self.run_migration(entry, direction, &mut report)?;
        }
        Ok(report)
    }

    fn run_migration(
        &mut self,
        entry: &MigrationEntry,
        direction: Direction,
        report: &mut RunReport,
    ) -> Result<()> {
        let version = entry.version;
        let database_type = self.processor.database_type().to_string();
        let expressions = match direction {
            Direction::Up => expressions_up(&*entry.migration, &database_type),
            Direction::Down => expressions_down(&*entry.migration, &database_type).map_err(
                |source| MigrateError::Reversal {
                    version: Some(version),
                    source,
                },
            )?,
        };

        match direction {
            Direction::Up => info!(version, name = entry.name(), "Migrating"),
            Direction::Down => info!(version, name = entry.name(), "Reverting"),
        }

        let expressions = self.prepare(Some(version), expressions)?;

        self.processor
            .begin_transaction()
            .map_err(|source| transaction_error(version, "BeginTransaction", source))?;

        let result = self.execute_all(Some(version), &expressions, report).and_then(|()| {
            match direction {
                Direction::Up => self.loader.record_applied(
                    &mut self.processor,
                    version,
                    entry.description.as_deref(),
                ),
                Direction::Down => self.loader.remove_applied(&mut self.processor, version),
            }
        });

        if let Err(err) = result {
            if let Err(rollback) = self.processor.rollback_transaction() {
                warn!(version, error = %rollback, "Rollback failed");
            }
            return Err(err);
        }

        if self.is_preview() {
            self.processor
                .rollback_transaction()
                .map_err(|source| transaction_error(version, "RollbackTransaction", source))?;
        } else {
            self.processor
                .commit_transaction()
                .map_err(|source| transaction_error(version, "CommitTransaction", source))?;
        }

        report.applied.push(version);
        Ok(())
    }

    // Validation covers the whole migration before anything executes.
    fn prepare(&self, version: Option<i64>, expressions: Vec<Expression>) -> Result<Vec<Expression>> {
        let expressions = self.conventions.apply(expressions);
        for expr in &expressions {
            let errors = expr.validate();
            if !errors.is_empty() {
                return Err(MigrateError::Validation {
                    version,
                    kind: expr.kind(),
                    errors,
                });
            }
        }
        Ok(expressions)
    }

    fn execute_migration(
        &mut self,
        version: Option<i64>,
        expressions: Vec<Expression>,
        report: &mut RunReport,
    ) -> Result<()> {
        let expressions = self.prepare(version, expressions)?;
        self.execute_all(version, &expressions, report)
    }

    fn execute_all(
        &mut self,
        version: Option<i64>,
        expressions: &[Expression],
        report: &mut RunReport,
    ) -> Result<()> {
        let preview = self.is_preview();
        for expr in expressions {
            debug!(version, expression = %expr, preview, "Executing expression");
            let result = if preview {
                self.processor.preview(expr)
            } else {
                self.processor.execute(expr)
            };

            let Err(source) = result else { continue };
            if !self.context.silent_fail {
                return Err(MigrateError::Execution {
                    version,
                    kind: expr.kind(),
                    source,
                });
            }

            warn!(version, kind = expr.kind(), error = %source, "Expression failed, continuing");
            let captured = CapturedError {
                version,
                kind: expr.kind(),
                message: source.to_string(),
            };
            self.caught_errors.push(captured.clone());
            report.captured_errors.push(captured);
        }
        Ok(())
    }
}

fn transaction_error(
    version: i64,
    kind: &'static str,
    source: crate::processor::ProcessorError,
) -> MigrateError {
    MigrateError::Execution {
        version: Some(version),
        kind,
        source,
    }
}
