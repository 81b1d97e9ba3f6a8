//! Integration tests for the migrator-runner crate.
//!
//! Runs against an in-memory processor that keeps just enough state
//! (schemas, tables, columns, indexes, rows) to observe what a run did.

use std::collections::{BTreeMap, HashSet};

use migrator_core::{
    AutoReversingMigration, ColumnDefinition, ColumnType, CreateTable, Expression,
    IndexDefinition, Migration, MigrationContext, ReversalError, Row,
};
use migrator_runner::{
    MigrateError, MigrationEntry, MigrationRegistry, MigrationRunner, Processor, ProcessorError,
    ProcessorResult, RunnerContext, VersionLoader, VersionTableMetadata,
};

#[derive(Debug, Clone, Default)]
struct State {
    schemas: HashSet<String>,
    tables: BTreeMap<String, (Vec<String>, Vec<Row>)>,
    /// Index name to the key of its table.
    indexes: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
struct MemoryProcessor {
    state: State,
    snapshot: Option<State>,
    preview: bool,
    executed: Vec<String>,
    previewed: Vec<String>,
    commits: usize,
    rollbacks: usize,
}

fn key(schema: Option<&str>, table: &str) -> String {
    match schema {
        Some(schema) => format!("{schema}.{table}"),
        None => table.to_string(),
    }
}

fn fail(message: impl Into<String>) -> ProcessorError {
    ProcessorError::new(message)
}

impl MemoryProcessor {
    fn has_table(&self, table: &str) -> bool {
        self.state.tables.contains_key(table)
    }

    fn table_mut(&mut self, schema: Option<&str>, table: &str) -> ProcessorResult<&mut (Vec<String>, Vec<Row>)> {
        self.state
            .tables
            .get_mut(&key(schema, table))
            .ok_or_else(|| fail(format!("no such table: {table}")))
    }
}

impl Processor for MemoryProcessor {
    fn database_type(&self) -> &str {
        "memory"
    }

    fn is_preview(&self) -> bool {
        self.preview
    }

    fn execute(&mut self, expr: &Expression) -> ProcessorResult<()> {
        match expr {
            Expression::CreateSchema(e) => {
                self.state.schemas.insert(e.name.clone());
            }
            Expression::DeleteSchema(e) => {
                self.state.schemas.remove(&e.name);
            }
            Expression::CreateTable(e) => {
                let k = key(e.schema.as_deref(), &e.name);
                if self.state.tables.contains_key(&k) {
                    return Err(fail(format!("table {k} already exists")));
                }
                let columns = e.columns.iter().map(|c| c.name.clone()).collect();
                self.state.tables.insert(k, (columns, Vec::new()));
            }
            Expression::DeleteTable(e) => {
                let k = key(e.schema.as_deref(), &e.name);
                if self.state.tables.remove(&k).is_none() {
                    return Err(fail(format!("no such table: {}", e.name)));
                }
                self.state.indexes.retain(|_, table| *table != k);
            }
            Expression::CreateColumn(e) => {
                let name = e.column.name.clone();
                self.table_mut(e.schema.as_deref(), &e.table)?.0.push(name);
            }
            Expression::CreateIndex(e) => {
                let name = e.name.clone().unwrap_or_default();
                if self.state.indexes.contains_key(&name) {
                    return Err(fail(format!("index {name} already exists")));
                }
                let table = key(e.schema.as_deref(), &e.table);
                self.state.indexes.insert(name, table);
            }
            Expression::DeleteIndex(e) => {
                self.state.indexes.remove(e.name.as_deref().unwrap_or_default());
            }
            Expression::InsertData(e) => {
                let rows = e.rows.clone();
                self.table_mut(e.schema.as_deref(), &e.table)?.1.extend(rows);
            }
            Expression::DeleteData(e) => {
                let filters = e.rows.clone();
                let all = e.all_rows;
                let table = self.table_mut(e.schema.as_deref(), &e.table)?;
                table.1.retain(|row| {
                    !all && !filters
                        .iter()
                        .any(|f| f.iter().all(|(k, v)| row.get(k) == Some(v)))
                });
            }
            Expression::ExecuteSql(e) if e.sql.starts_with("fail") => {
                return Err(fail(format!("statement failed: {}", e.sql)));
            }
            _ => {}
        }
        self.executed.push(expr.to_string());
        Ok(())
    }

    fn preview(&mut self, expr: &Expression) -> ProcessorResult<()> {
        self.previewed.push(expr.to_string());
        Ok(())
    }

    fn schema_exists(&self, schema: &str) -> ProcessorResult<bool> {
        Ok(self.state.schemas.contains(schema))
    }

    fn table_exists(&self, schema: Option<&str>, table: &str) -> ProcessorResult<bool> {
        Ok(self.state.tables.contains_key(&key(schema, table)))
    }

    fn column_exists(&self, schema: Option<&str>, table: &str, column: &str) -> ProcessorResult<bool> {
        Ok(self
            .state
            .tables
            .get(&key(schema, table))
            .is_some_and(|t| t.0.iter().any(|c| c == column)))
    }

    fn index_exists(&self, _schema: Option<&str>, _table: &str, index: &str) -> ProcessorResult<bool> {
        Ok(self.state.indexes.contains_key(index))
    }

    fn constraint_exists(&self, _schema: Option<&str>, _table: &str, _name: &str) -> ProcessorResult<bool> {
        Ok(false)
    }

    fn sequence_exists(&self, _schema: Option<&str>, _sequence: &str) -> ProcessorResult<bool> {
        Ok(false)
    }

    fn read_rows(&self, schema: Option<&str>, table: &str) -> ProcessorResult<Vec<Row>> {
        self.state
            .tables
            .get(&key(schema, table))
            .map(|t| t.1.clone())
            .ok_or_else(|| fail(format!("no such table: {table}")))
    }

    fn begin_transaction(&mut self) -> ProcessorResult<()> {
        self.snapshot = Some(self.state.clone());
        Ok(())
    }

    fn commit_transaction(&mut self) -> ProcessorResult<()> {
        self.snapshot = None;
        self.commits += 1;
        Ok(())
    }

    fn rollback_transaction(&mut self) -> ProcessorResult<()> {
        if let Some(snapshot) = self.snapshot.take() {
            self.state = snapshot;
        }
        self.rollbacks += 1;
        Ok(())
    }
}

/// Creates one table with an `Id` column.
struct CreateTableMigration(&'static str);

impl AutoReversingMigration for CreateTableMigration {
    fn up(&self, ctx: &mut MigrationContext) {
        ctx.add(Expression::CreateTable(
            CreateTable::new(self.0)
                .with_column(ColumnDefinition::new("Id", ColumnType::Int32).primary_key()),
        ));
    }
}

/// Runs raw statements up; has no way back.
struct SqlMigration(Vec<&'static str>);

impl Migration for SqlMigration {
    fn up(&self, ctx: &mut MigrationContext) {
        ctx.extend(self.0.iter().map(|sql| Expression::execute_sql(*sql)));
    }

    fn down(&self, ctx: &mut MigrationContext) -> Result<(), ReversalError> {
        ctx.extend(self.0.iter().map(|sql| Expression::execute_sql(*sql)));
        Ok(())
    }
}

/// Auto-reversing migration that cannot actually be reversed.
struct IrreversibleMigration;

impl AutoReversingMigration for IrreversibleMigration {
    fn up(&self, ctx: &mut MigrationContext) {
        ctx.add(Expression::execute_sql("update Users set Name = 'x'"));
    }
}

fn registry(entries: Vec<MigrationEntry>) -> MigrationRegistry {
    let mut registry = MigrationRegistry::new();
    for entry in entries {
        registry.register(entry).unwrap();
    }
    registry
}

fn tables(n: i64) -> MigrationRegistry {
    const NAMES: [&str; 6] = ["T1", "T2", "T3", "T4", "T5", "T6"];
    registry(
        (1..=n)
            .map(|v| MigrationEntry::new(v, CreateTableMigration(NAMES[(v - 1) as usize])))
            .collect(),
    )
}

fn runner(processor: MemoryProcessor, source: MigrationRegistry) -> MigrationRunner<MemoryProcessor> {
    MigrationRunner::builder(processor).source(source).build().unwrap()
}

fn runner_with(
    processor: MemoryProcessor,
    source: MigrationRegistry,
    context: RunnerContext,
) -> MigrationRunner<MemoryProcessor> {
    MigrationRunner::builder(processor)
        .context(context)
        .source(source)
        .build()
        .unwrap()
}

fn versions(runner: &mut MigrationRunner<MemoryProcessor>) -> Vec<i64> {
    runner.applied_versions().unwrap().versions().collect()
}

// ---------------------------------------------------------------------------
// Version loader
// ---------------------------------------------------------------------------

#[test]
fn test_bootstrap_twice_equals_once() {
    let mut processor = MemoryProcessor::default();
    let mut loader = VersionLoader::new(VersionTableMetadata::default());

    loader.ensure_bootstrap(&mut processor).unwrap();
    let after_first = processor.executed.clone();
    loader.ensure_bootstrap(&mut processor).unwrap();

    assert_eq!(
        after_first,
        vec![
            "CreateTable VersionInfo",
            "CreateIndex UC_Version",
            "CreateColumn AppliedOn",
            "CreateColumn Description",
        ]
    );
    assert_eq!(processor.executed, after_first);
    assert!(loader.is_bootstrapped());
}

#[test]
fn test_bootstrap_skips_existing_parts() {
    let mut processor = MemoryProcessor::default();
    VersionLoader::new(VersionTableMetadata::default())
        .ensure_bootstrap(&mut processor)
        .unwrap();
    processor.executed.clear();

    let mut fresh = VersionLoader::new(VersionTableMetadata::default());
    fresh.ensure_bootstrap(&mut processor).unwrap();
    assert!(processor.executed.is_empty());
}

#[test]
fn test_bootstrap_checks_each_step_on_its_own() {
    let mut processor = MemoryProcessor::default();
    processor
        .state
        .indexes
        .insert("UC_Version".into(), "VersionInfo".into());

    let mut loader = VersionLoader::new(VersionTableMetadata::default());
    loader.ensure_bootstrap(&mut processor).unwrap();

    assert!(processor.has_table("VersionInfo"));
    assert_eq!(
        processor.executed,
        vec![
            "CreateTable VersionInfo",
            "CreateColumn AppliedOn",
            "CreateColumn Description",
        ]
    );
}

#[test]
fn test_bootstrap_owns_created_schema_only() {
    let metadata = VersionTableMetadata {
        schema: Some("audit".into()),
        ..Default::default()
    };

    let mut processor = MemoryProcessor::default();
    let mut loader = VersionLoader::new(metadata.clone());
    loader.ensure_bootstrap(&mut processor).unwrap();
    assert_eq!(processor.executed[0], "CreateSchema audit");
    assert!(loader.owns_schema());

    loader.drop_bookkeeping(&mut processor).unwrap();
    assert!(!processor.state.schemas.contains("audit"));
    assert!(!loader.is_bootstrapped());

    let mut existing = MemoryProcessor::default();
    existing.state.schemas.insert("audit".into());
    let mut loader = VersionLoader::new(metadata);
    loader.ensure_bootstrap(&mut existing).unwrap();
    assert!(!loader.owns_schema());
    loader.drop_bookkeeping(&mut existing).unwrap();
    assert!(existing.state.schemas.contains("audit"));
    assert!(!existing.has_table("audit.VersionInfo"));
}

#[test]
fn test_bootstrap_in_preview_is_cached_and_reads_empty() {
    let mut processor = MemoryProcessor {
        preview: true,
        ..Default::default()
    };
    let mut loader = VersionLoader::new(VersionTableMetadata::default()).with_preview(true);

    loader.ensure_bootstrap(&mut processor).unwrap();
    loader.ensure_bootstrap(&mut processor).unwrap();
    assert_eq!(processor.previewed.len(), 4);
    assert!(processor.executed.is_empty());
    assert!(loader.load_applied(&mut processor).unwrap().is_empty());
}

#[test]
fn test_record_and_remove_versions() {
    let mut processor = MemoryProcessor::default();
    let mut loader = VersionLoader::new(VersionTableMetadata::default());

    loader.record_applied(&mut processor, 1, Some("First")).unwrap();
    let info = loader.load_applied(&mut processor).unwrap();
    assert!(info.has_applied(1));
    assert_eq!(info.get(1).unwrap().description.as_deref(), Some("First"));
    assert!(info.get(1).unwrap().applied_on.is_some());

    assert!(matches!(
        loader.record_applied(&mut processor, 1, None),
        Err(MigrateError::VersionAlreadyApplied(1))
    ));

    loader.remove_applied(&mut processor, 1).unwrap();
    assert!(loader.load_applied(&mut processor).unwrap().is_empty());
    assert!(matches!(
        loader.remove_applied(&mut processor, 1),
        Err(MigrateError::VersionNotApplied(1))
    ));
}

// ---------------------------------------------------------------------------
// Migrate up / down
// ---------------------------------------------------------------------------

#[test]
fn test_migrate_up_then_rollback_to_zero() {
    let mut runner = runner(MemoryProcessor::default(), tables(3));

    let report = runner.migrate_up(None, false).unwrap();
    assert_eq!(report.applied, vec![1, 2, 3]);
    assert_eq!(versions(&mut runner), vec![1, 2, 3]);
    assert_eq!(runner.processor().commits, 3);

    let report = runner.rollback_to_version(0).unwrap();
    assert_eq!(report.applied, vec![3, 2, 1]);
    assert!(!runner.processor().has_table("VersionInfo"));
    assert!(!runner.processor().has_table("T1"));
    assert!(runner.applied_versions().unwrap().is_empty());
}

#[test]
fn test_migrate_up_again_after_rollback_to_zero() {
    let mut runner = runner(MemoryProcessor::default(), tables(3));
    runner.migrate_up(None, false).unwrap();
    runner.rollback_to_version(0).unwrap();
    assert!(runner.processor().state.indexes.is_empty());

    let report = runner.migrate_up(None, false).unwrap();
    assert_eq!(report.applied, vec![1, 2, 3]);
    assert_eq!(versions(&mut runner), vec![1, 2, 3]);
    assert!(runner.processor().has_table("T3"));
}

#[test]
fn test_six_migrations_latest_and_cleanup() {
    let mut runner = runner(MemoryProcessor::default(), tables(6));
    runner.migrate_up(None, false).unwrap();

    let info = runner.applied_versions().unwrap();
    assert_eq!(info.len(), 6);
    assert_eq!(info.latest(), 6);

    runner.rollback_to_version(0).unwrap();
    let processor = runner.into_processor();
    assert!(!processor.has_table("VersionInfo"));
    assert!(processor.state.tables.is_empty());
}

#[test]
fn test_migrate_up_to_target_and_down() {
    let mut runner = runner(MemoryProcessor::default(), tables(4));

    runner.migrate_up(Some(2), false).unwrap();
    assert_eq!(versions(&mut runner), vec![1, 2]);
    assert!(runner.has_migrations_to_apply_up(None).unwrap());
    assert!(!runner.has_migrations_to_apply_up(Some(2)).unwrap());

    runner.migrate_up(None, false).unwrap();
    let report = runner.migrate_down(1, false).unwrap();
    assert_eq!(report.applied, vec![4, 3, 2]);
    assert_eq!(versions(&mut runner), vec![1]);
    assert!(runner.processor().has_table("T1"));
    assert!(!runner.processor().has_table("T2"));
}

#[test]
fn test_rollback_steps() {
    let mut runner = runner(MemoryProcessor::default(), tables(3));
    runner.migrate_up(None, false).unwrap();

    runner.rollback(2).unwrap();
    assert_eq!(versions(&mut runner), vec![1]);

    runner.rollback(5).unwrap();
    assert!(versions(&mut runner).is_empty());
    assert!(runner.processor().has_table("VersionInfo"));
}

#[test]
fn test_rollback_to_unknown_version() {
    let mut runner = runner(MemoryProcessor::default(), tables(2));
    runner.migrate_up(None, false).unwrap();
    assert!(matches!(
        runner.rollback_to_version(42),
        Err(MigrateError::UnknownVersion(42))
    ));
}

#[test]
fn test_descriptions_are_recorded() {
    let source = registry(vec![
        MigrationEntry::new(1, CreateTableMigration("Users")).with_description("Add users"),
    ]);
    let mut runner = runner(MemoryProcessor::default(), source);
    runner.migrate_up(None, false).unwrap();

    let info = runner.applied_versions().unwrap();
    assert_eq!(info.get(1).unwrap().description.as_deref(), Some("Add users"));
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

#[test]
fn test_version_order_validation() {
    let mut first = runner(
        MemoryProcessor::default(),
        registry(vec![MigrationEntry::new(10, CreateTableMigration("Users"))]),
    );
    first.migrate_up(None, false).unwrap();

    let source = registry(vec![
        MigrationEntry::new(5, CreateTableMigration("UserEmail")).with_description("UserEmail"),
        MigrationEntry::new(10, CreateTableMigration("Users")),
        MigrationEntry::new(11, CreateTableMigration("Groups")),
    ]);
    let mut second = runner(first.into_processor(), source.clone());

    match second.validate_version_order() {
        Err(MigrateError::VersionOrderInvalid { migrations }) => {
            assert_eq!(migrations, vec![(5, "UserEmail".to_string())]);
        }
        other => panic!("expected VersionOrderInvalid, got {other:?}"),
    }
    assert!(matches!(
        second.migrate_up(None, false),
        Err(MigrateError::VersionOrderInvalid { .. })
    ));

    let context = RunnerContext {
        allow_out_of_order: true,
        ..Default::default()
    };
    let mut third = runner_with(second.into_processor(), source, context);
    let report = third.migrate_up(None, false).unwrap();
    assert_eq!(report.applied, vec![5, 11]);
    assert!(third.validate_version_order().is_ok());
}

#[test]
fn test_newer_unapplied_versions_are_in_order() {
    let mut first = runner(MemoryProcessor::default(), tables(1));
    first.migrate_up(None, false).unwrap();

    let mut second = runner(first.into_processor(), tables(3));
    assert!(second.validate_version_order().is_ok());
}

// ---------------------------------------------------------------------------
// Failure policy
// ---------------------------------------------------------------------------

#[test]
fn test_failure_rolls_back_only_the_failing_migration() {
    struct TableThenFail;
    impl Migration for TableThenFail {
        fn up(&self, ctx: &mut MigrationContext) {
            ctx.add(Expression::CreateTable(
                CreateTable::new("Half").with_column(ColumnDefinition::new("Id", ColumnType::Int32)),
            ));
            ctx.add(Expression::execute_sql("fail here"));
        }
        fn down(&self, _ctx: &mut MigrationContext) -> Result<(), ReversalError> {
            Ok(())
        }
    }

    let source = registry(vec![
        MigrationEntry::new(1, CreateTableMigration("Users")),
        MigrationEntry::new(2, TableThenFail),
        MigrationEntry::new(3, CreateTableMigration("Groups")),
    ]);
    let mut runner = runner(MemoryProcessor::default(), source);

    let err = runner.migrate_up(None, false).unwrap_err();
    assert!(matches!(
        err,
        MigrateError::Execution { version: Some(2), kind: "ExecuteSql", .. }
    ));
    assert_eq!(versions(&mut runner), vec![1]);
    assert!(runner.processor().has_table("Users"));
    assert!(!runner.processor().has_table("Half"));
    assert!(!runner.processor().has_table("Groups"));
    assert_eq!(runner.processor().rollbacks, 1);
}

#[test]
fn test_silent_fail_captures_execution_errors() {
    let source = registry(vec![MigrationEntry::new(
        1,
        SqlMigration(vec!["fail one", "select 1", "fail two"]),
    )]);
    let context = RunnerContext {
        silent_fail: true,
        ..Default::default()
    };
    let mut runner = runner_with(MemoryProcessor::default(), source, context);

    let report = runner.migrate_up(None, false).unwrap();
    assert_eq!(report.captured_errors.len(), 2);
    assert!(!report.is_clean());
    assert_eq!(report.applied, vec![1]);
    assert_eq!(runner.caught_errors().len(), 2);
    assert_eq!(runner.caught_errors()[0].version, Some(1));
    assert_eq!(versions(&mut runner), vec![1]);
}

#[test]
fn test_validation_runs_before_execution() {
    struct Invalid;
    impl AutoReversingMigration for Invalid {
        fn up(&self, ctx: &mut MigrationContext) {
            ctx.add(Expression::create_schema("valid"));
            ctx.add(Expression::CreateTable(CreateTable::new("Empty")));
        }
    }

    let context = RunnerContext {
        silent_fail: true,
        ..Default::default()
    };
    let mut runner = runner_with(
        MemoryProcessor::default(),
        registry(vec![MigrationEntry::new(1, Invalid)]),
        context,
    );
    let err = runner.migrate_up(None, false).unwrap_err();
    assert!(matches!(
        err,
        MigrateError::Validation { version: Some(1), kind: "CreateTable", .. }
    ));
    assert!(!runner.processor().state.schemas.contains("valid"));
    assert!(runner.caught_errors().is_empty());
}

#[test]
fn test_irreversible_migration_fails_on_down() {
    let source = registry(vec![MigrationEntry::new(1, IrreversibleMigration)]);
    let mut runner = runner(MemoryProcessor::default(), source);
    runner.migrate_up(None, false).unwrap();

    let err = runner.migrate_down(0, false).unwrap_err();
    assert!(matches!(err, MigrateError::Reversal { version: Some(1), .. }));
    assert_eq!(versions(&mut runner), vec![1]);
}

#[test]
fn test_breaking_change_gate() {
    let source = || {
        registry(vec![
            MigrationEntry::new(1, CreateTableMigration("Users")),
            MigrationEntry::new(2, CreateTableMigration("Groups")).breaking(),
        ])
    };

    let mut blocked = runner(MemoryProcessor::default(), source());
    assert!(matches!(
        blocked.migrate_up(None, false),
        Err(MigrateError::BreakingChange { version: 2 })
    ));
    assert!(versions(&mut blocked).is_empty());

    let mut allowed = runner(MemoryProcessor::default(), source());
    assert_eq!(allowed.migrate_up(None, true).unwrap().applied, vec![1, 2]);
    assert!(matches!(
        allowed.migrate_down(0, false),
        Err(MigrateError::BreakingChange { version: 2 })
    ));

    let context = RunnerContext {
        allow_breaking_change: true,
        ..Default::default()
    };
    let mut by_context = runner_with(MemoryProcessor::default(), source(), context);
    by_context.migrate_up(None, false).unwrap();
    by_context.rollback_to_version(0).unwrap();
}

// ---------------------------------------------------------------------------
// Preview, conventions, single migrations
// ---------------------------------------------------------------------------

#[test]
fn test_preview_never_touches_store() {
    let context = RunnerContext {
        preview_only: true,
        ..Default::default()
    };
    let mut runner = runner_with(MemoryProcessor::default(), tables(2), context);

    let report = runner.migrate_up(None, false).unwrap();
    assert_eq!(report.applied, vec![1, 2]);

    let processor = runner.processor();
    assert!(processor.executed.is_empty());
    assert!(processor.state.tables.is_empty());
    assert!(processor.previewed.contains(&"CreateTable T1".to_string()));
    assert!(processor.previewed.iter().any(|e| e.starts_with("InsertData")));
    assert_eq!(processor.commits, 0);
    assert!(runner.applied_versions().unwrap().is_empty());
}

#[test]
fn test_conventions_name_indexes() {
    struct Indexed;
    impl AutoReversingMigration for Indexed {
        fn up(&self, ctx: &mut MigrationContext) {
            ctx.add(Expression::CreateTable(
                CreateTable::new("Users")
                    .with_column(ColumnDefinition::new("GroupId", ColumnType::Int32)),
            ));
            ctx.add(Expression::CreateIndex(
                IndexDefinition::new("Users").on_column("GroupId"),
            ));
        }
    }

    let mut runner = runner(
        MemoryProcessor::default(),
        registry(vec![MigrationEntry::new(1, Indexed)]),
    );
    runner.migrate_up(None, false).unwrap();
    assert!(runner.processor().state.indexes.contains_key("IX_Users_GroupId"));

    runner.migrate_down(0, false).unwrap();
    assert!(!runner.processor().state.indexes.contains_key("IX_Users_GroupId"));
    assert!(
        runner
            .processor()
            .executed
            .contains(&"DeleteIndex IX_Users_GroupId".to_string())
    );
}

#[test]
fn test_apply_up_and_down_skip_version_table() {
    let mut runner = runner(MemoryProcessor::default(), MigrationRegistry::new());

    runner.apply_up(&CreateTableMigration("Scratch")).unwrap();
    assert!(runner.processor().has_table("Scratch"));
    assert!(!runner.processor().has_table("VersionInfo"));

    runner.apply_down(&CreateTableMigration("Scratch")).unwrap();
    assert!(!runner.processor().has_table("Scratch"));

    assert!(matches!(
        runner.apply_down(&IrreversibleMigration),
        Err(MigrateError::Reversal { version: None, .. })
    ));
}

#[test]
fn test_list_migrations() {
    let source = registry(vec![
        MigrationEntry::new(1, CreateTableMigration("Users")).with_description("Add users"),
        MigrationEntry::new(2, CreateTableMigration("Groups")).breaking(),
    ]);
    let mut runner = runner(MemoryProcessor::default(), source);
    runner.migrate_up(Some(1), false).unwrap();

    let status = runner.list_migrations().unwrap();
    assert_eq!(status.len(), 2);
    assert!(status[0].applied);
    assert!(status[0].applied_on.is_some());
    assert_eq!(status[0].description.as_deref(), Some("Add users"));
    assert!(!status[1].applied);
    assert!(status[1].breaking_change);
    assert!(status[1].name.ends_with("CreateTableMigration"));
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

fn tenant_migrations() -> MigrationRegistry {
    registry(vec![
        MigrationEntry::new(1, CreateTableMigration("TenantATable")).tagged(["TenantA"]),
        MigrationEntry::new(2, CreateTableMigration("NormalTable")),
        MigrationEntry::new(3, CreateTableMigration("TenantBTable")).tagged(["TenantB"]),
        MigrationEntry::new(4, CreateTableMigration("TenantAandBTable"))
            .tagged(["TenantA", "TenantB"]),
    ])
}

fn tagged(tags: &[&str]) -> RunnerContext {
    RunnerContext {
        tags: tags.iter().map(|t| t.to_string()).collect(),
        allow_out_of_order: true,
        ..Default::default()
    }
}

fn created_tables(runner: &MigrationRunner<MemoryProcessor>) -> [bool; 4] {
    let p = runner.processor();
    [
        p.has_table("TenantATable"),
        p.has_table("NormalTable"),
        p.has_table("TenantBTable"),
        p.has_table("TenantAandBTable"),
    ]
}

#[test]
fn test_tag_selection_scenarios() {
    let cases: [(&[&str], [bool; 4]); 4] = [
        (&["TenantA"], [true, true, false, true]),
        (&["TenantA", "TenantB"], [false, true, false, true]),
        (&["TenantB"], [false, true, true, true]),
        (&[], [false, true, false, false]),
    ];

    for (tags, expected) in cases {
        let mut runner = runner_with(MemoryProcessor::default(), tenant_migrations(), tagged(tags));
        runner.migrate_up(None, false).unwrap();
        assert_eq!(created_tables(&runner), expected, "tags {tags:?}");
    }
}

#[test]
fn test_migrate_down_with_different_tags() {
    let mut up = runner_with(MemoryProcessor::default(), tenant_migrations(), tagged(&["TenantA"]));
    up.migrate_up(None, false).unwrap();
    assert_eq!(created_tables(&up), [true, true, false, true]);

    let mut down = runner_with(up.into_processor(), tenant_migrations(), tagged(&["TenantB"]));
    down.migrate_down(0, false).unwrap();
    assert_eq!(created_tables(&down), [true, false, false, false]);
    assert_eq!(versions(&mut down), vec![1]);
}

#[test]
fn test_namespace_selection() {
    let source = registry(vec![
        MigrationEntry::new(1, CreateTableMigration("Core")).in_namespace("app"),
        MigrationEntry::new(2, CreateTableMigration("Tenant")).in_namespace("app.tenants"),
        MigrationEntry::new(3, CreateTableMigration("Other")).in_namespace("other"),
    ]);
    let context = RunnerContext {
        namespace: Some("app".into()),
        nested_namespaces: true,
        ..Default::default()
    };
    let mut runner = runner_with(MemoryProcessor::default(), source, context);
    assert_eq!(runner.migrations().len(), 2);
    runner.migrate_up(None, false).unwrap();
    assert!(!runner.processor().has_table("Other"));
}

#[test]
fn test_duplicate_versions_across_sources() {
    let result = MigrationRunner::builder(MemoryProcessor::default())
        .source(tables(2))
        .source(tables(1))
        .build();
    assert!(matches!(result, Err(MigrateError::DuplicateVersion(1))));
}
