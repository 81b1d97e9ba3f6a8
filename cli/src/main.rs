use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use migrator_core::{expressions_down, expressions_up};
use migrator_runner::{
    DirectorySource, MigrationRunner, Processor, RunReport, RunnerConfig, RunnerContext,
    TagBehavior, TagGroup,
};
use migrator_sqlite::SqliteProcessor;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Parser)]
#[command(name = "migrate")]
#[command(about = "Apply and revert schema migrations against a SQLite database")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    run: RunArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Database file path.
    #[arg(long)]
    db: PathBuf,
    /// Directory of migration documents (repeatable).
    #[arg(long)]
    migrations: Vec<PathBuf>,
    /// YAML runner configuration.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Comma-separated active tags.
    #[arg(long, value_delimiter = ',')]
    tags: Vec<String>,
    /// Only run migrations of this namespace.
    #[arg(long)]
    namespace: Option<String>,
    /// Include namespaces nested below --namespace.
    #[arg(long)]
    nested_namespaces: bool,
    /// Print the SQL instead of executing it.
    #[arg(long)]
    preview: bool,
    /// Keep going when a statement fails and report the failures.
    #[arg(long)]
    silent_fail: bool,
    /// Apply migrations older than the latest applied version.
    #[arg(long)]
    allow_out_of_order: bool,
    /// Debug logging (overrides RUST_LOG).
    #[arg(long, short)]
    verbose: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply pending migrations.
    Up(UpArgs),
    /// Revert applied migrations above a version.
    Down(DownArgs),
    /// Revert the latest migrations, by count or down to a version.
    Rollback(RollbackArgs),
    /// Check version ordering and migration expressions.
    Validate,
    /// Show applied and pending migrations.
    Status,
    /// List loaded migrations with their tags.
    List,
}

#[derive(Debug, Args)]
struct UpArgs {
    /// Highest version to apply.
    #[arg(long)]
    target: Option<i64>,
    /// Allow migrations flagged as breaking changes.
    #[arg(long)]
    allow_breaking: bool,
}

#[derive(Debug, Args)]
struct DownArgs {
    /// Version to revert down to; migrations above it are reverted.
    #[arg(long)]
    target: i64,
    /// Allow migrations flagged as breaking changes.
    #[arg(long)]
    allow_breaking: bool,
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
struct RollbackArgs {
    /// Revert everything above this version; 0 also drops the version table.
    #[arg(long)]
    to: Option<i64>,
    /// Number of migrations to revert.
    #[arg(long)]
    steps: Option<usize>,
}

type Runner = MigrationRunner<SqliteProcessor>;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.run.verbose);

    let result = build_runner(&cli.run).and_then(|mut runner| {
        let result = match cli.command {
            Command::Up(args) => run_up(&mut runner, args),
            Command::Down(args) => run_down(&mut runner, args),
            Command::Rollback(args) => run_rollback(&mut runner, args),
            Command::Validate => run_validate(&mut runner),
            Command::Status => run_status(&mut runner),
            Command::List => run_list(&runner),
        };
        print_preview(&runner);
        result
    });

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn build_runner(args: &RunArgs) -> Result<Runner, String> {
    let mut config = match &args.config {
        Some(path) => RunnerConfig::load(path)
            .map_err(|e| format!("Failed to load config '{}': {e}", path.display()))?,
        None => RunnerConfig::default(),
    };
    apply_overrides(&mut config.context, args);

    let conn = rusqlite::Connection::open(&args.db)
        .map_err(|e| format!("Failed to open database '{}': {e}", args.db.display()))?;
    let processor = SqliteProcessor::new(conn)
        .map_err(|e| format!("Failed to initialize database: {e}"))?;

    let mut builder = MigrationRunner::builder(processor).config(config);
    if !args.migrations.is_empty() {
        let source = args
            .migrations
            .iter()
            .fold(DirectorySource::builder(), |b, dir| b.from_dir(dir))
            .build()
            .map_err(|e| format!("Failed to load migrations: {e}"))?;
        builder = builder.source(source);
    }
    builder
        .build()
        .map_err(|e| format!("Failed to load migrations: {e}"))
}

/// Command-line flags win over the config file.
fn apply_overrides(context: &mut RunnerContext, args: &RunArgs) {
    if !args.tags.is_empty() {
        context.tags = args.tags.clone();
    }
    if args.namespace.is_some() {
        context.namespace = args.namespace.clone();
    }
    context.nested_namespaces |= args.nested_namespaces;
    context.preview_only |= args.preview;
    context.silent_fail |= args.silent_fail;
    context.allow_out_of_order |= args.allow_out_of_order;
}

fn run_up(runner: &mut Runner, args: UpArgs) -> Result<(), String> {
    let report = runner
        .migrate_up(args.target, args.allow_breaking)
        .map_err(|e| format!("Migration up failed: {e}"))?;
    print_report("Applied", &report);
    Ok(())
}

fn run_down(runner: &mut Runner, args: DownArgs) -> Result<(), String> {
    let report = runner
        .migrate_down(args.target, args.allow_breaking)
        .map_err(|e| format!("Migration down failed: {e}"))?;
    print_report("Reverted", &report);
    Ok(())
}

fn run_rollback(runner: &mut Runner, args: RollbackArgs) -> Result<(), String> {
    let report = match (args.to, args.steps) {
        (Some(version), _) => runner.rollback_to_version(version),
        (None, Some(steps)) => runner.rollback(steps),
        (None, None) => return Err("either --to or --steps is required".to_string()),
    }
    .map_err(|e| format!("Rollback failed: {e}"))?;
    print_report("Reverted", &report);
    Ok(())
}

fn run_validate(runner: &mut Runner) -> Result<(), String> {
    let mut problems = Vec::new();
    if let Err(e) = runner.validate_version_order() {
        problems.push(e.to_string());
    }

    let database_type = runner.processor().database_type();
    for entry in runner.migrations() {
        let expressions = runner
            .conventions()
            .apply(expressions_up(&*entry.migration, database_type));
        for expr in &expressions {
            for err in expr.validate() {
                problems.push(format!("migration {}: {expr}: {err}", entry.version));
            }
        }
        if let Err(e) = expressions_down(&*entry.migration, database_type) {
            println!("  note: migration {} has no down: {e}", entry.version);
        }
    }

    if problems.is_empty() {
        println!("{} migration(s) valid", runner.migrations().len());
        return Ok(());
    }
    for problem in &problems {
        println!("  {problem}");
    }
    Err(format!("{} problem(s) found", problems.len()))
}

fn run_status(runner: &mut Runner) -> Result<(), String> {
    let statuses = runner
        .list_migrations()
        .map_err(|e| format!("Failed to read migration status: {e}"))?;

    println!("Migration Status:");
    let mut applied = 0;
    for status in &statuses {
        let state = if status.applied {
            applied += 1;
            "applied"
        } else {
            "pending"
        };
        let when = status
            .applied_on
            .map(|ts| format!("  ({})", ts.to_rfc3339()))
            .unwrap_or_default();
        println!(
            "  {:>6}  {state:<8} {}{when}",
            status.version,
            status.description.as_deref().unwrap_or(&status.name)
        );
    }
    println!("  {applied} applied, {} pending", statuses.len() - applied);
    Ok(())
}

fn run_list(runner: &Runner) -> Result<(), String> {
    for entry in runner.migrations() {
        let mut line = format!("{:>6}  {}", entry.version, entry.name());
        if let Some(namespace) = &entry.namespace {
            line.push_str(&format!("  namespace={namespace}"));
        }
        if !entry.tags.is_empty() {
            let tags: Vec<String> = entry.tags.iter().map(format_tags).collect();
            line.push_str(&format!("  tags={}", tags.join(" ")));
        }
        if entry.breaking_change {
            line.push_str("  [breaking]");
        }
        println!("{line}");
    }
    Ok(())
}

fn format_tags(group: &TagGroup) -> String {
    let names = group.names.join(",");
    match group.behavior {
        TagBehavior::RequireAll => names,
        TagBehavior::RequireAny => format!("any({names})"),
    }
}

fn print_report(verb: &str, report: &RunReport) {
    println!("{verb} {} migration(s)", report.applied.len());
    for version in &report.applied {
        println!("  {version}");
    }
    for err in &report.captured_errors {
        let version = err
            .version
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string());
        eprintln!("warning: migration {version}: {} failed: {}", err.kind, err.message);
    }
}

fn print_preview(runner: &Runner) {
    for sql in runner.processor().rendered() {
        println!("{sql};");
    }
}
