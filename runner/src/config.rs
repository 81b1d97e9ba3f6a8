//! Runner configuration.
//!
//! Defines the YAML-serializable settings of a migration run: the version
//! table layout, naming conventions and the per-invocation context. Every
//! section has defaults, so a partial file is enough.
//!
//! # Example YAML
//!
//! ```yaml
//! version_table:
//!   schema: audit
//!   table_name: VersionInfo
//! conventions:
//!   default_schema: app
//! context:
//!   tags: [TenantA]
//!   namespace: app.tenants
//!   nested_namespaces: true
//!   preview_only: false
//!   allow_breaking_change: false
//!   silent_fail: false
//!   allow_out_of_order: false
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use migrator_core::ConventionSet;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::version::VersionTableMetadata;

/// Per-invocation options read by the runner.
///
/// # Examples
///
/// ```
/// # use migrator_runner::RunnerContext;
/// let ctx = RunnerContext {
///     tags: vec!["TenantA".into()],
///     silent_fail: true,
///     ..Default::default()
/// };
/// assert!(!ctx.preview_only);
/// assert!(!ctx.allow_out_of_order);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerContext {
    /// Active tags; see [`tags_match`](crate::tags_match).
    pub tags: Vec<String>,
    /// Only migrations of this namespace are loaded.
    pub namespace: Option<String>,
    /// Also load migrations of namespaces nested below `namespace`.
    pub nested_namespaces: bool,
    /// Render expressions instead of executing them.
    pub preview_only: bool,
    /// Allow breaking migrations without passing the flag per call.
    pub allow_breaking_change: bool,
    /// Capture expression failures instead of aborting.
    pub silent_fail: bool,
    /// Skip the version ordering check before migrating up.
    pub allow_out_of_order: bool,
}

/// Top-level runner configuration.
///
/// # Examples
///
/// ```no_run
/// use migrator_runner::RunnerConfig;
///
/// let config = RunnerConfig::load("migrate.yml").unwrap();
/// println!("version table: {}", config.version_table.table_name);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Version table layout.
    pub version_table: VersionTableMetadata,
    /// Naming conventions.
    pub conventions: ConventionSet,
    /// Run options.
    pub context: RunnerContext,
}

impl RunnerConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::MigrateError::Io) if the file cannot be read, or
    /// [`Yaml`](crate::MigrateError::Yaml) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::MigrateError::Io) if the file cannot be written,
    /// or [`Yaml`](crate::MigrateError::Yaml) if serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }
}
