//! Where migrations come from.
//!
//! Migrations are either registered in code through a
//! [`MigrationRegistry`] or loaded from migration documents on disk through
//! a [`DirectorySource`]. Both implement [`MigrationSource`].
//!
//! # Loading patterns
//!
//! ```no_run
//! use migrator_runner::DirectorySource;
//!
//! // One directory of *.yaml / *.yml / *.json documents
//! let source = DirectorySource::from_dir("migrations/").unwrap();
//!
//! // Several directories merged
//! let source = DirectorySource::builder()
//!     .from_dir("migrations/core/")
//!     .from_dir("migrations/tenants/")
//!     .build()
//!     .unwrap();
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use migrator_core::{Expression, Migration, MigrationContext, ReversalError, reverse_expressions};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MigrateError, Result};
use crate::tags::{TagBehavior, TagGroup};

/// A migration together with the metadata the runner selects it by.
///
/// # Examples
///
/// ```
/// use migrator_core::*;
/// use migrator_runner::MigrationEntry;
///
/// struct AddUsers;
///
/// impl AutoReversingMigration for AddUsers {
///     fn up(&self, ctx: &mut MigrationContext) {
///         ctx.add(Expression::create_schema("users"));
///     }
/// }
///
/// let entry = MigrationEntry::new(1, AddUsers)
///     .with_description("Add users")
///     .tagged(["TenantA"])
///     .breaking();
/// assert_eq!(entry.version, 1);
/// assert!(entry.breaking_change);
/// ```
#[derive(Clone)]
pub struct MigrationEntry {
    pub version: i64,
    pub description: Option<String>,
    pub namespace: Option<String>,
    pub tags: Vec<TagGroup>,
    pub breaking_change: bool,
    pub migration: Arc<dyn Migration>,
}

impl MigrationEntry {
    /// Wraps `migration` under `version`, untagged and non-breaking.
    pub fn new(version: i64, migration: impl Migration + 'static) -> Self {
        Self::from_arc(version, Arc::new(migration))
    }

    /// Same as [`new`](Self::new) for an already shared migration.
    pub fn from_arc(version: i64, migration: Arc<dyn Migration>) -> Self {
        Self {
            version,
            description: None,
            namespace: None,
            tags: Vec::new(),
            breaking_change: false,
            migration,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Adds a `RequireAll` tag group.
    pub fn tagged<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.push(TagGroup::all(names));
        self
    }

    /// Adds a `RequireAny` tag group.
    pub fn tagged_any<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.push(TagGroup::any(names));
        self
    }

    /// Marks the migration as a breaking change.
    pub fn breaking(mut self) -> Self {
        self.breaking_change = true;
        self
    }

    /// Display name: the description, else the migration's own name.
    pub fn name(&self) -> &str {
        self.description
            .as_deref()
            .unwrap_or_else(|| self.migration.name())
    }
}

impl fmt::Debug for MigrationEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationEntry")
            .field("version", &self.version)
            .field("name", &self.migration.name())
            .field("description", &self.description)
            .field("namespace", &self.namespace)
            .field("tags", &self.tags)
            .field("breaking_change", &self.breaking_change)
            .finish()
    }
}

/// Supplies migrations to a runner.
pub trait MigrationSource {
    /// Returns the migrations in `namespace` (all when `None`); with
    /// `nested`, namespaces below it (`ns.child`) are included too.
    fn migrations(&self, namespace: Option<&str>, nested: bool) -> Result<Vec<MigrationEntry>>;
}

/// Returns `true` if a migration namespace falls within the requested scope.
pub fn in_namespace(entry: Option<&str>, requested: Option<&str>, nested: bool) -> bool {
    let Some(requested) = requested else {
        return true;
    };
    match entry {
        Some(ns) if ns == requested => true,
        Some(ns) => {
            nested
                && ns
                    .strip_prefix(requested)
                    .is_some_and(|rest| rest.starts_with('.'))
        }
        None => false,
    }
}

fn scoped(entries: &[MigrationEntry], namespace: Option<&str>, nested: bool) -> Vec<MigrationEntry> {
    entries
        .iter()
        .filter(|e| in_namespace(e.namespace.as_deref(), namespace, nested))
        .cloned()
        .collect()
}

/// Migrations registered explicitly in code.
///
/// # Examples
///
/// ```
/// use migrator_core::*;
/// use migrator_runner::{MigrationEntry, MigrationRegistry, MigrationSource};
///
/// struct Noop;
/// impl AutoReversingMigration for Noop {
///     fn up(&self, _ctx: &mut MigrationContext) {}
/// }
///
/// let mut registry = MigrationRegistry::new();
/// registry.register(MigrationEntry::new(1, Noop).in_namespace("app")).unwrap();
/// registry.register(MigrationEntry::new(2, Noop).in_namespace("app.tenants")).unwrap();
/// assert!(registry.register(MigrationEntry::new(1, Noop)).is_err());
///
/// assert_eq!(registry.migrations(Some("app"), false).unwrap().len(), 1);
/// assert_eq!(registry.migrations(Some("app"), true).unwrap().len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MigrationRegistry {
    entries: Vec<MigrationEntry>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a migration.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::DuplicateVersion`] if the version is taken.
    pub fn register(&mut self, entry: MigrationEntry) -> Result<()> {
        if self.entries.iter().any(|e| e.version == entry.version) {
            return Err(MigrateError::DuplicateVersion(entry.version));
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, entry: MigrationEntry) -> Result<Self> {
        self.register(entry)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MigrationEntry> {
        self.entries.iter()
    }
}

impl MigrationSource for MigrationRegistry {
    fn migrations(&self, namespace: Option<&str>, nested: bool) -> Result<Vec<MigrationEntry>> {
        Ok(scoped(&self.entries, namespace, nested))
    }
}

/// On-disk form of one migration.
///
/// # Example YAML
///
/// ```yaml
/// version: 3
/// description: Add users
/// namespace: app
/// tags: [TenantA]
/// up:
///   - op: create_table
///     name: Users
///     columns:
///       - { name: Id, type: int32, primary_key: true, identity: true }
///   - op: create_index
///     table: Users
///     columns: [{ name: Id }]
/// ```
///
/// Without `down`, the reverse of `up` is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationDocument {
    pub version: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub tag_behavior: TagBehavior,
    #[serde(default)]
    pub breaking_change: bool,
    pub up: Vec<Expression>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down: Option<Vec<Expression>>,
}

impl MigrationDocument {
    /// Converts the document into a runnable entry named `name`.
    pub fn into_entry(self, name: impl Into<String>) -> MigrationEntry {
        let migration = DocumentMigration {
            name: name.into(),
            up: self.up,
            down: self.down,
        };
        let mut entry = MigrationEntry::new(self.version, migration);
        entry.description = self.description;
        entry.namespace = self.namespace;
        entry.breaking_change = self.breaking_change;
        if !self.tags.is_empty() {
            entry.tags.push(TagGroup {
                names: self.tags,
                behavior: self.tag_behavior,
            });
        }
        entry
    }
}

struct DocumentMigration {
    name: String,
    up: Vec<Expression>,
    down: Option<Vec<Expression>>,
}

impl Migration for DocumentMigration {
    fn up(&self, ctx: &mut MigrationContext) {
        ctx.extend(self.up.iter().cloned());
    }

    fn down(&self, ctx: &mut MigrationContext) -> std::result::Result<(), ReversalError> {
        match &self.down {
            Some(down) => ctx.extend(down.iter().cloned()),
            None => ctx.extend(reverse_expressions(&self.up)?),
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Migrations loaded from migration documents.
#[derive(Debug, Clone, Default)]
pub struct DirectorySource {
    registry: MigrationRegistry,
    directories: Vec<PathBuf>,
}

impl DirectorySource {
    /// Returns a new [`DirectorySourceBuilder`] for several directories.
    pub fn builder() -> DirectorySourceBuilder {
        DirectorySourceBuilder::new()
    }

    /// Loads every `*.yaml`, `*.yml` and `*.json` file in `path`.
    ///
    /// Files are read in name order; the file stem names the migration.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Io`] if the directory or a file cannot be
    /// read, [`MigrateError::Yaml`]/[`MigrateError::Json`] for malformed
    /// documents, and [`MigrateError::DuplicateVersion`] when two documents
    /// share a version.
    pub fn from_dir(path: impl AsRef<Path>) -> Result<Self> {
        let mut source = Self::default();
        source.load_dir(path.as_ref())?;
        Ok(source)
    }

    /// Parses one document file.
    pub fn load_document(path: impl AsRef<Path>) -> Result<MigrationDocument> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let document = match extension(path) {
            Some("json") => serde_json::from_reader(reader)?,
            _ => serde_yaml::from_reader(reader)?,
        };
        Ok(document)
    }

    fn load_dir(&mut self, path: &Path) -> Result<()> {
        let mut files = BTreeSet::new();
        for entry in std::fs::read_dir(path)? {
            let file_path = entry?.path();
            if matches!(extension(&file_path), Some("yaml" | "yml" | "json")) {
                files.insert(file_path);
            }
        }

        for file_path in files {
            let document = Self::load_document(&file_path)?;
            let name = file_path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            debug!(path = %file_path.display(), version = document.version, "Loaded migration document");
            self.registry.register(document.into_entry(name))?;
        }

        self.directories.push(path.to_path_buf());
        Ok(())
    }

    /// Directories this source was loaded from.
    pub fn directories(&self) -> &[PathBuf] {
        &self.directories
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }
}

impl MigrationSource for DirectorySource {
    fn migrations(&self, namespace: Option<&str>, nested: bool) -> Result<Vec<MigrationEntry>> {
        self.registry.migrations(namespace, nested)
    }
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|e| e.to_str())
}

/// Builder merging several directories into one [`DirectorySource`].
///
/// Unlike a fallback chain, every directory must load; versions must be
/// unique across all of them.
#[derive(Debug, Default)]
pub struct DirectorySourceBuilder {
    directories: Vec<PathBuf>,
}

impl DirectorySourceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a directory of migration documents.
    pub fn from_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.directories.push(path.into());
        self
    }

    /// Loads all directories in the order they were added.
    pub fn build(self) -> Result<DirectorySource> {
        if self.directories.is_empty() {
            return Err(MigrateError::Source("no migration directories configured".into()));
        }
        let mut source = DirectorySource::default();
        for dir in &self.directories {
            source.load_dir(dir)?;
        }
        Ok(source)
    }
}
