//! Version bookkeeping.
//!
//! The [`VersionLoader`] owns the table recording which migrations have been
//! applied. It creates that table on first use through a fixed sequence of
//! steps, each one skipped when the object already exists, and remembers
//! the outcome for the rest of its lifetime.
//!
//! # Example YAML
//!
//! ```yaml
//! schema: audit
//! table_name: SchemaVersions
//! owns_schema: false
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use migrator_core::{
    ColumnDefinition, ColumnExpression, ColumnType, CreateTable, DeleteData, Expression,
    IndexDefinition, InsertData, ObjectRef, Row, Value, row,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{MigrateError, Result};
use crate::processor::Processor;

/// Names of the version table and its columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionTableMetadata {
    /// Schema holding the table; `None` uses the backend default.
    pub schema: Option<String>,
    /// Table name.
    pub table_name: String,
    /// Version column.
    pub column_name: String,
    /// Applied timestamp column.
    pub applied_on_column: String,
    /// Description column.
    pub description_column: String,
    /// Unique index over the version column.
    pub unique_index_name: String,
    /// Whether the schema may be dropped together with the table.
    pub owns_schema: bool,
}

impl Default for VersionTableMetadata {
    fn default() -> Self {
        Self {
            schema: None,
            table_name: "VersionInfo".to_string(),
            column_name: "Version".to_string(),
            applied_on_column: "AppliedOn".to_string(),
            description_column: "Description".to_string(),
            unique_index_name: "UC_Version".to_string(),
            owns_schema: true,
        }
    }
}

/// One row of the version table.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedVersion {
    pub version: i64,
    pub applied_on: Option<DateTime<Utc>>,
    pub description: Option<String>,
}

/// The set of applied versions, ordered ascending.
///
/// # Examples
///
/// ```
/// use migrator_runner::{AppliedVersion, VersionInfo};
///
/// let mut info = VersionInfo::default();
/// assert_eq!(info.latest(), 0);
///
/// info.insert(AppliedVersion { version: 3, applied_on: None, description: None });
/// info.insert(AppliedVersion { version: 1, applied_on: None, description: None });
/// assert_eq!(info.latest(), 3);
/// assert!(info.has_applied(1));
/// assert_eq!(info.versions().collect::<Vec<_>>(), vec![1, 3]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VersionInfo {
    applied: BTreeMap<i64, AppliedVersion>,
}

impl VersionInfo {
    /// Adds (or replaces) a record.
    pub fn insert(&mut self, record: AppliedVersion) {
        self.applied.insert(record.version, record);
    }

    /// Returns `true` if `version` is recorded.
    pub fn has_applied(&self, version: i64) -> bool {
        self.applied.contains_key(&version)
    }

    /// Highest applied version, or `0` when nothing is applied.
    pub fn latest(&self) -> i64 {
        self.applied.keys().next_back().copied().unwrap_or(0)
    }

    /// Looks up a record.
    pub fn get(&self, version: i64) -> Option<&AppliedVersion> {
        self.applied.get(&version)
    }

    /// Applied versions, ascending.
    pub fn versions(&self) -> impl DoubleEndedIterator<Item = i64> + '_ {
        self.applied.keys().copied()
    }

    /// Records, ascending.
    pub fn iter(&self) -> impl Iterator<Item = &AppliedVersion> {
        self.applied.values()
    }

    pub fn len(&self) -> usize {
        self.applied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Reads and writes the version table through a [`Processor`].
///
/// The loader does not hold the processor; every operation borrows it, so
/// the runner keeps sole ownership.
#[derive(Debug, Clone)]
pub struct VersionLoader {
    metadata: VersionTableMetadata,
    preview: bool,
    bootstrapped: bool,
    owns_schema: bool,
}

impl VersionLoader {
    /// Creates a loader for the given table layout.
    pub fn new(metadata: VersionTableMetadata) -> Self {
        Self {
            metadata,
            preview: false,
            bootstrapped: false,
            owns_schema: false,
        }
    }

    /// In preview mode writes are rendered through
    /// [`Processor::preview`] and never reach the store.
    pub fn with_preview(mut self, preview: bool) -> Self {
        self.preview = preview;
        self
    }

    pub fn metadata(&self) -> &VersionTableMetadata {
        &self.metadata
    }

    /// Whether the bootstrap already ran for this loader.
    pub fn is_bootstrapped(&self) -> bool {
        self.bootstrapped
    }

    /// Whether dropping the bookkeeping also drops its schema.
    ///
    /// True only when ownership is allowed and this loader created the
    /// schema during bootstrap.
    pub fn owns_schema(&self) -> bool {
        self.owns_schema
    }

    /// Creates the version table and its parts if missing.
    ///
    /// Runs at most once per loader; later calls return immediately even if
    /// the processor still reports the objects as missing.
    pub fn ensure_bootstrap<P: Processor + ?Sized>(&mut self, processor: &mut P) -> Result<()> {
        if self.bootstrapped {
            return Ok(());
        }

        let meta = &self.metadata;
        let schema = meta.schema.as_deref();

        if let Some(name) = schema {
            let exists = processor
                .schema_exists(name)
                .map_err(|source| MigrateError::Bootstrap { step: "schema", source })?;
            self.owns_schema = meta.owns_schema && !exists;
            if !exists {
                self.dispatch(processor, "schema", Expression::create_schema(name))?;
            }
        }

        let table_exists = processor
            .table_exists(schema, &meta.table_name)
            .map_err(|source| MigrateError::Bootstrap { step: "table", source })?;
        if !table_exists {
            let mut table = CreateTable::new(&meta.table_name).with_column(
                ColumnDefinition::new(&meta.column_name, ColumnType::Int64).not_null(),
            );
            table.schema = meta.schema.clone();
            self.dispatch(processor, "table", Expression::CreateTable(table))?;
        }

        let index_exists = processor
            .index_exists(schema, &meta.table_name, &meta.unique_index_name)
            .map_err(|source| MigrateError::Bootstrap { step: "unique index", source })?;
        if !index_exists {
            let mut index = IndexDefinition::new(&meta.table_name)
                .named(&meta.unique_index_name)
                .on_column(&meta.column_name)
                .unique()
                .clustered();
            index.schema = meta.schema.clone();
            self.dispatch(processor, "unique index", Expression::CreateIndex(index))?;
        }

        let columns = [
            ("applied on column", &meta.applied_on_column, ColumnType::DateTime),
            ("description column", &meta.description_column, ColumnType::String(Some(1024))),
        ];
        for (step, column, column_type) in columns {
            let exists = processor
                .column_exists(schema, &meta.table_name, column)
                .map_err(|source| MigrateError::Bootstrap { step, source })?;
            if !exists {
                let mut expr =
                    ColumnExpression::new(&meta.table_name, ColumnDefinition::new(column, column_type));
                expr.schema = meta.schema.clone();
                self.dispatch(processor, step, Expression::CreateColumn(expr))?;
            }
        }

        self.bootstrapped = true;
        debug!(table = %self.metadata.table_name, owns_schema = self.owns_schema, "Version table ready");
        Ok(())
    }

    /// Reads the applied versions. Always queries the store.
    ///
    /// In preview mode a version table that was never physically created
    /// reads as empty.
    pub fn load_applied<P: Processor + ?Sized>(&mut self, processor: &mut P) -> Result<VersionInfo> {
        self.ensure_bootstrap(processor)?;
        let meta = &self.metadata;
        let schema = meta.schema.as_deref();

        let exists = processor
            .table_exists(schema, &meta.table_name)
            .map_err(|source| execution("ReadVersions", source))?;
        if !exists && self.preview {
            return Ok(VersionInfo::default());
        }

        let rows = processor
            .read_rows(schema, &meta.table_name)
            .map_err(|source| execution("ReadVersions", source))?;

        let mut info = VersionInfo::default();
        for row in rows {
            info.insert(self.parse_row(&row)?);
        }
        Ok(info)
    }

    /// Records `version` as applied now.
    pub fn record_applied<P: Processor + ?Sized>(
        &mut self,
        processor: &mut P,
        version: i64,
        description: Option<&str>,
    ) -> Result<()> {
        if self.load_applied(processor)?.has_applied(version) {
            return Err(MigrateError::VersionAlreadyApplied(version));
        }
        let meta = &self.metadata;
        let record = row([
            (meta.column_name.clone(), Value::Int(version)),
            (meta.applied_on_column.clone(), Value::Timestamp(Utc::now())),
            (meta.description_column.clone(), Value::from(description)),
        ]);
        let mut insert = InsertData::new(&meta.table_name).with_row(record);
        insert.schema = meta.schema.clone();
        self.write(processor, Expression::InsertData(insert))?;
        debug!(version, "Recorded version");
        Ok(())
    }

    /// Removes the record of `version`.
    pub fn remove_applied<P: Processor + ?Sized>(&mut self, processor: &mut P, version: i64) -> Result<()> {
        if !self.load_applied(processor)?.has_applied(version) {
            return Err(MigrateError::VersionNotApplied(version));
        }
        let meta = &self.metadata;
        let delete = DeleteData {
            schema: meta.schema.clone(),
            table: meta.table_name.clone(),
            rows: vec![row([(meta.column_name.clone(), Value::Int(version))])],
            all_rows: false,
        };
        self.write(processor, Expression::DeleteData(delete))?;
        debug!(version, "Removed version");
        Ok(())
    }

    /// Drops the version table, and its schema when owned.
    ///
    /// The next operation bootstraps again.
    pub fn drop_bookkeeping<P: Processor + ?Sized>(&mut self, processor: &mut P) -> Result<()> {
        let meta = &self.metadata;
        let mut table = ObjectRef::new(&meta.table_name);
        table.schema = meta.schema.clone();
        self.write(processor, Expression::DeleteTable(table))?;

        if let (true, Some(schema)) = (self.owns_schema, meta.schema.as_deref()) {
            self.write(processor, Expression::delete_schema(schema))?;
        }

        info!(table = %self.metadata.table_name, "Dropped version table");
        self.bootstrapped = false;
        self.owns_schema = false;
        Ok(())
    }

    fn dispatch<P: Processor + ?Sized>(
        &self,
        processor: &mut P,
        step: &'static str,
        expr: Expression,
    ) -> Result<()> {
        debug!(step, expression = %expr, "Bootstrapping version table");
        self.send(processor, &expr)
            .map_err(|source| MigrateError::Bootstrap { step, source })
    }

    fn write<P: Processor + ?Sized>(&self, processor: &mut P, expr: Expression) -> Result<()> {
        self.send(processor, &expr)
            .map_err(|source| execution(expr.kind(), source))
    }

    fn send<P: Processor + ?Sized>(
        &self,
        processor: &mut P,
        expr: &Expression,
    ) -> crate::processor::ProcessorResult<()> {
        if self.preview {
            processor.preview(expr)
        } else {
            processor.execute(expr)
        }
    }

    fn parse_row(&self, row: &Row) -> Result<AppliedVersion> {
        let meta = &self.metadata;
        let version = row
            .get(&meta.column_name)
            .and_then(Value::as_int)
            .ok_or_else(|| MigrateError::CorruptVersionRow(format!("{row:?}")))?;

        let applied_on = match row.get(&meta.applied_on_column) {
            Some(Value::Timestamp(ts)) => Some(*ts),
            Some(Value::Text(text)) => parse_timestamp(text),
            _ => None,
        };
        let description = row
            .get(&meta.description_column)
            .and_then(Value::as_text)
            .map(str::to_string);

        Ok(AppliedVersion {
            version,
            applied_on,
            description,
        })
    }
}

fn execution(kind: &'static str, source: crate::processor::ProcessorError) -> MigrateError {
    MigrateError::Execution {
        version: None,
        kind,
        source,
    }
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|ts| ts.with_timezone(&Utc))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_defaults() {
        let meta = VersionTableMetadata::default();
        assert_eq!(meta.table_name, "VersionInfo");
        assert_eq!(meta.column_name, "Version");
        assert_eq!(meta.applied_on_column, "AppliedOn");
        assert_eq!(meta.description_column, "Description");
        assert_eq!(meta.unique_index_name, "UC_Version");
        assert!(meta.schema.is_none());
        assert!(meta.owns_schema);
    }

    #[test]
    fn test_partial_metadata_yaml() {
        let meta: VersionTableMetadata =
            serde_yaml::from_str("schema: audit\ntable_name: SchemaVersions\n").unwrap();
        assert_eq!(meta.schema.as_deref(), Some("audit"));
        assert_eq!(meta.table_name, "SchemaVersions");
        assert_eq!(meta.column_name, "Version");
    }

    #[test]
    fn test_parse_row_accepts_text_timestamps() {
        let loader = VersionLoader::new(VersionTableMetadata::default());
        let parsed = loader
            .parse_row(&row([
                ("Version", Value::Int(7)),
                ("AppliedOn", Value::from("2024-01-01T10:00:00+00:00")),
                ("Description", Value::from("AddUsers")),
            ]))
            .unwrap();
        assert_eq!(parsed.version, 7);
        assert!(parsed.applied_on.is_some());
        assert_eq!(parsed.description.as_deref(), Some("AddUsers"));
    }

    #[test]
    fn test_parse_row_rejects_missing_version() {
        let loader = VersionLoader::new(VersionTableMetadata::default());
        let err = loader.parse_row(&row([("Version", Value::Null)])).unwrap_err();
        assert!(matches!(err, MigrateError::CorruptVersionRow(_)));
    }
}
