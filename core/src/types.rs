//! Expression type definitions for schema and data changes.
//!
//! This module defines the data model a migration is made of. Every schema
//! or data operation is one [`Expression`] variant carrying a payload type.
//! The types are designed for serialization with [`serde`] so migrations can
//! be authored in code or loaded from YAML/JSON documents.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A literal value used in column defaults and data rows.
///
/// Deserialization is untagged, so plain YAML/JSON scalars map directly:
/// `null`, `true`, `42`, `1.5` and `"text"`.
///
/// # Examples
///
/// ```
/// use migrator_core::Value;
///
/// assert_eq!(Value::from(42), Value::Int(42));
/// assert_eq!(Value::from("Test"), Value::Text("Test".into()));
/// assert!(Value::Null.is_null());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL `NULL`.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Text value.
    Text(String),
    /// UTC timestamp, serialized as RFC 3339 text.
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the integer payload, if any.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the text payload, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// One data row: column name to value.
pub type Row = BTreeMap<String, Value>;

/// Builds a [`Row`] from `(column, value)` pairs.
///
/// # Examples
///
/// ```
/// use migrator_core::{row, Value};
///
/// let r = row([("Name", Value::from("Test")), ("Age", Value::from(3))]);
/// assert_eq!(r.len(), 2);
/// assert_eq!(r["Age"], Value::Int(3));
/// ```
pub fn row<I, K>(pairs: I) -> Row
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// Logical column type, rendered per dialect by the processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Non-unicode string with optional maximum length.
    AnsiString(Option<u32>),
    /// Unicode string with optional maximum length.
    String(Option<u32>),
    /// 16-bit integer.
    Int16,
    /// 32-bit integer.
    Int32,
    /// 64-bit integer.
    Int64,
    /// Boolean.
    Boolean,
    /// Fixed-point decimal.
    Decimal {
        /// Total number of digits.
        precision: u8,
        /// Digits after the decimal point.
        scale: u8,
    },
    /// Double-precision float.
    Double,
    /// Calendar date.
    Date,
    /// Date and time.
    DateTime,
    /// Binary data with optional maximum length.
    Binary(Option<u32>),
    /// Globally unique identifier.
    Guid,
    /// Backend-specific type passed through verbatim.
    Custom(String),
}

fn default_true() -> bool {
    true
}

/// Definition of a single table column.
///
/// # Examples
///
/// ```
/// use migrator_core::{ColumnDefinition, ColumnType};
///
/// let id = ColumnDefinition::new("Id", ColumnType::Int32).primary_key().identity();
/// assert!(!id.nullable);
/// assert!(id.primary_key && id.identity);
///
/// let name = ColumnDefinition::new("Name", ColumnType::String(Some(255)))
///     .with_default("Anonymous");
/// assert!(name.nullable);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Column name.
    pub name: String,
    /// Logical column type.
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Whether the column accepts `NULL`.
    #[serde(default = "default_true")]
    pub nullable: bool,
    /// Part of the table's primary key.
    #[serde(default)]
    pub primary_key: bool,
    /// Auto-incrementing column.
    #[serde(default)]
    pub identity: bool,
    /// Column carries a unique constraint.
    #[serde(default)]
    pub unique: bool,
    /// Default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ColumnDefinition {
    /// Creates a nullable column of the given type.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
            primary_key: false,
            identity: false,
            unique: false,
            default: None,
        }
    }

    /// Marks the column `NOT NULL`.
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Marks the column as (part of) the primary key. Implies `NOT NULL`.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// Marks the column as auto-incrementing.
    pub fn identity(mut self) -> Self {
        self.identity = true;
        self
    }

    /// Adds a unique constraint on the column.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the default value.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// Sort direction of an index column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Ascending (the default).
    #[default]
    Ascending,
    /// Descending.
    Descending,
}

/// A column participating in an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexColumn {
    /// Column name.
    pub name: String,
    /// Sort direction.
    #[serde(default)]
    pub direction: Direction,
}

/// Definition of an index, shared by `CreateIndex` and `DeleteIndex`.
///
/// The name is optional until the naming conventions run.
///
/// # Examples
///
/// ```
/// use migrator_core::{Direction, IndexDefinition};
///
/// let ix = IndexDefinition::new("Users").on_column("GroupId").unique();
/// assert!(ix.name.is_none());
/// assert_eq!(ix.columns[0].direction, Direction::Ascending);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    /// Index name; filled by conventions when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Schema of the indexed table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Indexed table.
    pub table: String,
    /// Indexed columns, in key order.
    #[serde(default)]
    pub columns: Vec<IndexColumn>,
    /// Unique index.
    #[serde(default)]
    pub unique: bool,
    /// Clustered index, where the backend supports it.
    #[serde(default)]
    pub clustered: bool,
}

impl IndexDefinition {
    /// Creates an unnamed index on `table` without columns.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            name: None,
            schema: None,
            table: table.into(),
            columns: Vec::new(),
            unique: false,
            clustered: false,
        }
    }

    /// Sets an explicit name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the table schema.
    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Appends an ascending column.
    pub fn on_column(self, column: impl Into<String>) -> Self {
        self.on_column_with(column, Direction::Ascending)
    }

    /// Appends a column with an explicit direction.
    pub fn on_column_with(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.columns.push(IndexColumn {
            name: column.into(),
            direction,
        });
        self
    }

    /// Marks the index unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Marks the index clustered.
    pub fn clustered(mut self) -> Self {
        self.clustered = true;
        self
    }
}

/// Referential action for foreign keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ForeignKeyRule {
    /// No action (the default).
    #[default]
    None,
    /// Cascade the change.
    Cascade,
    /// Set referencing columns to `NULL`.
    SetNull,
    /// Set referencing columns to their default.
    SetDefault,
    /// Reject the change.
    Restrict,
}

/// Definition of a foreign key, shared by create and delete.
///
/// # Examples
///
/// ```
/// use migrator_core::ForeignKeyDefinition;
///
/// let fk = ForeignKeyDefinition::new("Users", "Groups")
///     .from_column("GroupId")
///     .to_column("GroupId");
/// assert_eq!(fk.from_columns, vec!["GroupId"]);
/// assert!(fk.name.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyDefinition {
    /// Constraint name; filled by conventions when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Schema of the referencing table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_schema: Option<String>,
    /// Referencing (foreign) table.
    pub from_table: String,
    /// Referencing columns.
    #[serde(default)]
    pub from_columns: Vec<String>,
    /// Schema of the referenced table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_schema: Option<String>,
    /// Referenced (primary) table.
    #[serde(default)]
    pub to_table: String,
    /// Referenced columns.
    #[serde(default)]
    pub to_columns: Vec<String>,
    /// Action on delete of the referenced row.
    #[serde(default)]
    pub on_delete: ForeignKeyRule,
    /// Action on update of the referenced key.
    #[serde(default)]
    pub on_update: ForeignKeyRule,
}

impl ForeignKeyDefinition {
    /// Creates an unnamed foreign key from `from_table` to `to_table`.
    pub fn new(from_table: impl Into<String>, to_table: impl Into<String>) -> Self {
        Self {
            name: None,
            from_schema: None,
            from_table: from_table.into(),
            from_columns: Vec::new(),
            to_schema: None,
            to_table: to_table.into(),
            to_columns: Vec::new(),
            on_delete: ForeignKeyRule::None,
            on_update: ForeignKeyRule::None,
        }
    }

    /// Sets an explicit name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the referencing table's schema.
    pub fn from_schema(mut self, schema: impl Into<String>) -> Self {
        self.from_schema = Some(schema.into());
        self
    }

    /// Sets the referenced table's schema.
    pub fn to_schema(mut self, schema: impl Into<String>) -> Self {
        self.to_schema = Some(schema.into());
        self
    }

    /// Appends a referencing column.
    pub fn from_column(mut self, column: impl Into<String>) -> Self {
        self.from_columns.push(column.into());
        self
    }

    /// Appends a referenced column.
    pub fn to_column(mut self, column: impl Into<String>) -> Self {
        self.to_columns.push(column.into());
        self
    }

    /// Sets the on-delete action.
    pub fn on_delete(mut self, rule: ForeignKeyRule) -> Self {
        self.on_delete = rule;
        self
    }

    /// Sets the on-update action.
    pub fn on_update(mut self, rule: ForeignKeyRule) -> Self {
        self.on_update = rule;
        self
    }
}

/// Kind of table constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    /// Unique constraint (the default).
    #[default]
    Unique,
    /// Primary key constraint.
    PrimaryKey,
}

/// Definition of a table constraint, shared by create and delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintDefinition {
    /// Constraint name; filled by conventions when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Schema of the constrained table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Constrained table.
    pub table: String,
    /// Constrained columns.
    #[serde(default)]
    pub columns: Vec<String>,
    /// Constraint kind.
    #[serde(default)]
    pub kind: ConstraintKind,
}

impl ConstraintDefinition {
    /// Creates an unnamed unique constraint on `table`.
    pub fn unique(table: impl Into<String>) -> Self {
        Self::with_kind(table, ConstraintKind::Unique)
    }

    /// Creates an unnamed primary key constraint on `table`.
    pub fn primary_key(table: impl Into<String>) -> Self {
        Self::with_kind(table, ConstraintKind::PrimaryKey)
    }

    fn with_kind(table: impl Into<String>, kind: ConstraintKind) -> Self {
        Self {
            name: None,
            schema: None,
            table: table.into(),
            columns: Vec::new(),
            kind,
        }
    }

    /// Sets an explicit name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the table schema.
    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Appends a constrained column.
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.columns.push(column.into());
        self
    }
}

/// Definition of a sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceDefinition {
    /// Schema of the sequence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Sequence name.
    pub name: String,
    /// First value.
    #[serde(default)]
    pub start: Option<i64>,
    /// Step between values.
    #[serde(default)]
    pub increment: Option<i64>,
    /// Lower bound.
    #[serde(default)]
    pub min_value: Option<i64>,
    /// Upper bound.
    #[serde(default)]
    pub max_value: Option<i64>,
    /// Restart at the bound once exhausted.
    #[serde(default)]
    pub cycle: bool,
    /// Number of values to preallocate.
    #[serde(default)]
    pub cache: Option<i64>,
}

impl SequenceDefinition {
    /// Creates a sequence with backend defaults for every option.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
            start: None,
            increment: None,
            min_value: None,
            max_value: None,
            cycle: false,
            cache: None,
        }
    }

    /// Sets the schema.
    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Sets the start value.
    pub fn start_with(mut self, start: i64) -> Self {
        self.start = Some(start);
        self
    }

    /// Sets the increment.
    pub fn increment_by(mut self, increment: i64) -> Self {
        self.increment = Some(increment);
        self
    }

    /// Sets both bounds.
    pub fn bounds(mut self, min: i64, max: i64) -> Self {
        self.min_value = Some(min);
        self.max_value = Some(max);
        self
    }

    /// Enables cycling.
    pub fn cycle(mut self) -> Self {
        self.cycle = true;
        self
    }

    /// Sets the cache size.
    pub fn cache(mut self, cache: i64) -> Self {
        self.cache = Some(cache);
        self
    }
}

/// Payload of `CreateSchema` and `DeleteSchema`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaExpression {
    /// Schema name.
    pub name: String,
}

/// A schema-qualified object reference (`DeleteTable`, `DeleteSequence`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Schema of the object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Object name.
    pub name: String,
}

impl ObjectRef {
    /// Creates a reference without schema.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    /// Sets the schema.
    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }
}

/// Payload of `CreateTable`.
///
/// # Examples
///
/// ```
/// use migrator_core::{ColumnDefinition, ColumnType, CreateTable};
///
/// let users = CreateTable::new("Users")
///     .with_column(ColumnDefinition::new("UserId", ColumnType::Int32).primary_key().identity())
///     .with_column(ColumnDefinition::new("GroupId", ColumnType::Int32).not_null());
/// assert_eq!(users.columns.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTable {
    /// Schema of the table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Table name.
    pub name: String,
    /// Column definitions, in order.
    #[serde(default)]
    pub columns: Vec<ColumnDefinition>,
    /// Optional table comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CreateTable {
    /// Creates a table definition without columns.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
            columns: Vec::new(),
            description: None,
        }
    }

    /// Sets the schema.
    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Appends a column.
    pub fn with_column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }

    /// Sets the table comment.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Payload of `RenameTable`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameTable {
    /// Schema of the table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Current name.
    pub old_name: String,
    /// New name.
    pub new_name: String,
}

/// Payload of `AlterTableSchema`: moves a table between schemas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlterTableSchema {
    /// Table to move.
    pub table: String,
    /// Current schema.
    #[serde(default)]
    pub from_schema: Option<String>,
    /// Target schema.
    #[serde(default)]
    pub to_schema: Option<String>,
}

/// Payload of `CreateColumn` and `AlterColumn`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnExpression {
    /// Schema of the table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Table owning the column.
    pub table: String,
    /// The column definition (new or altered).
    pub column: ColumnDefinition,
}

impl ColumnExpression {
    /// Creates a column expression on `table`.
    pub fn new(table: impl Into<String>, column: ColumnDefinition) -> Self {
        Self {
            schema: None,
            table: table.into(),
            column,
        }
    }

    /// Sets the schema.
    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }
}

/// Payload of `DeleteColumn`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteColumn {
    /// Schema of the table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Table owning the columns.
    pub table: String,
    /// Columns to drop.
    pub columns: Vec<String>,
}

/// Payload of `RenameColumn`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameColumn {
    /// Schema of the table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Table owning the column.
    pub table: String,
    /// Current name.
    pub old_name: String,
    /// New name.
    pub new_name: String,
}

/// Payload of `InsertData`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertData {
    /// Schema of the table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Target table.
    pub table: String,
    /// Rows to insert.
    pub rows: Vec<Row>,
}

impl InsertData {
    /// Creates an insert with no rows.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            schema: None,
            table: table.into(),
            rows: Vec::new(),
        }
    }

    /// Sets the schema.
    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Appends a row.
    pub fn with_row(mut self, row: Row) -> Self {
        self.rows.push(row);
        self
    }
}

/// Payload of `UpdateData`.
///
/// Exactly one of `where_rows` (each row an AND-ed equality filter, rows
/// OR-ed together) or `all_rows` must be used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateData {
    /// Schema of the table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Target table.
    pub table: String,
    /// Column assignments.
    pub set: Row,
    /// Row filters.
    #[serde(default)]
    pub where_rows: Vec<Row>,
    /// Update every row.
    #[serde(default)]
    pub all_rows: bool,
}

/// Payload of `DeleteData`.
///
/// Exactly one of `rows` (equality filters) or `all_rows` must be used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteData {
    /// Schema of the table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Target table.
    pub table: String,
    /// Row filters.
    #[serde(default)]
    pub rows: Vec<Row>,
    /// Delete every row.
    #[serde(default)]
    pub all_rows: bool,
}

/// Payload of `ExecuteSql`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteSql {
    /// Raw statement(s), passed to the backend unchanged.
    pub sql: String,
    /// Optional human-readable label for logs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One atomic schema or data operation.
///
/// Serialized with an `op` tag, so a YAML migration document lists
/// expressions like:
///
/// ```yaml
/// - op: create_index
///   table: Users
///   columns: [{ name: GroupId }]
/// - op: execute_sql
///   sql: select 1
/// ```
///
/// # Examples
///
/// ```
/// use migrator_core::{Expression, IndexDefinition};
///
/// let expr = Expression::CreateIndex(IndexDefinition::new("Users").on_column("GroupId"));
/// assert_eq!(expr.kind(), "CreateIndex");
/// assert_eq!(expr.to_string(), "CreateIndex Users");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Expression {
    /// Create a schema.
    CreateSchema(SchemaExpression),
    /// Drop a schema.
    DeleteSchema(SchemaExpression),
    /// Create a table with its columns.
    CreateTable(CreateTable),
    /// Drop a table.
    DeleteTable(ObjectRef),
    /// Rename a table.
    RenameTable(RenameTable),
    /// Move a table to another schema.
    AlterTableSchema(AlterTableSchema),
    /// Add a column.
    CreateColumn(ColumnExpression),
    /// Change a column's definition.
    AlterColumn(ColumnExpression),
    /// Drop one or more columns.
    DeleteColumn(DeleteColumn),
    /// Rename a column.
    RenameColumn(RenameColumn),
    /// Create an index.
    CreateIndex(IndexDefinition),
    /// Drop an index.
    DeleteIndex(IndexDefinition),
    /// Create a foreign key.
    CreateForeignKey(ForeignKeyDefinition),
    /// Drop a foreign key.
    DeleteForeignKey(ForeignKeyDefinition),
    /// Create a unique or primary key constraint.
    CreateConstraint(ConstraintDefinition),
    /// Drop a unique or primary key constraint.
    DeleteConstraint(ConstraintDefinition),
    /// Create a sequence.
    CreateSequence(SequenceDefinition),
    /// Drop a sequence.
    DeleteSequence(ObjectRef),
    /// Insert rows.
    InsertData(InsertData),
    /// Update rows.
    UpdateData(UpdateData),
    /// Delete rows.
    DeleteData(DeleteData),
    /// Run raw SQL.
    ExecuteSql(ExecuteSql),
}

impl Expression {
    /// Shorthand for [`Expression::CreateSchema`].
    pub fn create_schema(name: impl Into<String>) -> Self {
        Expression::CreateSchema(SchemaExpression { name: name.into() })
    }

    /// Shorthand for [`Expression::DeleteSchema`].
    pub fn delete_schema(name: impl Into<String>) -> Self {
        Expression::DeleteSchema(SchemaExpression { name: name.into() })
    }

    /// Shorthand for [`Expression::DeleteTable`] without schema.
    pub fn delete_table(name: impl Into<String>) -> Self {
        Expression::DeleteTable(ObjectRef::new(name))
    }

    /// Shorthand for [`Expression::RenameTable`] without schema.
    pub fn rename_table(old_name: impl Into<String>, new_name: impl Into<String>) -> Self {
        Expression::RenameTable(RenameTable {
            schema: None,
            old_name: old_name.into(),
            new_name: new_name.into(),
        })
    }

    /// Shorthand for [`Expression::RenameColumn`] without schema.
    pub fn rename_column(
        table: impl Into<String>,
        old_name: impl Into<String>,
        new_name: impl Into<String>,
    ) -> Self {
        Expression::RenameColumn(RenameColumn {
            schema: None,
            table: table.into(),
            old_name: old_name.into(),
            new_name: new_name.into(),
        })
    }

    /// Shorthand for [`Expression::ExecuteSql`].
    pub fn execute_sql(sql: impl Into<String>) -> Self {
        Expression::ExecuteSql(ExecuteSql {
            sql: sql.into(),
            description: None,
        })
    }

    /// Returns the variant name, used in logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Expression::CreateSchema(_) => "CreateSchema",
            Expression::DeleteSchema(_) => "DeleteSchema",
            Expression::CreateTable(_) => "CreateTable",
            Expression::DeleteTable(_) => "DeleteTable",
            Expression::RenameTable(_) => "RenameTable",
            Expression::AlterTableSchema(_) => "AlterTableSchema",
            Expression::CreateColumn(_) => "CreateColumn",
            Expression::AlterColumn(_) => "AlterColumn",
            Expression::DeleteColumn(_) => "DeleteColumn",
            Expression::RenameColumn(_) => "RenameColumn",
            Expression::CreateIndex(_) => "CreateIndex",
            Expression::DeleteIndex(_) => "DeleteIndex",
            Expression::CreateForeignKey(_) => "CreateForeignKey",
            Expression::DeleteForeignKey(_) => "DeleteForeignKey",
            Expression::CreateConstraint(_) => "CreateConstraint",
            Expression::DeleteConstraint(_) => "DeleteConstraint",
            Expression::CreateSequence(_) => "CreateSequence",
            Expression::DeleteSequence(_) => "DeleteSequence",
            Expression::InsertData(_) => "InsertData",
            Expression::UpdateData(_) => "UpdateData",
            Expression::DeleteData(_) => "DeleteData",
            Expression::ExecuteSql(_) => "ExecuteSql",
        }
    }

    /// Returns the name of the object the expression targets.
    ///
    /// For named objects (indexes, constraints, foreign keys) this is the
    /// name when known, otherwise the owning table.
    pub fn target(&self) -> &str {
        match self {
            Expression::CreateSchema(e) | Expression::DeleteSchema(e) => &e.name,
            Expression::CreateTable(e) => &e.name,
            Expression::DeleteTable(e) | Expression::DeleteSequence(e) => &e.name,
            Expression::RenameTable(e) => &e.old_name,
            Expression::AlterTableSchema(e) => &e.table,
            Expression::CreateColumn(e) | Expression::AlterColumn(e) => &e.column.name,
            Expression::DeleteColumn(e) => &e.table,
            Expression::RenameColumn(e) => &e.old_name,
            Expression::CreateIndex(e) | Expression::DeleteIndex(e) => {
                e.name.as_deref().unwrap_or(&e.table)
            }
            Expression::CreateForeignKey(e) | Expression::DeleteForeignKey(e) => {
                e.name.as_deref().unwrap_or(&e.from_table)
            }
            Expression::CreateConstraint(e) | Expression::DeleteConstraint(e) => {
                e.name.as_deref().unwrap_or(&e.table)
            }
            Expression::CreateSequence(e) => &e.name,
            Expression::InsertData(e) => &e.table,
            Expression::UpdateData(e) => &e.table,
            Expression::DeleteData(e) => &e.table,
            Expression::ExecuteSql(e) => e.description.as_deref().unwrap_or("sql"),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.target())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(7i32), Value::Int(7));
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".into()));
        assert_eq!(Value::Int(3).as_int(), Some(3));
        assert_eq!(Value::Text("a".into()).as_text(), Some("a"));
    }

    #[test]
    fn test_primary_key_implies_not_null() {
        let col = ColumnDefinition::new("Id", ColumnType::Int64).primary_key();
        assert!(col.primary_key);
        assert!(!col.nullable);
    }

    #[test]
    fn test_expression_display_uses_kind_and_target() {
        let fk = Expression::CreateForeignKey(
            ForeignKeyDefinition::new("Users", "Groups").named("FK_Foo"),
        );
        assert_eq!(fk.to_string(), "CreateForeignKey FK_Foo");
        assert_eq!(Expression::execute_sql("select 1").target(), "sql");
    }

    #[test]
    fn test_expression_deserializes_from_yaml_shape() {
        let json = serde_json::json!({
            "op": "create_table",
            "name": "Users",
            "columns": [
                { "name": "Id", "type": "int32", "primary_key": true, "identity": true },
                { "name": "Name", "type": { "string": 32 }, "nullable": false, "default": "anon" }
            ]
        });
        let expr: Expression = serde_json::from_value(json).unwrap();
        let Expression::CreateTable(table) = expr else {
            panic!("expected CreateTable");
        };
        assert_eq!(table.columns[0].column_type, ColumnType::Int32);
        assert!(table.columns[0].nullable);
        assert_eq!(table.columns[1].column_type, ColumnType::String(Some(32)));
        assert_eq!(table.columns[1].default, Some(Value::Text("anon".into())));
    }

    #[test]
    fn test_untagged_values_deserialize_from_scalars() {
        let r: Row = serde_json::from_value(serde_json::json!({
            "a": null, "b": true, "c": 5, "d": 1.5, "e": "x"
        }))
        .unwrap();
        assert_eq!(r["a"], Value::Null);
        assert_eq!(r["b"], Value::Bool(true));
        assert_eq!(r["c"], Value::Int(5));
        assert_eq!(r["d"], Value::Float(1.5));
        assert_eq!(r["e"], Value::Text("x".into()));
    }
}
