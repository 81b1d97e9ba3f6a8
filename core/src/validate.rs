//! Structural validation of expressions.
//!
//! Validation runs after the naming conventions and before an expression is
//! handed to a processor. It catches missing identifiers, empty column
//! lists, contradictory row filters and impossible sequence bounds. All
//! problems are collected; validation never stops at the first one.
//!
//! # Examples
//!
//! ```
//! use migrator_core::*;
//!
//! let ok = Expression::CreateIndex(
//!     IndexDefinition::new("Users").named("IX_Users_GroupId").on_column("GroupId"),
//! );
//! assert!(validate_expression(&ok).is_empty());
//!
//! // Unnamed and without columns: two problems
//! let bad = Expression::CreateIndex(IndexDefinition::new("Users"));
//! assert_eq!(validate_expression(&bad).len(), 2);
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::{
    ColumnDefinition, ColumnType, ConstraintDefinition, Expression, ForeignKeyDefinition,
    IndexDefinition, SequenceDefinition,
};

/// Expression validation errors.
///
/// `kind` is the [`Expression::kind`] of the offending expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required identifier is missing or whitespace-only.
    #[error("{kind}: {field} cannot be empty")]
    EmptyName {
        kind: &'static str,
        field: &'static str,
    },
    /// A column list that must not be empty is empty.
    #[error("{kind}: at least one column is required")]
    NoColumns { kind: &'static str },
    /// Two columns in one table definition share a name.
    #[error("duplicate column in table {table}: {column}")]
    DuplicateColumn { table: String, column: String },
    /// Foreign key column counts differ between the two sides.
    #[error("foreign key column count mismatch: {from} referencing vs {to} referenced")]
    ForeignKeyColumnMismatch { from: usize, to: usize },
    /// `AlterTableSchema` moves a table to the schema it is already in.
    #[error("table {0} is already in the target schema")]
    SameSchema(String),
    /// Decimal scale exceeds its precision.
    #[error("column {column}: decimal precision {precision} is smaller than scale {scale}")]
    InvalidDecimal {
        column: String,
        precision: u8,
        scale: u8,
    },
    /// A declared string or binary length is zero.
    #[error("column {0}: length must be greater than zero")]
    ZeroLength(String),
    /// An insert carries no rows, or an empty row.
    #[error("insert into {0} requires at least one non-empty row")]
    EmptyInsert(String),
    /// An update assigns no columns.
    #[error("update of {0} has no column assignments")]
    EmptyUpdate(String),
    /// Neither or both of explicit row filters and `all_rows` were given.
    #[error("{kind} on {table}: specify either row filters or all_rows, not both or neither")]
    AmbiguousRowFilter { kind: &'static str, table: String },
    /// A sequence increment of zero.
    #[error("sequence {0}: increment cannot be zero")]
    ZeroIncrement(String),
    /// Sequence minimum is greater than its maximum.
    #[error("sequence {0}: min value exceeds max value")]
    InvalidSequenceBounds(String),
    /// Sequence start lies outside `[min, max]`.
    #[error("sequence {0}: start value is outside of its bounds")]
    StartOutOfRange(String),
    /// Sequence cache smaller than two.
    #[error("sequence {0}: cache must be at least 2")]
    InvalidCache(String),
    /// Raw SQL is empty.
    #[error("sql statement cannot be empty")]
    EmptySql,
}

/// Validates a single expression, returning every problem found.
pub fn validate_expression(expr: &Expression) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let kind = expr.kind();

    match expr {
        Expression::CreateSchema(e) | Expression::DeleteSchema(e) => {
            require(&mut errors, kind, "schema name", &e.name);
        }
        Expression::CreateTable(e) => {
            require(&mut errors, kind, "table name", &e.name);
            if e.columns.is_empty() {
                errors.push(ValidationError::NoColumns { kind });
            }
            let mut seen = HashSet::new();
            for column in &e.columns {
                validate_column(&mut errors, kind, column);
                if !seen.insert(column.name.as_str()) {
                    errors.push(ValidationError::DuplicateColumn {
                        table: e.name.clone(),
                        column: column.name.clone(),
                    });
                }
            }
        }
        Expression::DeleteTable(e) => require(&mut errors, kind, "table name", &e.name),
        Expression::RenameTable(e) => {
            require(&mut errors, kind, "old table name", &e.old_name);
            require(&mut errors, kind, "new table name", &e.new_name);
        }
        Expression::AlterTableSchema(e) => {
            require(&mut errors, kind, "table name", &e.table);
            if e.from_schema == e.to_schema {
                errors.push(ValidationError::SameSchema(e.table.clone()));
            }
        }
        Expression::CreateColumn(e) | Expression::AlterColumn(e) => {
            require(&mut errors, kind, "table name", &e.table);
            validate_column(&mut errors, kind, &e.column);
        }
        Expression::DeleteColumn(e) => {
            require(&mut errors, kind, "table name", &e.table);
            if e.columns.is_empty() {
                errors.push(ValidationError::NoColumns { kind });
            }
            for column in &e.columns {
                require(&mut errors, kind, "column name", column);
            }
        }
        Expression::RenameColumn(e) => {
            require(&mut errors, kind, "table name", &e.table);
            require(&mut errors, kind, "old column name", &e.old_name);
            require(&mut errors, kind, "new column name", &e.new_name);
        }
        Expression::CreateIndex(e) => validate_index(&mut errors, kind, e, true),
        Expression::DeleteIndex(e) => validate_index(&mut errors, kind, e, false),
        Expression::CreateForeignKey(e) => validate_foreign_key(&mut errors, kind, e, true),
        Expression::DeleteForeignKey(e) => validate_foreign_key(&mut errors, kind, e, false),
        Expression::CreateConstraint(e) => validate_constraint(&mut errors, kind, e, true),
        Expression::DeleteConstraint(e) => validate_constraint(&mut errors, kind, e, false),
        Expression::CreateSequence(e) => validate_sequence(&mut errors, kind, e),
        Expression::DeleteSequence(e) => require(&mut errors, kind, "sequence name", &e.name),
        Expression::InsertData(e) => {
            require(&mut errors, kind, "table name", &e.table);
            if e.rows.is_empty() || e.rows.iter().any(|r| r.is_empty()) {
                errors.push(ValidationError::EmptyInsert(e.table.clone()));
            }
        }
        Expression::UpdateData(e) => {
            require(&mut errors, kind, "table name", &e.table);
            if e.set.is_empty() {
                errors.push(ValidationError::EmptyUpdate(e.table.clone()));
            }
            if e.where_rows.is_empty() == !e.all_rows {
                errors.push(ValidationError::AmbiguousRowFilter {
                    kind,
                    table: e.table.clone(),
                });
            }
        }
        Expression::DeleteData(e) => {
            require(&mut errors, kind, "table name", &e.table);
            if e.rows.is_empty() == !e.all_rows {
                errors.push(ValidationError::AmbiguousRowFilter {
                    kind,
                    table: e.table.clone(),
                });
            }
        }
        Expression::ExecuteSql(e) => {
            if e.sql.trim().is_empty() {
                errors.push(ValidationError::EmptySql);
            }
        }
    }

    errors
}

impl Expression {
    /// Validates this expression. See [`validate_expression`].
    pub fn validate(&self) -> Vec<ValidationError> {
        validate_expression(self)
    }
}

fn require(errors: &mut Vec<ValidationError>, kind: &'static str, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        errors.push(ValidationError::EmptyName { kind, field });
    }
}

fn require_opt(
    errors: &mut Vec<ValidationError>,
    kind: &'static str,
    field: &'static str,
    value: Option<&str>,
) {
    require(errors, kind, field, value.unwrap_or_default());
}

fn validate_column(errors: &mut Vec<ValidationError>, kind: &'static str, column: &ColumnDefinition) {
    require(errors, kind, "column name", &column.name);
    match column.column_type {
        ColumnType::Decimal { precision, scale } if precision < scale => {
            errors.push(ValidationError::InvalidDecimal {
                column: column.name.clone(),
                precision,
                scale,
            });
        }
        ColumnType::AnsiString(Some(0)) | ColumnType::String(Some(0)) | ColumnType::Binary(Some(0)) => {
            errors.push(ValidationError::ZeroLength(column.name.clone()));
        }
        _ => {}
    }
}

// Delete variants only need a name; columns matter for creation.
fn validate_index(
    errors: &mut Vec<ValidationError>,
    kind: &'static str,
    index: &IndexDefinition,
    creating: bool,
) {
    require_opt(errors, kind, "index name", index.name.as_deref());
    require(errors, kind, "table name", &index.table);
    if creating && index.columns.is_empty() {
        errors.push(ValidationError::NoColumns { kind });
    }
}

fn validate_foreign_key(
    errors: &mut Vec<ValidationError>,
    kind: &'static str,
    fk: &ForeignKeyDefinition,
    creating: bool,
) {
    require_opt(errors, kind, "foreign key name", fk.name.as_deref());
    require(errors, kind, "foreign table name", &fk.from_table);
    if !creating {
        return;
    }
    require(errors, kind, "primary table name", &fk.to_table);
    if fk.from_columns.is_empty() || fk.to_columns.is_empty() {
        errors.push(ValidationError::NoColumns { kind });
    } else if fk.from_columns.len() != fk.to_columns.len() {
        errors.push(ValidationError::ForeignKeyColumnMismatch {
            from: fk.from_columns.len(),
            to: fk.to_columns.len(),
        });
    }
}

fn validate_constraint(
    errors: &mut Vec<ValidationError>,
    kind: &'static str,
    constraint: &ConstraintDefinition,
    creating: bool,
) {
    require_opt(errors, kind, "constraint name", constraint.name.as_deref());
    require(errors, kind, "table name", &constraint.table);
    if creating && constraint.columns.is_empty() {
        errors.push(ValidationError::NoColumns { kind });
    }
}

fn validate_sequence(
    errors: &mut Vec<ValidationError>,
    kind: &'static str,
    sequence: &SequenceDefinition,
) {
    require(errors, kind, "sequence name", &sequence.name);
    let name = &sequence.name;

    if sequence.increment == Some(0) {
        errors.push(ValidationError::ZeroIncrement(name.clone()));
    }
    if let (Some(min), Some(max)) = (sequence.min_value, sequence.max_value) {
        if min > max {
            errors.push(ValidationError::InvalidSequenceBounds(name.clone()));
        }
    }
    if let Some(start) = sequence.start {
        let below = sequence.min_value.is_some_and(|min| start < min);
        let above = sequence.max_value.is_some_and(|max| start > max);
        if below || above {
            errors.push(ValidationError::StartOutOfRange(name.clone()));
        }
    }
    if sequence.cache.is_some_and(|cache| cache < 2) {
        errors.push(ValidationError::InvalidCache(name.clone()));
    }
}
