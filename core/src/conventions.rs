//! Default naming conventions.
//!
//! Unnamed indexes, constraints and foreign keys receive deterministic names
//! derived from their table and column identifiers, so the same definition
//! always maps to the same database object on every backend. Deletions are
//! named with the same rules as creations.

use serde::{Deserialize, Serialize};

use crate::{ConstraintDefinition, ConstraintKind, Expression, ForeignKeyDefinition, IndexDefinition};

/// Convention settings applied to expressions before execution.
///
/// # Examples
///
/// ```
/// use migrator_core::*;
///
/// let conventions = ConventionSet::default();
/// let exprs = conventions.apply(vec![Expression::CreateIndex(
///     IndexDefinition::new("Users").on_column("GroupId"),
/// )]);
/// let Expression::CreateIndex(index) = &exprs[0] else { unreachable!() };
/// assert_eq!(index.name.as_deref(), Some("IX_Users_GroupId"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConventionSet {
    /// Schema used when an expression omits one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_schema: Option<String>,
}

impl ConventionSet {
    /// Creates conventions with a default schema.
    pub fn with_default_schema(schema: impl Into<String>) -> Self {
        Self {
            default_schema: Some(schema.into()),
        }
    }

    /// Applies the conventions to every expression.
    pub fn apply(&self, expressions: Vec<Expression>) -> Vec<Expression> {
        expressions
            .into_iter()
            .map(|expr| self.apply_one(expr))
            .collect()
    }

    /// Applies the conventions to a single expression.
    pub fn apply_one(&self, mut expr: Expression) -> Expression {
        match &mut expr {
            Expression::CreateIndex(index) | Expression::DeleteIndex(index) => {
                if index.name.is_none() {
                    index.name = index_name(index);
                }
                self.fill(&mut index.schema);
            }
            Expression::CreateConstraint(c) | Expression::DeleteConstraint(c) => {
                if c.name.is_none() {
                    c.name = constraint_name(c);
                }
                self.fill(&mut c.schema);
            }
            Expression::CreateForeignKey(fk) | Expression::DeleteForeignKey(fk) => {
                if fk.name.is_none() {
                    fk.name = foreign_key_name(fk);
                }
                self.fill(&mut fk.from_schema);
                self.fill(&mut fk.to_schema);
            }
            Expression::CreateTable(e) => self.fill(&mut e.schema),
            Expression::DeleteTable(e) | Expression::DeleteSequence(e) => self.fill(&mut e.schema),
            Expression::RenameTable(e) => self.fill(&mut e.schema),
            Expression::CreateColumn(e) | Expression::AlterColumn(e) => self.fill(&mut e.schema),
            Expression::DeleteColumn(e) => self.fill(&mut e.schema),
            Expression::RenameColumn(e) => self.fill(&mut e.schema),
            Expression::CreateSequence(e) => self.fill(&mut e.schema),
            Expression::InsertData(e) => self.fill(&mut e.schema),
            Expression::UpdateData(e) => self.fill(&mut e.schema),
            Expression::DeleteData(e) => self.fill(&mut e.schema),
            Expression::CreateSchema(_)
            | Expression::DeleteSchema(_)
            | Expression::AlterTableSchema(_)
            | Expression::ExecuteSql(_) => {}
        }
        expr
    }

    fn fill(&self, schema: &mut Option<String>) {
        if schema.is_none() {
            schema.clone_from(&self.default_schema);
        }
    }
}

/// Conventional index name: `IX_<table>_<col1>_<col2>…`.
///
/// Returns `None` when the definition has no columns.
pub fn index_name(index: &IndexDefinition) -> Option<String> {
    if index.columns.is_empty() {
        return None;
    }
    let columns: Vec<&str> = index.columns.iter().map(|c| c.name.as_str()).collect();
    Some(format!("IX_{}_{}", index.table, columns.join("_")))
}

/// Conventional constraint name: `UC_<table>_<cols>` or `PK_<table>_<cols>`.
///
/// Returns `None` when the definition has no columns.
pub fn constraint_name(constraint: &ConstraintDefinition) -> Option<String> {
    if constraint.columns.is_empty() {
        return None;
    }
    let prefix = match constraint.kind {
        ConstraintKind::Unique => "UC",
        ConstraintKind::PrimaryKey => "PK",
    };
    Some(format!(
        "{prefix}_{}_{}",
        constraint.table,
        constraint.columns.join("_")
    ))
}

/// Conventional foreign key name: `FK_<fromTable>_<fromCols>_<toTable>_<toCols>`.
///
/// Returns `None` when the referencing side has no columns.
pub fn foreign_key_name(fk: &ForeignKeyDefinition) -> Option<String> {
    if fk.from_columns.is_empty() {
        return None;
    }
    let mut name = format!("FK_{}_{}_{}", fk.from_table, fk.from_columns.join("_"), fk.to_table);
    if !fk.to_columns.is_empty() {
        name.push('_');
        name.push_str(&fk.to_columns.join("_"));
    }
    Some(name)
}
