//! Structural inversion of expressions.
//!
//! Reversal is what lets a migration declare only its forward direction.
//! Paired operations (index, foreign key, constraint, schema, renames)
//! invert into each other; creations invert into the matching deletion.
//! Destructive or data-dependent operations have no inverse.
//!
//! # Examples
//!
//! ```
//! use migrator_core::*;
//!
//! let rename = Expression::rename_column("Users", "Name", "FullName");
//! let back = rename.reverse().unwrap();
//! assert_eq!(back, Expression::rename_column("Users", "FullName", "Name"));
//! assert_eq!(back.reverse().unwrap(), rename);
//!
//! assert!(Expression::execute_sql("select 1").reverse().is_err());
//! ```

use thiserror::Error;

use crate::{
    AlterTableSchema, DeleteColumn, DeleteData, Expression, ObjectRef, RenameColumn, RenameTable,
    SchemaExpression,
};

/// Failure to invert an expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReversalError {
    /// The expression has no structural inverse.
    #[error("{kind} on {target} cannot be reversed automatically")]
    NotReversible { kind: &'static str, target: String },
}

impl ReversalError {
    fn of(expr: &Expression) -> Self {
        ReversalError::NotReversible {
            kind: expr.kind(),
            target: expr.target().to_string(),
        }
    }
}

impl Expression {
    /// Returns the inverse expression.
    ///
    /// Deleting an index, constraint or foreign key is only reversible when
    /// the definition still lists its columns, since those are needed to
    /// recreate it.
    pub fn reverse(&self) -> Result<Expression, ReversalError> {
        let reversed = match self {
            Expression::CreateSchema(e) => Expression::DeleteSchema(e.clone()),
            Expression::DeleteSchema(e) => Expression::CreateSchema(SchemaExpression {
                name: e.name.clone(),
            }),
            Expression::CreateTable(e) => Expression::DeleteTable(ObjectRef {
                schema: e.schema.clone(),
                name: e.name.clone(),
            }),
            Expression::RenameTable(e) => Expression::RenameTable(RenameTable {
                schema: e.schema.clone(),
                old_name: e.new_name.clone(),
                new_name: e.old_name.clone(),
            }),
            Expression::AlterTableSchema(e) => Expression::AlterTableSchema(AlterTableSchema {
                table: e.table.clone(),
                from_schema: e.to_schema.clone(),
                to_schema: e.from_schema.clone(),
            }),
            Expression::CreateColumn(e) => Expression::DeleteColumn(DeleteColumn {
                schema: e.schema.clone(),
                table: e.table.clone(),
                columns: vec![e.column.name.clone()],
            }),
            Expression::RenameColumn(e) => Expression::RenameColumn(RenameColumn {
                schema: e.schema.clone(),
                table: e.table.clone(),
                old_name: e.new_name.clone(),
                new_name: e.old_name.clone(),
            }),
            Expression::CreateIndex(e) => Expression::DeleteIndex(e.clone()),
            Expression::DeleteIndex(e) if !e.columns.is_empty() => {
                Expression::CreateIndex(e.clone())
            }
            Expression::CreateForeignKey(e) => Expression::DeleteForeignKey(e.clone()),
            Expression::DeleteForeignKey(e) if !e.from_columns.is_empty() => {
                Expression::CreateForeignKey(e.clone())
            }
            Expression::CreateConstraint(e) => Expression::DeleteConstraint(e.clone()),
            Expression::DeleteConstraint(e) if !e.columns.is_empty() => {
                Expression::CreateConstraint(e.clone())
            }
            Expression::CreateSequence(e) => Expression::DeleteSequence(ObjectRef {
                schema: e.schema.clone(),
                name: e.name.clone(),
            }),
            Expression::InsertData(e) => Expression::DeleteData(DeleteData {
                schema: e.schema.clone(),
                table: e.table.clone(),
                rows: e.rows.clone(),
                all_rows: false,
            }),
            _ => return Err(ReversalError::of(self)),
        };
        Ok(reversed)
    }

    /// Returns `true` when [`Expression::reverse`] would succeed.
    pub fn is_reversible(&self) -> bool {
        self.reverse().is_ok()
    }
}

/// Inverts a forward expression list into its down direction.
///
/// Each expression is reversed and the order flipped. Fails on the first
/// expression without an inverse.
///
/// # Examples
///
/// ```
/// use migrator_core::*;
///
/// let up = vec![
///     Expression::create_schema("audit"),
///     Expression::rename_table("A", "B"),
/// ];
/// let down = reverse_expressions(&up).unwrap();
/// assert_eq!(down[0], Expression::rename_table("B", "A"));
/// assert_eq!(down[1], Expression::delete_schema("audit"));
/// ```
pub fn reverse_expressions(expressions: &[Expression]) -> Result<Vec<Expression>, ReversalError> {
    expressions.iter().rev().map(Expression::reverse).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ColumnDefinition, ColumnExpression, ColumnType, ConstraintDefinition, CreateTable,
        ForeignKeyDefinition, IndexDefinition, InsertData, SequenceDefinition, Value, row,
    };

    fn symmetric() -> Vec<Expression> {
        vec![
            Expression::create_schema("s"),
            Expression::delete_schema("s"),
            Expression::CreateIndex(IndexDefinition::new("T").named("IX").on_column("A")),
            Expression::DeleteIndex(IndexDefinition::new("T").named("IX").on_column("A")),
            Expression::CreateForeignKey(
                ForeignKeyDefinition::new("A", "B").from_column("x").to_column("y"),
            ),
            Expression::DeleteForeignKey(
                ForeignKeyDefinition::new("A", "B").from_column("x").to_column("y"),
            ),
            Expression::CreateConstraint(ConstraintDefinition::unique("T").column("A")),
            Expression::DeleteConstraint(ConstraintDefinition::primary_key("T").column("A")),
            Expression::rename_table("A", "B"),
            Expression::rename_column("T", "A", "B"),
            Expression::AlterTableSchema(AlterTableSchema {
                table: "T".into(),
                from_schema: Some("a".into()),
                to_schema: None,
            }),
        ]
    }

    #[test]
    fn test_symmetric_variants_round_trip() {
        for expr in symmetric() {
            let twice = expr.reverse().and_then(|r| r.reverse()).unwrap();
            assert_eq!(twice, expr, "{expr}");
        }
    }

    #[test]
    fn test_one_way_reversals() {
        let table = Expression::CreateTable(
            CreateTable::new("Users")
                .in_schema("app")
                .with_column(ColumnDefinition::new("Id", ColumnType::Int32)),
        );
        assert_eq!(
            table.reverse().unwrap(),
            Expression::DeleteTable(ObjectRef::new("Users").in_schema("app"))
        );

        let column = Expression::CreateColumn(ColumnExpression::new(
            "Users",
            ColumnDefinition::new("Age", ColumnType::Int16),
        ));
        let Expression::DeleteColumn(dropped) = column.reverse().unwrap() else {
            panic!("expected DeleteColumn");
        };
        assert_eq!(dropped.columns, vec!["Age"]);

        let seq = Expression::CreateSequence(SequenceDefinition::new("Seq"));
        assert_eq!(
            seq.reverse().unwrap(),
            Expression::DeleteSequence(ObjectRef::new("Seq"))
        );

        let insert = Expression::InsertData(
            InsertData::new("Users").with_row(row([("Id", Value::from(1))])),
        );
        let Expression::DeleteData(delete) = insert.reverse().unwrap() else {
            panic!("expected DeleteData");
        };
        assert_eq!(delete.rows.len(), 1);
        assert!(!delete.all_rows);
    }

    #[test]
    fn test_destructive_expressions_are_not_reversible() {
        let cases = [
            Expression::delete_table("Users"),
            Expression::DeleteSequence(ObjectRef::new("Seq")),
            Expression::execute_sql("select 1"),
            Expression::DeleteColumn(DeleteColumn {
                schema: None,
                table: "Users".into(),
                columns: vec!["Age".into()],
            }),
        ];
        for expr in cases {
            assert!(!expr.is_reversible(), "{expr}");
            assert!(matches!(
                expr.reverse(),
                Err(ReversalError::NotReversible { kind, .. }) if kind == expr.kind()
            ));
        }
    }

    #[test]
    fn test_delete_by_name_only_is_not_reversible() {
        let expr = Expression::DeleteIndex(IndexDefinition::new("Users").named("IX_Users_Name"));
        assert_eq!(
            expr.reverse(),
            Err(ReversalError::NotReversible {
                kind: "DeleteIndex",
                target: "IX_Users_Name".into(),
            })
        );
    }

    #[test]
    fn test_reverse_expressions_fails_fast() {
        let up = vec![
            Expression::create_schema("a"),
            Expression::execute_sql("insert into x values (1)"),
        ];
        let err = reverse_expressions(&up).unwrap_err();
        assert!(matches!(err, ReversalError::NotReversible { kind: "ExecuteSql", .. }));
    }
}
