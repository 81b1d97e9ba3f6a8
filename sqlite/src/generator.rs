//! SQL generation for SQLite.
//!
//! Turns one [`Expression`] into the statements that implement it. Schemas
//! are attached databases, so schema-qualified names render as
//! `"schema"."name"`.
//!
//! # Limitations
//!
//! SQLite cannot create or drop attached databases through DDL, has no
//! sequences, and cannot alter columns, move tables between databases or add
//! foreign keys and primary keys to existing tables without rebuilding them.
//! Those expressions return [`SqliteError::Unsupported`]. Unique constraints
//! are rendered as unique indexes.

use migrator_core::{
    ColumnDefinition, ConstraintDefinition, ConstraintKind, CreateTable, Direction, Expression,
    IndexDefinition, Row,
};

use crate::convert::{column_type, literal, qualified, quote};
use crate::error::{Result, SqliteError};

/// Generates the statements for one expression.
///
/// # Examples
///
/// ```
/// use migrator_core::*;
/// use migrator_sqlite::generate_sql;
///
/// let sql = generate_sql(&Expression::CreateIndex(
///     IndexDefinition::new("Users").named("IX_Users_GroupId").on_column("GroupId"),
/// ))
/// .unwrap();
/// assert_eq!(sql, vec![r#"CREATE INDEX "IX_Users_GroupId" ON "Users" ("GroupId" ASC)"#]);
/// ```
pub fn generate_sql(expr: &Expression) -> Result<Vec<String>> {
    let kind = expr.kind();
    let sql = match expr {
        Expression::CreateSchema(_) | Expression::DeleteSchema(_) => {
            return unsupported(kind, "schemas are attached databases");
        }
        Expression::CreateSequence(_) | Expression::DeleteSequence(_) => {
            return unsupported(kind, "sequences do not exist");
        }
        Expression::AlterColumn(_) => {
            return unsupported(kind, "columns cannot be altered in place");
        }
        Expression::AlterTableSchema(_) => {
            return unsupported(kind, "tables cannot move between databases");
        }
        Expression::CreateForeignKey(_) | Expression::DeleteForeignKey(_) => {
            return unsupported(kind, "foreign keys are declared only at table creation");
        }
        Expression::CreateTable(e) => vec![create_table(e)?],
        Expression::DeleteTable(e) => {
            vec![format!("DROP TABLE {}", qualified(e.schema.as_deref(), &e.name))]
        }
        Expression::RenameTable(e) => vec![format!(
            "ALTER TABLE {} RENAME TO {}",
            qualified(e.schema.as_deref(), &e.old_name),
            quote(&e.new_name)
        )],
        Expression::CreateColumn(e) => vec![format!(
            "ALTER TABLE {} ADD COLUMN {}",
            qualified(e.schema.as_deref(), &e.table),
            column(&e.column, false)?
        )],
        Expression::DeleteColumn(e) => {
            let table = qualified(e.schema.as_deref(), &e.table);
            e.columns
                .iter()
                .map(|c| format!("ALTER TABLE {table} DROP COLUMN {}", quote(c)))
                .collect()
        }
        Expression::RenameColumn(e) => vec![format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            qualified(e.schema.as_deref(), &e.table),
            quote(&e.old_name),
            quote(&e.new_name)
        )],
        Expression::CreateIndex(e) => vec![create_index(e)],
        Expression::DeleteIndex(e) => vec![drop_index(e.schema.as_deref(), e.name.as_deref())],
        Expression::CreateConstraint(e) => vec![create_constraint(e)?],
        Expression::DeleteConstraint(e) => {
            if e.kind == ConstraintKind::PrimaryKey {
                return unsupported(kind, "primary keys are declared only at table creation");
            }
            vec![drop_index(e.schema.as_deref(), e.name.as_deref())]
        }
        Expression::InsertData(e) => {
            let table = qualified(e.schema.as_deref(), &e.table);
            e.rows
                .iter()
                .map(|row| insert(&table, row))
                .collect::<Result<_>>()?
        }
        Expression::UpdateData(e) => {
            let assignments = e
                .set
                .iter()
                .map(|(col, value)| Ok(format!("{} = {}", quote(col), literal(value)?)))
                .collect::<Result<Vec<_>>>()?;
            let mut sql = format!(
                "UPDATE {} SET {}",
                qualified(e.schema.as_deref(), &e.table),
                assignments.join(", ")
            );
            if !e.all_rows {
                sql.push_str(&where_clause(&e.where_rows)?);
            }
            vec![sql]
        }
        Expression::DeleteData(e) => {
            let mut sql = format!("DELETE FROM {}", qualified(e.schema.as_deref(), &e.table));
            if !e.all_rows {
                sql.push_str(&where_clause(&e.rows)?);
            }
            vec![sql]
        }
        Expression::ExecuteSql(e) => vec![e.sql.clone()],
    };
    Ok(sql)
}

fn unsupported<T>(kind: &'static str, reason: &'static str) -> Result<T> {
    Err(SqliteError::Unsupported { kind, reason })
}

fn create_table(table: &CreateTable) -> Result<String> {
    // An identity column must be the inline INTEGER PRIMARY KEY.
    let identity = table.columns.iter().any(|c| c.identity && c.primary_key);

    let mut parts = table
        .columns
        .iter()
        .map(|c| column(c, identity))
        .collect::<Result<Vec<_>>>()?;

    let keys: Vec<String> = table
        .columns
        .iter()
        .filter(|c| c.primary_key)
        .map(|c| quote(&c.name))
        .collect();
    if !identity && !keys.is_empty() {
        parts.push(format!("PRIMARY KEY ({})", keys.join(", ")));
    }

    Ok(format!(
        "CREATE TABLE {} ({})",
        qualified(table.schema.as_deref(), &table.name),
        parts.join(", ")
    ))
}

fn column(column: &ColumnDefinition, inline_key: bool) -> Result<String> {
    let mut sql = quote(&column.name);
    if inline_key && column.primary_key && column.identity {
        sql.push_str(" INTEGER PRIMARY KEY AUTOINCREMENT");
    } else {
        sql.push(' ');
        sql.push_str(&column_type(&column.column_type));
        if !column.nullable {
            sql.push_str(" NOT NULL");
        }
    }
    if column.unique && !column.primary_key {
        sql.push_str(" UNIQUE");
    }
    if let Some(default) = &column.default {
        sql.push_str(" DEFAULT ");
        sql.push_str(&literal(default)?);
    }
    Ok(sql)
}

fn create_index(index: &IndexDefinition) -> String {
    let columns: Vec<String> = index
        .columns
        .iter()
        .map(|c| {
            let direction = match c.direction {
                Direction::Ascending => "ASC",
                Direction::Descending => "DESC",
            };
            format!("{} {direction}", quote(&c.name))
        })
        .collect();
    format!(
        "CREATE {}INDEX {} ON {} ({})",
        if index.unique { "UNIQUE " } else { "" },
        qualified(index.schema.as_deref(), index.name.as_deref().unwrap_or_default()),
        quote(&index.table),
        columns.join(", ")
    )
}

fn create_constraint(constraint: &ConstraintDefinition) -> Result<String> {
    if constraint.kind == ConstraintKind::PrimaryKey {
        return unsupported("CreateConstraint", "primary keys are declared only at table creation");
    }
    let columns: Vec<String> = constraint.columns.iter().map(|c| quote(c)).collect();
    Ok(format!(
        "CREATE UNIQUE INDEX {} ON {} ({})",
        qualified(
            constraint.schema.as_deref(),
            constraint.name.as_deref().unwrap_or_default()
        ),
        quote(&constraint.table),
        columns.join(", ")
    ))
}

fn drop_index(schema: Option<&str>, name: Option<&str>) -> String {
    format!("DROP INDEX {}", qualified(schema, name.unwrap_or_default()))
}

fn insert(table: &str, row: &Row) -> Result<String> {
    let columns: Vec<String> = row.keys().map(|c| quote(c)).collect();
    let values = row.values().map(literal).collect::<Result<Vec<_>>>()?;
    Ok(format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        columns.join(", "),
        values.join(", ")
    ))
}

/// Each row is an AND of equalities; rows are OR-ed.
fn where_clause(rows: &[Row]) -> Result<String> {
    let mut groups = Vec::with_capacity(rows.len());
    for row in rows {
        let mut terms = Vec::with_capacity(row.len());
        for (col, value) in row {
            if value.is_null() {
                terms.push(format!("{} IS NULL", quote(col)));
            } else {
                terms.push(format!("{} = {}", quote(col), literal(value)?));
            }
        }
        groups.push(format!("({})", terms.join(" AND ")));
    }
    Ok(format!(" WHERE {}", groups.join(" OR ")))
}
