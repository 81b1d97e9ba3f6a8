//! Conversion between [`Value`] and SQLite.
//!
//! Values are written as SQL literals, so a rendered statement is complete
//! on its own and can be shown in preview mode exactly as it would run.
//! Reading goes the other way, from [`ValueRef`] back to [`Value`].

use chrono::SecondsFormat;
use migrator_core::{ColumnType, Value};
use rusqlite::types::ValueRef;

use crate::error::{Result, SqliteError};

/// Quotes an identifier, doubling embedded quotes.
pub fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quotes an optionally schema-qualified name.
pub fn qualified(schema: Option<&str>, name: &str) -> String {
    match schema {
        Some(schema) => format!("{}.{}", quote(schema), quote(name)),
        None => quote(name),
    }
}

/// Renders a value as a SQL literal.
///
/// # Errors
///
/// Returns [`SqliteError::ConversionError`] for non-finite floats.
pub fn literal(value: &Value) -> Result<String> {
    Ok(match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => u8::from(*b).to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) if f.is_finite() => format!("{f:?}"),
        Value::Float(f) => {
            return Err(SqliteError::ConversionError(format!(
                "cannot store non-finite float {f}"
            )));
        }
        Value::Text(s) => text(s),
        Value::Timestamp(ts) => text(&ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
    })
}

fn text(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Reads a column value.
///
/// # Errors
///
/// Returns [`SqliteError::ConversionError`] for blobs and non-UTF-8 text.
pub fn value_from_ref(value: ValueRef<'_>) -> Result<Value> {
    match value {
        ValueRef::Null => Ok(Value::Null),
        ValueRef::Integer(i) => Ok(Value::Int(i)),
        ValueRef::Real(f) => Ok(Value::Float(f)),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .map(|s| Value::Text(s.to_string()))
            .map_err(|e| SqliteError::ConversionError(format!("invalid UTF-8 text: {e}"))),
        ValueRef::Blob(_) => Err(SqliteError::ConversionError(
            "blob columns cannot be read as values".to_string(),
        )),
    }
}

/// SQLite type name for a logical column type.
pub fn column_type(column_type: &ColumnType) -> String {
    match column_type {
        ColumnType::AnsiString(_) | ColumnType::String(_) => "TEXT".to_string(),
        ColumnType::Int16 | ColumnType::Int32 | ColumnType::Int64 | ColumnType::Boolean => {
            "INTEGER".to_string()
        }
        ColumnType::Decimal { precision, scale } => format!("NUMERIC({precision},{scale})"),
        ColumnType::Double => "DOUBLE".to_string(),
        ColumnType::Date | ColumnType::DateTime => "DATETIME".to_string(),
        ColumnType::Binary(_) => "BLOB".to_string(),
        ColumnType::Guid => "UNIQUEIDENTIFIER".to_string(),
        ColumnType::Custom(name) => name.clone(),
    }
}
