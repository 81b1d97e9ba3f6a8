//! [`Processor`] implementation over a rusqlite [`Connection`].

use migrator_core::{Expression, Row};
use migrator_runner::{Processor, ProcessorResult};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};

use crate::convert::{qualified, quote, value_from_ref};
use crate::error::Result;
use crate::generator::generate_sql;

/// Runs expressions against a SQLite database.
///
/// Attached databases play the role of schemas. In preview mode every
/// statement is rendered into [`rendered`](Self::rendered) and logged, and
/// nothing is executed.
///
/// # Examples
///
/// ```
/// use migrator_core::Expression;
/// use migrator_runner::Processor;
/// use migrator_sqlite::SqliteProcessor;
///
/// let mut processor = SqliteProcessor::open_in_memory().unwrap().with_preview(true);
/// processor.execute(&Expression::delete_table("Users")).unwrap();
/// assert_eq!(processor.rendered(), [r#"DROP TABLE "Users""#]);
/// ```
pub struct SqliteProcessor {
    conn: Connection,
    preview: bool,
    rendered: Vec<String>,
}

impl SqliteProcessor {
    /// Wraps a connection and enables foreign key enforcement.
    pub fn new(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self {
            conn,
            preview: false,
            rendered: Vec::new(),
        })
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    /// Renders statements instead of executing them.
    pub fn with_preview(mut self, preview: bool) -> Self {
        self.preview = preview;
        self
    }

    /// Statements rendered in preview, in order.
    pub fn rendered(&self) -> &[String] {
        &self.rendered
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn into_connection(self) -> Connection {
        self.conn
    }

    fn render(&mut self, expr: &Expression) -> Result<()> {
        for sql in generate_sql(expr)? {
            info!(expression = %expr, sql = %sql, "Preview");
            self.rendered.push(sql);
        }
        Ok(())
    }

    fn run(&mut self, expr: &Expression) -> Result<()> {
        for sql in generate_sql(expr)? {
            debug!(expression = %expr, sql = %sql, "Executing statement");
            self.conn.execute_batch(&sql)?;
        }
        Ok(())
    }

    fn attached(&self, schema: &str) -> Result<bool> {
        let mut stmt = self.conn.prepare("PRAGMA database_list")?;
        let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
        for name in names {
            if name?.eq_ignore_ascii_case(schema) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Looks up one `sqlite_master` entry, `false` when the schema is not
    /// attached.
    fn master_entry(
        &self,
        schema: Option<&str>,
        kind: &str,
        name: &str,
        table: Option<&str>,
    ) -> Result<bool> {
        if let Some(schema) = schema {
            if !self.attached(schema)? {
                return Ok(false);
            }
        }
        let master = qualified(schema, "sqlite_master");
        let found = match table {
            Some(table) => self
                .conn
                .query_row(
                    &format!(
                        "SELECT 1 FROM {master} WHERE type = ?1 AND name = ?2 AND tbl_name = ?3"
                    ),
                    params![kind, name, table],
                    |_| Ok(()),
                )
                .optional()?,
            None => self
                .conn
                .query_row(
                    &format!("SELECT 1 FROM {master} WHERE type = ?1 AND name = ?2"),
                    params![kind, name],
                    |_| Ok(()),
                )
                .optional()?,
        };
        Ok(found.is_some())
    }

    fn has_column(&self, schema: Option<&str>, table: &str, column: &str) -> Result<bool> {
        if !self.master_entry(schema, "table", table, None)? {
            return Ok(false);
        }
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM pragma_table_info(?1, ?2) WHERE name = ?3",
                params![table, schema.unwrap_or("main"), column],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn rows(&self, schema: Option<&str>, table: &str) -> Result<Vec<Row>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM {}", qualified(schema, table)))?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.query([])?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Row::new();
            for (i, column) in columns.iter().enumerate() {
                values.insert(column.clone(), value_from_ref(row.get_ref(i)?)?);
            }
            result.push(values);
        }
        Ok(result)
    }
}

impl Processor for SqliteProcessor {
    fn database_type(&self) -> &str {
        "sqlite"
    }

    fn is_preview(&self) -> bool {
        self.preview
    }

    fn execute(&mut self, expr: &Expression) -> ProcessorResult<()> {
        if self.preview {
            return Ok(self.render(expr)?);
        }
        Ok(self.run(expr)?)
    }

    fn preview(&mut self, expr: &Expression) -> ProcessorResult<()> {
        Ok(self.render(expr)?)
    }

    fn schema_exists(&self, schema: &str) -> ProcessorResult<bool> {
        Ok(self.attached(schema)?)
    }

    fn table_exists(&self, schema: Option<&str>, table: &str) -> ProcessorResult<bool> {
        Ok(self.master_entry(schema, "table", table, None)?)
    }

    fn column_exists(
        &self,
        schema: Option<&str>,
        table: &str,
        column: &str,
    ) -> ProcessorResult<bool> {
        Ok(self.has_column(schema, table, column)?)
    }

    fn index_exists(
        &self,
        schema: Option<&str>,
        table: &str,
        index: &str,
    ) -> ProcessorResult<bool> {
        Ok(self.master_entry(schema, "index", index, Some(table))?)
    }

    // Unique constraints are stored as indexes.
    fn constraint_exists(
        &self,
        schema: Option<&str>,
        table: &str,
        constraint: &str,
    ) -> ProcessorResult<bool> {
        Ok(self.master_entry(schema, "index", constraint, Some(table))?)
    }

    fn sequence_exists(&self, _schema: Option<&str>, _sequence: &str) -> ProcessorResult<bool> {
        Ok(false)
    }

    fn read_rows(&self, schema: Option<&str>, table: &str) -> ProcessorResult<Vec<Row>> {
        Ok(self.rows(schema, table)?)
    }

    fn begin_transaction(&mut self) -> ProcessorResult<()> {
        debug!("Beginning transaction");
        self.conn
            .execute_batch("BEGIN")
            .map_err(|e| crate::SqliteError::from(e).into())
    }

    fn commit_transaction(&mut self) -> ProcessorResult<()> {
        debug!("Committing transaction");
        self.conn
            .execute_batch("COMMIT")
            .map_err(|e| crate::SqliteError::from(e).into())
    }

    fn rollback_transaction(&mut self) -> ProcessorResult<()> {
        if self.conn.is_autocommit() {
            return Ok(());
        }
        debug!("Rolling back transaction");
        self.conn
            .execute_batch("ROLLBACK")
            .map_err(|e| crate::SqliteError::from(e).into())
    }
}
