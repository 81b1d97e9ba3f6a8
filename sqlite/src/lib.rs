//! SQLite backend for the migration runner.
//!
//! [`SqliteProcessor`] implements [`Processor`](migrator_runner::Processor)
//! over a rusqlite connection. Statements are produced by
//! [`generate_sql`], one expression at a time.
//!
//! # Architecture
//!
//! - **`generator`**: expression to SQL, including the SQLite limitations
//! - **`convert`**: identifier quoting, literals and value reading
//! - **`processor`**: execution, preview capture, existence checks and
//!   transactions
//!
//! # Quick start
//!
//! ```no_run
//! use migrator_runner::{DirectorySource, MigrationRunner};
//! use migrator_sqlite::SqliteProcessor;
//! use rusqlite::Connection;
//!
//! let processor = SqliteProcessor::new(Connection::open("app.db").unwrap()).unwrap();
//! let mut runner = MigrationRunner::builder(processor)
//!     .source(DirectorySource::from_dir("migrations/").unwrap())
//!     .build()
//!     .unwrap();
//!
//! let report = runner.migrate_up(None, false).unwrap();
//! println!("Applied {:?}", report.applied);
//! ```
//!
//! # Schemas
//!
//! SQLite has no schemas, only attached databases. A schema name on an
//! expression refers to an attached database, which must be attached on the
//! connection before the run; `CreateSchema` and `DeleteSchema` are rejected.

mod convert;
mod error;
mod generator;
mod processor;

pub use convert::{literal, qualified, quote};
pub use error::{Result, SqliteError};
pub use generator::generate_sql;
pub use processor::SqliteProcessor;
