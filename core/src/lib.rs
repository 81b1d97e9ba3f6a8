//! Expression model and migration contracts for schema migrations.
//!
//! This crate defines everything a migration is made of, independent of any
//! database backend:
//!
//! - [`Expression`]: one schema or data operation (tables, columns,
//!   indexes, foreign keys, constraints, sequences, schemas, rows, raw SQL).
//! - [`validate_expression`]: structural checks run before dispatch.
//! - [`Expression::reverse`] and [`reverse_expressions`]: structural
//!   inversion used by auto-reversing migrations.
//! - [`ConventionSet`]: deterministic default names for indexes,
//!   constraints and foreign keys.
//! - [`Migration`] and [`AutoReversingMigration`]: the author-facing
//!   contracts.
//!
//! # Example
//!
//! ```
//! use migrator_core::*;
//!
//! let exprs = ConventionSet::default().apply(vec![
//!     Expression::CreateTable(
//!         CreateTable::new("Users")
//!             .with_column(ColumnDefinition::new("UserId", ColumnType::Int32).primary_key())
//!             .with_column(ColumnDefinition::new("GroupId", ColumnType::Int32).not_null()),
//!     ),
//!     Expression::CreateIndex(IndexDefinition::new("Users").on_column("GroupId")),
//! ]);
//!
//! assert_eq!(exprs[1].target(), "IX_Users_GroupId");
//! assert!(exprs.iter().all(|e| e.validate().is_empty()));
//! assert_eq!(reverse_expressions(&exprs).unwrap().len(), 2);
//! ```

mod conventions;
mod migration;
mod reverse;
mod types;
mod validate;

pub use conventions::{ConventionSet, constraint_name, foreign_key_name, index_name};
pub use migration::{
    AutoReversingMigration, Migration, MigrationContext, expressions_down, expressions_up,
};
pub use reverse::{ReversalError, reverse_expressions};
pub use types::*;
pub use validate::{ValidationError, validate_expression};
