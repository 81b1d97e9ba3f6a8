//! Author-facing migration contracts.
//!
//! A migration emits expressions into a [`MigrationContext`]; it never talks
//! to the database directly. Migrations that only describe their forward
//! direction implement [`AutoReversingMigration`] and get a `down` computed
//! from the reversed `up`.
//!
//! # Examples
//!
//! ```
//! use migrator_core::*;
//!
//! struct AddUsers;
//!
//! impl AutoReversingMigration for AddUsers {
//!     fn up(&self, ctx: &mut MigrationContext) {
//!         ctx.add(Expression::CreateTable(
//!             CreateTable::new("Users")
//!                 .with_column(ColumnDefinition::new("Id", ColumnType::Int32).primary_key()),
//!         ));
//!         ctx.add(Expression::CreateIndex(
//!             IndexDefinition::new("Users").on_column("Id").unique(),
//!         ));
//!     }
//! }
//!
//! let down = expressions_down(&AddUsers, "sqlite").unwrap();
//! assert_eq!(down[0].kind(), "DeleteIndex");
//! assert_eq!(down[1], Expression::delete_table("Users"));
//! ```

use crate::{Expression, ReversalError, reverse_expressions};

/// Collects the expressions a migration emits.
#[derive(Debug, Clone, Default)]
pub struct MigrationContext {
    database_type: String,
    expressions: Vec<Expression>,
}

impl MigrationContext {
    /// Creates an empty context for the given backend name.
    pub fn new(database_type: impl Into<String>) -> Self {
        Self {
            database_type: database_type.into(),
            expressions: Vec::new(),
        }
    }

    /// Backend name reported by the processor (e.g. `"sqlite"`).
    pub fn database_type(&self) -> &str {
        &self.database_type
    }

    /// Case-insensitive backend check, for migrations that branch per backend.
    pub fn is_database(&self, name: &str) -> bool {
        self.database_type.eq_ignore_ascii_case(name)
    }

    /// Appends an expression.
    pub fn add(&mut self, expr: Expression) {
        self.expressions.push(expr);
    }

    /// Appends several expressions.
    pub fn extend(&mut self, exprs: impl IntoIterator<Item = Expression>) {
        self.expressions.extend(exprs);
    }

    /// Expressions collected so far.
    pub fn expressions(&self) -> &[Expression] {
        &self.expressions
    }

    /// Consumes the context, returning its expressions.
    pub fn into_expressions(self) -> Vec<Expression> {
        self.expressions
    }
}

/// A migration with explicit forward and reverse directions.
pub trait Migration: Send + Sync {
    /// Emits the forward expressions.
    fn up(&self, ctx: &mut MigrationContext);

    /// Emits the reverse expressions.
    fn down(&self, ctx: &mut MigrationContext) -> Result<(), ReversalError>;

    /// Display name used in logs and status listings.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// A migration that only declares `up`.
///
/// Every implementor is a [`Migration`]: its `down` replays `up`, reverses
/// each expression and flips the order.
pub trait AutoReversingMigration: Send + Sync {
    /// Emits the forward expressions.
    fn up(&self, ctx: &mut MigrationContext);

    /// Display name used in logs and status listings.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<T: AutoReversingMigration> Migration for T {
    fn up(&self, ctx: &mut MigrationContext) {
        AutoReversingMigration::up(self, ctx);
    }

    fn down(&self, ctx: &mut MigrationContext) -> Result<(), ReversalError> {
        let mut forward = MigrationContext::new(ctx.database_type());
        AutoReversingMigration::up(self, &mut forward);
        ctx.extend(reverse_expressions(forward.expressions())?);
        Ok(())
    }

    fn name(&self) -> &str {
        AutoReversingMigration::name(self)
    }
}

/// Collects a migration's forward expressions.
pub fn expressions_up(migration: &dyn Migration, database_type: &str) -> Vec<Expression> {
    let mut ctx = MigrationContext::new(database_type);
    migration.up(&mut ctx);
    ctx.into_expressions()
}

/// Collects a migration's reverse expressions.
pub fn expressions_down(
    migration: &dyn Migration,
    database_type: &str,
) -> Result<Vec<Expression>, ReversalError> {
    let mut ctx = MigrationContext::new(database_type);
    migration.down(&mut ctx)?;
    Ok(ctx.into_expressions())
}
