//! Destination stores: where cleaned tables land and constraints are declared.
//!
//! A destination loads each table as all-TEXT staging columns, replacing any
//! previous content, and later applies the whole constraint plan in one
//! transaction. Two implementations share these semantics: PostgreSQL and an
//! in-memory store used for dry runs and tests.

pub mod memory;
pub mod postgres;

use retailhub_core::schema::ConstraintStep;
use retailhub_core::table::TableData;
use thiserror::Error;

pub use self::memory::MemoryDestination;
pub use self::postgres::PostgresDestination;

#[derive(Debug, Error)]
pub enum LoadError {
    /// Data in the destination contradicts a declared type or constraint.
    #[error("constraint violation on {table}: {detail}")]
    ConstraintViolation { table: String, detail: String },

    #[error("table '{table}' has not been loaded")]
    MissingTable { table: String },

    #[error("destination error: {0}")]
    Destination(String),
}

/// A single-writer destination store.
pub trait Destination: Send {
    fn name(&self) -> &str;

    /// Drop `table` if present (with anything depending on it), recreate it
    /// with TEXT columns and copy every row in. Atomic per table.
    fn replace_table(&mut self, table: &TableData) -> Result<(), LoadError>;

    /// Run the plan in order inside one transaction and return the DDL that
    /// was executed. On error nothing from the plan remains applied.
    fn apply_constraints(&mut self, plan: &[ConstraintStep]) -> Result<Vec<String>, LoadError>;

    fn list_tables(&mut self) -> Result<Vec<String>, LoadError>;
}
