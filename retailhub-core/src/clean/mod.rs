//! Entity cleaners: raw record sets in, typed rows plus rejections out.
//!
//! Each cleaner is a plain function over a `RecordSet`. Individual bad rows
//! never raise; they are dropped and recorded as `RowRejected` with a reason.
//! Only an empty input or a missing expected column is fatal.

pub mod cards;
pub mod date_times;
pub mod orders;
pub mod parse;
pub mod products;
pub mod stores;
pub mod users;

use crate::domain::NaturalKey;
use crate::entity::EntityKind;
use crate::record::{RawRecord, RecordSet};
use crate::table::{TableData, TableRow};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;
use tracing::{debug, info, warn};

pub use cards::clean_cards;
pub use date_times::clean_date_times;
pub use orders::clean_orders;
pub use products::{clean_products, convert_product_weights, parse_weight_kg};
pub use stores::clean_stores;
pub use users::clean_users;

/// Fatal cleaner errors. Row-level problems are `RowRejected` instead.
#[derive(Debug, Error)]
pub enum CleanError {
    #[error("{entity}: input record set is empty")]
    EmptyInput { entity: EntityKind },

    #[error("{entity}: expected column '{column}' is missing")]
    MissingColumn { entity: EntityKind, column: String },
}

/// Why a row was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    #[error("every non-key value is a placeholder or noise")]
    Garbage,

    #[error("malformed key in '{column}'")]
    InvalidKey { column: String },

    #[error("duplicate key in '{column}'")]
    DuplicateKey { column: String },

    #[error("unparseable date in '{column}'")]
    InvalidDate { column: String },

    #[error("non-numeric value in '{column}'")]
    InvalidNumber { column: String },

    #[error("value not allowed in '{column}'")]
    InvalidValue { column: String },

    #[error("missing value in '{column}'")]
    MissingValue { column: String },
}

impl RejectReason {
    pub fn label(&self) -> &'static str {
        match self {
            RejectReason::Garbage => "garbage",
            RejectReason::InvalidKey { .. } => "invalid_key",
            RejectReason::DuplicateKey { .. } => "duplicate_key",
            RejectReason::InvalidDate { .. } => "invalid_date",
            RejectReason::InvalidNumber { .. } => "invalid_number",
            RejectReason::InvalidValue { .. } => "invalid_value",
            RejectReason::MissingValue { .. } => "missing_value",
        }
    }

    pub fn column(&self) -> Option<&str> {
        match self {
            RejectReason::Garbage => None,
            RejectReason::InvalidKey { column }
            | RejectReason::DuplicateKey { column }
            | RejectReason::InvalidDate { column }
            | RejectReason::InvalidNumber { column }
            | RejectReason::InvalidValue { column }
            | RejectReason::MissingValue { column } => Some(column),
        }
    }

    pub(crate) fn invalid_key(column: &str) -> Self {
        RejectReason::InvalidKey {
            column: column.to_string(),
        }
    }

    pub(crate) fn invalid_date(column: &str) -> Self {
        RejectReason::InvalidDate {
            column: column.to_string(),
        }
    }

    pub(crate) fn invalid_number(column: &str) -> Self {
        RejectReason::InvalidNumber {
            column: column.to_string(),
        }
    }

    pub(crate) fn invalid_value(column: &str) -> Self {
        RejectReason::InvalidValue {
            column: column.to_string(),
        }
    }

    pub(crate) fn missing_value(column: &str) -> Self {
        RejectReason::MissingValue {
            column: column.to_string(),
        }
    }
}

/// A dropped row: its zero-based position in the raw input and the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("row {row} rejected: {reason}")]
pub struct RowRejected {
    pub row: usize,
    pub reason: RejectReason,
}

/// Output of one cleaner.
#[derive(Debug, Clone)]
pub struct Cleaned<T> {
    pub rows: Vec<T>,
    pub rejected: Vec<RowRejected>,
    pub input_rows: usize,
}

impl<T> Cleaned<T> {
    pub fn discarded(&self) -> usize {
        self.rejected.len()
    }

    pub fn rejection_counts(&self) -> BTreeMap<&'static str, usize> {
        count_reasons(&self.rejected)
    }
}

fn count_reasons(rejected: &[RowRejected]) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for r in rejected {
        *counts.entry(r.reason.label()).or_insert(0) += 1;
    }
    counts
}

/// Static description of one cleaner's input.
pub(crate) struct CleanerSpec {
    pub entity: EntityKind,
    /// Columns whose absence is fatal.
    pub required: &'static [&'static str],
    /// Bookkeeping columns that never reach the destination.
    pub ignored: &'static [&'static str],
}

/// Shared driver: input checks, garbage detection, conversion, key dedupe.
pub(crate) fn run_cleaner<T, F>(
    spec: &CleanerSpec,
    raw: &RecordSet,
    convert: F,
) -> Result<Cleaned<T>, CleanError>
where
    T: NaturalKey,
    F: Fn(&RawRecord) -> Result<T, RejectReason>,
{
    if raw.is_empty() {
        return Err(CleanError::EmptyInput {
            entity: spec.entity,
        });
    }
    if let Some(column) = spec.required.iter().find(|c| !raw.has_column(c)) {
        return Err(CleanError::MissingColumn {
            entity: spec.entity,
            column: column.to_string(),
        });
    }

    let mut skip: Vec<&str> = spec.ignored.to_vec();
    if let Some(key) = T::KEY_COLUMN {
        skip.push(key);
    }

    let mut rows = Vec::with_capacity(raw.len());
    let mut rejected = Vec::new();
    let mut seen = HashSet::new();

    for (index, record) in raw.rows().iter().enumerate() {
        let outcome = if parse::is_garbage_row(record, &skip) {
            Err(RejectReason::Garbage)
        } else {
            convert(record)
        };

        match outcome {
            Ok(row) => {
                let duplicate_of = match (T::KEY_COLUMN, row.natural_key()) {
                    (Some(column), Some(key)) => (!seen.insert(key)).then_some(column),
                    _ => None,
                };
                match duplicate_of {
                    Some(column) => rejected.push(RowRejected {
                        row: index,
                        reason: RejectReason::DuplicateKey {
                            column: column.to_string(),
                        },
                    }),
                    None => rows.push(row),
                }
            }
            Err(reason) => rejected.push(RowRejected { row: index, reason }),
        }
    }

    for r in &rejected {
        debug!(entity = %spec.entity, row = r.row, reason = %r.reason, "row rejected");
    }
    if !rejected.is_empty() {
        warn!(
            entity = %spec.entity,
            rejected = rejected.len(),
            "rows dropped during cleaning"
        );
    }
    info!(
        entity = %spec.entity,
        input = raw.len(),
        kept = rows.len(),
        "cleaned"
    );

    Ok(Cleaned {
        rows,
        rejected,
        input_rows: raw.len(),
    })
}

/// A cleaned entity in staging-table form, ready for the loader.
#[derive(Debug, Clone)]
pub struct CleanedTable {
    pub entity: EntityKind,
    pub table: TableData,
    pub input_rows: usize,
    pub rejected: Vec<RowRejected>,
}

impl CleanedTable {
    fn from_cleaned<T: TableRow>(entity: EntityKind, cleaned: Cleaned<T>) -> Self {
        Self {
            entity,
            table: TableData::from_rows(entity.table_name(), &cleaned.rows),
            input_rows: cleaned.input_rows,
            rejected: cleaned.rejected,
        }
    }

    pub fn discarded(&self) -> usize {
        self.rejected.len()
    }

    pub fn rejection_counts(&self) -> BTreeMap<&'static str, usize> {
        count_reasons(&self.rejected)
    }
}

/// Run the cleaner for `kind`.
pub fn clean_entity(kind: EntityKind, raw: &RecordSet) -> Result<CleanedTable, CleanError> {
    Ok(match kind {
        EntityKind::Users => CleanedTable::from_cleaned(kind, clean_users(raw)?),
        EntityKind::Cards => CleanedTable::from_cleaned(kind, clean_cards(raw)?),
        EntityKind::Stores => CleanedTable::from_cleaned(kind, clean_stores(raw)?),
        EntityKind::Products => CleanedTable::from_cleaned(kind, clean_products(raw)?),
        EntityKind::DateTimes => CleanedTable::from_cleaned(kind, clean_date_times(raw)?),
        EntityKind::Orders => CleanedTable::from_cleaned(kind, clean_orders(raw)?),
    })
}
