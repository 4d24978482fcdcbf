//! Schema loader: lands cleaned tables in a destination and applies the
//! constraint plan once every table is present.

use crate::destination::{Destination, LoadError};
use retailhub_core::clean::CleanedTable;
use retailhub_core::schema::{constraint_plan, plan_summary};
use retailhub_core::EntityKind;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// What one load wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub entity: EntityKind,
    pub table: String,
    pub rows: usize,
    /// BLAKE3 of the staged content; equal across reruns with the same input.
    pub fingerprint: String,
}

pub struct SchemaLoader<D: Destination> {
    destination: D,
    loaded: BTreeSet<EntityKind>,
}

impl<D: Destination> SchemaLoader<D> {
    pub fn new(destination: D) -> Self {
        Self {
            destination,
            loaded: BTreeSet::new(),
        }
    }

    /// Replace the entity's destination table with the cleaned rows.
    pub fn load(&mut self, cleaned: &CleanedTable) -> Result<LoadSummary, LoadError> {
        let table = &cleaned.table;
        self.destination.replace_table(table)?;
        self.loaded.insert(cleaned.entity);
        let summary = LoadSummary {
            entity: cleaned.entity,
            table: table.name.clone(),
            rows: table.len(),
            fingerprint: table.fingerprint(),
        };
        info!(
            entity = %summary.entity,
            table = %summary.table,
            rows = summary.rows,
            destination = self.destination.name(),
            "table loaded"
        );
        Ok(summary)
    }

    pub fn is_loaded(&self, entity: EntityKind) -> bool {
        self.loaded.contains(&entity)
    }

    /// Entities not yet loaded during this loader's lifetime.
    pub fn missing(&self) -> Vec<EntityKind> {
        EntityKind::ALL
            .into_iter()
            .filter(|e| !self.loaded.contains(e))
            .collect()
    }

    /// Apply the full constraint plan. Every table must have been loaded first.
    pub fn apply_constraints(&mut self) -> Result<Vec<String>, LoadError> {
        if let Some(missing) = self.missing().first() {
            return Err(LoadError::MissingTable {
                table: missing.table_name().to_string(),
            });
        }
        let plan = constraint_plan();
        for (table, steps) in plan_summary(&plan) {
            debug!(table, steps, "constraint steps planned");
        }
        let executed = self.destination.apply_constraints(&plan)?;
        info!(statements = executed.len(), "constraints applied");
        Ok(executed)
    }

    pub fn destination(&self) -> &D {
        &self.destination
    }

    pub fn into_inner(self) -> D {
        self.destination
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destination::MemoryDestination;
    use retailhub_core::clean::clean_entity;
    use retailhub_core::{RawRecord, RecordSet};

    fn cleaned_stores() -> CleanedTable {
        let rows: RecordSet = vec![RawRecord::from_pairs([
            ("address", Some("Flat 72W\nSally isle\nEast Deantown\nE7B 8EB")),
            ("longitude", Some("51.62907")),
            ("lat", None),
            ("locality", Some("High Wycombe")),
            ("store_code", Some("HI-9B97EE4E")),
            ("staff_numbers", Some("34")),
            ("opening_date", Some("1996-10-25")),
            ("store_type", Some("Local")),
            ("latitude", Some("-0.74934")),
            ("country_code", Some("GB")),
            ("continent", Some("Europe")),
        ])]
        .into_iter()
        .collect();
        clean_entity(EntityKind::Stores, &rows).unwrap()
    }

    #[test]
    fn load_reports_rows_and_fingerprint() {
        let mut loader = SchemaLoader::new(MemoryDestination::new());
        let cleaned = cleaned_stores();
        let summary = loader.load(&cleaned).unwrap();
        assert_eq!(summary.table, "dim_store_details");
        assert_eq!(summary.rows, 1);
        assert_eq!(summary.fingerprint, cleaned.table.fingerprint());
        assert!(loader.is_loaded(EntityKind::Stores));

        let again = loader.load(&cleaned).unwrap();
        assert_eq!(again, summary);
    }

    #[test]
    fn constraints_require_every_table() {
        let mut loader = SchemaLoader::new(MemoryDestination::new());
        loader.load(&cleaned_stores()).unwrap();
        match loader.apply_constraints() {
            Err(LoadError::MissingTable { table }) => assert_eq!(table, "dim_users"),
            other => panic!("expected MissingTable, got {other:?}"),
        }
        assert_eq!(loader.missing().len(), 5);
    }
}
