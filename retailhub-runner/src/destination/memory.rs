//! In-memory destination with the same load and constraint semantics as
//! PostgreSQL, for dry runs and tests.

use super::{Destination, LoadError};
use chrono::{NaiveDate, NaiveTime};
use retailhub_core::schema::ConstraintStep;
use retailhub_core::table::{SqlType, TableData};
use std::collections::{BTreeMap, HashSet};
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
struct StoredColumn {
    name: String,
    /// Rendered declared type; `TEXT` until retyped.
    sql_type: String,
    not_null: bool,
}

#[derive(Debug, Clone, PartialEq)]
struct ForeignKeyRef {
    column: String,
    table: String,
}

#[derive(Debug, Clone, PartialEq)]
struct StoredTable {
    columns: Vec<StoredColumn>,
    rows: Vec<Vec<Option<String>>>,
    unique: Vec<String>,
    primary_key: Option<String>,
    foreign_keys: Vec<ForeignKeyRef>,
}

impl StoredTable {
    fn column_index(&self, table: &str, column: &str) -> Result<usize, LoadError> {
        self.columns
            .iter()
            .position(|c| c.name == column)
            .ok_or_else(|| {
                LoadError::Destination(format!("column \"{column}\" of relation \"{table}\" does not exist"))
            })
    }

    fn values(&self, idx: usize) -> impl Iterator<Item = Option<&str>> {
        self.rows.iter().map(move |r| r.get(idx).and_then(|v| v.as_deref()))
    }
}

/// Tables held in memory.
#[derive(Debug, Default)]
pub struct MemoryDestination {
    tables: BTreeMap<String, StoredTable>,
}

impl MemoryDestination {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current content of a table as staging text.
    pub fn snapshot(&self, table: &str) -> Option<TableData> {
        self.tables.get(table).map(|t| TableData {
            name: table.to_string(),
            columns: t.columns.iter().map(|c| c.name.clone()).collect(),
            rows: t.rows.clone(),
        })
    }

    /// Declared type of a column (`TEXT` until the constraint plan runs).
    pub fn column_type(&self, table: &str, column: &str) -> Option<&str> {
        self.tables
            .get(table)?
            .columns
            .iter()
            .find(|c| c.name == column)
            .map(|c| c.sql_type.as_str())
    }

    pub fn is_not_null(&self, table: &str, column: &str) -> Option<bool> {
        self.tables
            .get(table)?
            .columns
            .iter()
            .find(|c| c.name == column)
            .map(|c| c.not_null)
    }

    pub fn primary_key(&self, table: &str) -> Option<&str> {
        self.tables.get(table)?.primary_key.as_deref()
    }

    /// `(column, referenced table)` pairs declared on `table`.
    pub fn foreign_keys(&self, table: &str) -> Vec<(String, String)> {
        self.tables
            .get(table)
            .map(|t| {
                t.foreign_keys
                    .iter()
                    .map(|fk| (fk.column.clone(), fk.table.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Overwrite one cell, e.g. to plant an orphan in tests.
    pub fn set_cell(&mut self, table: &str, row: usize, column: &str, value: Option<&str>) -> Result<(), LoadError> {
        let stored = self.tables.get_mut(table).ok_or_else(|| LoadError::MissingTable {
            table: table.to_string(),
        })?;
        let idx = stored.column_index(table, column)?;
        let cell = stored
            .rows
            .get_mut(row)
            .and_then(|r| r.get_mut(idx))
            .ok_or_else(|| LoadError::Destination(format!("{table} has no row {row}")))?;
        *cell = value.map(str::to_string);
        Ok(())
    }
}

fn castable(value: &str, sql_type: SqlType, bound: Option<usize>) -> bool {
    match sql_type {
        SqlType::Text => true,
        SqlType::Uuid => uuid::Uuid::parse_str(value.trim()).is_ok(),
        SqlType::Date => NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").is_ok(),
        SqlType::Time => NaiveTime::parse_from_str(value.trim(), "%H:%M:%S").is_ok(),
        SqlType::Float => value.trim().parse::<f64>().is_ok(),
        SqlType::SmallInt => value.trim().parse::<i16>().is_ok(),
        SqlType::Bool => matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "t" | "true" | "y" | "yes" | "on" | "1" | "f" | "false" | "n" | "no" | "off" | "0"
        ),
        SqlType::Varchar(n) => value.chars().count() <= usize::from(n),
        SqlType::FittedVarchar => bound.map_or(true, |n| value.chars().count() <= n),
    }
}

fn table_mut<'a>(
    tables: &'a mut BTreeMap<String, StoredTable>,
    table: &str,
) -> Result<&'a mut StoredTable, LoadError> {
    tables.get_mut(table).ok_or_else(|| LoadError::MissingTable {
        table: table.to_string(),
    })
}

fn violation(table: &str, detail: String) -> LoadError {
    LoadError::ConstraintViolation {
        table: table.to_string(),
        detail,
    }
}

/// Apply one step to `tables`, returning the DDL it corresponds to.
fn apply_step(tables: &mut BTreeMap<String, StoredTable>, step: &ConstraintStep) -> Result<String, LoadError> {
    match step {
        ConstraintStep::SetType {
            table,
            column,
            sql_type,
        } => {
            let stored = table_mut(tables, table)?;
            let idx = stored.column_index(table, column)?;
            let fitted = match sql_type {
                SqlType::FittedVarchar => Some(
                    stored
                        .values(idx)
                        .flatten()
                        .map(|v| v.chars().count())
                        .max()
                        .unwrap_or(1)
                        .max(1),
                ),
                _ => None,
            };
            if let Some(bad) = stored
                .values(idx)
                .flatten()
                .find(|v| !castable(v, *sql_type, fitted))
            {
                return Err(violation(
                    table,
                    format!("invalid input for type {}: \"{bad}\"", sql_type.ddl(fitted)),
                ));
            }
            stored.columns[idx].sql_type = sql_type.ddl(fitted);
            Ok(step.to_sql(fitted))
        }
        ConstraintStep::SetNotNull { table, column } => {
            let stored = table_mut(tables, table)?;
            let idx = stored.column_index(table, column)?;
            if stored.values(idx).any(|v| v.is_none()) {
                return Err(violation(
                    table,
                    format!("column \"{column}\" contains null values"),
                ));
            }
            stored.columns[idx].not_null = true;
            Ok(step.to_sql(None))
        }
        ConstraintStep::AddUnique { table, column } | ConstraintStep::AddPrimaryKey { table, column } => {
            let stored = table_mut(tables, table)?;
            let idx = stored.column_index(table, column)?;
            let mut seen = HashSet::new();
            for value in stored.values(idx) {
                match value {
                    None if matches!(step, ConstraintStep::AddPrimaryKey { .. }) => {
                        return Err(violation(table, format!("column \"{column}\" contains null values")));
                    }
                    None => {}
                    Some(v) if !seen.insert(v) => {
                        return Err(violation(table, format!("Key ({column})=({v}) is duplicated")));
                    }
                    Some(_) => {}
                }
            }
            if matches!(step, ConstraintStep::AddPrimaryKey { .. }) {
                if stored.primary_key.is_some() {
                    return Err(LoadError::Destination(format!(
                        "multiple primary keys for table \"{table}\" are not allowed"
                    )));
                }
                stored.columns[idx].not_null = true;
                stored.primary_key = Some(column.to_string());
            } else {
                stored.unique.push(column.to_string());
            }
            Ok(step.to_sql(None))
        }
        ConstraintStep::AddForeignKey {
            table,
            column,
            references_table,
            references_column,
        } => {
            let target = tables.get(*references_table).ok_or_else(|| LoadError::MissingTable {
                table: references_table.to_string(),
            })?;
            let is_key = target.primary_key.as_deref() == Some(*references_column)
                || target.unique.iter().any(|u| u == references_column);
            if !is_key {
                return Err(LoadError::Destination(format!(
                    "there is no unique constraint matching given keys for referenced table \"{references_table}\""
                )));
            }
            let target_idx = target.column_index(references_table, references_column)?;
            let target_type = target.columns[target_idx].sql_type.clone();
            let keys: HashSet<String> = target.values(target_idx).flatten().map(str::to_string).collect();

            let stored = table_mut(tables, table)?;
            let idx = stored.column_index(table, column)?;
            let own_type = &stored.columns[idx].sql_type;
            if own_type.split('(').next() != target_type.split('(').next() {
                return Err(violation(
                    table,
                    format!("key columns \"{column}\" and \"{references_column}\" are of incompatible types: {own_type} and {target_type}"),
                ));
            }
            if let Some(orphan) = stored.values(idx).flatten().find(|v| !keys.contains(*v)) {
                return Err(violation(
                    table,
                    format!("Key ({column})=({orphan}) is not present in table \"{references_table}\""),
                ));
            }
            stored.foreign_keys.push(ForeignKeyRef {
                column: column.to_string(),
                table: references_table.to_string(),
            });
            Ok(step.to_sql(None))
        }
    }
}

impl Destination for MemoryDestination {
    fn name(&self) -> &str {
        "memory"
    }

    fn replace_table(&mut self, table: &TableData) -> Result<(), LoadError> {
        if let Some(bad) = table.rows.iter().find(|r| r.len() != table.columns.len()) {
            return Err(LoadError::Destination(format!(
                "{}: row has {} values for {} columns",
                table.name,
                bad.len(),
                table.columns.len()
            )));
        }
        // DROP … CASCADE removes foreign keys elsewhere that point at this table.
        for other in self.tables.values_mut() {
            other.foreign_keys.retain(|fk| fk.table != table.name);
        }
        self.tables.insert(
            table.name.clone(),
            StoredTable {
                columns: table
                    .columns
                    .iter()
                    .map(|name| StoredColumn {
                        name: name.clone(),
                        sql_type: "TEXT".into(),
                        not_null: false,
                    })
                    .collect(),
                rows: table.rows.clone(),
                unique: Vec::new(),
                primary_key: None,
                foreign_keys: Vec::new(),
            },
        );
        info!(table = %table.name, rows = table.len(), "table replaced (memory)");
        Ok(())
    }

    fn apply_constraints(&mut self, plan: &[ConstraintStep]) -> Result<Vec<String>, LoadError> {
        let mut staged = self.tables.clone();
        let mut executed = Vec::with_capacity(plan.len());
        for step in plan {
            executed.push(apply_step(&mut staged, step)?);
        }
        self.tables = staged;
        info!(steps = executed.len(), "constraint plan applied (memory)");
        Ok(executed)
    }

    fn list_tables(&mut self) -> Result<Vec<String>, LoadError> {
        Ok(self.tables.keys().cloned().collect())
    }
}
