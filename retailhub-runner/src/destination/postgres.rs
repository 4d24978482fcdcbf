//! PostgreSQL destination using the sync `postgres` client.
//!
//! Staging tables are written with `COPY … FROM STDIN` in text format.

use super::{Destination, LoadError};
use postgres::{Client, NoTls};
use retailhub_core::schema::{quote_ident, ConstraintStep};
use retailhub_core::table::{SqlType, TableData};
use std::io::Write;
use tracing::{debug, info};

/// SQLSTATE classes that mean the data disagrees with the schema:
/// 22 (data exception), 23 (integrity violation) and 42804 (datatype mismatch).
fn is_data_violation(code: &str) -> bool {
    code.starts_with("22") || code.starts_with("23") || code == "42804"
}

fn format_pg_error(error: &postgres::Error) -> String {
    match error.as_db_error() {
        Some(db) => match db.detail() {
            Some(detail) => format!("{} ({detail}) [sqlstate {}]", db.message(), db.code().code()),
            None => format!("{} [sqlstate {}]", db.message(), db.code().code()),
        },
        None => error.to_string(),
    }
}

fn classify(table: &str, error: postgres::Error) -> LoadError {
    let detail = format_pg_error(&error);
    match error.code() {
        Some(state) if is_data_violation(state.code()) => LoadError::ConstraintViolation {
            table: table.to_string(),
            detail,
        },
        _ => LoadError::Destination(detail),
    }
}

/// Append one COPY text-format field: `\N` for null; backslash, tab, newline
/// and carriage return escaped; NUL bytes dropped.
fn push_copy_field(buf: &mut String, value: Option<&str>) {
    let Some(value) = value else {
        buf.push_str("\\N");
        return;
    };
    for ch in value.chars() {
        match ch {
            '\\' => buf.push_str("\\\\"),
            '\t' => buf.push_str("\\t"),
            '\n' => buf.push_str("\\n"),
            '\r' => buf.push_str("\\r"),
            '\0' => {}
            other => buf.push(other),
        }
    }
}

/// The whole table as a COPY text-format payload.
pub fn copy_text(table: &TableData) -> String {
    let mut buf = String::new();
    for row in &table.rows {
        for (idx, cell) in row.iter().enumerate() {
            if idx > 0 {
                buf.push('\t');
            }
            push_copy_field(&mut buf, cell.as_deref());
        }
        buf.push('\n');
    }
    buf
}

pub struct PostgresDestination {
    client: Client,
    label: String,
}

impl PostgresDestination {
    /// Connect with a libpq-style connection string.
    pub fn connect(connection_string: &str) -> Result<Self, LoadError> {
        let client = Client::connect(connection_string, NoTls)
            .map_err(|e| LoadError::Destination(format!("cannot connect: {}", format_pg_error(&e))))?;
        Ok(Self {
            client,
            label: "postgres".into(),
        })
    }
}

impl Destination for PostgresDestination {
    fn name(&self) -> &str {
        &self.label
    }

    fn replace_table(&mut self, table: &TableData) -> Result<(), LoadError> {
        let name = quote_ident(&table.name);
        let columns: Vec<String> = table.columns.iter().map(|c| quote_ident(c)).collect();
        let ddl = format!(
            "DROP TABLE IF EXISTS {name} CASCADE; CREATE TABLE {name} ({})",
            columns
                .iter()
                .map(|c| format!("{c} TEXT"))
                .collect::<Vec<_>>()
                .join(", ")
        );

        let mut tx = self
            .client
            .transaction()
            .map_err(|e| classify(&table.name, e))?;
        tx.batch_execute(&ddl).map_err(|e| classify(&table.name, e))?;

        let copy_stmt = format!("COPY {name} ({}) FROM STDIN", columns.join(", "));
        let mut writer = tx.copy_in(copy_stmt.as_str()).map_err(|e| classify(&table.name, e))?;
        writer
            .write_all(copy_text(table).as_bytes())
            .map_err(|e| LoadError::Destination(format!("COPY into {}: {e}", table.name)))?;
        let copied = writer.finish().map_err(|e| classify(&table.name, e))?;
        tx.commit().map_err(|e| classify(&table.name, e))?;

        info!(table = %table.name, rows = copied, "table replaced");
        Ok(())
    }

    fn apply_constraints(&mut self, plan: &[ConstraintStep]) -> Result<Vec<String>, LoadError> {
        let mut tx = self
            .client
            .transaction()
            .map_err(|e| LoadError::Destination(format_pg_error(&e)))?;
        let mut executed = Vec::with_capacity(plan.len());

        for step in plan {
            let fitted = match step {
                ConstraintStep::SetType {
                    table,
                    column,
                    sql_type: SqlType::FittedVarchar,
                } => {
                    let sql = format!(
                        "SELECT COALESCE(MAX(LENGTH({})), 1)::int FROM {}",
                        quote_ident(column),
                        quote_ident(table)
                    );
                    let row = tx.query_one(sql.as_str(), &[]).map_err(|e| classify(table, e))?;
                    let len: i32 = row.try_get(0).map_err(|e| classify(table, e))?;
                    Some(usize::try_from(len).unwrap_or(1))
                }
                _ => None,
            };
            let sql = step.to_sql(fitted);
            debug!(%sql, "applying constraint step");
            tx.batch_execute(&sql).map_err(|e| classify(step.table(), e))?;
            executed.push(sql);
        }

        tx.commit()
            .map_err(|e| LoadError::Destination(format_pg_error(&e)))?;
        info!(steps = executed.len(), "constraint plan applied");
        Ok(executed)
    }

    fn list_tables(&mut self) -> Result<Vec<String>, LoadError> {
        self.client
            .query(
                "SELECT table_name::text FROM information_schema.tables \
                 WHERE table_schema = current_schema() ORDER BY table_name",
                &[],
            )
            .map_err(|e| LoadError::Destination(format_pg_error(&e)))?
            .iter()
            .map(|row| row.try_get::<_, String>(0))
            .collect::<Result<_, _>>()
            .map_err(|e| LoadError::Destination(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_text_escapes_and_nulls() {
        let table = TableData {
            name: "dim_store_details".into(),
            columns: vec!["address".into(), "latitude".into()],
            rows: vec![
                vec![Some("Flat 72W\nSally isle".into()), None],
                vec![Some("tab\there \\ slash".into()), Some("51.5".into())],
            ],
        };
        assert_eq!(
            copy_text(&table),
            "Flat 72W\\nSally isle\t\\N\ntab\\there \\\\ slash\t51.5\n"
        );
    }

    #[test]
    fn empty_string_is_not_null() {
        let mut buf = String::new();
        push_copy_field(&mut buf, Some(""));
        assert_eq!(buf, "");
        push_copy_field(&mut buf, None);
        assert_eq!(buf, "\\N");
    }

    #[test]
    fn violation_classes() {
        assert!(is_data_violation("23503"));
        assert!(is_data_violation("23505"));
        assert!(is_data_violation("22P02"));
        assert!(is_data_violation("42804"));
        assert!(!is_data_violation("42P01"));
        assert!(!is_data_violation("08006"));
    }
}
