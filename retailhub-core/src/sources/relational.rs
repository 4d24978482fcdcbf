//! Relational table reader backed by the sync `postgres` client.
//!
//! Columns are discovered from `information_schema.columns` in ordinal order
//! and every value is selected as `::text`, so rows arrive exactly as the
//! database renders them.

use super::{SourceAdapter, SourceError, SourceKind};
use crate::record::{RawRecord, RecordSet};
use postgres::{Client, NoTls};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

const COLUMNS_QUERY: &str = "SELECT column_name::text FROM information_schema.columns \
     WHERE table_schema = current_schema() AND table_name = $1 \
     ORDER BY ordinal_position";

const TABLES_QUERY: &str = "SELECT table_name::text FROM information_schema.tables \
     WHERE table_schema = current_schema() ORDER BY table_name";

/// Reads whole tables as text.
pub trait TableReader: Send + Sync {
    fn read_table(&self, table: &str) -> Result<RecordSet, SourceError>;

    fn list_tables(&self) -> Result<Vec<String>, SourceError>;
}

/// PostgreSQL validation for unquoted table names: letters, digits and
/// underscores, starting with a letter or underscore, at most 63 bytes.
pub fn validate_table_name(name: &str) -> Result<(), SourceError> {
    let invalid = |why: String| SourceError::Unavailable(format!("invalid table name '{name}': {why}"));
    if name.is_empty() {
        return Err(invalid("must not be empty".into()));
    }
    if name.len() > 63 {
        return Err(invalid(format!("exceeds 63 bytes (got {})", name.len())));
    }
    let mut chars = name.chars();
    if let Some(first) = chars.next() {
        if !first.is_ascii_alphabetic() && first != '_' {
            return Err(invalid(format!("must start with a letter or underscore, got '{first}'")));
        }
    }
    if let Some(ch) = chars.find(|c| !c.is_ascii_alphanumeric() && *c != '_') {
        return Err(invalid(format!("contains '{ch}'")));
    }
    Ok(())
}

fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// A PostgreSQL database read through one lazily opened connection.
pub struct PostgresSource {
    connection_string: String,
    client: Mutex<Option<Client>>,
}

impl PostgresSource {
    /// `connection_string` is libpq style (`host=… port=… user=… dbname=…`).
    /// Nothing is opened until the first read.
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            client: Mutex::new(None),
        }
    }

    fn connection(&self) -> Result<MutexGuard<'_, Option<Client>>, SourceError> {
        let mut guard = self
            .client
            .lock()
            .map_err(|_| SourceError::Unavailable("source connection lock poisoned".into()))?;
        if guard.is_none() {
            debug!("connecting to source database");
            let client = Client::connect(&self.connection_string, NoTls)
                .map_err(|e| SourceError::Unavailable(format!("cannot connect to source database: {e}")))?;
            *guard = Some(client);
        }
        Ok(guard)
    }
}

impl TableReader for PostgresSource {
    fn read_table(&self, table: &str) -> Result<RecordSet, SourceError> {
        validate_table_name(table)?;
        let mut guard = self.connection()?;
        let client = guard
            .as_mut()
            .ok_or_else(|| SourceError::Unavailable("source database not connected".into()))?;

        let columns: Vec<String> = client
            .query(COLUMNS_QUERY, &[&table])
            .map_err(|e| SourceError::Unavailable(format!("{table}: {e}")))?
            .iter()
            .map(|row| row.try_get::<_, String>(0))
            .collect::<Result<_, _>>()
            .map_err(|e| SourceError::Parse(format!("{table}: {e}")))?;
        if columns.is_empty() {
            return Err(SourceError::Unavailable(format!("table '{table}' does not exist")));
        }

        let select_list = columns
            .iter()
            .map(|c| format!("{}::text", quote(c)))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("SELECT {select_list} FROM {}", quote(table));
        let rows = client
            .query(sql.as_str(), &[])
            .map_err(|e| SourceError::Unavailable(format!("{table}: {e}")))?;

        let mut set = RecordSet::with_columns(columns.clone());
        for row in &rows {
            let mut record = RawRecord::new();
            for (idx, column) in columns.iter().enumerate() {
                let value: Option<String> = row
                    .try_get(idx)
                    .map_err(|e| SourceError::Parse(format!("{table}.{column}: {e}")))?;
                record.insert(column.as_str(), value);
            }
            set.push(record);
        }
        Ok(set)
    }

    fn list_tables(&self) -> Result<Vec<String>, SourceError> {
        let mut guard = self.connection()?;
        let client = guard
            .as_mut()
            .ok_or_else(|| SourceError::Unavailable("source database not connected".into()))?;
        client
            .query(TABLES_QUERY, &[])
            .map_err(|e| SourceError::Unavailable(e.to_string()))?
            .iter()
            .map(|row| row.try_get::<_, String>(0))
            .collect::<Result<_, _>>()
            .map_err(|e| SourceError::Parse(e.to_string()))
    }
}

/// One named table from a shared reader.
pub struct RelationalAdapter {
    reader: Arc<dyn TableReader>,
    table: String,
}

impl RelationalAdapter {
    pub fn new(reader: Arc<dyn TableReader>, table: impl Into<String>) -> Self {
        Self {
            reader,
            table: table.into(),
        }
    }
}

impl SourceAdapter for RelationalAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Relational
    }

    fn describe(&self) -> String {
        format!("table {}", self.table)
    }

    fn extract(&self) -> Result<RecordSet, SourceError> {
        let set = self.reader.read_table(&self.table)?;
        info!(table = %self.table, rows = set.len(), "read relational table");
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    struct FakeReader {
        tables: BTreeMap<String, RecordSet>,
    }

    impl TableReader for FakeReader {
        fn read_table(&self, table: &str) -> Result<RecordSet, SourceError> {
            validate_table_name(table)?;
            self.tables
                .get(table)
                .cloned()
                .ok_or_else(|| SourceError::Unavailable(format!("table '{table}' does not exist")))
        }

        fn list_tables(&self) -> Result<Vec<String>, SourceError> {
            Ok(self.tables.keys().cloned().collect())
        }
    }

    fn reader() -> Arc<dyn TableReader> {
        let users: RecordSet = vec![RawRecord::from_pairs([("first_name", Some("Ada"))])]
            .into_iter()
            .collect();
        Arc::new(FakeReader {
            tables: BTreeMap::from([("legacy_users".to_string(), users)]),
        })
    }

    #[test]
    fn extracts_named_table() {
        let adapter = RelationalAdapter::new(reader(), "legacy_users");
        let set = adapter.extract().unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(adapter.kind(), SourceKind::Relational);
        assert_eq!(adapter.describe(), "table legacy_users");
    }

    #[test]
    fn missing_table_is_unavailable() {
        let adapter = RelationalAdapter::new(reader(), "legacy_store_details");
        assert!(matches!(adapter.extract(), Err(SourceError::Unavailable(_))));
    }

    #[test]
    fn table_names_are_validated() {
        assert!(validate_table_name("orders_table").is_ok());
        assert!(validate_table_name("_staging").is_ok());
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("1orders").is_err());
        assert!(validate_table_name("orders; DROP TABLE x").is_err());
        assert!(validate_table_name(&"a".repeat(64)).is_err());
    }

    #[test]
    fn unreachable_database_is_unavailable() {
        let source = PostgresSource::new("host=127.0.0.1 port=1 user=nobody dbname=none connect_timeout=1");
        let err = source.read_table("legacy_users").unwrap_err();
        assert!(matches!(err, SourceError::Unavailable(_)));
    }
}
