//! Loosely typed record sets produced at the adapter boundary.
//!
//! Every value is kept as the source's text (or `None` for a source-side
//! null). Cleaners convert these into typed rows immediately; nothing past
//! the cleaners sees a `RawRecord`.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One raw row: column name → text value, `None` for null.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawRecord {
    values: BTreeMap<String, Option<String>>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from `(column, value)` pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, Option<&'a str>)>) -> Self {
        let mut record = Self::new();
        for (column, value) in pairs {
            record.insert(column, value.map(str::to_string));
        }
        record
    }

    /// Build a record from a JSON object, stringifying scalars.
    pub fn from_json_object(object: &Map<String, Value>) -> Self {
        let mut record = Self::new();
        for (column, value) in object {
            record.insert(column.as_str(), json_to_text(value));
        }
        record
    }

    pub fn insert(&mut self, column: impl Into<String>, value: Option<String>) {
        self.values.insert(column.into(), value);
    }

    /// The value of `column`, or `None` when it is null or absent.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).and_then(|v| v.as_deref())
    }

    pub fn contains(&self, column: &str) -> bool {
        self.values.contains_key(column)
    }

    pub fn remove(&mut self, column: &str) -> Option<Option<String>> {
        self.values.remove(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Text form of a JSON value. Nulls stay null; nested values keep their JSON text.
pub fn json_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// An ordered sequence of raw rows with the union of their columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordSet {
    columns: Vec<String>,
    rows: Vec<RawRecord>,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty record set with a known column order (e.g. from a CSV header).
    pub fn with_columns(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row, registering any column not seen before.
    pub fn push(&mut self, row: RawRecord) {
        for column in row.columns() {
            if !self.columns.iter().any(|c| c == column) {
                self.columns.push(column.to_string());
            }
        }
        self.rows.push(row);
    }

    /// Concatenate another record set after this one, preserving row order.
    pub fn extend(&mut self, other: RecordSet) {
        for column in other.columns {
            if !self.columns.contains(&column) {
                self.columns.push(column);
            }
        }
        self.rows.extend(other.rows);
    }

    /// Remove columns from every row. Missing columns are ignored.
    pub fn drop_columns(&mut self, columns: &[&str]) {
        self.columns.retain(|c| !columns.contains(&c.as_str()));
        for row in &mut self.rows {
            for column in columns {
                row.remove(column);
            }
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn rows(&self) -> &[RawRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl FromIterator<RawRecord> for RecordSet {
    fn from_iter<I: IntoIterator<Item = RawRecord>>(iter: I) -> Self {
        let mut set = RecordSet::new();
        for row in iter {
            set.push(row);
        }
        set
    }
}
