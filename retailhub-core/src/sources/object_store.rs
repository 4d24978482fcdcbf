//! Objects in storage buckets (or on disk), parsed as CSV or JSON.

use super::{Locator, SourceAdapter, SourceError, SourceKind};
use crate::record::{json_to_text, RawRecord, RecordSet};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectFormat {
    Csv,
    Json,
}

impl ObjectFormat {
    /// Guess from a locator's extension.
    pub fn from_extension(locator: &str) -> Option<Self> {
        let lower = locator.to_ascii_lowercase();
        if lower.ends_with(".csv") {
            Some(ObjectFormat::Csv)
        } else if lower.ends_with(".json") {
            Some(ObjectFormat::Json)
        } else {
            None
        }
    }
}

impl FromStr for ObjectFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ObjectFormat::Csv),
            "json" => Ok(ObjectFormat::Json),
            other => Err(format!("unknown object format '{other}' (expected csv or json)")),
        }
    }
}

impl fmt::Display for ObjectFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ObjectFormat::Csv => "csv",
            ObjectFormat::Json => "json",
        })
    }
}

/// CSV with a header row. Empty fields become null; an unnamed leading index
/// column keeps its empty name.
pub fn parse_csv(bytes: &[u8]) -> Result<RecordSet, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);
    let header: Vec<String> = reader
        .headers()
        .map_err(|e| SourceError::Parse(format!("CSV header: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut set = RecordSet::with_columns(header.clone());
    for (line, result) in reader.records().enumerate() {
        let record = result.map_err(|e| SourceError::Parse(format!("CSV record {line}: {e}")))?;
        let mut row = RawRecord::new();
        for (column, value) in header.iter().zip(record.iter()) {
            row.insert(column.as_str(), (!value.is_empty()).then(|| value.to_string()));
        }
        set.push(row);
    }
    Ok(set)
}

/// JSON as either a records array or the column-oriented
/// `{"column": {"0": v, "1": v}}` layout, rows ordered by numeric index.
pub fn parse_json(bytes: &[u8]) -> Result<RecordSet, SourceError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| SourceError::Parse(format!("JSON: {e}")))?;
    match value {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(map) => Ok(RawRecord::from_json_object(map)),
                _ => Err(SourceError::Parse(format!("JSON record {i} is not an object"))),
            })
            .collect(),
        Value::Object(columns) => parse_column_oriented(&columns),
        _ => Err(SourceError::Parse(
            "JSON must be a records array or a column-oriented object".into(),
        )),
    }
}

fn parse_column_oriented(columns: &Map<String, Value>) -> Result<RecordSet, SourceError> {
    let mut indices = Vec::new();
    for (name, cells) in columns {
        let cells = cells
            .as_object()
            .ok_or_else(|| SourceError::Parse(format!("column '{name}' is not an index map")))?;
        for key in cells.keys() {
            let idx: usize = key
                .parse()
                .map_err(|_| SourceError::Parse(format!("column '{name}' has non-numeric index '{key}'")))?;
            indices.push((idx, key.as_str()));
        }
    }
    indices.sort_unstable();
    indices.dedup();

    let mut set = RecordSet::with_columns(columns.keys().cloned().collect());
    for (_, key) in indices {
        let mut row = RawRecord::new();
        for (name, cells) in columns {
            let value = cells.get(key).and_then(json_to_text);
            row.insert(name.as_str(), value);
        }
        set.push(row);
    }
    Ok(set)
}

/// One object in a bucket, on a web server or on disk.
pub struct ObjectStoreAdapter {
    locator: Locator,
    format: ObjectFormat,
}

impl ObjectStoreAdapter {
    pub fn new(locator: &str, format: ObjectFormat) -> Result<Self, SourceError> {
        Ok(Self {
            locator: Locator::parse(locator)?,
            format,
        })
    }
}

impl SourceAdapter for ObjectStoreAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::ObjectStore
    }

    fn describe(&self) -> String {
        format!("{} object {}", self.format, self.locator)
    }

    fn extract(&self) -> Result<RecordSet, SourceError> {
        let bytes = self.locator.fetch()?;
        let set = match self.format {
            ObjectFormat::Csv => parse_csv(&bytes)?,
            ObjectFormat::Json => parse_json(&bytes)?,
        };
        info!(locator = %self.locator, format = %self.format, rows = set.len(), "read object");
        Ok(set)
    }
}
