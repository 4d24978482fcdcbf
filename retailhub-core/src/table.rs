//! Table model shared by the cleaners and the destination stores.
//!
//! Cleaned entities describe their columns once (`TableRow::COLUMNS`) and
//! render themselves as cells. A `TableData` is the text staging form the
//! loader writes; declared SQL types are applied later by the constraint plan.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::io;
use uuid::Uuid;

/// A single typed value of a cleaned row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Cell {
    Null,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    Time(NaiveTime),
    Uuid(Uuid),
}

impl Cell {
    /// Staging text for this cell. Dates are ISO, UUIDs hyphenated lower-case.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Cell::Null => None,
            Cell::Text(s) => Some(s.clone()),
            Cell::Int(i) => Some(i.to_string()),
            Cell::Float(f) => Some(f.to_string()),
            Cell::Bool(b) => Some(b.to_string()),
            Cell::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            Cell::Time(t) => Some(t.format("%H:%M:%S").to_string()),
            Cell::Uuid(u) => Some(u.hyphenated().to_string()),
        }
    }

    pub fn opt_text(value: &Option<String>) -> Cell {
        match value {
            Some(s) => Cell::Text(s.clone()),
            None => Cell::Null,
        }
    }

    pub fn opt_float(value: Option<f64>) -> Cell {
        value.map_or(Cell::Null, Cell::Float)
    }
}

/// Declared destination type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SqlType {
    /// Left as loaded.
    Text,
    Uuid,
    Date,
    Time,
    Float,
    SmallInt,
    Bool,
    Varchar(u16),
    /// VARCHAR bounded by the longest value observed in the column.
    FittedVarchar,
}

impl SqlType {
    /// DDL spelling. `fitted` supplies the bound for `FittedVarchar`;
    /// without it the bound renders as `?`.
    pub fn ddl(self, fitted: Option<usize>) -> String {
        match self {
            SqlType::Text => "TEXT".into(),
            SqlType::Uuid => "UUID".into(),
            SqlType::Date => "DATE".into(),
            SqlType::Time => "TIME".into(),
            SqlType::Float => "FLOAT".into(),
            SqlType::SmallInt => "SMALLINT".into(),
            SqlType::Bool => "BOOL".into(),
            SqlType::Varchar(n) => format!("VARCHAR({n})"),
            SqlType::FittedVarchar => match fitted {
                Some(n) => format!("VARCHAR({})", n.max(1)),
                None => "VARCHAR(?)".into(),
            },
        }
    }

    /// Whether the constraint plan needs to retype this column.
    pub fn needs_cast(self) -> bool {
        !matches!(self, SqlType::Text)
    }
}

/// One column of a destination table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub sql_type: SqlType,
}

pub const fn column(name: &'static str, sql_type: SqlType) -> ColumnDef {
    ColumnDef { name, sql_type }
}

/// A cleaned, strongly typed row that knows its destination columns.
pub trait TableRow {
    const COLUMNS: &'static [ColumnDef];

    /// Cells in `COLUMNS` order.
    fn cells(&self) -> Vec<Cell>;
}

/// Text staging form of a cleaned table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableData {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl TableData {
    pub fn from_rows<T: TableRow>(name: &str, rows: &[T]) -> Self {
        Self {
            name: name.to_string(),
            columns: T::COLUMNS.iter().map(|c| c.name.to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| row.cells().iter().map(Cell::to_text).collect())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Values of one column, in row order.
    pub fn column_values(&self, column: &str) -> Option<Vec<Option<&str>>> {
        let idx = self.column_index(column)?;
        Some(self.rows.iter().map(|r| r[idx].as_deref()).collect())
    }

    /// Longest value (in characters) in `column`; `None` if the column is unknown.
    pub fn max_len(&self, column: &str) -> Option<usize> {
        let values = self.column_values(column)?;
        Some(
            values
                .into_iter()
                .flatten()
                .map(|v| v.chars().count())
                .max()
                .unwrap_or(0),
        )
    }

    /// BLAKE3 over name, header and every cell. Identical tables hash identically.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.name.as_bytes());
        for column in &self.columns {
            hasher.update(b"\x1f");
            hasher.update(column.as_bytes());
        }
        for row in &self.rows {
            hasher.update(b"\x1e");
            for cell in row {
                match cell {
                    Some(v) => {
                        hasher.update(b"\x1f1");
                        hasher.update(v.as_bytes());
                    }
                    None => {
                        hasher.update(b"\x1f0");
                    }
                }
            }
        }
        hasher.finalize().to_hex().to_string()
    }

    /// Write the table as CSV with a header row. Nulls become empty fields.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut out = csv::Writer::from_writer(writer);
        out.write_record(&self.columns)?;
        for row in &self.rows {
            out.write_record(row.iter().map(|v| v.as_deref().unwrap_or("")))?;
        }
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pair {
        code: String,
        weight: Option<f64>,
    }

    impl TableRow for Pair {
        const COLUMNS: &'static [ColumnDef] = &[
            column("code", SqlType::FittedVarchar),
            column("weight", SqlType::Float),
        ];

        fn cells(&self) -> Vec<Cell> {
            vec![Cell::Text(self.code.clone()), Cell::opt_float(self.weight)]
        }
    }

    fn sample() -> TableData {
        TableData::from_rows(
            "pairs",
            &[
                Pair {
                    code: "A1".into(),
                    weight: Some(1.2),
                },
                Pair {
                    code: "B-202".into(),
                    weight: None,
                },
            ],
        )
    }

    #[test]
    fn from_rows_renders_staging_text() {
        let table = sample();
        assert_eq!(table.columns, vec!["code", "weight"]);
        assert_eq!(table.rows[0], vec![Some("A1".into()), Some("1.2".into())]);
        assert_eq!(table.rows[1], vec![Some("B-202".into()), None]);
    }

    #[test]
    fn max_len_counts_characters() {
        let table = sample();
        assert_eq!(table.max_len("code"), Some(5));
        assert_eq!(table.max_len("weight"), Some(3));
        assert_eq!(table.max_len("missing"), None);
    }

    #[test]
    fn fingerprint_is_stable_and_content_sensitive() {
        let a = sample();
        let b = sample();
        assert_eq!(a.fingerprint(), b.fingerprint());

        let mut c = sample();
        c.rows[1][1] = Some(String::new());
        assert_ne!(a.fingerprint(), c.fingerprint(), "null and empty must differ");
    }

    #[test]
    fn cell_text_forms() {
        let date = NaiveDate::from_ymd_opt(2016, 5, 3).unwrap();
        assert_eq!(Cell::Date(date).to_text().as_deref(), Some("2016-05-03"));
        assert_eq!(Cell::Float(50.0).to_text().as_deref(), Some("50"));
        assert_eq!(Cell::Bool(false).to_text().as_deref(), Some("false"));
        let id = Uuid::parse_str("93caf182-e4e9-4c6e-bebb-60a1a9dcf9b8").unwrap();
        assert_eq!(
            Cell::Uuid(id).to_text().as_deref(),
            Some("93caf182-e4e9-4c6e-bebb-60a1a9dcf9b8")
        );
    }

    #[test]
    fn sql_type_ddl() {
        assert_eq!(SqlType::FittedVarchar.ddl(Some(12)), "VARCHAR(12)");
        assert_eq!(SqlType::FittedVarchar.ddl(Some(0)), "VARCHAR(1)");
        assert_eq!(SqlType::FittedVarchar.ddl(None), "VARCHAR(?)");
        assert_eq!(SqlType::Varchar(255).ddl(None), "VARCHAR(255)");
        assert!(!SqlType::Text.needs_cast());
    }

    #[test]
    fn write_csv_emits_header_and_empty_nulls() {
        let mut buf = Vec::new();
        sample().write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "code,weight\nA1,1.2\nB-202,\n");
    }
}
