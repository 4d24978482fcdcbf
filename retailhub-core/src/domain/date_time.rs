use super::NaturalKey;
use crate::table::{column, Cell, ColumnDef, SqlType, TableRow};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Part of the day a sale happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimePeriod {
    Morning,
    Midday,
    Evening,
    LateHours,
}

impl TimePeriod {
    pub const ALL: [TimePeriod; 4] = [
        TimePeriod::Morning,
        TimePeriod::Midday,
        TimePeriod::Evening,
        TimePeriod::LateHours,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TimePeriod::Morning => "Morning",
            TimePeriod::Midday => "Midday",
            TimePeriod::Evening => "Evening",
            TimePeriod::LateHours => "Late_Hours",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL.into_iter().find(|p| p.as_str() == s)
    }
}

/// A cleaned calendar row (`dim_date_times`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateTimeEntry {
    pub timestamp: NaiveTime,
    pub month: u32,
    pub year: i32,
    pub day: u32,
    pub time_period: TimePeriod,
    pub date_uuid: Uuid,
}

impl TableRow for DateTimeEntry {
    const COLUMNS: &'static [ColumnDef] = &[
        column("timestamp", SqlType::Text),
        column("month", SqlType::FittedVarchar),
        column("year", SqlType::FittedVarchar),
        column("day", SqlType::FittedVarchar),
        column("time_period", SqlType::FittedVarchar),
        column("date_uuid", SqlType::Uuid),
    ];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Time(self.timestamp),
            Cell::Int(i64::from(self.month)),
            Cell::Int(i64::from(self.year)),
            Cell::Int(i64::from(self.day)),
            Cell::Text(self.time_period.as_str().to_string()),
            Cell::Uuid(self.date_uuid),
        ]
    }
}

impl NaturalKey for DateTimeEntry {
    const KEY_COLUMN: Option<&'static str> = Some("date_uuid");

    fn natural_key(&self) -> Option<String> {
        Some(self.date_uuid.hyphenated().to_string())
    }
}
