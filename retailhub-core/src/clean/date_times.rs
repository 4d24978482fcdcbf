//! Sale timestamps JSON → `dim_date_times`.

use super::parse::parse_uuid;
use super::{run_cleaner, Cleaned, CleanError, CleanerSpec, RejectReason};
use crate::domain::{DateTimeEntry, TimePeriod};
use crate::entity::EntityKind;
use crate::record::{RawRecord, RecordSet};
use chrono::NaiveTime;

const SPEC: CleanerSpec = CleanerSpec {
    entity: EntityKind::DateTimes,
    required: &["timestamp", "month", "year", "day", "time_period", "date_uuid"],
    ignored: &["index"],
};

pub fn clean_date_times(raw: &RecordSet) -> Result<Cleaned<DateTimeEntry>, CleanError> {
    run_cleaner(&SPEC, raw, convert)
}

/// Unsigned decimal in `min..=max`, optionally with an exact digit count.
fn bounded(
    row: &RawRecord,
    column: &str,
    digits: Option<usize>,
    min: u32,
    max: u32,
) -> Result<u32, RejectReason> {
    let value = row.get(column).map(str::trim).unwrap_or_default();
    let well_formed = !value.is_empty()
        && value.bytes().all(|b| b.is_ascii_digit())
        && digits.map_or(true, |n| value.len() == n);
    value
        .parse::<u32>()
        .ok()
        .filter(|v| well_formed && (min..=max).contains(v))
        .ok_or_else(|| RejectReason::invalid_value(column))
}

fn convert(row: &RawRecord) -> Result<DateTimeEntry, RejectReason> {
    let date_uuid = row
        .get("date_uuid")
        .and_then(parse_uuid)
        .ok_or_else(|| RejectReason::invalid_key("date_uuid"))?;
    let timestamp = row
        .get("timestamp")
        .and_then(|t| NaiveTime::parse_from_str(t.trim(), "%H:%M:%S").ok())
        .ok_or_else(|| RejectReason::invalid_value("timestamp"))?;
    let month = bounded(row, "month", None, 1, 12)?;
    let day = bounded(row, "day", None, 1, 31)?;
    let year = bounded(row, "year", Some(4), 1900, 2100)? as i32;
    let time_period = row
        .get("time_period")
        .and_then(TimePeriod::parse)
        .ok_or_else(|| RejectReason::invalid_value("time_period"))?;

    Ok(DateTimeEntry {
        timestamp,
        month,
        year,
        day,
        time_period,
        date_uuid,
    })
}
