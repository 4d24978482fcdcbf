//! `legacy_users` → `dim_users`.

use super::parse::{non_empty, parse_date, parse_uuid};
use super::{run_cleaner, Cleaned, CleanError, CleanerSpec, RejectReason};
use crate::domain::{CountryCode, User};
use crate::entity::EntityKind;
use crate::record::{RawRecord, RecordSet};

const SPEC: CleanerSpec = CleanerSpec {
    entity: EntityKind::Users,
    required: &[
        "first_name",
        "last_name",
        "date_of_birth",
        "country_code",
        "join_date",
        "user_uuid",
    ],
    ignored: &["index"],
};

pub fn clean_users(raw: &RecordSet) -> Result<Cleaned<User>, CleanError> {
    run_cleaner(&SPEC, raw, convert)
}

fn convert(row: &RawRecord) -> Result<User, RejectReason> {
    let user_uuid = row
        .get("user_uuid")
        .and_then(parse_uuid)
        .ok_or_else(|| RejectReason::invalid_key("user_uuid"))?;
    let first_name =
        non_empty(row.get("first_name")).ok_or_else(|| RejectReason::missing_value("first_name"))?;
    let last_name =
        non_empty(row.get("last_name")).ok_or_else(|| RejectReason::missing_value("last_name"))?;
    let date_of_birth = row
        .get("date_of_birth")
        .and_then(parse_date)
        .ok_or_else(|| RejectReason::invalid_date("date_of_birth"))?;
    let join_date = row
        .get("join_date")
        .and_then(parse_date)
        .ok_or_else(|| RejectReason::invalid_date("join_date"))?;
    let country_code = resolve_country(row).ok_or_else(|| RejectReason::invalid_value("country_code"))?;

    Ok(User {
        first_name,
        last_name,
        date_of_birth,
        company: row.get("company").map(str::to_string),
        email_address: row.get("email_address").map(str::to_string),
        address: row.get("address").map(str::to_string),
        country: row.get("country").map(str::to_string),
        country_code,
        phone_number: row.get("phone_number").and_then(normalize_phone),
        join_date,
        user_uuid,
    })
}

/// A known code wins; otherwise the code or `country` column is read as a full name.
fn resolve_country(row: &RawRecord) -> Option<CountryCode> {
    let code = row.get("country_code").unwrap_or_default();
    CountryCode::from_code(code)
        .or_else(|| CountryCode::from_country_name(code))
        .or_else(|| row.get("country").and_then(CountryCode::from_country_name))
}

/// Strip separators, drop a national `(0)` after an international prefix and
/// spell `00` prefixes as `+`. Placeholders become null.
pub fn normalize_phone(raw: &str) -> Option<String> {
    if non_empty(Some(raw)).is_none() {
        return None;
    }
    let trimmed = raw.trim();
    let without_trunk = if trimmed.starts_with('+') || trimmed.starts_with("00") {
        trimmed.replacen("(0)", "", 1)
    } else {
        trimmed.to_string()
    };
    let compact: String = without_trunk
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '.' | '-' | '(' | ')'))
        .collect();
    let normalized = match compact.strip_prefix("00") {
        Some(rest) => format!("+{rest}"),
        None => compact,
    };
    (!normalized.is_empty()).then_some(normalized)
}
