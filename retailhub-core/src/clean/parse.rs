//! Value-level parsers shared by the entity cleaners.
//!
//! Every parser takes the raw source text and returns `None` when the value
//! cannot be coerced; the caller turns that into a row rejection.

use crate::record::RawRecord;
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::LazyLock;
use uuid::Uuid;

/// Ten upper-case alphanumerics mixing letters and digits, e.g. `QP74AHEQT0`.
static NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]{10}$").expect("valid regex"));

static CANONICAL_UUID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("valid regex")
});

const PLACEHOLDERS: [&str; 5] = ["", "null", "n/a", "nan", "none"];

const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%B %d %Y", "%Y %B %d", "%B %Y %d"];

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Null, empty or one of the textual null spellings.
pub fn is_placeholder(value: Option<&str>) -> bool {
    match value {
        None => true,
        Some(v) => {
            let v = v.trim();
            PLACEHOLDERS.iter().any(|p| v.eq_ignore_ascii_case(p))
        }
    }
}

pub fn is_noise(value: &str) -> bool {
    let v = value.trim();
    NOISE.is_match(v)
        && v.bytes().any(|b| b.is_ascii_alphabetic())
        && v.bytes().any(|b| b.is_ascii_digit())
}

/// True when every column outside `skip` is a placeholder or noise token.
///
/// A row with nothing left to inspect is not garbage.
pub fn is_garbage_row(row: &RawRecord, skip: &[&str]) -> bool {
    let mut inspected = 0usize;
    for (column, value) in row.iter() {
        if skip.contains(&column) {
            continue;
        }
        inspected += 1;
        let junk = match value {
            None => true,
            Some(v) => is_placeholder(Some(v)) || is_noise(v),
        };
        if !junk {
            return false;
        }
    }
    inspected > 0
}

/// Canonical 8-4-4-4-12 UUID after trimming. Braced, URN and simple forms are refused.
pub fn parse_uuid(value: &str) -> Option<Uuid> {
    let v = value.trim();
    if !CANONICAL_UUID.is_match(v) {
        return None;
    }
    Uuid::parse_str(v).ok()
}

/// Dates in any of the upstream spellings. Month names may be full or abbreviated.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let v = value.trim();
    if v.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(v, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(v, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// A decimal number with currency symbols, thousands separators and a
/// trailing unit suffix removed. Non-finite results are refused.
pub fn parse_number(value: &str) -> Option<f64> {
    let v = value.trim().trim_start_matches(['£', '$', '€']);
    let v = v.trim_end_matches(|c: char| c.is_alphabetic() || c.is_whitespace());
    let cleaned: String = v.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Strict integer: optional sign and ASCII digits only.
pub fn parse_integer(value: &str) -> Option<i64> {
    let v = value.trim();
    let digits = v.strip_prefix('-').unwrap_or(v);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    v.parse().ok()
}

pub fn digits_only(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// Card numbers with formatting punctuation (`?`, whitespace, `-`, `.`) removed.
/// Anything other than digits left over is refused.
pub fn normalize_card_number(value: &str) -> Option<String> {
    let cleaned: String = value
        .chars()
        .filter(|c| !matches!(c, '?' | '-' | '.') && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() || !cleaned.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(cleaned)
}

/// Trimmed non-placeholder text.
pub fn non_empty(value: Option<&str>) -> Option<String> {
    if is_placeholder(value) {
        return None;
    }
    value.map(|v| v.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders() {
        for token in ["", "  ", "NULL", "null", "N/A", "NaN", "None"] {
            assert!(is_placeholder(Some(token)), "{token:?}");
        }
        assert!(is_placeholder(None));
        assert!(!is_placeholder(Some("0")));
    }

    #[test]
    fn noise_tokens_need_letters_and_digits() {
        assert!(is_noise("QP74AHEQT0"));
        assert!(is_noise("A3GTWT0QHS"));
        assert!(!is_noise("ABCDEFGHIJ"));
        assert!(!is_noise("1234567890"));
        assert!(!is_noise("QP74AHEQT"));
        assert!(!is_noise("qp74aheqt0"));
    }

    #[test]
    fn garbage_rows_skip_listed_columns() {
        let row = RawRecord::from_pairs([
            ("store_code", Some("WEB-1388012W")),
            ("address", Some("NULL")),
            ("locality", Some("QP74AHEQT0")),
            ("staff_numbers", None),
        ]);
        assert!(is_garbage_row(&row, &["store_code"]));

        let row = RawRecord::from_pairs([("address", Some("NULL")), ("locality", Some("Leeds"))]);
        assert!(!is_garbage_row(&row, &[]));

        let only_key = RawRecord::from_pairs([("store_code", Some("NULL"))]);
        assert!(!is_garbage_row(&only_key, &["store_code"]));
    }

    #[test]
    fn uuid_must_be_canonical() {
        let id = "93caf182-e4e9-4c6e-bebb-60a1a9dcf9b8";
        assert!(parse_uuid(id).is_some());
        assert!(parse_uuid(&format!("  {id} ")).is_some());
        assert!(parse_uuid("93caf182e4e94c6ebebb60a1a9dcf9b8").is_none());
        assert!(parse_uuid("{93caf182-e4e9-4c6e-bebb-60a1a9dcf9b8}").is_none());
        assert!(parse_uuid("NULL").is_none());
    }

    #[test]
    fn date_spellings() {
        let d = NaiveDate::from_ymd_opt(1968, 10, 16).unwrap();
        assert_eq!(parse_date("1968-10-16"), Some(d));
        assert_eq!(parse_date("1968/10/16"), Some(d));
        assert_eq!(parse_date("October 16 1968"), Some(d));
        assert_eq!(parse_date("Oct 16 1968"), Some(d));
        assert_eq!(parse_date("1968 October 16"), Some(d));
        assert_eq!(parse_date("October 1968 16"), Some(d));
        assert_eq!(parse_date("1968-10-16 08:00:00"), Some(d));
        assert_eq!(parse_date("not-a-date"), None);
        assert_eq!(parse_date("2019-02-30"), None);
    }

    #[test]
    fn numbers_lose_currency_and_units() {
        assert_eq!(parse_number("£12.99"), Some(12.99));
        assert_eq!(parse_number("$1,299.00"), Some(1299.0));
        assert_eq!(parse_number("4.5kg"), Some(4.5));
        assert_eq!(parse_number("N/A"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("12abc34"), None);
    }

    #[test]
    fn integers_are_strict() {
        assert_eq!(parse_integer(" 4 "), Some(4));
        assert_eq!(parse_integer("-2"), Some(-2));
        assert_eq!(parse_integer("4.0"), None);
        assert_eq!(parse_integer("J4"), None);
        assert_eq!(parse_integer(""), None);
    }

    #[test]
    fn card_numbers() {
        assert_eq!(normalize_card_number("??4971858637664481"), Some("4971858637664481".into()));
        assert_eq!(normalize_card_number("4971 8586-3766.4481"), Some("4971858637664481".into()));
        assert_eq!(normalize_card_number("NB71VBAHJE"), None);
        assert_eq!(normalize_card_number("???"), None);
    }

    #[test]
    fn digits_only_strips_letters() {
        assert_eq!(digits_only("J78"), "78");
        assert_eq!(digits_only("3n9"), "39");
    }
}
