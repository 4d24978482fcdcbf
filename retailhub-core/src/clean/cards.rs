//! Card details document → `dim_card_details`.

use super::parse::{normalize_card_number, parse_date};
use super::{run_cleaner, Cleaned, CleanError, CleanerSpec, RejectReason};
use crate::domain::Card;
use crate::entity::EntityKind;
use crate::record::{RawRecord, RecordSet};
use regex::Regex;
use std::sync::LazyLock;

static EXPIRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(0[1-9]|1[0-2])/\d{2}$").expect("valid regex"));

const SPEC: CleanerSpec = CleanerSpec {
    entity: EntityKind::Cards,
    required: &["card_number", "expiry_date", "date_payment_confirmed"],
    ignored: &[],
};

pub fn clean_cards(raw: &RecordSet) -> Result<Cleaned<Card>, CleanError> {
    run_cleaner(&SPEC, raw, convert)
}

fn convert(row: &RawRecord) -> Result<Card, RejectReason> {
    let card_number = row
        .get("card_number")
        .and_then(normalize_card_number)
        .ok_or_else(|| RejectReason::invalid_key("card_number"))?;
    let expiry_date = row
        .get("expiry_date")
        .map(str::trim)
        .filter(|v| EXPIRY.is_match(v))
        .ok_or_else(|| RejectReason::invalid_value("expiry_date"))?
        .to_string();
    let date_payment_confirmed = row
        .get("date_payment_confirmed")
        .and_then(parse_date)
        .ok_or_else(|| RejectReason::invalid_date("date_payment_confirmed"))?;

    Ok(Card {
        card_number,
        expiry_date,
        card_provider: row.get("card_provider").map(|p| p.trim().to_string()),
        date_payment_confirmed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(number: &str, expiry: &str, confirmed: &str) -> RawRecord {
        RawRecord::from_pairs([
            ("card_number", Some(number)),
            ("expiry_date", Some(expiry)),
            ("card_provider", Some("Diners Club / Carte Blanche")),
            ("date_payment_confirmed", Some(confirmed)),
        ])
    }

    #[test]
    fn formatting_punctuation_is_removed() {
        let raw: RecordSet = vec![card("??3554954842403828", "09/26", "2015-11-25")]
            .into_iter()
            .collect();
        let cleaned = clean_cards(&raw).unwrap();
        assert_eq!(cleaned.rows[0].card_number, "3554954842403828");
    }

    #[test]
    fn expiry_must_be_month_slash_year() {
        let raw: RecordSet = vec![
            card("30060773296197", "13/26", "2015-11-25"),
            card("30060773296198", "9/26", "2015-11-25"),
            card("30060773296199", "12/26", "2015-11-25"),
        ]
        .into_iter()
        .collect();
        let cleaned = clean_cards(&raw).unwrap();
        assert_eq!(cleaned.rows.len(), 1);
        assert_eq!(cleaned.rows[0].expiry_date, "12/26");
        assert_eq!(cleaned.rejection_counts().get("invalid_value"), Some(&2));
    }

    #[test]
    fn confirmation_date_spellings() {
        let raw: RecordSet = vec![
            card("4971858637664481", "09/26", "December 2021 17"),
            card("4971858637664482", "09/26", "2021/12/17"),
            card("4971858637664483", "09/26", "yesterday"),
        ]
        .into_iter()
        .collect();
        let cleaned = clean_cards(&raw).unwrap();
        assert_eq!(cleaned.rows.len(), 2);
        assert_eq!(cleaned.rows[0].date_payment_confirmed, cleaned.rows[1].date_payment_confirmed);
    }
}
