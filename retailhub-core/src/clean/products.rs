//! Products CSV → `dim_products`, with weights normalized to kilograms.

use super::parse::{non_empty, parse_date, parse_number, parse_uuid};
use super::{run_cleaner, Cleaned, CleanError, CleanerSpec, RejectReason};
use crate::domain::{Product, WeightClass};
use crate::entity::EntityKind;
use crate::record::{RawRecord, RecordSet};
use regex::Regex;
use std::sync::LazyLock;

/// `[<multiplier> x ]<amount><unit>`, e.g. `3 x 400g`, `.5kg`, `16oz`.
static WEIGHT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(\d+(?:\.\d+)?)\s*x\s*)?(\d+(?:\.\d+)?|\.\d+)\s*(kg|g|ml|oz)$")
        .expect("valid regex")
});

const KG_PER_OZ: f64 = 0.0283495;

const SPEC: CleanerSpec = CleanerSpec {
    entity: EntityKind::Products,
    required: &[
        "product_name",
        "product_price",
        "weight",
        "EAN",
        "date_added",
        "uuid",
        "removed",
        "product_code",
    ],
    ignored: &["", "Unnamed: 0", "index"],
};

/// Normalize weights with [`convert_product_weights`], then type each row.
pub fn clean_products(raw: &RecordSet) -> Result<Cleaned<Product>, CleanError> {
    run_cleaner(&SPEC, &convert_product_weights(raw), convert)
}

/// Parse one weight string into kilograms, rounded to six decimals.
///
/// Millilitres are taken as grams. Trailing punctuation (`"77g ."`) is ignored.
pub fn parse_weight_kg(raw: &str) -> Option<f64> {
    let lowered = raw.trim().to_lowercase();
    let value = lowered.trim_end_matches(|c: char| !c.is_ascii_alphanumeric());
    let caps = WEIGHT.captures(value)?;

    let multiplier = match caps.get(1) {
        Some(m) => m.as_str().parse::<f64>().ok()?,
        None => 1.0,
    };
    let amount = caps.get(2)?.as_str().parse::<f64>().ok()?;
    let factor = match caps.get(3)?.as_str() {
        "kg" => 1.0,
        "g" | "ml" => 0.001,
        "oz" => KG_PER_OZ,
        _ => return None,
    };

    let kg = multiplier * amount * factor;
    Some((kg * 1e6).round() / 1e6)
}

/// Rewrite the `weight` column of a raw product set as `"<kg> kg"`.
///
/// Values that cannot be parsed become null; the cleaner later drops those rows.
/// Already converted values parse back to themselves.
pub fn convert_product_weights(raw: &RecordSet) -> RecordSet {
    raw.rows()
        .iter()
        .map(|row| {
            let mut row = row.clone();
            let kg = row.get("weight").and_then(parse_weight_kg);
            row.insert("weight", kg.map(|w| format!("{w} kg")));
            row
        })
        .collect()
}

fn availability(token: &str) -> Option<bool> {
    match token.trim() {
        "Still_available" | "Still_avaliable" => Some(true),
        "Removed" => Some(false),
        _ => None,
    }
}

fn convert(row: &RawRecord) -> Result<Product, RejectReason> {
    let product_code = non_empty(row.get("product_code"))
        .ok_or_else(|| RejectReason::invalid_key("product_code"))?;
    let product_name = non_empty(row.get("product_name"))
        .ok_or_else(|| RejectReason::missing_value("product_name"))?;
    let product_price = row
        .get("product_price")
        .and_then(parse_number)
        .ok_or_else(|| RejectReason::invalid_number("product_price"))?;
    let weight = row
        .get("weight")
        .and_then(parse_weight_kg)
        .ok_or_else(|| RejectReason::invalid_number("weight"))?;
    let ean = non_empty(row.get("EAN")).ok_or_else(|| RejectReason::missing_value("EAN"))?;
    let date_added = row
        .get("date_added")
        .and_then(parse_date)
        .ok_or_else(|| RejectReason::invalid_date("date_added"))?;
    let uuid = row
        .get("uuid")
        .and_then(parse_uuid)
        .ok_or_else(|| RejectReason::invalid_value("uuid"))?;
    let still_available = row
        .get("removed")
        .and_then(availability)
        .ok_or_else(|| RejectReason::invalid_value("removed"))?;

    Ok(Product {
        product_name,
        product_price,
        weight,
        category: row.get("category").map(|c| c.trim().to_string()),
        ean,
        date_added,
        uuid,
        still_available,
        product_code,
        weight_class: WeightClass::from_kg(weight),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Option<f64>, b: f64) -> bool {
        a.is_some_and(|a| (a - b).abs() < 1e-4)
    }

    #[test]
    fn weight_notations() {
        assert_eq!(parse_weight_kg("3 x 400g"), Some(1.2));
        assert_eq!(parse_weight_kg("650g"), Some(0.65));
        assert!(approx(parse_weight_kg("2 oz"), 0.0567));
        assert_eq!(parse_weight_kg("1.6kg"), Some(1.6));
        assert_eq!(parse_weight_kg("500ml"), Some(0.5));
        assert_eq!(parse_weight_kg("77g ."), Some(0.077));
        assert_eq!(parse_weight_kg("12 x 100g"), Some(1.2));
        assert_eq!(parse_weight_kg(".5KG"), Some(0.5));
    }

    #[test]
    fn unparseable_weights() {
        assert_eq!(parse_weight_kg("9GO9NZ5JTL"), None);
        assert_eq!(parse_weight_kg("heavy"), None);
        assert_eq!(parse_weight_kg("400"), None);
        assert_eq!(parse_weight_kg(""), None);
    }

    #[test]
    fn convert_rewrites_weight_column() {
        let raw: RecordSet = vec![
            RawRecord::from_pairs([("weight", Some("3 x 400g"))]),
            RawRecord::from_pairs([("weight", Some("junk"))]),
        ]
        .into_iter()
        .collect();
        let converted = convert_product_weights(&raw);
        assert_eq!(converted.rows()[0].get("weight"), Some("1.2 kg"));
        assert_eq!(converted.rows()[1].get("weight"), None);
        assert_eq!(convert_product_weights(&converted), converted);
    }

    #[test]
    fn cleaning_converted_weights_matches_cleaning_raw() {
        let raw: RecordSet = vec![
            product("R7-3126933h", "£39.99", "3 x 400g", "Still_avaliable"),
            product("S7-1175877v", "£12.99", "2 oz", "Removed"),
        ]
        .into_iter()
        .collect();
        let direct = clean_products(&raw).unwrap();
        let chained = clean_products(&convert_product_weights(&raw)).unwrap();
        assert_eq!(chained.rows.len(), 2);
        assert!(chained.rejected.is_empty());
        assert_eq!(chained.rows[0].weight, 1.2);
        assert_eq!(direct.rows, chained.rows);
    }

    fn product(code: &str, price: &str, weight: &str, removed: &str) -> RawRecord {
        RawRecord::from_pairs([
            ("Unnamed: 0", Some("0")),
            ("product_name", Some("FurReal Dazzlin' Dimples My Playful Dolphin")),
            ("product_price", Some(price)),
            ("weight", Some(weight)),
            ("category", Some("toys-and-games")),
            ("EAN", Some("7425710935115")),
            ("date_added", Some("2005-12-02")),
            ("uuid", Some("83dc0a69-f96f-4c34-bcb7-928acae19a94")),
            ("removed", Some(removed)),
            ("product_code", Some(code)),
        ])
    }

    #[test]
    fn products_are_typed_and_classified() {
        let raw: RecordSet = vec![
            product("R7-3126933h", "£39.99", "1.6kg", "Still_avaliable"),
            product("C2-7287916l", "N/A", "1.6kg", "Still_available"),
            product("S7-1175877v", "£12.99", "50kg", "Removed"),
            product("D8-8421505n", "£1.00", "1kg", "Discontinued"),
        ]
        .into_iter()
        .collect();
        let cleaned = clean_products(&raw).unwrap();
        assert_eq!(cleaned.rows.len(), 2);

        let first = &cleaned.rows[0];
        assert_eq!(first.product_price, 39.99);
        assert!(first.still_available);
        assert_eq!(first.weight_class, WeightClass::Light);

        let second = &cleaned.rows[1];
        assert_eq!(second.product_price, 12.99);
        assert!(!second.still_available);
        assert_eq!(second.weight_class, WeightClass::Heavy);

        let counts = cleaned.rejection_counts();
        assert_eq!(counts.get("invalid_number"), Some(&1));
        assert_eq!(counts.get("invalid_value"), Some(&1));
    }

    #[test]
    fn bad_product_uuid_drops_row() {
        let mut row = product("R7-3126933h", "£39.99", "1.6kg", "Removed");
        row.insert("uuid", Some("83dc0a69".into()));
        let raw: RecordSet = vec![row].into_iter().collect();
        let cleaned = clean_products(&raw).unwrap();
        assert!(cleaned.rows.is_empty());
        assert_eq!(cleaned.rejected[0].reason, RejectReason::invalid_value("uuid"));
    }
}
