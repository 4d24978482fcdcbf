//! Store API records → `dim_store_details`.

use super::parse::{digits_only, is_placeholder, non_empty, parse_date};
use super::{run_cleaner, Cleaned, CleanError, CleanerSpec, RejectReason};
use crate::domain::{Continent, CountryCode, Store, StoreType};
use crate::entity::EntityKind;
use crate::record::{RawRecord, RecordSet};

const SPEC: CleanerSpec = CleanerSpec {
    entity: EntityKind::Stores,
    required: &[
        "store_code",
        "longitude",
        "latitude",
        "staff_numbers",
        "opening_date",
        "store_type",
        "country_code",
        "continent",
    ],
    // `lat` duplicates `latitude` and is always junk upstream.
    ignored: &["index", "lat"],
};

pub fn clean_stores(raw: &RecordSet) -> Result<Cleaned<Store>, CleanError> {
    run_cleaner(&SPEC, raw, convert)
}

fn convert(row: &RawRecord) -> Result<Store, RejectReason> {
    let store_code =
        non_empty(row.get("store_code")).ok_or_else(|| RejectReason::invalid_key("store_code"))?;
    let longitude = coordinate(row.get("longitude"))
        .ok_or_else(|| RejectReason::invalid_number("longitude"))?;
    let latitude =
        coordinate(row.get("latitude")).ok_or_else(|| RejectReason::invalid_number("latitude"))?;
    let staff_numbers = row
        .get("staff_numbers")
        .map(digits_only)
        .and_then(|d| d.parse::<i16>().ok())
        .ok_or_else(|| RejectReason::invalid_number("staff_numbers"))?;
    let opening_date = row
        .get("opening_date")
        .and_then(parse_date)
        .ok_or_else(|| RejectReason::invalid_date("opening_date"))?;
    let store_type = match row.get("store_type") {
        v if is_placeholder(v) => None,
        Some(v) => Some(StoreType::parse(v).ok_or_else(|| RejectReason::invalid_value("store_type"))?),
        None => None,
    };
    let country_code = row
        .get("country_code")
        .and_then(CountryCode::from_code)
        .ok_or_else(|| RejectReason::invalid_value("country_code"))?;
    let continent = row
        .get("continent")
        .and_then(Continent::parse)
        .ok_or_else(|| RejectReason::invalid_value("continent"))?;

    Ok(Store {
        address: row.get("address").map(str::to_string),
        longitude,
        latitude,
        locality: row.get("locality").map(str::to_string),
        store_code,
        staff_numbers,
        opening_date,
        store_type,
        country_code,
        continent,
    })
}

/// `Some(None)` for the null sentinels, `None` for anything non-numeric.
fn coordinate(value: Option<&str>) -> Option<Option<f64>> {
    if is_placeholder(value) {
        return Some(None);
    }
    value?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(code: &str, lat: &str, store_type: &str, continent: &str) -> RawRecord {
        RawRecord::from_pairs([
            ("index", Some("1")),
            ("address", Some("Flat 72W\nSally isle\nEast Deanfurt\nLE3 8BN")),
            ("longitude", Some("-1.74047")),
            ("lat", None),
            ("latitude", Some(lat)),
            ("locality", Some("Chapletown")),
            ("store_code", Some(code)),
            ("staff_numbers", Some("J78")),
            ("opening_date", Some("2009-11-14")),
            ("store_type", Some(store_type)),
            ("country_code", Some("GB")),
            ("continent", Some(continent)),
        ])
    }

    #[test]
    fn web_portal_with_na_coordinates_survives() {
        let web = RawRecord::from_pairs([
            ("index", Some("0")),
            ("address", Some("N/A")),
            ("longitude", Some("N/A")),
            ("lat", None),
            ("latitude", Some("N/A")),
            ("locality", Some("N/A")),
            ("store_code", Some("WEB-1388012W")),
            ("staff_numbers", Some("325")),
            ("opening_date", Some("2010-06-12")),
            ("store_type", Some("Web Portal")),
            ("country_code", Some("GB")),
            ("continent", Some("Europe")),
        ]);
        let raw: RecordSet = vec![web].into_iter().collect();
        let cleaned = clean_stores(&raw).unwrap();
        let s = &cleaned.rows[0];
        assert_eq!(s.longitude, None);
        assert_eq!(s.latitude, None);
        assert_eq!(s.address.as_deref(), Some("N/A"));
        assert_eq!(s.locality.as_deref(), Some("N/A"));
        assert_eq!(s.store_type, Some(StoreType::WebPortal));
    }

    #[test]
    fn non_numeric_latitude_drops_row() {
        let raw: RecordSet = vec![
            store("CH-01234", "53.0", "Local", "Europe"),
            store("CH-01235", "13KJZ890JH", "Local", "Europe"),
        ]
        .into_iter()
        .collect();
        let cleaned = clean_stores(&raw).unwrap();
        assert_eq!(cleaned.rows.len(), 1);
        assert_eq!(cleaned.rejected[0].reason, RejectReason::invalid_number("latitude"));
    }

    #[test]
    fn staff_numbers_and_continent_are_repaired() {
        let raw: RecordSet = vec![store("CH-01234", "53.0", "Super Store", "eeEurope")]
            .into_iter()
            .collect();
        let cleaned = clean_stores(&raw).unwrap();
        assert_eq!(cleaned.rows[0].staff_numbers, 78);
        assert_eq!(cleaned.rows[0].continent, Continent::Europe);
    }

    #[test]
    fn store_type_is_nullable_but_closed() {
        let raw: RecordSet = vec![
            store("A-1", "53.0", "NULL", "Europe"),
            store("A-2", "53.0", "Pop-up", "Europe"),
        ]
        .into_iter()
        .collect();
        let cleaned = clean_stores(&raw).unwrap();
        assert_eq!(cleaned.rows.len(), 1);
        assert_eq!(cleaned.rows[0].store_type, None);
        assert_eq!(cleaned.rejected[0].reason, RejectReason::invalid_value("store_type"));
    }

    #[test]
    fn fully_null_rows_are_garbage() {
        let junk = RawRecord::from_pairs([
            ("index", Some("217")),
            ("address", Some("NULL")),
            ("longitude", Some("NULL")),
            ("lat", None),
            ("latitude", Some("NULL")),
            ("locality", Some("NULL")),
            ("store_code", Some("NULL")),
            ("staff_numbers", Some("NULL")),
            ("opening_date", Some("NULL")),
            ("store_type", Some("NULL")),
            ("country_code", Some("NULL")),
            ("continent", Some("NULL")),
        ]);
        let raw: RecordSet = vec![junk, store("A-1", "53.0", "Local", "Europe")]
            .into_iter()
            .collect();
        let cleaned = clean_stores(&raw).unwrap();
        assert_eq!(cleaned.rows.len(), 1);
        assert_eq!(cleaned.rejected[0].reason, RejectReason::Garbage);
    }
}
