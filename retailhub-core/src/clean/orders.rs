//! `orders_table` → `orders_table`.
//!
//! Rows pass through once their five dimension references are well formed.
//! Whether those references resolve is checked by the destination's foreign keys.

use super::parse::{non_empty, normalize_card_number, parse_integer, parse_uuid};
use super::{run_cleaner, Cleaned, CleanError, CleanerSpec, RejectReason};
use crate::domain::Order;
use crate::entity::EntityKind;
use crate::record::{RawRecord, RecordSet};

const SPEC: CleanerSpec = CleanerSpec {
    entity: EntityKind::Orders,
    required: &[
        "date_uuid",
        "user_uuid",
        "card_number",
        "store_code",
        "product_code",
        "product_quantity",
    ],
    ignored: &["level_0", "index", "1", "first_name", "last_name"],
};

pub fn clean_orders(raw: &RecordSet) -> Result<Cleaned<Order>, CleanError> {
    run_cleaner(&SPEC, raw, convert)
}

fn uuid_ref(row: &RawRecord, column: &str) -> Result<uuid::Uuid, RejectReason> {
    row.get(column)
        .and_then(parse_uuid)
        .ok_or_else(|| RejectReason::invalid_key(column))
}

fn code_ref(row: &RawRecord, column: &str) -> Result<String, RejectReason> {
    non_empty(row.get(column)).ok_or_else(|| RejectReason::invalid_key(column))
}

fn convert(row: &RawRecord) -> Result<Order, RejectReason> {
    let date_uuid = uuid_ref(row, "date_uuid")?;
    let user_uuid = uuid_ref(row, "user_uuid")?;
    let card_number = row
        .get("card_number")
        .and_then(normalize_card_number)
        .ok_or_else(|| RejectReason::invalid_key("card_number"))?;
    let store_code = code_ref(row, "store_code")?;
    let product_code = code_ref(row, "product_code")?;
    let product_quantity = row
        .get("product_quantity")
        .and_then(parse_integer)
        .and_then(|q| i16::try_from(q).ok())
        .ok_or_else(|| RejectReason::invalid_number("product_quantity"))?;

    Ok(Order {
        date_uuid,
        user_uuid,
        card_number,
        store_code,
        product_code,
        product_quantity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(user: &str, card: &str, quantity: &str) -> RawRecord {
        RawRecord::from_pairs([
            ("level_0", Some("0")),
            ("index", Some("0")),
            ("date_uuid", Some("9476f17e-5d6a-4117-874d-9cdb38ca1fa6")),
            ("first_name", None),
            ("last_name", None),
            ("user_uuid", Some(user)),
            ("card_number", Some(card)),
            ("store_code", Some("BL-8387506C")),
            ("product_code", Some("R7-3126933h")),
            ("1", None),
            ("product_quantity", Some(quantity)),
        ])
    }

    const USER: &str = "93caf182-e4e9-4c6e-bebb-60a1a9dcf9b8";

    #[test]
    fn bookkeeping_columns_do_not_survive() {
        let raw: RecordSet = vec![order(USER, "30060773296197", "3")].into_iter().collect();
        let cleaned = clean_orders(&raw).unwrap();
        let table = crate::table::TableData::from_rows("orders_table", &cleaned.rows);
        for dropped in ["level_0", "index", "1", "first_name", "last_name"] {
            assert!(table.column_index(dropped).is_none(), "{dropped}");
        }
        assert_eq!(cleaned.rows[0].product_quantity, 3);
    }

    #[test]
    fn card_numbers_match_the_card_cleaner() {
        let raw: RecordSet = vec![order(USER, "??3006 0773 2961 97", "1")].into_iter().collect();
        let cleaned = clean_orders(&raw).unwrap();
        assert_eq!(cleaned.rows[0].card_number, "30060773296197");
    }

    #[test]
    fn malformed_references_drop_rows() {
        let raw: RecordSet = vec![
            order("not-a-uuid", "30060773296197", "1"),
            order(USER, "30060773296197", "two"),
            order(USER, "30060773296197", "4"),
        ]
        .into_iter()
        .collect();
        let cleaned = clean_orders(&raw).unwrap();
        assert_eq!(cleaned.rows.len(), 1);
        assert_eq!(cleaned.rejected[0].reason, RejectReason::invalid_key("user_uuid"));
        assert_eq!(
            cleaned.rejected[1].reason,
            RejectReason::invalid_number("product_quantity")
        );
    }

    #[test]
    fn repeated_orders_are_all_kept() {
        let raw: RecordSet = vec![
            order(USER, "30060773296197", "1"),
            order(USER, "30060773296197", "1"),
        ]
        .into_iter()
        .collect();
        assert_eq!(clean_orders(&raw).unwrap().rows.len(), 2);
    }
}
