use super::NaturalKey;
use crate::table::{column, Cell, ColumnDef, SqlType, TableRow};
use serde::Serialize;
use uuid::Uuid;

/// A cleaned sale (`orders_table`), keyed only by its five dimension references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub date_uuid: Uuid,
    pub user_uuid: Uuid,
    pub card_number: String,
    pub store_code: String,
    pub product_code: String,
    pub product_quantity: i16,
}

impl TableRow for Order {
    const COLUMNS: &'static [ColumnDef] = &[
        column("date_uuid", SqlType::Uuid),
        column("user_uuid", SqlType::Uuid),
        column("card_number", SqlType::FittedVarchar),
        column("store_code", SqlType::FittedVarchar),
        column("product_code", SqlType::FittedVarchar),
        column("product_quantity", SqlType::SmallInt),
    ];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Uuid(self.date_uuid),
            Cell::Uuid(self.user_uuid),
            Cell::Text(self.card_number.clone()),
            Cell::Text(self.store_code.clone()),
            Cell::Text(self.product_code.clone()),
            Cell::Int(i64::from(self.product_quantity)),
        ]
    }
}

impl NaturalKey for Order {
    const KEY_COLUMN: Option<&'static str> = None;

    fn natural_key(&self) -> Option<String> {
        None
    }
}
