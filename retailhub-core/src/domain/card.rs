use super::NaturalKey;
use crate::table::{column, Cell, ColumnDef, SqlType, TableRow};
use chrono::NaiveDate;
use serde::Serialize;

/// A cleaned payment card row (`dim_card_details`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    /// Digits only.
    pub card_number: String,
    /// `MM/YY`.
    pub expiry_date: String,
    pub card_provider: Option<String>,
    pub date_payment_confirmed: NaiveDate,
}

impl TableRow for Card {
    const COLUMNS: &'static [ColumnDef] = &[
        column("card_number", SqlType::FittedVarchar),
        column("expiry_date", SqlType::FittedVarchar),
        column("card_provider", SqlType::Text),
        column("date_payment_confirmed", SqlType::Date),
    ];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.card_number.clone()),
            Cell::Text(self.expiry_date.clone()),
            Cell::opt_text(&self.card_provider),
            Cell::Date(self.date_payment_confirmed),
        ]
    }
}

impl NaturalKey for Card {
    const KEY_COLUMN: Option<&'static str> = Some("card_number");

    fn natural_key(&self) -> Option<String> {
        Some(self.card_number.clone())
    }
}
