use super::{CountryCode, NaturalKey};
use crate::table::{column, Cell, ColumnDef, SqlType, TableRow};
use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

/// A cleaned customer row (`dim_users`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub company: Option<String>,
    pub email_address: Option<String>,
    pub address: Option<String>,
    pub country: Option<String>,
    pub country_code: CountryCode,
    pub phone_number: Option<String>,
    pub join_date: NaiveDate,
    pub user_uuid: Uuid,
}

impl TableRow for User {
    const COLUMNS: &'static [ColumnDef] = &[
        column("first_name", SqlType::Varchar(255)),
        column("last_name", SqlType::Varchar(255)),
        column("date_of_birth", SqlType::Date),
        column("company", SqlType::Text),
        column("email_address", SqlType::Text),
        column("address", SqlType::Text),
        column("country", SqlType::Text),
        column("country_code", SqlType::FittedVarchar),
        column("phone_number", SqlType::Text),
        column("join_date", SqlType::Date),
        column("user_uuid", SqlType::Uuid),
    ];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.first_name.clone()),
            Cell::Text(self.last_name.clone()),
            Cell::Date(self.date_of_birth),
            Cell::opt_text(&self.company),
            Cell::opt_text(&self.email_address),
            Cell::opt_text(&self.address),
            Cell::opt_text(&self.country),
            Cell::Text(self.country_code.as_str().to_string()),
            Cell::opt_text(&self.phone_number),
            Cell::Date(self.join_date),
            Cell::Uuid(self.user_uuid),
        ]
    }
}

impl NaturalKey for User {
    const KEY_COLUMN: Option<&'static str> = Some("user_uuid");

    fn natural_key(&self) -> Option<String> {
        Some(self.user_uuid.hyphenated().to_string())
    }
}
