use super::{CountryCode, NaturalKey};
use crate::table::{column, Cell, ColumnDef, SqlType, TableRow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The five kinds of store in the estate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreType {
    WebPortal,
    Local,
    SuperStore,
    MallKiosk,
    Outlet,
}

impl StoreType {
    pub const ALL: [StoreType; 5] = [
        StoreType::WebPortal,
        StoreType::Local,
        StoreType::SuperStore,
        StoreType::MallKiosk,
        StoreType::Outlet,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StoreType::WebPortal => "Web Portal",
            StoreType::Local => "Local",
            StoreType::SuperStore => "Super Store",
            StoreType::MallKiosk => "Mall Kiosk",
            StoreType::Outlet => "Outlet",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Continent {
    Europe,
    America,
}

impl Continent {
    pub fn as_str(self) -> &'static str {
        match self {
            Continent::Europe => "Europe",
            Continent::America => "America",
        }
    }

    /// Accepts the upstream `ee`-prefixed corruption (`eeEurope`).
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let s = s.strip_prefix("ee").unwrap_or(s);
        match s {
            "Europe" => Some(Continent::Europe),
            "America" => Some(Continent::America),
            _ => None,
        }
    }
}

/// A cleaned store row (`dim_store_details`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Store {
    pub address: Option<String>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub locality: Option<String>,
    pub store_code: String,
    pub staff_numbers: i16,
    pub opening_date: NaiveDate,
    pub store_type: Option<StoreType>,
    pub country_code: CountryCode,
    pub continent: Continent,
}

impl TableRow for Store {
    const COLUMNS: &'static [ColumnDef] = &[
        column("address", SqlType::Text),
        column("longitude", SqlType::Float),
        column("latitude", SqlType::Float),
        column("locality", SqlType::Varchar(255)),
        column("store_code", SqlType::FittedVarchar),
        column("staff_numbers", SqlType::SmallInt),
        column("opening_date", SqlType::Date),
        column("store_type", SqlType::Varchar(255)),
        column("country_code", SqlType::FittedVarchar),
        column("continent", SqlType::Varchar(255)),
    ];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::opt_text(&self.address),
            Cell::opt_float(self.longitude),
            Cell::opt_float(self.latitude),
            Cell::opt_text(&self.locality),
            Cell::Text(self.store_code.clone()),
            Cell::Int(i64::from(self.staff_numbers)),
            Cell::Date(self.opening_date),
            self.store_type
                .map_or(Cell::Null, |t| Cell::Text(t.as_str().to_string())),
            Cell::Text(self.country_code.as_str().to_string()),
            Cell::Text(self.continent.as_str().to_string()),
        ]
    }
}

impl NaturalKey for Store {
    const KEY_COLUMN: Option<&'static str> = Some("store_code");

    fn natural_key(&self) -> Option<String> {
        Some(self.store_code.clone())
    }
}
