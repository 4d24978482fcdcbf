use super::NaturalKey;
use crate::table::{column, Cell, ColumnDef, SqlType, TableRow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Delivery bucket derived from a product's weight in kilograms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WeightClass {
    Light,
    MidSized,
    Heavy,
    TruckRequired,
}

impl WeightClass {
    /// <2 Light, [2,40) Mid_Sized, [40,140) Heavy, ≥140 Truck_Required.
    pub fn from_kg(weight: f64) -> Self {
        if weight < 2.0 {
            WeightClass::Light
        } else if weight < 40.0 {
            WeightClass::MidSized
        } else if weight < 140.0 {
            WeightClass::Heavy
        } else {
            WeightClass::TruckRequired
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WeightClass::Light => "Light",
            WeightClass::MidSized => "Mid_Sized",
            WeightClass::Heavy => "Heavy",
            WeightClass::TruckRequired => "Truck_Required",
        }
    }
}

/// A cleaned product row (`dim_products`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub product_name: String,
    pub product_price: f64,
    /// Kilograms.
    pub weight: f64,
    pub category: Option<String>,
    pub ean: String,
    pub date_added: NaiveDate,
    pub uuid: Uuid,
    pub still_available: bool,
    pub product_code: String,
    pub weight_class: WeightClass,
}

impl TableRow for Product {
    const COLUMNS: &'static [ColumnDef] = &[
        column("product_name", SqlType::Text),
        column("product_price", SqlType::Float),
        column("weight", SqlType::Float),
        column("category", SqlType::Text),
        column("EAN", SqlType::FittedVarchar),
        column("date_added", SqlType::Date),
        column("uuid", SqlType::Uuid),
        column("still_available", SqlType::Bool),
        column("product_code", SqlType::FittedVarchar),
        column("weight_class", SqlType::FittedVarchar),
    ];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.product_name.clone()),
            Cell::Float(self.product_price),
            Cell::Float(self.weight),
            Cell::opt_text(&self.category),
            Cell::Text(self.ean.clone()),
            Cell::Date(self.date_added),
            Cell::Uuid(self.uuid),
            Cell::Bool(self.still_available),
            Cell::Text(self.product_code.clone()),
            Cell::Text(self.weight_class.as_str().to_string()),
        ]
    }
}

impl NaturalKey for Product {
    const KEY_COLUMN: Option<&'static str> = Some("product_code");

    fn natural_key(&self) -> Option<String> {
        Some(self.product_code.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_class_boundaries() {
        assert_eq!(WeightClass::from_kg(0.0), WeightClass::Light);
        assert_eq!(WeightClass::from_kg(1.999), WeightClass::Light);
        assert_eq!(WeightClass::from_kg(2.0), WeightClass::MidSized);
        assert_eq!(WeightClass::from_kg(39.99), WeightClass::MidSized);
        assert_eq!(WeightClass::from_kg(40.0), WeightClass::Heavy);
        assert_eq!(WeightClass::from_kg(139.9), WeightClass::Heavy);
        assert_eq!(WeightClass::from_kg(140.0), WeightClass::TruckRequired);
    }

    #[test]
    fn weight_class_labels() {
        assert_eq!(WeightClass::MidSized.as_str(), "Mid_Sized");
        assert_eq!(WeightClass::TruckRequired.as_str(), "Truck_Required");
    }
}
