//! The six retail entities and their destination tables.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One logical entity flowing through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Users,
    Cards,
    Stores,
    Products,
    DateTimes,
    Orders,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Users,
        EntityKind::Cards,
        EntityKind::Stores,
        EntityKind::Products,
        EntityKind::DateTimes,
        EntityKind::Orders,
    ];

    /// Dimension entities, in load order.
    pub const DIMENSIONS: [EntityKind; 5] = [
        EntityKind::Users,
        EntityKind::Cards,
        EntityKind::Stores,
        EntityKind::Products,
        EntityKind::DateTimes,
    ];

    pub fn table_name(self) -> &'static str {
        match self {
            EntityKind::Users => "dim_users",
            EntityKind::Cards => "dim_card_details",
            EntityKind::Stores => "dim_store_details",
            EntityKind::Products => "dim_products",
            EntityKind::DateTimes => "dim_date_times",
            EntityKind::Orders => "orders_table",
        }
    }

    pub fn is_dimension(self) -> bool {
        !matches!(self, EntityKind::Orders)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Users => "users",
            EntityKind::Cards => "cards",
            EntityKind::Stores => "stores",
            EntityKind::Products => "products",
            EntityKind::DateTimes => "date_times",
            EntityKind::Orders => "orders",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        EntityKind::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted || k.table_name() == wanted)
            .ok_or_else(|| {
                format!(
                    "unknown entity '{s}' (expected one of: users, cards, stores, products, date_times, orders)"
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_orders_is_a_fact() {
        let facts: Vec<_> = EntityKind::ALL
            .into_iter()
            .filter(|k| !k.is_dimension())
            .collect();
        assert_eq!(facts, vec![EntityKind::Orders]);
        assert_eq!(EntityKind::DIMENSIONS.len(), 5);
    }

    #[test]
    fn parses_entity_names_and_table_names() {
        assert_eq!("stores".parse::<EntityKind>().unwrap(), EntityKind::Stores);
        assert_eq!("date-times".parse::<EntityKind>().unwrap(), EntityKind::DateTimes);
        assert_eq!("dim_products".parse::<EntityKind>().unwrap(), EntityKind::Products);
        assert!("customers".parse::<EntityKind>().is_err());
    }
}
