//! Strongly typed retail entities, one per destination table.

pub mod card;
pub mod country;
pub mod date_time;
pub mod order;
pub mod product;
pub mod store;
pub mod user;

pub use card::Card;
pub use country::CountryCode;
pub use date_time::{DateTimeEntry, TimePeriod};
pub use order::Order;
pub use product::{Product, WeightClass};
pub use store::{Continent, Store, StoreType};
pub use user::User;

/// Rows that carry a natural key. The fact table returns `None`.
pub trait NaturalKey {
    /// Column holding the key, if any.
    const KEY_COLUMN: Option<&'static str>;

    fn natural_key(&self) -> Option<String>;
}
