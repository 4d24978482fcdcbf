use serde::{Deserialize, Serialize};
use std::fmt;

/// Two-letter ISO country codes present in the retail data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CountryCode {
    GB,
    DE,
    US,
}

impl CountryCode {
    pub const ALL: [CountryCode; 3] = [CountryCode::GB, CountryCode::DE, CountryCode::US];

    pub fn as_str(self) -> &'static str {
        match self {
            CountryCode::GB => "GB",
            CountryCode::DE => "DE",
            CountryCode::US => "US",
        }
    }

    /// Exact two-letter code, after trimming.
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL.into_iter().find(|c| c.as_str() == code)
    }

    /// Full country name as written upstream.
    pub fn from_country_name(name: &str) -> Option<Self> {
        match name.trim() {
            "United Kingdom" => Some(CountryCode::GB),
            "Germany" => Some(CountryCode::DE),
            "United States" => Some(CountryCode::US),
            _ => None,
        }
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_names_resolve() {
        assert_eq!(CountryCode::from_code(" DE "), Some(CountryCode::DE));
        assert_eq!(CountryCode::from_code("GGB"), None);
        assert_eq!(CountryCode::from_code("gb"), None);
        assert_eq!(
            CountryCode::from_country_name("United Kingdom"),
            Some(CountryCode::GB)
        );
        assert_eq!(CountryCode::from_country_name("France"), None);
    }
}
