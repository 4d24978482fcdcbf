//! Pipeline configuration, read from one TOML file.
//!
//! ```toml
//! [destination]
//! host = "localhost"
//! port = 5432
//! user = "postgres"
//! password = "secret"
//! database = "sales_data"
//!
//! [source_database]
//! host = "rds.example.com"
//! user = "reader"
//! password = "…"
//! database = "postgres"
//!
//! [sources]
//! users_table = "legacy_users"
//! orders_table = "orders_table"
//! card_document = "https://example.com/card_details.pdf"
//! products_object = "s3://data-handling-public/products.csv"
//! date_times_object = "https://example.com/date_details.json"
//!
//! [sources.store_api]
//! count_endpoint = "https://api.example.com/prod/number_stores"
//! record_endpoint = "https://api.example.com/prod/store_details/{index}"
//! api_key = "…"
//!
//! [run]
//! parallel_dimensions = true
//! report_path = "run_report.json"
//! ```

use retailhub_core::sources::ObjectFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// A PostgreSQL endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub user: String,
    #[serde(default)]
    pub password: String,
    pub database: String,
}

fn default_port() -> u16 {
    5432
}

/// libpq keyword value, quoted when it contains spaces, quotes or backslashes.
fn libpq_value(value: &str) -> String {
    if !value.is_empty() && !value.contains([' ', '\'', '\\']) {
        return value.to_string();
    }
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

impl ConnectionConfig {
    pub fn connection_string(&self) -> String {
        format!(
            "host={} port={} user={} password={} dbname={}",
            libpq_value(&self.host),
            self.port,
            libpq_value(&self.user),
            libpq_value(&self.password),
            libpq_value(&self.database)
        )
    }

    /// Connection string with the password masked, for logs.
    pub fn redacted(&self) -> String {
        format!(
            "host={} port={} user={} dbname={}",
            self.host, self.port, self.user, self.database
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreApiConfig {
    pub count_endpoint: String,
    /// URL template containing `{index}`.
    pub record_endpoint: String,
    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,
    pub api_key: String,
    #[serde(default = "default_count_field")]
    pub count_field: String,
}

fn default_api_key_header() -> String {
    "x-api-key".into()
}

fn default_count_field() -> String {
    "number_stores".into()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_users_table")]
    pub users_table: String,
    #[serde(default = "default_orders_table")]
    pub orders_table: String,
    pub card_document: String,
    pub products_object: String,
    /// Guessed from the locator's extension when absent.
    #[serde(default)]
    pub products_format: Option<ObjectFormat>,
    pub date_times_object: String,
    #[serde(default)]
    pub date_times_format: Option<ObjectFormat>,
    pub store_api: StoreApiConfig,
}

fn default_users_table() -> String {
    "legacy_users".into()
}

fn default_orders_table() -> String {
    "orders_table".into()
}

impl SourcesConfig {
    pub fn products_format(&self) -> Result<ObjectFormat, ConfigError> {
        resolve_format("products_object", &self.products_object, self.products_format)
    }

    pub fn date_times_format(&self) -> Result<ObjectFormat, ConfigError> {
        resolve_format("date_times_object", &self.date_times_object, self.date_times_format)
    }
}

fn resolve_format(
    field: &str,
    locator: &str,
    declared: Option<ObjectFormat>,
) -> Result<ObjectFormat, ConfigError> {
    declared
        .or_else(|| ObjectFormat::from_extension(locator))
        .ok_or_else(|| {
            ConfigError::Invalid(format!(
                "{field}: cannot infer format of '{locator}'; set it explicitly"
            ))
        })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub parallel_dimensions: bool,
    pub report_path: Option<PathBuf>,
    pub ddl_path: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            parallel_dimensions: true,
            report_path: None,
            ddl_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub destination: ConnectionConfig,
    pub source_database: ConnectionConfig,
    pub sources: SourcesConfig,
    #[serde(default)]
    pub run: RunConfig,
}

impl PipelineConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let sources = &self.sources;
        for (field, value) in [
            ("sources.users_table", &sources.users_table),
            ("sources.orders_table", &sources.orders_table),
            ("sources.card_document", &sources.card_document),
            ("sources.products_object", &sources.products_object),
            ("sources.date_times_object", &sources.date_times_object),
            ("sources.store_api.count_endpoint", &sources.store_api.count_endpoint),
            ("destination.database", &self.destination.database),
            ("source_database.database", &self.source_database.database),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{field} must not be empty")));
            }
        }
        if !sources.store_api.record_endpoint.contains("{index}") {
            return Err(ConfigError::Invalid(
                "sources.store_api.record_endpoint must contain an {index} placeholder".into(),
            ));
        }
        sources.products_format()?;
        sources.date_times_format()?;
        Ok(())
    }
}
