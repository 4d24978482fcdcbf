//! Source adapters and their structured error types.
//!
//! Each adapter pulls one entity's full snapshot from one kind of source and
//! returns it as a string-preserving `RecordSet`. Adapters only read; no
//! retries are attempted and a failure is final for that entity.

pub mod api;
pub mod document;
pub mod object_store;
pub mod relational;

use crate::record::RecordSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::trace;

pub use api::{ApiAdapter, HttpRecordApi, RecordApi};
pub use document::{parse_pdf_table, DocumentAdapter};
pub use object_store::{parse_csv, parse_json, ObjectFormat, ObjectStoreAdapter};
pub use relational::{PostgresSource, RelationalAdapter, TableReader};

/// Adapter failures. Both are fatal for the entity being extracted.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("parse error: {0}")]
    Parse(String),
}

/// The four kinds of upstream source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Relational,
    Document,
    Api,
    ObjectStore,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceKind::Relational => "relational",
            SourceKind::Document => "document",
            SourceKind::Api => "api",
            SourceKind::ObjectStore => "object_store",
        })
    }
}

/// One entity's upstream source.
///
/// Implementations must be shareable across the extraction thread pool.
pub trait SourceAdapter: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Human-readable locator, for logs and the run report.
    fn describe(&self) -> String;

    /// Pull the full snapshot.
    fn extract(&self) -> Result<RecordSet, SourceError>;
}

/// Where a document or object lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Http(String),
    File(PathBuf),
}

impl Locator {
    /// Accepts `s3://bucket/key`, `http(s)://…`, `file://…` or a bare path.
    ///
    /// S3 objects are fetched through the bucket's public HTTPS endpoint.
    pub fn parse(raw: &str) -> Result<Self, SourceError> {
        let raw = raw.trim();
        if let Some(rest) = raw.strip_prefix("s3://") {
            return match rest.split_once('/') {
                Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => Ok(Locator::Http(
                    format!("https://{bucket}.s3.amazonaws.com/{key}"),
                )),
                _ => Err(SourceError::Unavailable(format!(
                    "malformed object locator '{raw}'"
                ))),
            };
        }
        if raw.starts_with("http://") || raw.starts_with("https://") {
            return Ok(Locator::Http(raw.to_string()));
        }
        let path = raw.strip_prefix("file://").unwrap_or(raw);
        if path.is_empty() {
            return Err(SourceError::Unavailable("empty locator".into()));
        }
        Ok(Locator::File(PathBuf::from(path)))
    }

    pub fn fetch(&self) -> Result<Vec<u8>, SourceError> {
        match self {
            Locator::Http(url) => fetch_bytes(&http_client()?, url, &[]),
            Locator::File(path) => std::fs::read(path).map_err(|e| {
                SourceError::Unavailable(format!("cannot read {}: {e}", path.display()))
            }),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Http(url) => f.write_str(url),
            Locator::File(path) => write!(f, "{}", path.display()),
        }
    }
}

pub(crate) fn http_client() -> Result<reqwest::blocking::Client, SourceError> {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(60))
        .user_agent(concat!("retailhub/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| SourceError::Unavailable(format!("failed to build HTTP client: {e}")))
}

/// GET `url` with extra headers and return the body.
pub(crate) fn fetch_bytes(
    client: &reqwest::blocking::Client,
    url: &str,
    headers: &[(String, String)],
) -> Result<Vec<u8>, SourceError> {
    trace!(url, "GET");
    let mut request = client.get(url);
    for (name, value) in headers {
        request = request.header(name.as_str(), value.as_str());
    }
    let resp = request
        .send()
        .map_err(|e| SourceError::Unavailable(format!("{url}: {e}")))?;

    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(SourceError::Unavailable(format!(
            "authentication rejected (HTTP {status}) for {url}"
        )));
    }
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(SourceError::Unavailable(format!("not found: {url}")));
    }
    if !status.is_success() {
        return Err(SourceError::Unavailable(format!("HTTP {status} for {url}")));
    }

    resp.bytes()
        .map(|b| b.to_vec())
        .map_err(|e| SourceError::Unavailable(format!("{url}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s3_locators_resolve_to_https() {
        assert_eq!(
            Locator::parse("s3://data-handling-public/products.csv").unwrap(),
            Locator::Http("https://data-handling-public.s3.amazonaws.com/products.csv".into())
        );
        assert!(Locator::parse("s3://bucket-only").is_err());
        assert!(Locator::parse("s3:///key").is_err());
    }

    #[test]
    fn file_and_http_locators() {
        assert_eq!(
            Locator::parse("file:///tmp/date_details.json").unwrap(),
            Locator::File(PathBuf::from("/tmp/date_details.json"))
        );
        assert_eq!(
            Locator::parse("data/card_details.pdf").unwrap(),
            Locator::File(PathBuf::from("data/card_details.pdf"))
        );
        assert!(matches!(
            Locator::parse("https://example.com/card_details.pdf").unwrap(),
            Locator::Http(_)
        ));
        assert!(Locator::parse("  ").is_err());
    }

    #[test]
    fn missing_file_is_unavailable() {
        let err = Locator::File(PathBuf::from("/definitely/not/here.csv"))
            .fetch()
            .unwrap_err();
        assert!(matches!(err, SourceError::Unavailable(_)));
    }
}
