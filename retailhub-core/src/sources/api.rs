//! Paged record API: one count request, then one request per record index.

use super::{fetch_bytes, http_client, SourceAdapter, SourceError, SourceKind};
use crate::record::{RawRecord, RecordSet};
use serde_json::Value;
use tracing::{debug, info};

/// Transport for a count-then-fetch-by-index API.
pub trait RecordApi: Send + Sync {
    fn record_count(&self) -> Result<usize, SourceError>;

    fn fetch_record(&self, index: usize) -> Result<RawRecord, SourceError>;

    fn describe(&self) -> String;
}

/// HTTP implementation. `record_endpoint` carries an `{index}` placeholder.
pub struct HttpRecordApi {
    client: reqwest::blocking::Client,
    count_endpoint: String,
    record_endpoint: String,
    headers: Vec<(String, String)>,
    count_field: String,
}

impl HttpRecordApi {
    pub fn new(
        count_endpoint: impl Into<String>,
        record_endpoint: impl Into<String>,
        headers: Vec<(String, String)>,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            client: http_client()?,
            count_endpoint: count_endpoint.into(),
            record_endpoint: record_endpoint.into(),
            headers,
            count_field: "number_stores".into(),
        })
    }

    /// Name of the JSON field holding the total in the count response.
    pub fn with_count_field(mut self, field: impl Into<String>) -> Self {
        self.count_field = field.into();
        self
    }

    fn get_json(&self, url: &str) -> Result<Value, SourceError> {
        let body = fetch_bytes(&self.client, url, &self.headers)?;
        serde_json::from_slice(&body)
            .map_err(|e| SourceError::Parse(format!("{url}: response is not JSON: {e}")))
    }
}

/// Total record count from a count response: a bare number or `{field: n}`.
pub fn count_from_json(body: &Value, field: &str) -> Result<usize, SourceError> {
    let value = match body {
        Value::Object(map) => map
            .get(field)
            .ok_or_else(|| SourceError::Parse(format!("count response has no '{field}' field")))?,
        other => other,
    };
    let count = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    count
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| SourceError::Parse(format!("'{field}' is not a record count: {value}")))
}

impl RecordApi for HttpRecordApi {
    fn record_count(&self) -> Result<usize, SourceError> {
        let body = self.get_json(&self.count_endpoint)?;
        count_from_json(&body, &self.count_field)
    }

    fn fetch_record(&self, index: usize) -> Result<RawRecord, SourceError> {
        let url = self.record_endpoint.replace("{index}", &index.to_string());
        match self.get_json(&url)? {
            Value::Object(map) => Ok(RawRecord::from_json_object(&map)),
            other => Err(SourceError::Parse(format!(
                "{url}: expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    fn describe(&self) -> String {
        self.record_endpoint.clone()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Pages through a `RecordApi` in index order.
pub struct ApiAdapter<A> {
    api: A,
}

impl<A: RecordApi> ApiAdapter<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }
}

impl<A: RecordApi> SourceAdapter for ApiAdapter<A> {
    fn kind(&self) -> SourceKind {
        SourceKind::Api
    }

    fn describe(&self) -> String {
        format!("api {}", self.api.describe())
    }

    fn extract(&self) -> Result<RecordSet, SourceError> {
        let count = self.api.record_count()?;
        debug!(count, "record count resolved");

        let mut set = RecordSet::new();
        for index in 0..count {
            let record = self.api.fetch_record(index).map_err(|e| {
                SourceError::Unavailable(format!("record {index} of {count} failed: {e}"))
            })?;
            set.push(record);
        }
        info!(records = set.len(), "read API records");
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FakeApi {
        count: usize,
        fail_at: Option<usize>,
    }

    impl RecordApi for FakeApi {
        fn record_count(&self) -> Result<usize, SourceError> {
            Ok(self.count)
        }

        fn fetch_record(&self, index: usize) -> Result<RawRecord, SourceError> {
            if Some(index) == self.fail_at {
                return Err(SourceError::Unavailable("HTTP 500".into()));
            }
            Ok(RawRecord::from_pairs([("index", Some(index.to_string().as_str()))]))
        }

        fn describe(&self) -> String {
            "fake".into()
        }
    }

    #[test]
    fn records_arrive_in_index_order() {
        let adapter = ApiAdapter::new(FakeApi {
            count: 4,
            fail_at: None,
        });
        let set = adapter.extract().unwrap();
        let order: Vec<_> = set.rows().iter().map(|r| r.get("index").unwrap()).collect();
        assert_eq!(order, vec!["0", "1", "2", "3"]);
    }

    #[test]
    fn one_failed_index_aborts_everything() {
        let adapter = ApiAdapter::new(FakeApi {
            count: 4,
            fail_at: Some(2),
        });
        match adapter.extract() {
            Err(SourceError::Unavailable(msg)) => assert!(msg.contains("record 2")),
            other => panic!("expected unavailable, got {other:?}"),
        }
    }

    #[test]
    fn count_shapes() {
        assert_eq!(count_from_json(&json!({"name": "x", "number_stores": 451}), "number_stores").unwrap(), 451);
        assert_eq!(count_from_json(&json!(12), "number_stores").unwrap(), 12);
        assert_eq!(count_from_json(&json!({"number_stores": "7"}), "number_stores").unwrap(), 7);
        assert!(matches!(
            count_from_json(&json!({"stores": 3}), "number_stores"),
            Err(SourceError::Parse(_))
        ));
        assert!(count_from_json(&json!({"number_stores": -1}), "number_stores").is_err());
    }
}
