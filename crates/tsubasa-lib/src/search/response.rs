//! Typed decoding of backend search responses and their normalization into
//! the shape the gateway returns.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of a successful `_search` call, as returned by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSearchResponse {
    /// Milliseconds the backend spent executing the search.
    pub took: f64,
    pub hits: RawHits,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawHits {
    #[serde(default)]
    pub max_score: Option<f64>,
    #[serde(default)]
    pub total: Option<RawTotal>,
    #[serde(default)]
    pub hits: Vec<RawHit>,
}

/// Total hit count. Modern clusters send `{"value": n, "relation": "eq"}`,
/// older ones a bare integer.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawTotal {
    Object {
        value: u64,
        #[serde(default)]
        relation: Option<String>,
    },
    Count(u64),
}

impl RawTotal {
    pub fn value(&self) -> u64 {
        match self {
            RawTotal::Object { value, .. } => *value,
            RawTotal::Count(value) => *value,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawHit {
    #[serde(rename = "_source", default)]
    pub source: Option<Map<String, Value>>,
}

/// Error body returned with a non-success status.
#[derive(Debug, Clone, Deserialize)]
pub struct RawErrorResponse {
    pub error: RawErrorCause,
}

/// The backend reports `error` either as an object or as a plain string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawErrorCause {
    Detailed {
        #[serde(rename = "type")]
        kind: String,
        reason: Option<String>,
    },
    Message(String),
}

impl RawErrorCause {
    pub fn kind(&self) -> &str {
        match self {
            RawErrorCause::Detailed { kind, .. } => kind,
            RawErrorCause::Message(_) => "error",
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            RawErrorCause::Detailed { reason, .. } => reason.as_deref().unwrap_or(""),
            RawErrorCause::Message(message) => message,
        }
    }
}

/// Normalized search result returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Milliseconds measured by the gateway around the whole backend call.
    #[serde(rename = "request_ms")]
    pub request_latency_ms: u64,

    /// Milliseconds reported by the backend.
    #[serde(rename = "took")]
    pub backend_took_ms: f64,

    pub max_score: f64,
    pub total_hits: u64,

    /// `_source` of every hit, in hit order.
    #[serde(rename = "data")]
    pub documents: Vec<Map<String, Value>>,
}

impl SearchResponse {
    /// Normalize a raw backend response.
    ///
    /// `max_score` defaults to 0 and `total_hits` to 0 when the backend omits
    /// them. A hit without `_source` contributes an empty object so positions
    /// stay aligned with the backend's ordering.
    pub fn from_raw(raw: RawSearchResponse, request_latency_ms: u64) -> Self {
        let documents = raw
            .hits
            .hits
            .into_iter()
            .map(|hit| hit.source.unwrap_or_default())
            .collect();

        Self {
            request_latency_ms,
            backend_took_ms: raw.took,
            max_score: raw.hits.max_score.unwrap_or(0.0),
            total_hits: raw.hits.total.as_ref().map(RawTotal::value).unwrap_or(0),
            documents,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: Value) -> RawSearchResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn missing_max_score_defaults_to_zero() {
        let raw = decode(json!({
            "took": 4,
            "timed_out": false,
            "hits": {
                "total": { "value": 3, "relation": "eq" },
                "max_score": null,
                "hits": [
                    { "_index": "books", "_id": "1", "_source": { "title": "a" } },
                    { "_index": "books", "_id": "2", "_source": { "title": "b" } },
                    { "_index": "books", "_id": "3", "_source": { "title": "c" } }
                ]
            }
        }));

        let response = SearchResponse::from_raw(raw, 12);
        assert_eq!(response.max_score, 0.0);
        assert_eq!(response.total_hits, 3);
        assert_eq!(response.backend_took_ms, 4.0);
        assert_eq!(response.request_latency_ms, 12);
    }

    #[test]
    fn documents_keep_hit_order_and_only_source() {
        let raw = decode(json!({
            "took": 1,
            "hits": {
                "total": { "value": 2 },
                "max_score": 1.5,
                "hits": [
                    { "_id": "b", "_score": 1.5, "_source": { "title": "second" } },
                    { "_id": "a", "_score": 0.5, "_source": { "title": "first" } }
                ]
            }
        }));

        let response = SearchResponse::from_raw(raw, 0);
        assert_eq!(response.max_score, 1.5);
        assert_eq!(response.documents.len(), 2);
        assert_eq!(response.documents[0]["title"], "second");
        assert_eq!(response.documents[1]["title"], "first");
        assert!(!response.documents[0].contains_key("_id"));
    }

    #[test]
    fn zero_hits_serialize_as_empty_array() {
        let raw = decode(json!({
            "took": 2,
            "hits": { "total": { "value": 0 }, "max_score": null, "hits": [] }
        }));

        let response = SearchResponse::from_raw(raw, 3);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["data"], json!([]));
        assert_eq!(value["total_hits"], 0);
        assert_eq!(value["request_ms"], 3);
    }

    #[test]
    fn hits_array_may_be_absent() {
        let raw = decode(json!({ "took": 2, "hits": { "total": 0 } }));
        let response = SearchResponse::from_raw(raw, 0);
        assert!(response.documents.is_empty());
        assert_eq!(response.total_hits, 0);
    }

    #[test]
    fn missing_hits_object_is_a_decode_error() {
        let result = serde_json::from_value::<RawSearchResponse>(json!({ "took": 1 }));
        assert!(result.is_err());
    }

    #[test]
    fn error_bodies_decode_both_shapes() {
        let detailed: RawErrorResponse = serde_json::from_value(json!({
            "error": { "type": "index_not_found_exception", "reason": "no such index [x]" },
            "status": 404
        }))
        .unwrap();
        assert_eq!(detailed.error.kind(), "index_not_found_exception");
        assert_eq!(detailed.error.reason(), "no such index [x]");

        let plain: RawErrorResponse =
            serde_json::from_value(json!({ "error": "boom" })).unwrap();
        assert_eq!(plain.error.kind(), "error");
        assert_eq!(plain.error.reason(), "boom");
    }
}
