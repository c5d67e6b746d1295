//! Request bodies and their validation.

use axum::http::StatusCode;
use serde_json::{Map, Value};

use crate::envelope::{ApiResult, CODE_INVALID_DATA_TYPE, CODE_INVALID_JSON_BODY};

/// Body of `POST /elastic/{index}/search`.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub match_type: String,
    pub data: Map<String, Value>,
}

impl SearchRequest {
    /// Parse and validate a raw request body.
    ///
    /// A body that is not a JSON object fails with 400 `INVALID_JSON_BODY`.
    /// A missing or non-string `match_type`, or a missing or non-object
    /// `data`, fails with 406 `INVALID_DATA_TYPE`.
    ///
    /// Returns a boxed envelope to avoid a large `Result::Err` variant.
    pub fn from_body(body: &[u8]) -> Result<Self, Box<ApiResult>> {
        let mut body: Map<String, Value> = serde_json::from_slice(body).map_err(|e| {
            Box::new(ApiResult::err(
                StatusCode::BAD_REQUEST,
                CODE_INVALID_JSON_BODY,
                format!("Request body is not a valid JSON object: {}", e),
            ))
        })?;

        let match_type = match body.remove("match_type") {
            Some(Value::String(match_type)) => match_type,
            other => return Err(Box::new(invalid_type("match_type", other, "string"))),
        };

        let data = match body.remove("data") {
            Some(Value::Object(data)) => data,
            other => return Err(Box::new(invalid_type("data", other, "JSON object"))),
        };

        Ok(Self { match_type, data })
    }
}

fn invalid_type(field: &str, value: Option<Value>, expected: &str) -> ApiResult {
    let found = match value {
        None => "nothing".to_string(),
        Some(Value::Null) => "null".to_string(),
        Some(Value::Bool(_)) => "boolean".to_string(),
        Some(Value::Number(_)) => "number".to_string(),
        Some(Value::String(_)) => "string".to_string(),
        Some(Value::Array(_)) => "array".to_string(),
        Some(Value::Object(_)) => "JSON object".to_string(),
    };

    ApiResult::err(
        StatusCode::NOT_ACCEPTABLE,
        CODE_INVALID_DATA_TYPE,
        format!(
            "Invalid data type on {{{}}}: expected {}, got {}",
            field, expected, found
        ),
    )
}
