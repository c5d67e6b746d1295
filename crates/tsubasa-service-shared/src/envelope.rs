//! Uniform result envelope for every HTTP response.
//!
//! Success: `{"success":true,"status":200,"data":...}`
//! Error: `{"success":false,"status":406,"error":{"code":"...","message":"..."}}`

use axum::{
    extract::rejection::{BytesRejection, PathRejection},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use tsubasa_lib::error::{CODE_INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE};
use tsubasa_lib::Error as LibError;

/// No route matched the request path.
pub const CODE_ROUTE_NOT_FOUND: &str = "ROUTE_NOT_FOUND";

/// The path exists but not for this method.
pub const CODE_INVALID_METHOD: &str = "INVALID_METHOD";

/// The request body could not be parsed as a JSON object.
pub const CODE_INVALID_JSON_BODY: &str = "INVALID_JSON_BODY";

/// A body field is missing or has the wrong JSON type.
pub const CODE_INVALID_DATA_TYPE: &str = "INVALID_DATA_TYPE";

/// A path parameter could not be decoded.
pub const CODE_INVALID_PATH: &str = "INVALID_PATH";

/// The request body exceeded the size limit.
pub const CODE_PAYLOAD_TOO_LARGE: &str = "PAYLOAD_TOO_LARGE";

/// The request body could not be read.
pub const CODE_UNREADABLE_BODY: &str = "UNREADABLE_BODY";

/// Basic credentials were required but absent or undecodable.
pub const CODE_UNABLE_TO_OBTAIN: &str = "UNABLE_TO_OBTAIN";

pub const CODE_INVALID_USERNAME: &str = "INVALID_USERNAME";

pub const CODE_INVALID_PASSWORD: &str = "INVALID_PASSWORD";

/// Machine-readable error carried by a failed [`ApiResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

/// Result envelope written for every response.
///
/// Exactly one of `error` and `data` is present and `success` follows from
/// which one. The fields are private so that invariant can only be built
/// through [`ApiResult::ok`] and [`ApiResult::err`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResult<T = Value> {
    success: bool,
    status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ApiError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

impl<T> ApiResult<T> {
    /// Successful result answered with 200.
    pub fn ok(data: T) -> Self {
        Self::ok_with_status(StatusCode::OK, data)
    }

    /// Successful result answered with `status`.
    pub fn ok_with_status(status: StatusCode, data: T) -> Self {
        Self {
            success: true,
            status: status.as_u16(),
            error: None,
            data: Some(data),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }
}

impl ApiResult<Value> {
    /// Failed result with an explicit status, machine code and message.
    pub fn err(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            status: status.as_u16(),
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
            }),
            data: None,
        }
    }

    /// Generic 500 that reveals nothing about the cause.
    pub fn internal_error() -> Self {
        Self::err(
            StatusCode::INTERNAL_SERVER_ERROR,
            CODE_INTERNAL_SERVER_ERROR,
            INTERNAL_ERROR_MESSAGE,
        )
    }

    pub fn not_found(method: &Method, path: &str) -> Self {
        Self::err(
            StatusCode::NOT_FOUND,
            CODE_ROUTE_NOT_FOUND,
            format!("Unknown route \"{} {}\". Are you in the right path?", method, path),
        )
    }

    pub fn method_not_allowed(method: &Method, path: &str) -> Self {
        Self::err(
            StatusCode::METHOD_NOT_ALLOWED,
            CODE_INVALID_METHOD,
            format!("Method {} is not allowed on route {}.", method, path),
        )
    }
}

impl From<PathRejection> for ApiResult {
    fn from(rejection: PathRejection) -> Self {
        Self::err(rejection.status(), CODE_INVALID_PATH, rejection.body_text())
    }
}

impl From<BytesRejection> for ApiResult {
    fn from(rejection: BytesRejection) -> Self {
        let status = rejection.status();
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            Self::err(
                status,
                CODE_PAYLOAD_TOO_LARGE,
                "Request body exceeds the allowed size.",
            )
        } else {
            Self::err(status, CODE_UNREADABLE_BODY, "Request body could not be read.")
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResult<T> {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(self)).into_response()
    }
}

/// Convert a library error into its client-facing envelope.
///
/// Only the public message is used; backend detail stays in the logs.
pub fn from_lib_error(error: &LibError) -> ApiResult {
    let status = StatusCode::from_u16(error.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    ApiResult::err(status, error.code(), error.public_message())
}
