//! HTTP Basic credential gate.
//!
//! The gate is only active when both a username and a password are
//! configured. With either one missing every request passes through.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use subtle::ConstantTimeEq;

use tsubasa_lib::AuthCredentials;

use crate::envelope::{
    ApiResult, CODE_INVALID_PASSWORD, CODE_INVALID_USERNAME, CODE_UNABLE_TO_OBTAIN,
};

/// Challenge sent with every 401.
pub const BASIC_CHALLENGE: &str = "Basic realm=\"Tsubasa\"";

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// No `Authorization: Basic` header, or one that does not decode.
    Missing,
    InvalidUsername,
    InvalidPassword,
}

impl AuthFailure {
    pub fn code(self) -> &'static str {
        match self {
            AuthFailure::Missing => CODE_UNABLE_TO_OBTAIN,
            AuthFailure::InvalidUsername => CODE_INVALID_USERNAME,
            AuthFailure::InvalidPassword => CODE_INVALID_PASSWORD,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            AuthFailure::Missing => {
                "Server has enabled basic authentication and the credentials could not be obtained."
            }
            AuthFailure::InvalidUsername => "Invalid username.",
            AuthFailure::InvalidPassword => "Invalid password.",
        }
    }
}

impl IntoResponse for AuthFailure {
    fn into_response(self) -> Response {
        let mut response =
            ApiResult::err(StatusCode::UNAUTHORIZED, self.code(), self.message()).into_response();
        response.headers_mut().insert(
            header::WWW_AUTHENTICATE,
            HeaderValue::from_static(BASIC_CHALLENGE),
        );
        response
    }
}

/// Credential gate configuration shared by every request.
#[derive(Debug, Clone, Default)]
pub struct BasicAuth {
    credentials: Option<Arc<AuthCredentials>>,
}

impl BasicAuth {
    pub fn new(credentials: Option<AuthCredentials>) -> Self {
        Self {
            credentials: credentials.map(Arc::new),
        }
    }

    /// A gate that lets every request through.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.credentials.is_some()
    }

    /// Check the request headers against the configured credentials.
    ///
    /// The username is compared directly; the password is compared in
    /// constant time.
    pub fn check(&self, headers: &HeaderMap) -> Result<(), AuthFailure> {
        let Some(expected) = self.credentials.as_deref() else {
            return Ok(());
        };

        let (username, password) = basic_credentials(headers).ok_or(AuthFailure::Missing)?;

        if username != expected.username {
            return Err(AuthFailure::InvalidUsername);
        }

        if !bool::from(expected.password.as_bytes().ct_eq(password.as_bytes())) {
            return Err(AuthFailure::InvalidPassword);
        }

        Ok(())
    }
}

/// Decode `Authorization: Basic <base64(user:pass)>`.
///
/// The scheme compares case-insensitively. The password may itself contain
/// colons; only the first one separates it from the username.
pub fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// Middleware entry point, installed with `from_fn_with_state`.
pub async fn require_basic_auth(State(auth): State<BasicAuth>, req: Request, next: Next) -> Response {
    match auth.check(req.headers()) {
        Ok(()) => next.run(req).await,
        Err(failure) => {
            tracing::warn!(code = failure.code(), "rejected request at credential gate");
            failure.into_response()
        }
    }
}
