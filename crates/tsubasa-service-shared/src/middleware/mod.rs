//! HTTP middleware pipeline.
//!
//! Layers run in this order, outermost first:
//!
//! 1. [`resolve_client_addr`]: client address from proxy headers
//! 2. [`head_as_get`]: `HEAD` routed as `GET`
//! 3. [`AccessLogLayer`]: access log, request id, HTTP metrics
//! 4. [`security_headers`]: identifying and hardening headers
//! 5. [`require_basic_auth`]: optional credential gate
//! 6. [`RecoverLayer`]: panic-recovery boundary
//!
//! The pipeline wraps the whole routed application rather than each route,
//! so method rewriting happens before routing and the gate also covers
//! unknown paths.

mod access_log;
mod auth;
mod headers;
mod method;
mod real_ip;
mod recover;

pub use access_log::{
    extract_or_generate_request_id, metric_path, AccessLog, AccessLogFuture, AccessLogLayer,
    RequestId, REQUEST_ID_HEADER,
};
pub use auth::{basic_credentials, require_basic_auth, AuthFailure, BasicAuth, BASIC_CHALLENGE};
pub use headers::security_headers;
pub use method::{head_as_get, OriginalMethod};
pub use real_ip::{client_ip_from_headers, resolve_client_addr, ClientAddr};
pub use recover::{abort_handler, panic_message, AbortHandler, Hijack, Recover, RecoverLayer};

use std::sync::Arc;

use axum::{middleware::from_fn, middleware::from_fn_with_state, Router};
use tower::ServiceBuilder;

use crate::reporter::ErrorReporter;

/// Wrap a fully routed application in the middleware pipeline.
pub fn pipeline(
    app: Router,
    auth: BasicAuth,
    reporter: Option<Arc<dyn ErrorReporter>>,
) -> Router {
    if auth.is_enabled() {
        tracing::info!("basic authentication is enabled");
    }

    Router::new().fallback_service(app).layer(
        ServiceBuilder::new()
            .layer(from_fn(resolve_client_addr))
            .layer(from_fn(head_as_get))
            .layer(AccessLogLayer)
            .layer(from_fn(security_headers))
            .layer(from_fn_with_state(auth, require_basic_auth))
            .layer(RecoverLayer::new(reporter)),
    )
}
