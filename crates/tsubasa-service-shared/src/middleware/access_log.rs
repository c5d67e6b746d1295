//! Access logging and HTTP metrics.
//!
//! [`AccessLogLayer`] wraps everything below it in the pipeline and emits one
//! `request completed` line per request with method, path, protocol, status,
//! response size, duration, client address and request id. It records:
//!
//! - `http_requests_total`: Counter by method, path, status bucket
//! - `http_request_duration_seconds`: Histogram by method, path
//! - `http_response_size_bytes`: Histogram by method, path
//!
//! The layer does not catch panics. A fault that escapes the recovery
//! boundary unwinds through here without a log line for that request.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::http::{HeaderMap, HeaderValue, Request, Response};
use http_body::Body;
use pin_project_lite::pin_project;
use tower::{Layer, Service};
use tracing::{info_span, Span};
use uuid::Uuid;

use super::method::OriginalMethod;
use super::real_ip::ClientAddr;

/// Header carrying the request correlation id in both directions.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Newtype wrapper for request correlation IDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new UUID v7 request ID.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Extract the request ID from headers or generate a new UUID v7.
///
/// An `X-Request-ID` header that is empty or not valid UTF-8 counts as absent.
pub fn extract_or_generate_request_id(headers: &HeaderMap) -> RequestId {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(RequestId::from)
        .unwrap_or_else(RequestId::generate)
}

/// Collapse a request path into a bounded label for metrics.
///
/// Index names are client-controlled, so elastic routes are folded into
/// their patterns and anything unrouted becomes `other`.
pub fn metric_path(path: &str) -> &'static str {
    let path = path.split('?').next().unwrap_or(path);
    match path {
        "/" => "/",
        "/info" => "/info",
        "/metrics" => "/metrics",
        "/health/live" => "/health/live",
        "/health/ready" => "/health/ready",
        _ => match path.strip_prefix("/elastic/") {
            Some(rest) if !rest.is_empty() => match rest.split_once('/') {
                None => "/elastic/{index}",
                Some((_, "search")) => "/elastic/{index}/search",
                Some(_) => "other",
            },
            _ => "other",
        },
    }
}

/// Convert HTTP status code to bucket label.
fn status_bucket(status: u16) -> &'static str {
    match status {
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    }
}

// =============================================================================
// AccessLogLayer - Tower middleware for access logs and HTTP metrics
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct AccessLogLayer;

impl<S> Layer<S> for AccessLogLayer {
    type Service = AccessLog<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AccessLog { inner }
    }
}

/// Middleware service produced by [`AccessLogLayer`].
#[derive(Debug, Clone)]
pub struct AccessLog<S> {
    inner: S,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for AccessLog<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    ReqBody: Body + Send + 'static,
    ResBody: Body + Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = AccessLogFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let start = Instant::now();

        let method = req
            .extensions()
            .get::<OriginalMethod>()
            .map(|OriginalMethod(m)| m.to_string())
            .unwrap_or_else(|| req.method().to_string());
        let path = req.uri().path().to_string();
        let protocol = format!("{:?}", req.version());
        let client = req
            .extensions()
            .get::<ClientAddr>()
            .map(ToString::to_string)
            .unwrap_or_else(|| "-".to_string());

        let request_id = extract_or_generate_request_id(req.headers());
        req.extensions_mut().insert(request_id.clone());

        let span = info_span!(
            "request",
            request_id = %request_id,
            method = %method,
            path = %path,
            client = %client,
        );

        let future = {
            let _enter = span.enter();
            self.inner.call(req)
        };

        AccessLogFuture {
            inner: future,
            start,
            method,
            path,
            protocol,
            request_id,
            span,
        }
    }
}

pin_project! {
    /// Future wrapper that logs and records metrics on completion.
    pub struct AccessLogFuture<F> {
        #[pin]
        inner: F,
        start: Instant,
        method: String,
        path: String,
        protocol: String,
        request_id: RequestId,
        span: Span,
    }
}

impl<F, ResBody, E> Future for AccessLogFuture<F>
where
    F: Future<Output = Result<Response<ResBody>, E>>,
    ResBody: Body,
{
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let _enter = this.span.enter();

        let result = match this.inner.poll(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(result) => result,
        };

        let duration = this.start.elapsed();
        let latency_ms = duration.as_secs_f64() * 1000.0;
        let label = metric_path(this.path);

        match result {
            Ok(mut response) => {
                let status = response.status().as_u16();
                let bytes = response_size(&response);

                if let Ok(value) = HeaderValue::from_str(this.request_id.as_str()) {
                    response.headers_mut().insert(REQUEST_ID_HEADER, value);
                }

                metrics::counter!(
                    "http_requests_total",
                    "method" => this.method.clone(),
                    "path" => label,
                    "status" => status_bucket(status)
                )
                .increment(1);

                metrics::histogram!(
                    "http_request_duration_seconds",
                    "method" => this.method.clone(),
                    "path" => label
                )
                .record(duration.as_secs_f64());

                if let Some(bytes) = bytes {
                    metrics::histogram!(
                        "http_response_size_bytes",
                        "method" => this.method.clone(),
                        "path" => label
                    )
                    .record(bytes as f64);
                }

                tracing::info!(
                    protocol = %this.protocol,
                    status,
                    bytes = bytes.unwrap_or(0),
                    latency_ms,
                    "request completed"
                );

                Poll::Ready(Ok(response))
            }
            Err(err) => {
                metrics::counter!(
                    "http_requests_total",
                    "method" => this.method.clone(),
                    "path" => label,
                    "status" => "5xx"
                )
                .increment(1);

                tracing::error!(protocol = %this.protocol, latency_ms, "request failed");
                Poll::Ready(Err(err))
            }
        }
    }
}

/// Body size from `Content-Length`, or the body's exact size hint.
fn response_size<B: Body>(response: &Response<B>) -> Option<u64> {
    response
        .headers()
        .get(http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .or_else(|| response.body().size_hint().exact())
}
