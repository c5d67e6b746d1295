//! Panic-recovery boundary.
//!
//! [`RecoverLayer`] is the innermost layer of the pipeline. A panic raised
//! while a handler runs is logged with its route, forwarded to the
//! configured [`ErrorReporter`] and answered with a generic 500 envelope.
//!
//! Two cases are never converted and keep unwinding instead:
//!
//! - the payload is [`AbortHandler`], raised through [`abort_handler`]
//! - the handler set the request's [`Hijack`] flag because it took over the
//!   connection

use std::any::Any;
use std::convert::Infallible;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use futures::FutureExt;
use tower::{Layer, Service};

use super::access_log::RequestId;
use crate::envelope::ApiResult;
use crate::reporter::{ErrorReporter, FaultReport};

/// Panic payload that aborts the current request without an error response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbortHandler;

/// Abort the current request. The connection is dropped instead of
/// receiving a 500 envelope.
pub fn abort_handler() -> ! {
    std::panic::panic_any(AbortHandler)
}

/// Per-request flag a handler sets once it owns the connection.
///
/// Extract it in a handler and call [`Hijack::set`] before streaming or
/// upgrading; a later panic then propagates untouched.
#[derive(Debug, Clone, Default)]
pub struct Hijack(Arc<AtomicBool>);

impl Hijack {
    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl<S> FromRequestParts<S> for Hijack
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Hijack>().cloned().unwrap_or_default())
    }
}

/// Human-readable text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else if payload.is::<AbortHandler>() {
        "request aborted".to_string()
    } else {
        "non-string panic payload".to_string()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecoverLayer {
    reporter: Option<Arc<dyn ErrorReporter>>,
}

impl RecoverLayer {
    pub fn new(reporter: Option<Arc<dyn ErrorReporter>>) -> Self {
        Self { reporter }
    }
}

impl<S> Layer<S> for RecoverLayer {
    type Service = Recover<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Recover {
            inner,
            reporter: self.reporter.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Recover<S> {
    inner: S,
    reporter: Option<Arc<dyn ErrorReporter>>,
}

impl<S> Service<Request> for Recover<S>
where
    S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        let request_id = req.extensions().get::<RequestId>().map(|id| id.to_string());

        let hijack = Hijack::default();
        req.extensions_mut().insert(hijack.clone());

        let reporter = self.reporter.clone();
        let future = self.inner.call(req);

        Box::pin(async move {
            let payload = match AssertUnwindSafe(future).catch_unwind().await {
                Ok(result) => return result,
                Err(payload) => payload,
            };

            if payload.is::<AbortHandler>() || hijack.is_set() {
                std::panic::resume_unwind(payload);
            }

            let message = panic_message(&*payload);
            tracing::error!(
                method = %method,
                path = %path,
                panic = %message,
                "received panic on route '{} {}'",
                method,
                path
            );

            if let Some(reporter) = reporter {
                reporter.report(FaultReport::new(message, method, path, request_id));
            }

            Ok(ApiResult::internal_error().into_response())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use axum::{body::Body, http::StatusCode, routing::get, Router};
    use tower::ServiceExt;

    #[derive(Debug, Default)]
    struct Recording(Mutex<Vec<FaultReport>>);

    impl ErrorReporter for Recording {
        fn report(&self, report: FaultReport) {
            self.0.lock().unwrap().push(report);
        }
    }

    async fn explode() -> &'static str {
        panic!("kaboom")
    }

    async fn abort() -> &'static str {
        abort_handler()
    }

    async fn hijacked(hijack: Hijack) -> &'static str {
        hijack.set();
        panic!("stream broke")
    }

    fn app(reporter: Option<Arc<dyn ErrorReporter>>) -> Router {
        Router::new()
            .route("/ok", get(|| async { "fine" }))
            .route("/explode", get(explode))
            .route("/abort", get(abort))
            .route("/hijacked", get(hijacked))
            .layer(RecoverLayer::new(reporter))
    }

    fn get_request(path: &str) -> Request {
        Request::builder().uri(path).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn passes_through_normal_responses() {
        let response = app(None).oneshot(get_request("/ok")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn converts_panics_and_reports_them() {
        let recording = Arc::new(Recording::default());
        let response = app(Some(recording.clone()))
            .oneshot(get_request("/explode"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let reports = recording.0.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].message, "kaboom");
        assert_eq!(reports[0].method, "GET");
        assert_eq!(reports[0].path, "/explode");
    }

    #[tokio::test]
    async fn abort_sentinel_keeps_unwinding() {
        let outcome = AssertUnwindSafe(app(None).oneshot(get_request("/abort")))
            .catch_unwind()
            .await;

        let payload = outcome.expect_err("abort must not be converted");
        assert!(payload.is::<AbortHandler>());
    }

    #[tokio::test]
    async fn hijacked_requests_keep_unwinding() {
        let recording = Arc::new(Recording::default());
        let outcome = AssertUnwindSafe(app(Some(recording.clone())).oneshot(get_request("/hijacked")))
            .catch_unwind()
            .await;

        assert!(outcome.is_err());
        assert!(recording.0.lock().unwrap().is_empty());
    }

    #[test]
    fn panic_messages() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42_u8), "non-string panic payload");
    }
}
