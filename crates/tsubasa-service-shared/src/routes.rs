//! Route table.
//!
//! ```text
//! GET  /                       hello
//! GET  /info                   build info and backend health
//! GET  /health/live            liveness probe
//! GET  /health/ready           readiness probe
//! GET  /elastic/{index}        index existence
//! POST /elastic/{index}/search search an index
//! GET  /metrics                Prometheus exposition
//! ```
//!
//! Unknown paths answer 404 `ROUTE_NOT_FOUND` and known paths with the
//! wrong method answer 405 `INVALID_METHOD`, both as envelopes.

use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, PathRejection},
        OriginalUri, Path, State,
    },
    http::Method,
    response::{IntoResponse, Response},
    routing::{get, post, MethodRouter},
    Router,
};
use serde_json::json;

use tsubasa_lib::MatchType;

use crate::envelope::{from_lib_error, ApiResult};
use crate::health::{health_live, health_ready};
use crate::metrics::{
    failure_reason, index_label, metrics_handler, record_backend_latency, record_search,
    record_search_failed,
};
use crate::middleware::pipeline;
use crate::request::SearchRequest;
use crate::AppState;

/// Build the complete application: every route group wrapped in the
/// middleware pipeline.
pub fn router(state: AppState) -> Router {
    let auth = state.auth().clone();
    let reporter = state.reporter();

    let app = Router::new()
        .route("/", allow(get(hello)))
        .route("/info", allow(get(info)))
        .route("/metrics", allow(get(metrics_handler)))
        .nest("/health", health_routes())
        .nest("/elastic", elastic_routes())
        .fallback(not_found)
        .with_state(state);

    pipeline(app, auth, reporter)
}

fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/live", allow(get(health_live)))
        .route("/ready", allow(get(health_ready)))
}

fn elastic_routes() -> Router<AppState> {
    Router::new()
        .route("/{index}", allow(get(index_exists)))
        .route("/{index}/search", allow(post(search)))
}

/// Answer unsupported methods on a known path with an envelope.
fn allow(route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.fallback(method_not_allowed)
}

async fn not_found(method: Method, OriginalUri(uri): OriginalUri) -> ApiResult {
    ApiResult::not_found(&method, uri.path())
}

async fn method_not_allowed(method: Method, OriginalUri(uri): OriginalUri) -> ApiResult {
    ApiResult::method_not_allowed(&method, uri.path())
}

async fn hello() -> ApiResult {
    ApiResult::ok(json!({ "hello": "world" }))
}

async fn info(State(state): State<AppState>) -> ApiResult {
    let search = state.search();
    let ping = search.ping().await;

    ApiResult::ok(json!({
        "version": tsubasa_lib::VERSION,
        "commit_sha": tsubasa_lib::COMMIT_SHA,
        "build_date": tsubasa_lib::BUILD_DATE,
        "elastic": {
            "healthy": ping.available,
            "ping_ms": ping.latency_ms,
            "server_version": search.server_version(),
            "client_version": tsubasa_lib::VERSION,
        }
    }))
}

async fn index_exists(
    State(state): State<AppState>,
    index: Result<Path<String>, PathRejection>,
) -> ApiResult {
    let Path(index) = match index {
        Ok(index) => index,
        Err(rejection) => return rejection.into(),
    };

    let exists = state.search().index_exists(&index).await;
    ApiResult::ok(json!({ "exists": exists }))
}

async fn search(
    State(state): State<AppState>,
    index: Result<Path<String>, PathRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let Path(index) = match index {
        Ok(index) => index,
        Err(rejection) => return ApiResult::from(rejection).into_response(),
    };
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            record_search_failed("invalid_request");
            return ApiResult::from(rejection).into_response();
        }
    };

    let request = match SearchRequest::from_body(&body) {
        Ok(request) => request,
        Err(rejection) => {
            record_search_failed("invalid_request");
            return rejection.into_response();
        }
    };

    let match_type = MatchType::resolve(&request.match_type);
    match state
        .search()
        .search(&index, &request.match_type, request.data)
        .await
    {
        Ok(response) => {
            record_search(index_label(&index, state.indexes()), match_type);
            record_backend_latency(Duration::from_millis(response.request_latency_ms));
            ApiResult::ok(response).into_response()
        }
        Err(e) => {
            record_search_failed(failure_reason(&e));
            from_lib_error(&e).into_response()
        }
    }
}
