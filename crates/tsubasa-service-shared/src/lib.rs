//! HTTP layer of the Tsubasa search gateway.
//!
//! - [`ApiResult`]: the result envelope every response is written as
//! - [`middleware`]: the ordered request pipeline
//! - [`router`]: route table with envelope 404/405 handling
//! - [`AppState`]: dependencies built once at startup
//! - [`health`]: liveness and readiness probes
//! - [`metrics`]: Prometheus metrics infrastructure
//! - [`logging`]: structured logging setup and panic hook
//! - [`reporter`]: crash reporting for recovered panics
//! - [`lifecycle`]: serve, signal handling and bounded graceful shutdown
//!
//! # Architecture
//!
//! Handlers stay thin. All backend knowledge lives in `tsubasa-lib`:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  axum Handler                                               │
//! │  - Parse and validate the request body                      │
//! │  - Call tsubasa_lib::SearchService                          │
//! │  - Wrap the outcome in an ApiResult                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod envelope;
mod health;
pub mod lifecycle;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod reporter;
mod request;
mod routes;
mod state;

pub use envelope::{from_lib_error, ApiError, ApiResult};
pub use health::{health_live, health_ready, HealthStatus};
pub use lifecycle::{shutdown_signal, Lifecycle, LifecycleState, ShutdownOutcome};
pub use logging::{build_subscriber, init_logging, install_panic_hook, LogFormat, LoggingConfig};
pub use metrics::{init_metrics, metrics_handler, MetricsConfig, MetricsError};
pub use middleware::{pipeline, AbortHandler, BasicAuth, ClientAddr, Hijack, RequestId};
pub use reporter::{ErrorReporter, FaultReport, ReporterError, WebhookReporter};
pub use request::SearchRequest;
pub use routes::router;
pub use state::AppState;
