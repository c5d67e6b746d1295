//! Health check handlers for liveness and readiness probes.
//!
//! Provides `/health/live` and `/health/ready`. These answer in their own
//! probe format rather than the result envelope so orchestrators can read
//! them without knowing about Tsubasa.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::AppState;

const SERVICE_NAME: &str = "tsubasa";

/// Health status response for liveness and readiness probes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Status indicator: "ok" or "not_ready: <reason>".
    pub status: String,

    pub service: String,

    pub version: String,

    /// Whether the backend answered the readiness ping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_available: Option<bool>,

    /// Round-trip of the readiness ping in milliseconds (`-1` when unreachable).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_latency_ms: Option<i64>,
}

impl HealthStatus {
    pub fn alive(service: &str, version: &str) -> Self {
        Self {
            status: "ok".to_string(),
            service: service.to_string(),
            version: version.to_string(),
            backend_available: None,
            backend_latency_ms: None,
        }
    }

    pub fn ready(service: &str, version: &str, latency_ms: i64) -> Self {
        Self {
            status: "ok".to_string(),
            service: service.to_string(),
            version: version.to_string(),
            backend_available: Some(true),
            backend_latency_ms: Some(latency_ms),
        }
    }

    pub fn not_ready(service: &str, version: &str, reason: &str) -> Self {
        Self {
            status: format!("not_ready: {}", reason),
            service: service.to_string(),
            version: version.to_string(),
            backend_available: Some(false),
            backend_latency_ms: Some(-1),
        }
    }
}

/// Liveness probe handler.
///
/// Always 200 while the process is serving; never touches the backend.
///
/// ```text
/// GET /health/live
/// {"status":"ok","service":"tsubasa","version":"0.1.0"}
/// ```
pub async fn health_live() -> impl IntoResponse {
    let status = HealthStatus::alive(SERVICE_NAME, tsubasa_lib::VERSION);
    (StatusCode::OK, Json(status))
}

/// Readiness probe handler.
///
/// Pings the backend and answers 503 when it is unreachable.
///
/// ```text
/// GET /health/ready
/// {"status":"ok","service":"tsubasa","version":"0.1.0","backend_available":true,"backend_latency_ms":2}
/// ```
pub async fn health_ready(State(state): State<AppState>) -> Response {
    let ping = state.search().ping().await;

    if !ping.available {
        let status =
            HealthStatus::not_ready(SERVICE_NAME, tsubasa_lib::VERSION, "backend unreachable");
        return (StatusCode::SERVICE_UNAVAILABLE, Json(status)).into_response();
    }

    let status = HealthStatus::ready(SERVICE_NAME, tsubasa_lib::VERSION, ping.latency_ms);
    (StatusCode::OK, Json(status)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_status_alive() {
        let status = HealthStatus::alive("tsubasa", "1.0.0");
        assert_eq!(status.status, "ok");
        assert_eq!(status.service, "tsubasa");
        assert!(status.backend_available.is_none());
    }

    #[test]
    fn test_health_status_not_ready() {
        let status = HealthStatus::not_ready("tsubasa", "1.0.0", "backend unreachable");
        assert!(status.status.starts_with("not_ready:"));
        assert_eq!(status.backend_available, Some(false));
        assert_eq!(status.backend_latency_ms, Some(-1));
    }

    #[test]
    fn test_health_status_serialization() {
        let json = serde_json::to_string(&HealthStatus::alive("tsubasa", "0.1.0")).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(!json.contains("backend_available"));

        let json = serde_json::to_string(&HealthStatus::ready("tsubasa", "0.1.0", 3)).unwrap();
        assert!(json.contains("\"backend_latency_ms\":3"));
    }
}
