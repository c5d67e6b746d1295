//! Crash reporting for recovered handler panics.
//!
//! The gateway works the same with or without a reporter. When a
//! `crash_report_url` is configured, [`WebhookReporter`] posts each
//! [`FaultReport`] as JSON in the background so a slow collector never
//! holds up the response.

use std::fmt::Debug;
use std::time::Duration;

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How long a single report delivery may take.
pub const REPORT_TIMEOUT: Duration = Duration::from_secs(1);

/// A recovered fault, as sent to the collector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultReport {
    pub message: String,
    pub method: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// RFC 3339 time the fault was recovered.
    pub timestamp: String,
    pub version: String,
}

impl FaultReport {
    pub fn new(
        message: impl Into<String>,
        method: impl Into<String>,
        path: impl Into<String>,
        request_id: Option<String>,
    ) -> Self {
        Self {
            message: message.into(),
            method: method.into(),
            path: path.into(),
            request_id,
            timestamp: chrono::Utc::now().to_rfc3339(),
            version: tsubasa_lib::VERSION.to_string(),
        }
    }
}

/// Sink for recovered faults.
///
/// `report` must not block the calling request.
pub trait ErrorReporter: Send + Sync + Debug {
    fn report(&self, report: FaultReport);
}

#[derive(Debug, Error)]
pub enum ReporterError {
    #[error("invalid crash report url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to build crash report client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Posts fault reports to an HTTP endpoint.
#[derive(Debug, Clone)]
pub struct WebhookReporter {
    client: Client,
    url: Url,
}

impl WebhookReporter {
    pub fn new(url: &str) -> Result<Self, ReporterError> {
        let parsed = Url::parse(url).map_err(|e| ReporterError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ReporterError::InvalidUrl {
                url: url.to_string(),
                reason: "expected an http(s) url".to_string(),
            });
        }

        let client = Client::builder()
            .user_agent(concat!("tsubasa/", env!("CARGO_PKG_VERSION")))
            .timeout(REPORT_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            url: parsed,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn deliver(client: Client, url: Url, report: FaultReport) {
        match client.post(url).json(&report).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!("crash report delivered");
            }
            Ok(response) => {
                tracing::warn!(status = response.status().as_u16(), "crash report rejected");
            }
            Err(e) => {
                tracing::warn!(error = %e, "crash report delivery failed");
            }
        }
    }
}

impl ErrorReporter for WebhookReporter {
    fn report(&self, report: FaultReport) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("no async runtime available, dropping crash report");
            return;
        };

        runtime.spawn(Self::deliver(self.client.clone(), self.url.clone(), report));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn rejects_bad_urls() {
        assert!(matches!(
            WebhookReporter::new("not a url"),
            Err(ReporterError::InvalidUrl { .. })
        ));
        assert!(matches!(
            WebhookReporter::new("ftp://crash.example.com"),
            Err(ReporterError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn report_without_runtime_is_dropped() {
        let reporter = WebhookReporter::new("http://127.0.0.1:9/crash").unwrap();
        reporter.report(FaultReport::new("boom", "GET", "/", None));
    }

    #[tokio::test]
    async fn reports_are_posted_as_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/crash"))
            .and(body_partial_json(serde_json::json!({
                "message": "boom",
                "method": "GET",
                "path": "/explode",
                "request_id": "req-1"
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let reporter = WebhookReporter::new(&format!("{}/crash", server.uri())).unwrap();
        reporter.report(FaultReport::new(
            "boom",
            "GET",
            "/explode",
            Some("req-1".to_string()),
        ));

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            let received = server.received_requests().await.unwrap_or_default();
            if !received.is_empty() || tokio::time::Instant::now() > deadline {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        server.verify().await;
    }
}
