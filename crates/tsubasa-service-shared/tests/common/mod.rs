#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::http::{header, HeaderName, HeaderValue};
use axum_test::TestServer;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use tsubasa_lib::test_utils::MockBackend;
use tsubasa_lib::{AuthCredentials, SearchService};
use tsubasa_service_shared::{router, AppState, BasicAuth, ErrorReporter, FaultReport};

pub const USERNAME: &str = "noel";
pub const PASSWORD: &str = "hunter2";

/// Connect a [`SearchService`] to `backend`.
pub async fn state_with(backend: MockBackend) -> (AppState, Arc<MockBackend>) {
    let backend = Arc::new(backend);
    let search = SearchService::with_backend(backend.clone())
        .await
        .expect("mock backend connects");
    (AppState::new(search), backend)
}

/// Full application over `backend` with the credential gate disabled.
pub async fn server_with(backend: MockBackend) -> (TestServer, Arc<MockBackend>) {
    let (state, backend) = state_with(backend).await;
    let server = TestServer::new(router(state)).expect("test server starts");
    (server, backend)
}

/// Full application with the credential gate enabled for
/// [`USERNAME`]/[`PASSWORD`].
pub async fn secured_server() -> TestServer {
    let (state, _) = state_with(MockBackend::new()).await;
    let state = state.with_auth(BasicAuth::new(Some(AuthCredentials {
        username: USERNAME.to_string(),
        password: PASSWORD.to_string(),
    })));
    TestServer::new(router(state)).expect("test server starts")
}

pub fn authorization(username: &str, password: &str) -> (HeaderName, HeaderValue) {
    let encoded = STANDARD.encode(format!("{}:{}", username, password));
    let value = HeaderValue::from_str(&format!("Basic {}", encoded)).expect("valid header");
    (header::AUTHORIZATION, value)
}

/// Reporter that keeps every report in memory.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<FaultReport>>,
}

impl RecordingReporter {
    pub fn reports(&self) -> Vec<FaultReport> {
        self.reports.lock().unwrap().clone()
    }
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, report: FaultReport) {
        self.reports.lock().unwrap().push(report);
    }
}
