//! Application state shared by every handler.

use std::sync::Arc;

use tsubasa_lib::SearchService;

use crate::middleware::BasicAuth;
use crate::reporter::ErrorReporter;

/// Dependencies built once at startup and handed to the router.
///
/// Cheap to clone; every clone shares the same backend connection.
///
/// ```ignore
/// let search = SearchService::connect(&config.elastic).await?;
/// let state = AppState::new(search).with_auth(BasicAuth::new(config.auth_credentials()));
/// let app = tsubasa_service_shared::router(state);
/// ```
#[derive(Clone)]
pub struct AppState {
    search: SearchService,
    auth: BasicAuth,
    reporter: Option<Arc<dyn ErrorReporter>>,
    /// Indexes named in the configuration; used to bound metric labels.
    indexes: Arc<[String]>,
}

impl AppState {
    /// State with the credential gate disabled and no crash reporter.
    pub fn new(search: SearchService) -> Self {
        Self {
            search,
            auth: BasicAuth::disabled(),
            reporter: None,
            indexes: Arc::from(Vec::new()),
        }
    }

    pub fn with_auth(mut self, auth: BasicAuth) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn with_indexes(mut self, indexes: Vec<String>) -> Self {
        self.indexes = Arc::from(indexes);
        self
    }

    pub fn search(&self) -> &SearchService {
        &self.search
    }

    pub fn auth(&self) -> &BasicAuth {
        &self.auth
    }

    pub fn reporter(&self) -> Option<Arc<dyn ErrorReporter>> {
        self.reporter.clone()
    }

    pub fn indexes(&self) -> &[String] {
        &self.indexes
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("server_version", &self.search.server_version())
            .field("auth_enabled", &self.auth.is_enabled())
            .field("has_reporter", &self.reporter.is_some())
            .field("indexes", &self.indexes)
            .finish()
    }
}
