use std::sync::Arc;
use std::time::Instant;

use serde_json::{Map, Value};

use super::{
    ClusterInfo, ElasticBackend, MatchType, PingStatus, SearchBackend, SearchQuery,
    SearchResponse,
};
use crate::config::ElasticConfig;
use crate::error::{Error, Result};

/// Search abstraction shared by every request handler.
///
/// Cheap to clone; all clones share the same backend connection.
#[derive(Debug, Clone)]
pub struct SearchService {
    backend: Arc<dyn SearchBackend>,
    cluster: ClusterInfo,
}

impl SearchService {
    /// Connect to the configured cluster.
    ///
    /// Builds the transport and verifies connectivity by reading cluster info.
    /// Failure here is meant to abort startup.
    pub async fn connect(config: &ElasticConfig) -> Result<Self> {
        tracing::info!(nodes = ?config.nodes, "connecting to elasticsearch");
        let backend = ElasticBackend::from_config(config)?;
        Self::with_backend(Arc::new(backend)).await
    }

    /// Wrap an existing backend, verifying connectivity the same way
    /// [`SearchService::connect`] does.
    pub async fn with_backend(backend: Arc<dyn SearchBackend>) -> Result<Self> {
        let cluster = backend.info().await.map_err(|e| Error::Connection {
            message: e.to_string(),
        })?;

        tracing::info!(
            cluster = %cluster.cluster_name,
            server_version = %cluster.version,
            client_version = crate::VERSION,
            "connected to elasticsearch"
        );

        Ok(Self { backend, cluster })
    }

    /// Version reported by the cluster at connect time.
    pub fn server_version(&self) -> &str {
        &self.cluster.version
    }

    pub fn cluster(&self) -> &ClusterInfo {
        &self.cluster
    }

    /// Create every index in `names` that does not exist yet.
    ///
    /// A failure on one index is logged and skipped; the remaining indexes are
    /// still provisioned. Returns the indexes that were created.
    pub async fn ensure_indexes(&self, names: &[String]) -> Vec<String> {
        tracing::info!(count = names.len(), "creating indexes if not found");
        let mut created = Vec::new();

        for index in names {
            match self.backend.index_exists(index).await {
                Ok(true) => {
                    tracing::debug!(index = %index, "index already exists");
                }
                Ok(false) => match self.backend.create_index(index).await {
                    Ok(()) => {
                        tracing::info!(index = %index, "index created");
                        created.push(index.clone());
                    }
                    Err(e) => {
                        tracing::error!(index = %index, error = %e, "unable to create index, skipping");
                    }
                },
                Err(e) => {
                    tracing::error!(index = %index, error = %e, "unable to check index, skipping");
                }
            }
        }

        created
    }

    /// Probe backend liveness. Any failure yields [`PingStatus::unavailable`].
    pub async fn ping(&self) -> PingStatus {
        let start = Instant::now();
        match self.backend.ping().await {
            Ok(()) => PingStatus {
                available: true,
                latency_ms: i64::try_from(start.elapsed().as_millis()).unwrap_or(i64::MAX),
            },
            Err(e) => {
                tracing::debug!(error = %e, "elasticsearch ping failed");
                PingStatus::unavailable()
            }
        }
    }

    /// Whether `index` exists. Errors count as `false`: existence is never
    /// reported unless the backend confirmed it.
    pub async fn index_exists(&self, index: &str) -> bool {
        match self.backend.index_exists(index).await {
            Ok(exists) => exists,
            Err(e) => {
                tracing::warn!(index, error = %e, "index existence probe failed");
                false
            }
        }
    }

    /// Run a search.
    ///
    /// An unknown `match_type` fails with [`Error::InvalidMatchType`] before the
    /// backend is contacted. Backend failures are logged here with full detail;
    /// callers should only surface [`Error::public_message`].
    pub async fn search(
        &self,
        index: &str,
        match_type: &str,
        payload: Map<String, Value>,
    ) -> Result<SearchResponse> {
        let resolved = MatchType::resolve(match_type);
        let query = SearchQuery::new(index, resolved, payload).ok_or_else(|| {
            Error::InvalidMatchType {
                match_type: match_type.to_string(),
            }
        })?;

        tracing::debug!(index, match_type = %resolved, "searching index");
        tracing::trace!(body = %query.body(), "search body");

        let start = Instant::now();
        let raw = self.backend.search(&query).await.map_err(|e| {
            tracing::error!(index, match_type = %resolved, error = %e, "search failed");
            e
        })?;
        let elapsed = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        Ok(SearchResponse::from_raw(raw, elapsed))
    }
}
