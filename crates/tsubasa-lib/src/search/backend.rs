use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{RawSearchResponse, SearchQuery};
use crate::error::Result;

/// Identity of the cluster behind the gateway, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterInfo {
    pub cluster_name: String,
    pub version: String,
}

/// Result of a liveness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingStatus {
    pub available: bool,
    /// Round-trip time in milliseconds, or `-1` when the backend is unreachable.
    pub latency_ms: i64,
}

impl PingStatus {
    pub fn unavailable() -> Self {
        Self {
            available: false,
            latency_ms: -1,
        }
    }
}

/// Operations the gateway needs from a search backend.
///
/// Implementations must be safe to share between concurrent requests.
/// Every call is expected to honour its own deadline; callers cancel a call
/// by dropping the returned future.
#[async_trait]
pub trait SearchBackend: Send + Sync + Debug {
    /// Fetch cluster identity. Used to verify connectivity at startup.
    async fn info(&self) -> Result<ClusterInfo>;

    /// Lightweight liveness check.
    async fn ping(&self) -> Result<()>;

    /// `Ok(false)` only when the backend positively reports the index missing.
    async fn index_exists(&self, index: &str) -> Result<bool>;

    async fn create_index(&self, index: &str) -> Result<()>;

    async fn search(&self, query: &SearchQuery) -> Result<RawSearchResponse>;
}
