//! In-memory [`SearchBackend`] for handler and service tests.
//!
//! Every call is recorded so tests can assert which backend operations a
//! request triggered (or that none were).

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::search::{ClusterInfo, RawSearchResponse, SearchBackend, SearchQuery};

/// Server version reported by [`MockBackend::info`].
pub const MOCK_SERVER_VERSION: &str = "8.11.1";

/// A backend operation observed by [`MockBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Info,
    Ping,
    IndexExists(String),
    CreateIndex(String),
    Search { index: String, body: Value },
}

#[derive(Debug, Default)]
struct MockState {
    indexes: HashSet<String>,
    broken_indexes: HashSet<String>,
    unreachable: bool,
    ping_fails: bool,
    search_body: Option<Value>,
    search_error: Option<(u16, String, String)>,
    calls: Vec<BackendCall>,
}

/// Scriptable backend double.
#[derive(Debug, Default)]
pub struct MockBackend {
    state: Mutex<MockState>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an existing index.
    pub fn with_index(self, index: &str) -> Self {
        self.lock().indexes.insert(index.to_string());
        self
    }

    /// Make existence checks and creation fail for `index`.
    pub fn with_broken_index(self, index: &str) -> Self {
        self.lock().broken_indexes.insert(index.to_string());
        self
    }

    /// Make every call fail as if the cluster were down.
    pub fn unreachable(self) -> Self {
        self.lock().unreachable = true;
        self
    }

    /// Make liveness pings fail while every other call still works.
    pub fn with_failing_ping(self) -> Self {
        self.lock().ping_fails = true;
        self
    }

    /// Answer searches with these `_source` documents.
    pub fn with_hits(self, sources: Vec<Value>) -> Self {
        let body = search_body(&sources);
        self.lock().search_body = Some(body);
        self
    }

    /// Answer searches with an arbitrary raw body (which may not decode).
    pub fn with_raw_search_body(self, body: Value) -> Self {
        self.lock().search_body = Some(body);
        self
    }

    /// Answer searches with a backend error.
    pub fn with_search_error(self, status: u16, kind: &str, reason: &str) -> Self {
        self.lock().search_error = Some((status, kind.to_string(), reason.to_string()));
        self
    }

    /// Every call observed so far, in order.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().calls.clone()
    }

    pub fn search_calls(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| matches!(call, BackendCall::Search { .. }))
            .count()
    }

    pub fn has_index(&self, index: &str) -> bool {
        self.lock().indexes.contains(index)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, call: BackendCall) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(call);
        if state.unreachable {
            return Err(Error::Connection {
                message: "mock backend is unreachable".to_string(),
            });
        }
        Ok(())
    }
}

/// Raw `_search` body with one hit per source document.
pub fn search_body(sources: &[Value]) -> Value {
    let hits: Vec<Value> = sources
        .iter()
        .enumerate()
        .map(|(i, source)| {
            json!({
                "_index": "mock",
                "_id": i.to_string(),
                "_score": 1.0,
                "_source": source
            })
        })
        .collect();
    let max_score = if sources.is_empty() {
        Value::Null
    } else {
        json!(1.0)
    };

    json!({
        "took": 3,
        "timed_out": false,
        "hits": {
            "total": { "value": sources.len(), "relation": "eq" },
            "max_score": max_score,
            "hits": hits
        }
    })
}

#[async_trait]
impl SearchBackend for MockBackend {
    async fn info(&self) -> Result<ClusterInfo> {
        self.record(BackendCall::Info)?;
        Ok(ClusterInfo {
            cluster_name: "mock-cluster".to_string(),
            version: MOCK_SERVER_VERSION.to_string(),
        })
    }

    async fn ping(&self) -> Result<()> {
        self.record(BackendCall::Ping)?;
        if self.lock().ping_fails {
            return Err(Error::Connection {
                message: "mock ping failed".to_string(),
            });
        }
        Ok(())
    }

    async fn index_exists(&self, index: &str) -> Result<bool> {
        self.record(BackendCall::IndexExists(index.to_string()))?;
        let state = self.lock();
        if state.broken_indexes.contains(index) {
            return Err(Error::Backend {
                status: 500,
                kind: "mock_exception".to_string(),
                reason: format!("index {} is broken", index),
            });
        }
        Ok(state.indexes.contains(index))
    }

    async fn create_index(&self, index: &str) -> Result<()> {
        self.record(BackendCall::CreateIndex(index.to_string()))?;
        let mut state = self.lock();
        if state.broken_indexes.contains(index) {
            return Err(Error::Backend {
                status: 500,
                kind: "mock_exception".to_string(),
                reason: format!("index {} is broken", index),
            });
        }
        state.indexes.insert(index.to_string());
        Ok(())
    }

    async fn search(&self, query: &SearchQuery) -> Result<RawSearchResponse> {
        self.record(BackendCall::Search {
            index: query.index().to_string(),
            body: query.body(),
        })?;

        let state = self.lock();
        if let Some((status, kind, reason)) = &state.search_error {
            return Err(Error::Backend {
                status: *status,
                kind: kind.clone(),
                reason: reason.clone(),
            });
        }

        let body = state.search_body.clone().unwrap_or_else(|| search_body(&[]));
        Ok(serde_json::from_value(body)?)
    }
}
