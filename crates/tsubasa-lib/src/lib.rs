//! Tsubasa library entry points.
//!
//! This crate holds everything the gateway knows about the search backend:
//! configuration, match-type resolution, query construction, typed decoding of
//! backend responses and the [`SearchService`] that ties them together. The
//! HTTP crates only translate between requests and the functions exported
//! here instead of talking to Elasticsearch themselves.

pub mod config;
pub mod error;
pub mod search;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use crate::config::{AuthCredentials, Config, ElasticConfig, DEFAULT_CONFIG_TOML};
pub use crate::error::{Error, Result};
pub use crate::search::{
    ClusterInfo, ElasticBackend, MatchType, PingStatus, SearchBackend, SearchQuery,
    SearchResponse, SearchService,
};

/// Gateway version, taken from the crate manifest.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Git commit the binary was built from, injected through `TSUBASA_COMMIT_SHA`
/// at compile time.
pub const COMMIT_SHA: &str = match option_env!("TSUBASA_COMMIT_SHA") {
    Some(sha) => sha,
    None => "unknown",
};

/// Build date injected through `TSUBASA_BUILD_DATE` at compile time.
pub const BUILD_DATE: &str = match option_env!("TSUBASA_BUILD_DATE") {
    Some(date) => date,
    None => "unknown",
};
