//! Search abstraction over the Elasticsearch backend.
//!
//! - [`MatchType`]: resolution of client-supplied match types
//! - [`SearchQuery`]: query construction
//! - [`SearchResponse`]: typed decode and normalization of backend results
//! - [`SearchBackend`]: the operations the gateway needs from a backend
//! - [`ElasticBackend`]: REST implementation of [`SearchBackend`]
//! - [`SearchService`]: what the HTTP layer calls

mod backend;
mod elastic;
mod match_type;
mod query;
mod response;
mod service;

pub use backend::{ClusterInfo, PingStatus, SearchBackend};
pub use elastic::ElasticBackend;
pub use match_type::MatchType;
pub use query::SearchQuery;
pub use response::{
    RawErrorCause, RawErrorResponse, RawHit, RawHits, RawSearchResponse, RawTotal,
    SearchResponse,
};
pub use service::SearchService;
