//! Elasticsearch REST transport.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Certificate, Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;

use super::{ClusterInfo, RawErrorResponse, RawSearchResponse, SearchBackend, SearchQuery};
use crate::config::ElasticConfig;
use crate::error::{Error, Result};

const ALREADY_EXISTS: &str = "resource_already_exists_exception";

/// [`SearchBackend`] that talks to Elasticsearch over its REST API.
///
/// Requests rotate round-robin over the configured nodes. The underlying
/// client pools connections and is shared by every request.
#[derive(Debug)]
pub struct ElasticBackend {
    client: Client,
    nodes: Vec<Url>,
    next: AtomicUsize,
    credentials: Option<(String, String)>,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct RawInfo {
    #[serde(default)]
    cluster_name: String,
    version: RawVersion,
}

#[derive(Debug, Deserialize)]
struct RawVersion {
    number: String,
}

impl ElasticBackend {
    /// Build the transport from configuration. Performs no network calls.
    pub fn from_config(config: &ElasticConfig) -> Result<Self> {
        if config.nodes.is_empty() {
            return Err(Error::InvalidNode {
                node: String::new(),
                reason: "no nodes configured".to_string(),
            });
        }

        let nodes = config
            .nodes
            .iter()
            .map(|node| parse_node(node))
            .collect::<Result<Vec<_>>>()?;

        let mut builder = Client::builder()
            .user_agent(concat!("tsubasa/", env!("CARGO_PKG_VERSION")))
            .pool_max_idle_per_host(10)
            .timeout(config.request_timeout());

        if config.skip_ssl_verify {
            tracing::warn!("TLS certificate verification for elasticsearch is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(path) = &config.ca_path {
            tracing::info!(path = %path.display(), "using CA certificate for elasticsearch");
            builder = builder.add_root_certificate(load_certificate(path)?);
        }

        let credentials = match (&config.username, &config.password) {
            (Some(username), Some(password)) => Some((username.clone(), password.clone())),
            _ => None,
        };

        Ok(Self {
            client: builder.build()?,
            nodes,
            next: AtomicUsize::new(0),
            credentials,
            timeout: config.request_timeout(),
        })
    }

    fn next_node(&self) -> &Url {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.nodes.len();
        &self.nodes[index]
    }

    /// URL on the next node with `segments` appended as encoded path segments.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.next_node().clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url).timeout(self.timeout);
        match &self.credentials {
            Some((username, password)) => builder.basic_auth(username, Some(password)),
            None => builder,
        }
    }
}

#[async_trait]
impl SearchBackend for ElasticBackend {
    async fn info(&self) -> Result<ClusterInfo> {
        let response = self.request(Method::GET, self.endpoint(&[])).send().await?;
        if !response.status().is_success() {
            return Err(backend_error(response).await);
        }

        let body = response.bytes().await?;
        let info: RawInfo = serde_json::from_slice(&body)?;
        Ok(ClusterInfo {
            cluster_name: info.cluster_name,
            version: info.version.number,
        })
    }

    async fn ping(&self) -> Result<()> {
        let response = self.request(Method::HEAD, self.endpoint(&[])).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(backend_error(response).await)
        }
    }

    async fn index_exists(&self, index: &str) -> Result<bool> {
        let response = self
            .request(Method::HEAD, self.endpoint(&[index]))
            .send()
            .await?;

        let status = response.status();
        tracing::debug!(index, status = status.as_u16(), "HEAD index");

        if status.is_success() {
            Ok(true)
        } else if status == StatusCode::NOT_FOUND {
            Ok(false)
        } else {
            Err(backend_error(response).await)
        }
    }

    async fn create_index(&self, index: &str) -> Result<()> {
        let response = self
            .request(Method::PUT, self.endpoint(&[index]))
            .json(&serde_json::json!({}))
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(());
        }

        match backend_error(response).await {
            // Another gateway created it between our existence check and now.
            Error::Backend { kind, .. } if kind == ALREADY_EXISTS => Ok(()),
            err => Err(err),
        }
    }

    async fn search(&self, query: &SearchQuery) -> Result<RawSearchResponse> {
        let mut url = self.endpoint(&[query.index(), "_search"]);
        url.query_pairs_mut().append_pair("track_total_hits", "true");

        let response = self
            .request(Method::POST, url)
            .json(&query.body())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response).await);
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

fn parse_node(node: &str) -> Result<Url> {
    let url = Url::parse(node).map_err(|e| Error::InvalidNode {
        node: node.to_string(),
        reason: e.to_string(),
    })?;

    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(Error::InvalidNode {
            node: node.to_string(),
            reason: "expected an http(s) base URL".to_string(),
        });
    }

    Ok(url)
}

fn load_certificate(path: &Path) -> Result<Certificate> {
    let pem = std::fs::read(path).map_err(|e| Error::CaCertificate {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    Certificate::from_pem(&pem).map_err(|e| Error::CaCertificate {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Turn a non-success response into [`Error::Backend`], keeping the backend's
/// own error type and reason for the logs.
async fn backend_error(response: Response) -> Error {
    let status = response.status().as_u16();
    let body = match response.bytes().await {
        Ok(body) => body,
        Err(err) => return Error::Http(err),
    };

    match serde_json::from_slice::<RawErrorResponse>(&body) {
        Ok(raw) => Error::Backend {
            status,
            kind: raw.error.kind().to_string(),
            reason: raw.error.reason().to_string(),
        },
        Err(_) => Error::Backend {
            status,
            kind: "unknown".to_string(),
            reason: String::from_utf8_lossy(&body).into_owned(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(nodes: &[&str]) -> ElasticConfig {
        ElasticConfig {
            nodes: nodes.iter().map(|n| n.to_string()).collect(),
            ..ElasticConfig::default()
        }
    }

    #[test]
    fn rejects_empty_node_list() {
        let err = ElasticBackend::from_config(&config(&[])).unwrap_err();
        assert!(matches!(err, Error::InvalidNode { .. }));
    }

    #[test]
    fn rejects_non_http_nodes() {
        let err = ElasticBackend::from_config(&config(&["mailto:es@example.com"])).unwrap_err();
        assert!(matches!(err, Error::InvalidNode { .. }));

        let err = ElasticBackend::from_config(&config(&["not a url"])).unwrap_err();
        assert!(matches!(err, Error::InvalidNode { .. }));
    }

    #[test]
    fn endpoint_encodes_index_as_one_segment() {
        let backend = ElasticBackend::from_config(&config(&["http://localhost:9200"])).unwrap();

        let url = backend.endpoint(&["books", "_search"]);
        assert_eq!(url.as_str(), "http://localhost:9200/books/_search");

        let url = backend.endpoint(&["../_cluster/settings"]);
        assert_eq!(
            url.as_str(),
            "http://localhost:9200/..%2F_cluster%2Fsettings"
        );
    }

    #[test]
    fn endpoint_keeps_node_path_prefix() {
        let backend = ElasticBackend::from_config(&config(&["http://proxy:8080/es/"])).unwrap();
        let url = backend.endpoint(&["books"]);
        assert_eq!(url.as_str(), "http://proxy:8080/es/books");
    }

    #[test]
    fn nodes_rotate_round_robin() {
        let backend =
            ElasticBackend::from_config(&config(&["http://es-1:9200", "http://es-2:9200"]))
                .unwrap();

        let first = backend.endpoint(&[]).host_str().map(String::from);
        let second = backend.endpoint(&[]).host_str().map(String::from);
        let third = backend.endpoint(&[]).host_str().map(String::from);

        assert_eq!(first.as_deref(), Some("es-1"));
        assert_eq!(second.as_deref(), Some("es-2"));
        assert_eq!(third.as_deref(), Some("es-1"));
    }

    #[test]
    fn missing_ca_file_is_reported() {
        let mut cfg = config(&["https://localhost:9200"]);
        cfg.ca_path = Some("/nonexistent/ca.pem".into());

        let err = ElasticBackend::from_config(&cfg).unwrap_err();
        match err {
            Error::CaCertificate { path, .. } => assert!(path.ends_with("ca.pem")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
