//! Gateway configuration.
//!
//! Configuration is read from a TOML file and then overlaid with environment
//! variables using the `TSUBASA_` prefix (`__` separates nested keys, so
//! `TSUBASA_ELASTIC__NODES=http://a:9200,http://b:9200` overrides
//! `elastic.nodes`).
//!
//! The file is discovered in this order:
//!
//! 1. The path given explicitly (the `--config` flag).
//! 2. `TSUBASA_CONFIG_PATH`.
//! 3. `./config.toml`.
//! 4. `/app/noel/tsubasa/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ::config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable pointing at the configuration file.
pub const CONFIG_PATH_ENV: &str = "TSUBASA_CONFIG_PATH";

/// Location checked when neither the flag nor the environment names a file.
pub const CONTAINER_CONFIG_PATH: &str = "/app/noel/tsubasa/config.toml";

/// Contents written by `tsubasa generate`.
pub const DEFAULT_CONFIG_TOML: &str = r#"debug = false

[elastic]
nodes = ["http://localhost:9200"]
"#;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 23145;
const DEFAULT_NODE: &str = "http://localhost:9200";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 5;

/// Top-level gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Enables debug logging.
    #[serde(default)]
    pub debug: bool,

    /// Address the HTTP listener binds to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port the HTTP listener binds to.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Username for the gateway's Basic authentication. Requires `password`.
    #[serde(default)]
    pub username: Option<String>,

    /// Password for the gateway's Basic authentication. Requires `username`.
    #[serde(default)]
    pub password: Option<String>,

    /// Endpoint that receives crash reports for recovered handler panics.
    #[serde(default)]
    pub crash_report_url: Option<String>,

    /// Seconds in-flight requests get to finish once shutdown starts.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,

    /// Backend connection settings.
    #[serde(default)]
    pub elastic: ElasticConfig,
}

/// Elasticsearch connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticConfig {
    /// Base URLs of the nodes to send requests to.
    #[serde(default = "default_nodes")]
    pub nodes: Vec<String>,

    /// Username for the backend's Basic authentication.
    #[serde(default)]
    pub username: Option<String>,

    /// Password for the backend's Basic authentication.
    #[serde(default)]
    pub password: Option<String>,

    /// Indexes the gateway provisions at startup when they are missing.
    #[serde(default)]
    pub indexes: Vec<String>,

    /// PEM file added to the trusted roots for TLS connections to the backend.
    #[serde(default)]
    pub ca_path: Option<PathBuf>,

    /// Disables certificate verification for the backend.
    #[serde(default)]
    pub skip_ssl_verify: bool,

    /// Deadline applied to every individual backend call.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// Credentials for the gateway's own Basic authentication gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthCredentials {
    pub username: String,
    pub password: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            host: default_host(),
            port: default_port(),
            username: None,
            password: None,
            crash_report_url: None,
            shutdown_grace_secs: default_shutdown_grace_secs(),
            elastic: ElasticConfig::default(),
        }
    }
}

impl Default for ElasticConfig {
    fn default() -> Self {
        Self {
            nodes: default_nodes(),
            username: None,
            password: None,
            indexes: Vec::new(),
            ca_path: None,
            skip_ssl_verify: false,
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, overlaid with `TSUBASA_*` variables.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        tracing::info!(path = %path.display(), "loading configuration");
        let config = ::config::Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml))
            .add_source(environment())
            .build()?
            .try_deserialize::<Config>()?;

        tracing::debug!(
            nodes = config.elastic.nodes.len(),
            indexes = config.elastic.indexes.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Parse configuration from a TOML document without the environment overlay.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config = ::config::Config::builder()
            .add_source(File::from_str(contents, FileFormat::Toml))
            .build()?
            .try_deserialize::<Config>()?;
        Ok(config)
    }

    /// Resolve which configuration file to load.
    ///
    /// An explicit path always wins. Otherwise `TSUBASA_CONFIG_PATH`, then
    /// `./config.toml`, then [`CONTAINER_CONFIG_PATH`].
    pub fn discover(explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }

        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
            tracing::debug!(path = ?path, "found config path in {}", CONFIG_PATH_ENV);
            return PathBuf::from(path);
        }

        let local = PathBuf::from("./config.toml");
        if local.exists() {
            tracing::debug!("found config.toml in the working directory");
            return local;
        }

        tracing::debug!("falling back to {}", CONTAINER_CONFIG_PATH);
        PathBuf::from(CONTAINER_CONFIG_PATH)
    }

    /// Credentials for the Basic authentication gate.
    ///
    /// The gate is only enabled when both halves are configured; if either is
    /// missing this returns `None` and every request passes through.
    pub fn auth_credentials(&self) -> Option<AuthCredentials> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(AuthCredentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }

    /// `host:port` for the HTTP listener.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Grace period for draining in-flight requests on shutdown.
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl ElasticConfig {
    /// Deadline for a single backend call.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn environment() -> Environment {
    Environment::with_prefix("TSUBASA")
        .prefix_separator("_")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("elastic.nodes")
        .with_list_parse_key("elastic.indexes")
        .try_parsing(true)
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_nodes() -> Vec<String> {
    vec![DEFAULT_NODE.to_string()]
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

fn default_shutdown_grace_secs() -> u64 {
    DEFAULT_SHUTDOWN_GRACE_SECS
}
