use std::path::PathBuf;

use thiserror::Error;

/// Convenient result alias for the Tsubasa library.
pub type Result<T> = std::result::Result<T, Error>;

/// Machine code for failures whose detail must never reach a client.
pub const CODE_INTERNAL_SERVER_ERROR: &str = "INTERNAL_SERVER_ERROR";

/// Machine code for a `match_type` that does not resolve to a known query.
pub const CODE_INVALID_MATCH_TYPE: &str = "INVALID_MATCH_TYPE";

/// Generic message returned in place of backend or transport detail.
pub const INTERNAL_ERROR_MESSAGE: &str = "Unknown service error has occurred.";

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or deserialized.
    #[error("failed to load configuration: {0}")]
    Config(#[from] ::config::ConfigError),

    /// No configuration file exists at the resolved path.
    #[error("configuration file not found at {path}")]
    ConfigNotFound { path: PathBuf },

    /// A configured backend node address is not a usable base URL.
    #[error("invalid elasticsearch node '{node}': {reason}")]
    InvalidNode { node: String, reason: String },

    /// The configured CA certificate could not be read or parsed.
    #[error("failed to load CA certificate from {path}: {message}")]
    CaCertificate { path: PathBuf, message: String },

    /// The backend could not be reached while starting up.
    #[error("unable to connect to elasticsearch: {message}")]
    Connection { message: String },

    /// The requested match type is not one of the supported aliases.
    #[error("match type '{match_type}' is not a valid match type")]
    InvalidMatchType { match_type: String },

    /// The backend answered with an error status.
    #[error("elasticsearch returned {status}: {kind}: {reason}")]
    Backend {
        status: u16,
        kind: String,
        reason: String,
    },

    /// A backend response body did not match the expected shape.
    #[error("failed to decode elasticsearch response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Wrapper for HTTP transport errors (timeouts, refused connections, TLS).
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Wrapper for IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// HTTP status a caller should answer with for this error.
    pub fn status(&self) -> u16 {
        match self {
            Error::InvalidMatchType { .. } => 406,
            _ => 500,
        }
    }

    /// Stable upper-snake-case machine code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidMatchType { .. } => CODE_INVALID_MATCH_TYPE,
            _ => CODE_INTERNAL_SERVER_ERROR,
        }
    }

    /// Message that is safe to hand to a client.
    ///
    /// Only validation failures describe themselves; everything else collapses
    /// to [`INTERNAL_ERROR_MESSAGE`] so backend internals stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Error::InvalidMatchType { match_type } => {
                format!("Match type '{}' is not a valid match type.", match_type)
            }
            _ => INTERNAL_ERROR_MESSAGE.to_string(),
        }
    }
}
