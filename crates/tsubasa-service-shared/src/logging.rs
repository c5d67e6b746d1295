//! Structured logging for the gateway.
//!
//! - [`LoggingConfig`]: Configuration for the logging system
//! - [`init_logging`]: Initialize tracing with JSON or text formatting
//! - [`build_subscriber`]: The same subscriber, for scoped use
//! - [`install_panic_hook`]: Route panics through `tracing`
//!
//! # Environment Variables
//!
//! - `LOG_FORMAT`: Output format, either `json` (default) or `text`
//! - `RUST_LOG`: Log level filter (default: `info`, or `debug` with the debug flag)
//! - `TSUBASA_DISABLE_COLORS`: Disable ANSI colors in text output
//!
//! # Example
//!
//! ```no_run
//! use tsubasa_service_shared::logging::{init_logging, install_panic_hook, LoggingConfig};
//!
//! let config = LoggingConfig::from_env().with_debug(false);
//! init_logging(&config);
//! install_panic_hook();
//! ```

use serde::{Deserialize, Serialize};
use tracing::Subscriber;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::middleware::{panic_message, AbortHandler};

/// Environment variable that disables colored text output when set.
pub const DISABLE_COLORS_ENV: &str = "TSUBASA_DISABLE_COLORS";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON structured logging (default, production).
    #[default]
    Json,
    /// Human-readable text logging (development).
    Text,
}

impl LogFormat {
    /// Parse log format from string.
    ///
    /// Accepts "json", "text", or "pretty" (alias for text).
    /// Returns `Json` for any other value.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => LogFormat::Text,
            _ => LogFormat::Json,
        }
    }
}

/// Configuration for the logging system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Log level filter used when `RUST_LOG` is unset.
    pub level: String,
    /// ANSI colors for text output.
    pub colors: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            level: "info".to_string(),
            colors: true,
        }
    }
}

impl LoggingConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Self {
        let format = std::env::var("LOG_FORMAT")
            .map(|v| LogFormat::parse(&v))
            .unwrap_or(LogFormat::Json);

        let level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let colors = std::env::var_os(DISABLE_COLORS_ENV).is_none();

        Self {
            format,
            level,
            colors,
        }
    }

    /// Raise the default level to `debug` when the configuration asks for it.
    ///
    /// An explicit `RUST_LOG` still takes precedence in [`init_logging`].
    pub fn with_debug(mut self, debug: bool) -> Self {
        if debug {
            self.level = "debug".to_string();
        }
        self
    }
}

/// Initialize the tracing subscriber with the given configuration.
///
/// Call once at startup.
///
/// # JSON Format (default)
///
/// ```json
/// {"timestamp":"2026-01-10T10:00:00Z","level":"INFO","target":"tsubasa","fields":{"message":"connected to elasticsearch"}}
/// ```
///
/// # Text Format (development)
///
/// ```text
/// 2026-01-10T10:00:00Z  INFO tsubasa: connected to elasticsearch
/// ```
pub fn init_logging(config: &LoggingConfig) {
    build_subscriber(config).init();
}

/// Build the subscriber [`init_logging`] installs, without installing it.
///
/// Useful with [`tracing::subscriber::with_default`] to capture events
/// emitted before the final configuration is known.
pub fn build_subscriber(config: &LoggingConfig) -> Box<dyn Subscriber + Send + Sync> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Text => Box::new(registry.with(fmt::layer().with_ansi(config.colors))),
        LogFormat::Json => {
            let json_layer = fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false);

            Box::new(registry.with(json_layer))
        }
    }
}

/// Log panics with thread name and location through `tracing`.
///
/// The request abort sentinel is skipped since it is not a fault.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        if info.payload().is::<AbortHandler>() {
            return;
        }

        let thread = std::thread::current();
        let thread = thread.name().unwrap_or("<unnamed>");
        let location = info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "<unknown>".to_string());

        tracing::error!(
            thread,
            location = %location,
            "panic: {}",
            panic_message(info.payload())
        );
    }));
}
