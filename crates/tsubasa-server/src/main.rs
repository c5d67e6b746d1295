//! Tsubasa search gateway.
//!
//! `tsubasa` runs the HTTP server; `tsubasa generate [DIR]` writes a default
//! `config.toml`.
//!
//! # Environment
//!
//! - `TSUBASA_CONFIG_PATH` - configuration file when `--config` is not given
//! - `TSUBASA_*` - overrides for individual configuration keys
//! - `RUST_LOG` - log filter (default: info, or debug with `--verbose`)
//! - `LOG_FORMAT` - `json` (default) or `text`
//! - `TSUBASA_DISABLE_COLORS` - disable ANSI colors in text logs
//! - `METRICS_ENABLED` - set to `false` to disable the Prometheus recorder

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use tsubasa_lib::{Config, SearchService, DEFAULT_CONFIG_TOML};
use tsubasa_service_shared::{
    build_subscriber, init_logging, init_metrics, install_panic_hook, router, shutdown_signal,
    AppState, BasicAuth, Lifecycle, LoggingConfig, MetricsConfig, ShutdownOutcome,
    WebhookReporter,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "HTTP gateway in front of Elasticsearch")]
struct Cli {
    /// Configuration file to load instead of the discovered one.
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging regardless of the configuration.
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default config.toml into DIR.
    Generate {
        /// Directory to write into.
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Generate { dir }) => {
            let path = generate(&dir)?;
            println!("Wrote default configuration to {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        None => serve(cli.config.as_deref(), cli.verbose).await,
    }
}

fn generate(dir: &Path) -> Result<PathBuf> {
    let path = dir.join("config.toml");
    if path.exists() {
        bail!("{} already exists, refusing to overwrite", path.display());
    }

    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    fs::write(&path, DEFAULT_CONFIG_TOML)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

async fn serve(explicit_config: Option<&Path>, verbose: bool) -> Result<ExitCode> {
    // Config decides the final level; until it is loaded, log with the
    // environment and `--verbose` only.
    let bootstrap = build_subscriber(&LoggingConfig::from_env().with_debug(verbose));
    let (config_path, config) = tracing::subscriber::with_default(bootstrap, || {
        let path = Config::discover(explicit_config);
        Config::load(&path).map(|config| (path, config))
    })?;

    let logging = LoggingConfig::from_env().with_debug(config.debug || verbose);
    init_logging(&logging);
    install_panic_hook();

    tracing::info!(
        version = tsubasa_lib::VERSION,
        commit = tsubasa_lib::COMMIT_SHA,
        build_date = tsubasa_lib::BUILD_DATE,
        config = %config_path.display(),
        "starting tsubasa"
    );

    if let Err(e) = init_metrics(&MetricsConfig::from_env()) {
        tracing::warn!(error = %e, "failed to initialize metrics, continuing without metrics");
    }

    let search = SearchService::connect(&config.elastic)
        .await
        .context("unable to start without elasticsearch")?;
    search.ensure_indexes(&config.elastic.indexes).await;

    let auth = BasicAuth::new(config.auth_credentials());
    if !auth.is_enabled() && (config.username.is_some() || config.password.is_some()) {
        tracing::warn!("only one of username/password is set, basic authentication is disabled");
    }

    let mut state = AppState::new(search)
        .with_auth(auth)
        .with_indexes(config.elastic.indexes.clone());
    if let Some(url) = config.crash_report_url.as_deref() {
        let reporter = WebhookReporter::new(url).context("invalid crash_report_url")?;
        tracing::info!(url = %reporter.url(), "crash reporting enabled");
        state = state.with_reporter(Arc::new(reporter));
    }

    let app = router(state);
    let listener = TcpListener::bind(config.address())
        .await
        .with_context(|| format!("failed to bind {}", config.address()))?;

    let outcome = Lifecycle::new(config.shutdown_grace())
        .run(listener, app, shutdown_signal())
        .await
        .context("http server failed")?;

    Ok(match outcome {
        ShutdownOutcome::Graceful => ExitCode::SUCCESS,
        ShutdownOutcome::DeadlineExceeded => {
            tracing::error!("in-flight requests did not finish before the grace deadline");
            ExitCode::FAILURE
        }
    })
}
