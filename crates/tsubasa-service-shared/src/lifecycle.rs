//! Server lifecycle: listen, wait for a shutdown signal, drain.
//!
//! States move strictly forward:
//! `Starting -> Listening -> ShuttingDown -> Stopped`.
//!
//! Once shutdown starts the listener stops accepting and in-flight requests
//! share one grace deadline. Requests still running when it passes are
//! abandoned by aborting the server task.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::{oneshot, watch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Starting,
    Listening,
    ShuttingDown,
    Stopped,
}

/// How shutdown ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every in-flight request finished within the grace period.
    Graceful,
    /// The grace period ran out and remaining requests were dropped.
    DeadlineExceeded,
}

impl ShutdownOutcome {
    pub fn is_graceful(self) -> bool {
        self == ShutdownOutcome::Graceful
    }
}

/// Drives one server from bind to stop and publishes its state.
#[derive(Debug)]
pub struct Lifecycle {
    state: watch::Sender<LifecycleState>,
    grace: Duration,
}

impl Lifecycle {
    pub fn new(grace: Duration) -> Self {
        let (state, _) = watch::channel(LifecycleState::Starting);
        Self { state, grace }
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    fn transition(&self, next: LifecycleState) {
        tracing::debug!(state = ?next, "lifecycle transition");
        self.state.send_replace(next);
    }

    /// Serve `app` on `listener` until `shutdown` resolves, then drain.
    ///
    /// Returns an error only when the server itself fails. Running out of
    /// grace time is reported as [`ShutdownOutcome::DeadlineExceeded`].
    pub async fn run<F>(
        self,
        listener: TcpListener,
        app: Router,
        shutdown: F,
    ) -> io::Result<ShutdownOutcome>
    where
        F: Future<Output = ()> + Send,
    {
        let address = listener.local_addr()?;
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let server = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            let _ = stop_rx.await;
        });

        let mut handle = tokio::spawn(async move { server.await });

        self.transition(LifecycleState::Listening);
        tracing::info!(address = %address, "tsubasa is now listening");

        tokio::select! {
            _ = shutdown => {}
            finished = &mut handle => {
                // The server stopped without being asked to.
                self.transition(LifecycleState::Stopped);
                return match finished {
                    Ok(Ok(())) => Ok(ShutdownOutcome::Graceful),
                    Ok(Err(e)) => Err(e),
                    Err(e) => Err(io::Error::other(e)),
                };
            }
        }

        self.transition(LifecycleState::ShuttingDown);
        tracing::warn!(grace_secs = self.grace.as_secs_f64(), "shutting down HTTP server");
        let _ = stop_tx.send(());

        let outcome = match tokio::time::timeout(self.grace, &mut handle).await {
            Ok(Ok(Ok(()))) => ShutdownOutcome::Graceful,
            Ok(Ok(Err(e))) => {
                self.transition(LifecycleState::Stopped);
                return Err(e);
            }
            Ok(Err(e)) => {
                self.transition(LifecycleState::Stopped);
                return Err(io::Error::other(e));
            }
            Err(_) => {
                handle.abort();
                tracing::warn!("grace period elapsed, abandoning in-flight requests");
                ShutdownOutcome::DeadlineExceeded
            }
        };

        self.transition(LifecycleState::Stopped);
        tracing::info!(outcome = ?outcome, "HTTP server stopped");
        Ok(outcome)
    }
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
///
/// If a handler cannot be installed the failure is logged and that signal
/// is never observed.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received, starting graceful shutdown");
}
