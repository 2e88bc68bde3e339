//! Server lifecycle orchestration.
//!
//! # Responsibilities
//! - Bind the listener and start serving
//! - Wait for the first interrupt, then drain within a bounded window
//! - Run cleanup callbacks once the listener has stopped accepting
//!
//! # Design Decisions
//! - State is published on a watch channel: Starting → Serving → Draining → Closed
//! - A serve task that exits before any shutdown request is fatal; cleanup is skipped
//! - Drain timeout aborts every remaining connection before cleanup runs, so no
//!   handler outlives the shared clients it uses

use std::error::Error;
use std::future::Future;
use std::io;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinError;

use super::cleanup::{CleanupFailure, CleanupRegistry};
use super::shutdown::Shutdown;
use crate::http::HttpServer;

/// Externally observable lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Starting,
    Serving,
    Draining,
    Closed,
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("server failed: {0}")]
    Serve(#[source] io::Error),

    #[error("server exited before shutdown was requested")]
    ServerExited,

    #[error("server task failed: {0}")]
    ServerTask(#[from] JoinError),

    #[error("connections still open after {0:?} drain window")]
    ShutdownTimeout(Duration),
}

/// Outcome of a completed shutdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Whether every connection finished inside the drain window.
    pub drained: bool,
    pub cleanup_failures: Vec<CleanupFailure>,
}

/// Drives one server from bind to exit.
pub struct ServerLifecycle {
    drain_timeout: Duration,
    cleanup: CleanupRegistry,
    state: watch::Sender<LifecycleState>,
    shutdown: Shutdown,
}

impl ServerLifecycle {
    pub fn new(drain_timeout: Duration) -> Self {
        let (state, _) = watch::channel(LifecycleState::Starting);
        Self {
            drain_timeout,
            cleanup: CleanupRegistry::new(),
            state,
            shutdown: Shutdown::new(),
        }
    }

    /// Register a teardown callback. Callbacks run in registration order.
    pub fn on_shutdown<F, Fut, E>(&mut self, name: impl Into<String>, callback: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        self.cleanup.register(name, callback);
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Token that starts the drain when fired, same as an interrupt.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    pub async fn bind(&self, addr: &str) -> Result<TcpListener, LifecycleError> {
        TcpListener::bind(addr)
            .await
            .map_err(|source| LifecycleError::Bind {
                addr: addr.to_string(),
                source,
            })
    }

    /// Serve until `signal` resolves (or the shutdown handle fires), drain, clean up.
    pub async fn run<S>(
        self,
        listener: TcpListener,
        server: HttpServer,
        signal: S,
    ) -> Result<ShutdownReport, LifecycleError>
    where
        S: Future<Output = ()> + Send,
    {
        let Self {
            drain_timeout,
            cleanup,
            state,
            shutdown,
        } = self;

        let mut server_task = tokio::spawn(server.run(listener, shutdown.clone(), drain_timeout));
        transition(&state, LifecycleState::Serving);

        // Checked in order: a token fired elsewhere must win over the serve
        // task finishing because of it.
        tokio::select! {
            biased;
            _ = shutdown.wait() => tracing::info!("Shutdown requested, draining"),
            _ = signal => tracing::info!("Interrupt received, draining"),
            result = &mut server_task => {
                let err = match result {
                    Ok(Ok(_)) => LifecycleError::ServerExited,
                    Ok(Err(e)) => LifecycleError::Serve(e),
                    Err(e) => LifecycleError::ServerTask(e),
                };
                tracing::error!(error = %err, "Server stopped unexpectedly");
                return Err(err);
            }
        }

        transition(&state, LifecycleState::Draining);
        shutdown.trigger();

        // The server enforces the drain window itself and only returns once
        // every connection task has finished or been aborted.
        let drained = match server_task.await {
            Ok(Ok(true)) => true,
            Ok(Ok(false)) => {
                let err = LifecycleError::ShutdownTimeout(drain_timeout);
                tracing::error!(error = %err, "Forced server shutdown");
                false
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Server failed while draining");
                false
            }
            Err(e) => {
                tracing::error!(error = %e, "Server task failed while draining");
                false
            }
        };

        let cleanup_failures = cleanup.run_all().await;
        transition(&state, LifecycleState::Closed);
        tracing::info!(
            drained,
            cleanup_failures = cleanup_failures.len(),
            "Shutdown complete"
        );

        Ok(ShutdownReport {
            drained,
            cleanup_failures,
        })
    }
}

fn transition(state: &watch::Sender<LifecycleState>, next: LifecycleState) {
    let previous = state.send_replace(next);
    tracing::debug!(from = ?previous, to = ?next, "Lifecycle transition");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let lifecycle = ServerLifecycle::new(Duration::from_secs(1));
        let taken = lifecycle.bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap().to_string();

        let err = lifecycle.bind(&addr).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Bind { .. }));
        assert_eq!(lifecycle.state(), LifecycleState::Starting);
    }

    #[tokio::test]
    async fn test_shutdown_handle_drains_and_closes() {
        let mut lifecycle = ServerLifecycle::new(Duration::from_secs(1));
        lifecycle.on_shutdown("noop", || async { Ok::<(), io::Error>(()) });
        let handle = lifecycle.shutdown_handle();
        let mut states = lifecycle.subscribe_state();

        let listener = lifecycle.bind("127.0.0.1:0").await.unwrap();
        let server = HttpServer::from_router(Router::new());
        let run = tokio::spawn(lifecycle.run(listener, server, std::future::pending()));

        states
            .wait_for(|s| *s == LifecycleState::Serving)
            .await
            .unwrap();
        handle.trigger();

        let report = run.await.unwrap().unwrap();
        assert!(report.drained);
        assert!(report.cleanup_failures.is_empty());
        assert_eq!(*states.borrow(), LifecycleState::Closed);
    }
}
