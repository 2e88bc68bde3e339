//! HTTP server setup.
//!
//! # Responsibilities
//! - Wrap the registered routes in the pipeline
//! - Accept connections and serve each one on its own task, peer address attached
//! - On shutdown: stop accepting, let open connections finish within the drain
//!   window, then abort whatever is left
//!
//! # Design Decisions
//! - Connection tasks live in a `JoinSet` owned by the server, so a forced
//!   shutdown cancels every in-flight handler before `run` returns
//! - Accept errors are logged and retried; they never stop the server

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, extract::ConnectInfo, http::Request, Router};
use hyper::body::Incoming;
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto::Builder,
};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tower::Service;

use crate::config::GatewayConfig;
use crate::http::pipeline::Pipeline;
use crate::lifecycle::Shutdown;
use crate::routing::RouteRegistry;
use crate::store::CounterStore;

/// Pause after a failed accept (e.g. out of file descriptors).
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// HTTP server for the gateway.
#[derive(Clone)]
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Compose the pipeline from configuration around `routes`.
    pub fn new(config: &GatewayConfig, store: Arc<dyn CounterStore>, routes: RouteRegistry) -> Self {
        let pipeline = Pipeline::from_config(config, store);
        Self::from_router(pipeline.wrap(routes.into_router()))
    }

    /// Serve an already composed router.
    pub fn from_router(router: Router) -> Self {
        Self { router }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `shutdown` fires, then drain.
    ///
    /// Returns `true` when every connection finished inside `drain_timeout`.
    /// Otherwise the remaining connections are aborted, and their handlers
    /// dropped, before this returns `false`.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: Shutdown,
        drain_timeout: Duration,
    ) -> Result<bool, std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let mut connections = JoinSet::new();
        loop {
            tokio::select! {
                _ = shutdown.wait() => break,
                Some(_) = connections.join_next() => {}
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tracing::debug!(peer_addr = %peer, "Connection accepted");
                        connections.spawn(serve_connection(
                            self.router.clone(),
                            stream,
                            peer,
                            shutdown.clone(),
                        ));
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to accept connection");
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                },
            }
        }
        drop(listener);
        tracing::info!(open_connections = connections.len(), "HTTP server stopped accepting");

        let drained = tokio::time::timeout(drain_timeout, async {
            while connections.join_next().await.is_some() {}
        })
        .await
        .is_ok();

        if !drained {
            tracing::warn!(
                open_connections = connections.len(),
                "Drain window elapsed, aborting remaining connections"
            );
            connections.shutdown().await;
        }

        tracing::info!(drained, "HTTP server stopped");
        Ok(drained)
    }
}

/// Serve one connection; on shutdown finish the in-flight request and close.
async fn serve_connection(router: Router, stream: TcpStream, peer: SocketAddr, shutdown: Shutdown) {
    let service = hyper::service::service_fn(move |mut request: Request<Incoming>| {
        request.extensions_mut().insert(ConnectInfo(peer));
        let mut router = router.clone();
        async move { router.call(request.map(Body::new)).await }
    });

    let builder = Builder::new(TokioExecutor::new());
    let conn = builder.serve_connection(TokioIo::new(stream), service);
    tokio::pin!(conn);

    let result = tokio::select! {
        result = conn.as_mut() => result,
        _ = shutdown.wait() => {
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    };

    if let Err(e) = result {
        tracing::debug!(peer_addr = %peer, error = %e, "Connection closed with error");
    }
}
