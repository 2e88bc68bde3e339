//! Handler registration interface for route collaborators.
//!
//! # Responsibilities
//! - Accept `(method, path, handler)` registrations
//! - Group registrations under a shared path prefix
//! - Produce the axum `Router` the pipeline wraps
//!
//! # Design Decisions
//! - Registrations for one path with different methods merge into one route
//! - Prefixes compose by concatenation; an empty path means the prefix itself
//! - Invalid registrations panic at startup, the same way axum route conflicts do

use axum::{
    handler::Handler,
    http::Method,
    routing::{on, MethodFilter},
    Router,
};

/// Builder collecting route registrations.
#[derive(Debug, Default)]
pub struct RouteRegistry {
    prefix: String,
    router: Router,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `method` at `path` (relative to the current group).
    pub fn register<H, T>(mut self, method: Method, path: &str, handler: H) -> Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        let filter = match MethodFilter::try_from(method.clone()) {
            Ok(filter) => filter,
            Err(_) => panic!("method {} cannot be routed", method),
        };
        let full_path = join_paths(&self.prefix, path);

        tracing::debug!(method = %method, path = %full_path, "Route registered");
        self.router = self.router.route(&full_path, on(filter, handler));
        self
    }

    /// Register a group of routes under `prefix`.
    pub fn group<F>(mut self, prefix: &str, build: F) -> Self
    where
        F: FnOnce(RouteRegistry) -> RouteRegistry,
    {
        let nested = build(RouteRegistry {
            prefix: join_paths(&self.prefix, prefix),
            router: Router::new(),
        });
        self.router = self.router.merge(nested.router);
        self
    }

    pub fn into_router(self) -> Router {
        self.router
    }
}

fn join_paths(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    match (prefix.is_empty(), path.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{}", path),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{}/{}", prefix, path),
    }
}
