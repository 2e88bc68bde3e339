//! Admission gate: path allow-list checked before any other stage.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::AdmissionConfig;
use crate::error::PipelineError;
use crate::observability::metrics;

/// Allow-list of root paths (exact match) and one API prefix.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    root_paths: Vec<String>,
    api_prefix: String,
}

impl AdmissionGate {
    pub fn new(root_paths: Vec<String>, api_prefix: impl Into<String>) -> Self {
        Self {
            root_paths,
            api_prefix: api_prefix.into(),
        }
    }

    pub fn from_config(config: &AdmissionConfig) -> Self {
        Self::new(config.root_paths.clone(), config.api_prefix.clone())
    }

    /// True if the path may proceed down the pipeline.
    pub fn admits(&self, path: &str) -> bool {
        self.root_paths.iter().any(|p| p == path) || path.starts_with(&self.api_prefix)
    }
}

impl Default for AdmissionGate {
    fn default() -> Self {
        Self::from_config(&AdmissionConfig::default())
    }
}

/// Middleware rejecting paths outside the allow-list with 403.
pub async fn admission_middleware(
    State(gate): State<Arc<AdmissionGate>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path();
    if gate.admits(path) {
        return next.run(request).await;
    }

    tracing::debug!(path = %path, "Path rejected by admission gate");
    metrics::record_admission_rejected();
    PipelineError::AdmissionRejected(path.to_string()).into_response()
}
