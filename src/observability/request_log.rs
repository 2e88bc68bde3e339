//! Request/response logging middleware.
//!
//! # Responsibilities
//! - Buffer the request body, log a sanitized copy, hand the original bytes on
//! - Log a completion line with status, identity and latency
//! - Record request metrics
//!
//! # Design Decisions
//! - Runs first in the pipeline, so rejected requests are logged too
//! - Undecodable bodies are logged without a payload, never rejected
//! - Not purely passive: a body that cannot be buffered (over the size limit,
//!   or a failing stream) is answered here with 413/400, before the gate
//! - Responses that reach the handlers pass through untouched

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::LengthLimitError;
use serde_json::Value;

use crate::error::PipelineError;
use crate::http::request::{ClientAddrResolver, CurrentUser, GUEST_IDENTITY, X_REQUEST_ID};
use crate::observability::metrics;
use crate::observability::redaction::{decode_payload, sanitize_payload};

/// State for the request logger.
#[derive(Debug, Clone)]
pub struct RequestLogger {
    resolver: ClientAddrResolver,
    max_body_size: usize,
}

impl RequestLogger {
    pub fn new(resolver: ClientAddrResolver, max_body_size: usize) -> Self {
        Self {
            resolver,
            max_body_size,
        }
    }

    /// Buffer the whole body, enforcing the size limit.
    async fn buffer_body(&self, request: Request<Body>) -> Result<(Request<Body>, Bytes), PipelineError> {
        let declared = request
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        if declared.is_some_and(|len| len > self.max_body_size) {
            return Err(PipelineError::BodyTooLarge(self.max_body_size));
        }

        let (parts, body) = request.into_parts();
        let bytes = axum::body::to_bytes(body, self.max_body_size)
            .await
            .map_err(|e| {
                let inner = e.into_inner();
                if inner.is::<LengthLimitError>() {
                    PipelineError::BodyTooLarge(self.max_body_size)
                } else {
                    PipelineError::BodyUnreadable(inner.to_string())
                }
            })?;

        let request = Request::from_parts(parts, Body::from(bytes.clone()));
        Ok((request, bytes))
    }
}

/// Render the sanitized payload for the log line; `null` when there is none.
fn render_payload(body: &[u8]) -> String {
    decode_payload(body)
        .map(|payload| Value::Object(sanitize_payload(&payload)).to_string())
        .unwrap_or_else(|| "null".to_string())
}

/// Elapsed time as seconds with two decimals, e.g. `0.01s`.
fn format_process_time(elapsed: Duration) -> String {
    format!("{:.2}s", elapsed.as_secs_f64())
}

/// Middleware logging every request before and after the rest of the pipeline.
pub async fn request_log_middleware(
    State(logger): State<Arc<RequestLogger>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();

    let user_ip = logger.resolver.resolve(&request);
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();
    let path = request.uri().path().to_string();
    let method = request.method().clone();
    let upstream_identity = request.extensions().get::<CurrentUser>().cloned();

    let response = match logger.buffer_body(request).await {
        Ok((request, body)) => {
            tracing::info!(
                request_id = %request_id,
                user_ip = %user_ip,
                user_agent = %user_agent,
                path = %path,
                method = %method,
                payload = %render_payload(&body),
                "Request received"
            );
            next.run(request).await
        }
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                user_ip = %user_ip,
                path = %path,
                method = %method,
                error = %e,
                "Request body rejected"
            );
            e.into_response()
        }
    };

    let elapsed = start.elapsed();
    let status = response.status();
    let current_user = response
        .extensions()
        .get::<CurrentUser>()
        .or(upstream_identity.as_ref())
        .map(|user| user.0.as_str())
        .unwrap_or(GUEST_IDENTITY);

    tracing::info!(
        request_id = %request_id,
        user_ip = %user_ip,
        user_agent = %user_agent,
        current_user = %current_user,
        path = %path,
        method = %method,
        status_code = status.as_u16(),
        process_time = %format_process_time(elapsed),
        "Request completed"
    );
    metrics::record_request(method.as_str(), status.as_u16(), elapsed);

    response
}
