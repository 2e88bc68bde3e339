//! Request-scoped failures produced by the pipeline.
//!
//! Every variant renders as the JSON envelope; none of them ends the process.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::http::response::Envelope;
use crate::store::StoreError;

/// Failures a pipeline stage can answer a request with.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Path is outside the allow-list.
    #[error("path `{0}` is not admitted")]
    AdmissionRejected(String),

    /// Key exceeded its budget for the current window.
    #[error("rate limit exceeded for `{key}` ({count} > {limit})")]
    RateLimitExceeded { key: String, count: i64, limit: u32 },

    /// Counter store could not be reached; the limiter failed closed.
    #[error("counter store unavailable: {0}")]
    CounterStoreUnavailable(#[from] StoreError),

    /// A handler panicked and was recovered.
    #[error("handler panicked: {0}")]
    PanicInHandler(String),

    /// Request body exceeded the configured buffer limit.
    #[error("request body larger than {0} bytes")]
    BodyTooLarge(usize),

    /// Request body stream failed while being buffered.
    #[error("request body could not be read: {0}")]
    BodyUnreadable(String),
}

impl PipelineError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PipelineError::AdmissionRejected(_) => StatusCode::FORBIDDEN,
            PipelineError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            PipelineError::CounterStoreUnavailable(_) | PipelineError::PanicInHandler(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            PipelineError::BodyTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            PipelineError::BodyUnreadable(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Message shown to the client (without internal details).
    pub fn user_message(&self) -> &'static str {
        match self {
            PipelineError::AdmissionRejected(_) => "Forbidden Path",
            PipelineError::RateLimitExceeded { .. } => "rate limit exceeded, try again later",
            PipelineError::CounterStoreUnavailable(_) | PipelineError::PanicInHandler(_) => {
                "An Unexpected Error Occurred"
            }
            PipelineError::BodyTooLarge(_) => "Request body too large",
            PipelineError::BodyUnreadable(_) => "Request body could not be read",
        }
    }

    pub fn envelope(&self) -> Envelope {
        Envelope::new(self.status_code(), self.user_message())
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        self.envelope().into_response()
    }
}
