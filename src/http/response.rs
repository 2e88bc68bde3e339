//! Response envelope shared by the pipeline and the route collaborators.
//!
//! # Responsibilities
//! - Render `{message, status_code, data}` bodies
//! - Keep the status line and the `status_code` field in agreement
//!
//! # Design Decisions
//! - Rejections always carry an object (`{}`) in `data`
//! - No internal error detail ever reaches the envelope

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

/// JSON body used for every pipeline rejection and for collaborator replies.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub message: String,
    pub status_code: u16,
    pub data: Value,
}

impl Envelope {
    /// Envelope with an empty object payload.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: status.as_u16(),
            data: Value::Object(Default::default()),
        }
    }

    /// Replace the payload.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}
