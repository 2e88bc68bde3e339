use axum::http::{Method, StatusCode};

use crate::http::Envelope;
use crate::routing::RouteRegistry;

pub fn register(registry: RouteRegistry) -> RouteRegistry {
    registry.register(Method::POST, "/login", login)
}

// Credential checks live in a separate service; this endpoint only reserves the path.
async fn login() -> Envelope {
    Envelope::new(StatusCode::NOT_IMPLEMENTED, "Not Implemented")
}
