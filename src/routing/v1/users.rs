use axum::http::{Method, StatusCode};
use serde_json::json;

use crate::http::Envelope;
use crate::routing::RouteRegistry;

pub fn register(registry: RouteRegistry) -> RouteRegistry {
    registry.register(Method::GET, "", list_users)
}

async fn list_users() -> Envelope {
    Envelope::new(StatusCode::OK, "success").with_data(json!([]))
}
