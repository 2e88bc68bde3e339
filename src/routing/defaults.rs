//! Root-level routes.

use axum::{http::Method, http::StatusCode, Json};
use serde_json::{json, Value};

use super::RouteRegistry;

pub fn register(registry: RouteRegistry) -> RouteRegistry {
    registry
        .register(Method::GET, "/", home)
        .register(Method::GET, "/favicon.ico", favicon)
        .register(Method::GET, "/healthz", healthz)
}

async fn home() -> Json<Value> {
    Json(json!({ "message": "HOME" }))
}

async fn favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_home_body() {
        let router = register(RouteRegistry::new()).into_router();
        let response = router
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "message": "HOME" }));
    }

    #[tokio::test]
    async fn test_favicon_is_empty() {
        let router = register(RouteRegistry::new()).into_router();
        let response = router
            .oneshot(Request::get("/favicon.ico").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
