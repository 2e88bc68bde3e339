//! Pipeline composer.
//!
//! # Data Flow
//! ```text
//! Request
//!     → CORS
//!     → request ID (set, then propagate to the response)
//!     → request logger (pre event, body buffered and restored)
//!     → admission gate (403 outside the allow-list)
//!     → rate limiter (429 over budget, 500 on store failure)
//!     → panic boundary (500 envelope)
//!     → route handlers / 404 fallback
//!     → request logger (post event)
//! ```
//!
//! # Design Decisions
//! - The composer owns ordering only; every stage lives in its own module
//! - Everything is logged, everything admitted is rate-limited
//! - Unknown paths under the API prefix still consume budget before the 404

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{HeaderName, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
};

use crate::config::{CorsConfig, GatewayConfig};
use crate::error::PipelineError;
use crate::http::request::ClientAddrResolver;
use crate::http::response::Envelope;
use crate::observability::{metrics, request_log_middleware, RequestLogger};
use crate::security::{admission_middleware, rate_limit_middleware, AdmissionGate, RateLimiter};
use crate::store::CounterStore;

/// The fixed middleware stack wrapped around the route table.
#[derive(Clone)]
pub struct Pipeline {
    logger: Arc<RequestLogger>,
    gate: Arc<AdmissionGate>,
    limiter: Option<Arc<RateLimiter>>,
    cors: CorsLayer,
}

impl Pipeline {
    pub fn new(logger: RequestLogger, gate: AdmissionGate, limiter: Option<RateLimiter>) -> Self {
        Self {
            logger: Arc::new(logger),
            gate: Arc::new(gate),
            limiter: limiter.map(Arc::new),
            cors: build_cors(&CorsConfig::default()),
        }
    }

    /// Assemble every stage from configuration around a shared counter store.
    pub fn from_config(config: &GatewayConfig, store: Arc<dyn CounterStore>) -> Self {
        let resolver = ClientAddrResolver::from_origin(&config.app.external_base_url);
        let logger = RequestLogger::new(resolver.clone(), config.listener.max_body_size);
        let gate = AdmissionGate::from_config(&config.admission);
        let limiter = config.rate_limit.enabled.then(|| {
            RateLimiter::from_config(
                store,
                &config.rate_limit,
                config.counter_store.key_prefix.clone(),
                resolver,
            )
        });

        Self::new(logger, gate, limiter).with_cors(build_cors(&config.cors))
    }

    pub fn with_cors(mut self, cors: CorsLayer) -> Self {
        self.cors = cors;
        self
    }

    /// Wrap `routes` in the pipeline. Layers are added innermost first.
    pub fn wrap(&self, routes: Router) -> Router {
        let mut router = routes
            .fallback(not_found)
            .layer(CatchPanicLayer::custom(handle_panic));

        if let Some(limiter) = &self.limiter {
            router = router.layer(middleware::from_fn_with_state(
                limiter.clone(),
                rate_limit_middleware,
            ));
        }

        router
            .layer(middleware::from_fn_with_state(
                self.gate.clone(),
                admission_middleware,
            ))
            .layer(middleware::from_fn_with_state(
                self.logger.clone(),
                request_log_middleware,
            ))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(self.cors.clone())
    }
}

/// Build the cross-origin policy. No configured origins (or `*`) mirrors the caller's origin.
pub fn build_cors(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allow_origins
        .iter()
        .filter(|o| o.as_str() != "*")
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    let allow_origin = if origins.is_empty() {
        AllowOrigin::mirror_request()
    } else {
        AllowOrigin::list(origins)
    };

    let methods: Vec<Method> = config
        .allow_methods
        .iter()
        .filter_map(|m| m.parse().ok())
        .collect();
    let headers: Vec<HeaderName> = config
        .allow_headers
        .iter()
        .filter_map(|h| h.parse().ok())
        .collect();
    let exposed: Vec<HeaderName> = config
        .expose_headers
        .iter()
        .filter_map(|h| h.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(methods)
        .allow_headers(headers)
        .expose_headers(exposed)
        .allow_credentials(config.allow_credentials)
        .max_age(Duration::from_secs(config.max_age_secs))
}

async fn not_found() -> Envelope {
    Envelope::new(StatusCode::NOT_FOUND, "Not Found")
}

fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    tracing::error!(panic = %detail, "Handler panicked, recovered");
    metrics::record_handler_panic();
    PipelineError::PanicInHandler(detail).into_response()
}
