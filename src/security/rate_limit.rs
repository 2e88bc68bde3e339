//! Fixed-window rate limiting middleware backed by the shared counter store.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header::HeaderName, HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::{RateLimitConfig, RateLimitScope, StoreFailurePolicy};
use crate::error::PipelineError;
use crate::http::request::{ClientAddrResolver, CurrentUser};
use crate::observability::metrics;
use crate::store::{CounterStore, StoreError};

pub static X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub static X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// Distributed fixed-window limiter.
///
/// Every instance increments the same counter in the shared store, so the
/// budget holds across the whole fleet. The window TTL is attached when a
/// key is created (count 1) and never extended by later hits.
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    max_requests: u32,
    window: Duration,
    scope: RateLimitScope,
    on_store_error: StoreFailurePolicy,
    key_prefix: String,
    resolver: ClientAddrResolver,
}

impl RateLimiter {
    pub fn new(
        store: Arc<dyn CounterStore>,
        max_requests: u32,
        window: Duration,
        scope: RateLimitScope,
    ) -> Self {
        Self {
            store,
            max_requests,
            window,
            scope,
            on_store_error: StoreFailurePolicy::Closed,
            key_prefix: "rateL".to_string(),
            resolver: ClientAddrResolver::default(),
        }
    }

    pub fn from_config(
        store: Arc<dyn CounterStore>,
        config: &RateLimitConfig,
        key_prefix: impl Into<String>,
        resolver: ClientAddrResolver,
    ) -> Self {
        Self::new(store, config.max_requests, config.window(), config.scope)
            .with_store_failure_policy(config.on_store_error)
            .with_key_prefix(key_prefix)
            .with_resolver(resolver)
    }

    pub fn with_store_failure_policy(mut self, policy: StoreFailurePolicy) -> Self {
        self.on_store_error = policy;
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn with_resolver(mut self, resolver: ClientAddrResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn scope(&self) -> RateLimitScope {
        self.scope
    }

    /// Derive the counter key for a request.
    ///
    /// Global keys have one segment after the prefix (an IP, which never
    /// contains '/'); scoped keys end in the request path, which always
    /// starts with '/'. The two namespaces cannot collide.
    ///
    /// In scoped keys the identity is escaped so it never contains ':',
    /// which makes the first ':' after the prefix an unambiguous boundary.
    pub fn key_for(&self, client_ip: &str, identity: Option<&str>, path: &str) -> String {
        match self.scope {
            RateLimitScope::Global => format!("{}:{}", self.key_prefix, client_ip),
            RateLimitScope::Scoped => {
                let identity = identity.filter(|id| !id.is_empty()).unwrap_or(client_ip);
                format!("{}:{}:{}", self.key_prefix, escape_key_segment(identity), path)
            }
        }
    }

    /// Count one hit against `key` and return the count for this window.
    pub async fn hit(&self, key: &str) -> Result<i64, StoreError> {
        let count = self.store.incr(key).await?;

        if count == 1 {
            match self.store.expire(key, self.window).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::warn!(key = %key, "Rate limit key vanished before its window was set");
                }
                Err(e) => {
                    tracing::error!(key = %key, error = %e, "Failed to set rate limit window");
                }
            }
        }

        Ok(count)
    }

    /// Requests left in the window; negative once over budget.
    pub fn remaining(&self, count: i64) -> i64 {
        i64::from(self.max_requests) - count
    }

    fn apply_headers(&self, headers: &mut HeaderMap, count: Option<i64>) {
        headers.insert(
            X_RATELIMIT_LIMIT.clone(),
            HeaderValue::from(self.max_requests),
        );
        if let Some(count) = count {
            headers.insert(
                X_RATELIMIT_REMAINING.clone(),
                HeaderValue::from(self.remaining(count)),
            );
        }
    }
}

/// Percent-escape the characters that would make a key segment ambiguous.
fn escape_key_segment(segment: &str) -> String {
    segment.replace('%', "%25").replace(':', "%3A")
}

/// Middleware enforcing the request budget.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client_ip = limiter.resolver.resolve(&request);
    let identity = request
        .extensions()
        .get::<CurrentUser>()
        .map(|user| user.0.as_str());
    let key = limiter.key_for(&client_ip, identity, request.uri().path());

    let outcome = limiter.hit(&key).await;
    match outcome {
        Ok(count) if count > i64::from(limiter.max_requests) => {
            tracing::warn!(key = %key, count, limit = limiter.max_requests, "Rate limit exceeded");
            metrics::record_rate_limited(limiter.scope.as_str());

            let mut response = PipelineError::RateLimitExceeded {
                key,
                count,
                limit: limiter.max_requests,
            }
            .into_response();
            limiter.apply_headers(response.headers_mut(), Some(count));
            response
        }
        Ok(count) => {
            let mut response = next.run(request).await;
            limiter.apply_headers(response.headers_mut(), Some(count));
            response
        }
        Err(e) => {
            metrics::record_counter_store_error();
            match limiter.on_store_error {
                StoreFailurePolicy::Closed => {
                    tracing::error!(key = %key, error = %e, "Counter store unavailable, rejecting request");
                    let mut response = PipelineError::CounterStoreUnavailable(e).into_response();
                    limiter.apply_headers(response.headers_mut(), None);
                    response
                }
                StoreFailurePolicy::Open => {
                    tracing::warn!(key = %key, error = %e, "Counter store unavailable, admitting request unlimited");
                    next.run(request).await
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryCounterStore;

    fn limiter(scope: RateLimitScope) -> (Arc<InMemoryCounterStore>, RateLimiter) {
        let store = Arc::new(InMemoryCounterStore::new());
        let limiter = RateLimiter::new(store.clone(), 5, Duration::from_secs(60), scope);
        (store, limiter)
    }

    #[test]
    fn test_global_key_uses_address_only() {
        let (_, limiter) = limiter(RateLimitScope::Global);
        assert_eq!(limiter.key_for("10.1.1.1", Some("user-7"), "/api/v1/users"), "rateL:10.1.1.1");
        assert_eq!(
            limiter.key_for("10.1.1.1", None, "/api/v1/auth/login"),
            limiter.key_for("10.1.1.1", None, "/api/v1/users")
        );
    }

    #[test]
    fn test_scoped_key_uses_identity_and_path() {
        let (_, limiter) = limiter(RateLimitScope::Scoped);
        assert_eq!(
            limiter.key_for("10.1.1.1", Some("user-7"), "/api/v1/users"),
            "rateL:user-7:/api/v1/users"
        );
        assert_eq!(
            limiter.key_for("10.1.1.1", None, "/api/v1/users"),
            "rateL:10.1.1.1:/api/v1/users"
        );
        assert_eq!(
            limiter.key_for("10.1.1.1", Some(""), "/api/v1/users"),
            "rateL:10.1.1.1:/api/v1/users"
        );
    }

    #[test]
    fn test_scoped_identity_cannot_forge_another_key() {
        let (_, limiter) = limiter(RateLimitScope::Scoped);
        let forged = limiter.key_for("10.1.1.1", Some("a:/x"), "/y");
        let honest = limiter.key_for("10.1.1.1", Some("a"), "/x:/y");

        assert_ne!(forged, honest);
        assert_eq!(forged, "rateL:a%3A/x:/y");
        assert_eq!(honest, "rateL:a:/x:/y");
        assert_ne!(
            limiter.key_for("10.1.1.1", Some("a%3A/x"), "/y"),
            forged
        );
    }

    #[test]
    fn test_scoped_ipv6_fallback_is_escaped() {
        let (_, limiter) = limiter(RateLimitScope::Scoped);
        assert_eq!(limiter.key_for("::1", None, "/api/v1/users"), "rateL:%3A%3A1:/api/v1/users");
    }

    #[test]
    fn test_custom_prefix() {
        let (_, limiter) = limiter(RateLimitScope::Global);
        let limiter = limiter.with_key_prefix("edge");
        assert_eq!(limiter.key_for("::1", None, "/"), "edge:::1");
    }

    #[tokio::test]
    async fn test_window_attached_on_first_hit_only() {
        let (store, limiter) = limiter(RateLimitScope::Global);

        assert_eq!(limiter.hit("rateL:a").await.unwrap(), 1);
        assert_eq!(store.ttl("rateL:a").map(|t| t.as_secs() > 55), Some(true));

        assert_eq!(limiter.hit("rateL:a").await.unwrap(), 2);
        assert_eq!(store.count("rateL:a"), Some(2));
    }

    #[test]
    fn test_remaining_goes_negative() {
        let (_, limiter) = limiter(RateLimitScope::Global);
        assert_eq!(limiter.remaining(1), 4);
        assert_eq!(limiter.remaining(6), -1);
    }
}
