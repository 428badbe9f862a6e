//! Rate limiting middleware using Governor.
//!
//! Per-tenant token buckets on the management API. Webhook paths and the
//! health check are exempt: providers retry on 429 and must never be
//! throttled into a retry storm.

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use serde_json::json;
use std::{num::NonZeroU32, sync::Arc, time::Duration};

/// Rate limiter state shared across requests.
pub struct RateLimiterState {
    /// Per-tenant rate limiters
    limiters: DashMap<String, Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>>,
    /// Default quota for new tenants
    quota: Quota,
}

impl Default for RateLimiterState {
    fn default() -> Self {
        Self::new(100, Duration::from_secs(60))
    }
}

impl RateLimiterState {
    /// Creates a new rate limiter state.
    ///
    /// # Arguments
    /// * `requests` - Number of requests allowed per period
    /// * `period` - Time period for the quota
    pub fn new(requests: u32, period: Duration) -> Self {
        let quota = Quota::with_period(period)
            .unwrap()
            .allow_burst(NonZeroU32::new(requests).unwrap());

        Self {
            limiters: DashMap::new(),
            quota,
        }
    }

    /// Checks if a request should be rate limited.
    /// Returns true if the request is allowed, false if rate limited.
    pub fn check(&self, key: &str) -> bool {
        let limiter = self
            .limiters
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(RateLimiter::direct(self.quota)));

        limiter.check().is_ok()
    }
}

/// Extracts the tenant segment from `/api/tenants/{tenant}/...` paths.
fn tenant_key(path: &str) -> String {
    path.strip_prefix("/api/tenants/")
        .and_then(|rest| rest.split('/').next())
        .unwrap_or("anonymous")
        .to_string()
}

/// Rate limiting middleware, keyed by tenant path segment.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiterState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path();

    // Health and webhook ingress are never throttled.
    if path == "/health" || path.starts_with("/webhooks/") {
        return next.run(request).await;
    }

    let key = tenant_key(path);

    if !limiter.check(&key) {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "error": "Rate limit exceeded. Please try again later.",
                "retry_after_seconds": 60
            })),
        )
            .into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_key_extraction() {
        assert_eq!(tenant_key("/api/tenants/abc-123/gateways"), "abc-123");
        assert_eq!(tenant_key("/api/tenants/abc-123"), "abc-123");
        assert_eq!(tenant_key("/docs"), "anonymous");
    }

    #[test]
    fn test_quota_exhaustion() {
        let state = RateLimiterState::new(2, Duration::from_secs(60));
        assert!(state.check("t1"));
        assert!(state.check("t1"));
        assert!(!state.check("t1"));
        // Other tenants keep their own bucket.
        assert!(state.check("t2"));
    }
}
