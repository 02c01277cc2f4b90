//! Rate limiting middleware.

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::{
    collections::HashMap,
    net::SocketAddr,
    num::NonZeroU32,
    sync::{Arc, RwLock},
    time::Duration,
};

/// Per-IP rate limiter using Governor.
pub type IpRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// State for per-IP API rate limiting.
#[derive(Clone)]
pub struct RateLimitState {
    limiters: Arc<RwLock<HashMap<String, Arc<IpRateLimiter>>>>,
    /// Requests per minute allowed per client IP.
    rate_limit: u32,
}

impl RateLimitState {
    /// Create a new rate limit state.
    pub fn new(rate_limit: u32) -> Self {
        Self {
            limiters: Arc::new(RwLock::new(HashMap::new())),
            rate_limit,
        }
    }

    /// Get or create the limiter for the given IP.
    fn get_or_create_limiter(&self, ip: &str) -> Arc<IpRateLimiter> {
        {
            let read_guard = self.limiters.read().unwrap();
            if let Some(limiter) = read_guard.get(ip) {
                return limiter.clone();
            }
        }

        let mut write_guard = self.limiters.write().unwrap();

        // Double-check after acquiring the write lock
        if let Some(limiter) = write_guard.get(ip) {
            return limiter.clone();
        }

        let quota = Quota::per_minute(NonZeroU32::new(self.rate_limit).unwrap_or(NonZeroU32::MIN));
        let limiter = Arc::new(RateLimiter::direct(quota));
        write_guard.insert(ip.to_string(), limiter.clone());
        limiter
    }

    /// Check whether a request from this IP is allowed.
    pub fn check(&self, ip: &str) -> bool {
        self.get_or_create_limiter(ip).check().is_ok()
    }

    /// Drop limiters no longer held anywhere else.
    pub fn cleanup(&self) {
        let mut guard = self.limiters.write().unwrap();
        guard.retain(|_, v| Arc::strong_count(v) > 1);
    }

    /// Start a background task that periodically cleans up idle limiters.
    pub fn start_cleanup_task(self: Arc<Self>) {
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(300)).await;
                self.cleanup();
            }
        });
    }
}

/// Extract the client IP from a request.
fn get_client_ip(req: &Request<Body>) -> String {
    // X-Forwarded-For first (reverse proxy), first hop in the chain
    if let Some(forwarded) = req
        .headers()
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(ip) = forwarded.split(',').next() {
            return ip.trim().to_string();
        }
    }

    if let Some(real_ip) = req
        .headers()
        .get("X-Real-IP")
        .and_then(|v| v.to_str().ok())
    {
        return real_ip.to_string();
    }

    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    "unknown".to_string()
}

/// Rate limiting middleware for the API.
pub async fn api_rate_limit(
    state: Arc<RateLimitState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let ip = get_client_ip(&req);

    if !state.check(&ip) {
        tracing::warn!(ip = %ip, "API rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            "Too many requests. Please try again later.",
        )
            .into_response();
    }

    next.run(req).await
}
