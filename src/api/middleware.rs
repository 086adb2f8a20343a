//! API Middleware (Rate Limiting, Logging) and background maintenance

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::handlers::AppState;
use super::types::{ApiError, ApiResponse};
use crate::utils::constants::CLEANUP_INTERVAL_SECS;

/// Outcome of one rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_secs: u64,
}

/// Fixed-window in-memory rate limiter keyed by API key or client address
pub struct RateLimiter {
    /// key -> (requests in window, window start)
    requests: DashMap<String, (u32, Instant)>,
    requests_per_window: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(requests_per_window: u32, window: Duration) -> Self {
        Self {
            requests: DashMap::new(),
            requests_per_window,
            window,
        }
    }

    pub fn per_minute(requests: u32) -> Self {
        Self::new(requests, Duration::from_secs(60))
    }

    pub fn check(&self, key: &str) -> RateDecision {
        let now = Instant::now();
        let mut entry = self.requests.entry(key.to_string()).or_insert((0, now));

        if now.duration_since(entry.1) >= self.window {
            *entry = (0, now);
        }

        let reset_secs = self.window.saturating_sub(now.duration_since(entry.1)).as_secs();

        if entry.0 >= self.requests_per_window {
            return RateDecision {
                allowed: false,
                limit: self.requests_per_window,
                remaining: 0,
                reset_secs,
            };
        }

        entry.0 += 1;
        RateDecision {
            allowed: true,
            limit: self.requests_per_window,
            remaining: self.requests_per_window - entry.0,
            reset_secs,
        }
    }

    /// Forget keys idle for two windows
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let before = self.requests.len();
        self.requests
            .retain(|_, (_, started)| now.duration_since(*started) < self.window * 2);
        before.saturating_sub(self.requests.len())
    }

    pub fn tracked_keys(&self) -> usize {
        self.requests.len()
    }
}

fn is_health_path(path: &str) -> bool {
    path == "/health" || path == "/v1/health"
}

/// API key if present, otherwise the forwarded client address
fn rate_key(headers: &HeaderMap) -> String {
    headers
        .get("x-api-key")
        .or_else(|| headers.get("x-forwarded-for"))
        .or_else(|| headers.get("x-real-ip"))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

fn set_rate_headers(headers: &mut HeaderMap, decision: &RateDecision) {
    headers.insert("x-ratelimit-limit", HeaderValue::from(decision.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
    headers.insert("x-ratelimit-reset", HeaderValue::from(decision.reset_secs));
}

/// Rate limiting middleware; health checks are exempt
pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    if is_health_path(request.uri().path()) {
        return next.run(request).await;
    }

    let key = rate_key(&headers);
    let decision = state.limiter.check(&key);

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        warn!(key = %key, "🚫 Rate limit exceeded");
        (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ApiResponse::error(ApiError::rate_limited(decision.reset_secs), 0.0)),
        )
            .into_response()
    };

    set_rate_headers(response.headers_mut(), &decision);
    response
}

/// Request logging middleware
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    info!(
        method = %method,
        uri = %uri,
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_millis() as u64,
        "Request completed"
    );

    response
}

/// Periodically evict expired metadata and idle rate limit keys
pub fn start_cleanup_task(state: Arc<AppState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(CLEANUP_INTERVAL_SECS));
        loop {
            interval.tick().await;
            state.store.cleanup_expired();
            let idle = state.limiter.cleanup();
            if idle > 0 {
                info!("🧹 Rate limiter cleanup: {} idle keys removed", idle);
            }
        }
    })
}
