//! Per-IP throttling of the sign-in and sign-up routes

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use shared::error::{AppError, ErrorCode};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::state::AppState;

/// Idle counters older than this are dropped by [`RateLimiter::cleanup`]
const STALE_AFTER: Duration = Duration::from_secs(300);

/// Throttled route, with its budget per window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Throttle {
    Login,
    Register,
}

impl Throttle {
    fn budget(self) -> u32 {
        match self {
            Self::Login => 5,
            Self::Register => 3,
        }
    }

    fn window(self) -> Duration {
        Duration::from_secs(60)
    }
}

#[derive(Debug)]
struct Window {
    opened: Instant,
    hits: u32,
}

/// Fixed-window counters keyed by route and client address
#[derive(Clone, Default)]
pub struct RateLimiter {
    windows: Arc<Mutex<HashMap<(Throttle, String), Window>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts the hit; `false` once `ip` is over budget for this window
    pub async fn allow(&self, throttle: Throttle, ip: &str) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let window = windows
            .entry((throttle, ip.to_owned()))
            .or_insert(Window { opened: now, hits: 0 });

        if now.duration_since(window.opened) >= throttle.window() {
            *window = Window { opened: now, hits: 0 };
        }
        window.hits += 1;
        window.hits <= throttle.budget()
    }

    pub async fn cleanup(&self) {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let before = windows.len();
        windows.retain(|_, w| now.duration_since(w.opened) < STALE_AFTER);
        let dropped = before - windows.len();
        if dropped > 0 {
            tracing::debug!(dropped, "Pruned idle rate limit windows");
        }
    }
}

/// First X-Forwarded-For hop when behind a proxy, else the socket peer
fn client_ip(request: &Request) -> String {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());
    if let Some(ip) = forwarded {
        return ip.to_owned();
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_owned())
}

async fn throttled(
    state: &AppState,
    throttle: Throttle,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ip = client_ip(&request);
    if !state.rate_limiter.allow(throttle, &ip).await {
        tracing::warn!(?throttle, ip = %ip, "Rate limit exceeded");
        return Err(AppError::new(ErrorCode::TooManyRequests));
    }
    Ok(next.run(request).await)
}

pub async fn login_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    throttled(&state, Throttle::Login, request, next).await
}

pub async fn register_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    throttled(&state, Throttle::Register, request, next).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[tokio::test]
    async fn test_register_budget_is_per_ip_and_route() {
        let limiter = RateLimiter::new();
        for _ in 0..3 {
            assert!(limiter.allow(Throttle::Register, "10.0.0.1").await);
        }
        assert!(!limiter.allow(Throttle::Register, "10.0.0.1").await);
        assert!(limiter.allow(Throttle::Register, "10.0.0.2").await);
        assert!(limiter.allow(Throttle::Login, "10.0.0.1").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_reopens_after_a_minute() {
        let limiter = RateLimiter::new();
        for _ in 0..5 {
            assert!(limiter.allow(Throttle::Login, "10.0.0.9").await);
        }
        assert!(!limiter.allow(Throttle::Login, "10.0.0.9").await);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(limiter.allow(Throttle::Login, "10.0.0.9").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_forgets_idle_clients() {
        let limiter = RateLimiter::new();
        limiter.allow(Throttle::Login, "10.0.0.1").await;
        limiter.cleanup().await;
        assert_eq!(limiter.windows.lock().await.len(), 1);

        tokio::time::advance(STALE_AFTER).await;
        limiter.cleanup().await;
        assert!(limiter.windows.lock().await.is_empty());
    }

    #[test]
    fn test_client_ip_prefers_forwarded_header() {
        let request = axum::http::Request::builder()
            .header("x-forwarded-for", " 203.0.113.7 , 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_ip(&request), "203.0.113.7");

        let bare = axum::http::Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_ip(&bare), "unknown");
    }
}
