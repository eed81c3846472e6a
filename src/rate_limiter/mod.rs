/*!
 * # Rate Limiting Module
 *
 * Fixed-window request limiting per client IP for every `/api` route.
 *
 * Counters live in an in-process `DashMap`; a window opens on a client's first
 * request and the count resets once the window has elapsed. Responses carry
 * `X-RateLimit-Limit`, `X-RateLimit-Remaining` and `X-RateLimit-Reset`.
 *
 * ```ignore
 * let limiter = RateLimiter::new(RateLimitConfig::default());
 * tokio::spawn(start_cleanup_task(limiter.clone(), Duration::from_secs(900)));
 * let app = Router::new()
 *     .route("/", get(handler))
 *     .layer(RateLimitLayer::from_limiter(limiter));
 * ```
 */
use axum::{
    extract::{ConnectInfo, Request},
    http::{HeaderValue, Response},
    response::IntoResponse,
};
use dashmap::DashMap;
use metrics::counter;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::errors::ServiceError;

fn num_to_header_value<T: ToString>(n: T) -> HeaderValue {
    HeaderValue::from_str(&n.to_string()).unwrap_or_else(|_| HeaderValue::from_static("0"))
}

#[derive(Debug, Clone)]
struct RateLimitEntry {
    count: u32,
    window_start: Instant,
}

impl RateLimitEntry {
    fn new(now: Instant) -> Self {
        Self {
            count: 0,
            window_start: now,
        }
    }

    fn roll_window(&mut self, now: Instant, window_duration: Duration) {
        if now.duration_since(self.window_start) >= window_duration {
            self.count = 0;
            self.window_start = now;
        }
    }

    fn time_until_reset(&self, now: Instant, window_duration: Duration) -> Duration {
        window_duration.saturating_sub(now.duration_since(self.window_start))
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub requests_per_window: u32,
    pub window_duration: Duration,
    pub enable_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_window: 100,
            window_duration: Duration::from_secs(15 * 60),
            enable_headers: true,
        }
    }
}

impl From<&AppConfig> for RateLimitConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            requests_per_window: cfg.rate_limit_requests_per_window,
            window_duration: Duration::from_secs(cfg.rate_limit_window_seconds),
            enable_headers: cfg.rate_limit_enable_headers,
        }
    }
}

#[derive(Debug)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_time: Duration,
}

#[derive(Clone)]
pub struct RateLimiter {
    entries: Arc<DashMap<String, RateLimitEntry>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Count one request for `key` and report whether it fits in the current window.
    pub fn check_rate_limit(&self, key: &str) -> RateLimitResult {
        let now = Instant::now();
        let limit = self.config.requests_per_window;
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| RateLimitEntry::new(now));

        entry.roll_window(now, self.config.window_duration);
        let reset_time = entry.time_until_reset(now, self.config.window_duration);

        if entry.count >= limit {
            return RateLimitResult {
                allowed: false,
                limit,
                remaining: 0,
                reset_time,
            };
        }

        entry.count += 1;
        RateLimitResult {
            allowed: true,
            limit,
            remaining: limit - entry.count,
            reset_time,
        }
    }

    pub fn reset(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Drop entries whose window has fully elapsed
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        let window = self.config.window_duration;
        self.entries
            .retain(|_, entry| now.duration_since(entry.window_start) < window);
    }

    pub fn tracked_keys(&self) -> usize {
        self.entries.len()
    }
}

/// Periodically evicts expired client windows so the map stays bounded.
pub async fn start_cleanup_task(rate_limiter: RateLimiter, interval: Duration) {
    let mut interval_timer = tokio::time::interval(interval);

    loop {
        interval_timer.tick().await;
        rate_limiter.cleanup_expired();
        debug!(tracked = rate_limiter.tracked_keys(), "Rate limiter cleanup completed");
    }
}

/// Client key: first X-Forwarded-For hop, then X-Real-IP, then the socket peer.
pub fn extract_ip_key(request: &Request) -> String {
    if let Some(forwarded) = request.headers().get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            if let Some(ip) = forwarded_str.split(',').next() {
                let ip = ip.trim();
                if !ip.is_empty() {
                    return format!("ip:{}", ip);
                }
            }
        }
    }

    if let Some(real_ip) = request.headers().get("x-real-ip") {
        if let Ok(ip_str) = real_ip.to_str() {
            return format!("ip:{}", ip_str.trim());
        }
    }

    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return format!("ip:{}", addr.ip());
    }

    "ip:unknown".to_string()
}

fn is_limited_path(path: &str) -> bool {
    path.starts_with("/api") && !path.starts_with("/api/health")
}

fn apply_headers(response: &mut Response<axum::body::Body>, result: &RateLimitResult) {
    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", num_to_header_value(result.limit));
    headers.insert("X-RateLimit-Remaining", num_to_header_value(result.remaining));
    headers.insert(
        "X-RateLimit-Reset",
        num_to_header_value(result.reset_time.as_secs()),
    );
}

// Layer implementation for tower
#[derive(Clone)]
pub struct RateLimitLayer {
    rate_limiter: RateLimiter,
}

impl RateLimitLayer {
    pub fn from_limiter(rate_limiter: RateLimiter) -> Self {
        Self { rate_limiter }
    }
}

impl<S> tower::Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            rate_limiter: self.rate_limiter.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    rate_limiter: RateLimiter,
}

impl<S> tower::Service<Request> for RateLimitService<S>
where
    S: tower::Service<Request, Response = Response<axum::body::Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response<axum::body::Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let rate_limiter = self.rate_limiter.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let path = request.uri().path().to_string();
            if !is_limited_path(&path) {
                return inner.call(request).await;
            }

            let key = extract_ip_key(&request);
            let result = rate_limiter.check_rate_limit(&key);
            let enable_headers = rate_limiter.config().enable_headers;

            if !result.allowed {
                warn!(key = %key, path = %path, "Rate limit exceeded");
                counter!("rate_limit_denied_total", 1, "path" => path);

                let mut response = ServiceError::RateLimitExceeded.into_response();
                if enable_headers {
                    apply_headers(&mut response, &result);
                }
                return Ok(response);
            }

            let mut response = inner.call(request).await?;
            if enable_headers {
                apply_headers(&mut response, &result);
            }
            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, routing::get, Router};
    use tower::ServiceExt;

    fn limiter(limit: u32) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            requests_per_window: limit,
            window_duration: Duration::from_secs(60),
            enable_headers: true,
        })
    }

    #[test]
    fn allows_exactly_the_configured_number_of_requests() {
        let limiter = limiter(3);
        let remaining: Vec<u32> = (0..3)
            .map(|_| limiter.check_rate_limit("ip:10.0.0.1"))
            .map(|r| {
                assert!(r.allowed);
                r.remaining
            })
            .collect();
        assert_eq!(remaining, vec![2, 1, 0]);
        assert!(!limiter.check_rate_limit("ip:10.0.0.1").allowed);
        assert!(limiter.check_rate_limit("ip:10.0.0.2").allowed);
    }

    #[test]
    fn window_rolls_over() {
        let limiter = RateLimiter::new(RateLimitConfig {
            requests_per_window: 1,
            window_duration: Duration::from_millis(20),
            enable_headers: false,
        });
        assert!(limiter.check_rate_limit("k").allowed);
        assert!(!limiter.check_rate_limit("k").allowed);
        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.check_rate_limit("k").allowed);
        limiter.reset("k");
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[test]
    fn cleanup_drops_only_elapsed_windows() {
        let short = RateLimiter::new(RateLimitConfig {
            requests_per_window: 5,
            window_duration: Duration::from_millis(20),
            enable_headers: false,
        });
        short.check_rate_limit("ip:10.0.0.1");
        short.check_rate_limit("ip:10.0.0.2");
        short.cleanup_expired();
        assert_eq!(short.tracked_keys(), 2);

        std::thread::sleep(Duration::from_millis(30));
        short.check_rate_limit("ip:10.0.0.3");
        short.cleanup_expired();
        assert_eq!(short.tracked_keys(), 1);
    }

    #[tokio::test]
    async fn background_task_evicts_expired_clients() {
        let limiter = RateLimiter::new(RateLimitConfig {
            requests_per_window: 5,
            window_duration: Duration::from_millis(10),
            enable_headers: false,
        });
        for i in 0..50 {
            limiter.check_rate_limit(&format!("ip:192.0.2.{i}"));
        }
        assert_eq!(limiter.tracked_keys(), 50);

        let task = tokio::spawn(start_cleanup_task(limiter.clone(), Duration::from_millis(15)));
        tokio::time::sleep(Duration::from_millis(80)).await;
        task.abort();
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[tokio::test]
    async fn layer_returns_429_with_headers() {
        let app = Router::new()
            .route("/api/layanan", get(|| async { "ok" }))
            .route("/api/health", get(|| async { "ok" }))
            .layer(RateLimitLayer::from_limiter(limiter(1)));

        let request = || {
            Request::builder()
                .uri("/api/layanan")
                .header("x-forwarded-for", "203.0.113.9")
                .body(Body::empty())
                .unwrap()
        };

        let first = app.clone().oneshot(request()).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.headers().get("X-RateLimit-Remaining").unwrap(), "0");

        let second = app.clone().oneshot(request()).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(second.headers().get("X-RateLimit-Limit").unwrap(), "1");

        let health = app
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .header("x-forwarded-for", "203.0.113.9")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(health.status(), StatusCode::OK);
    }
}
