//! Fixed-window rate limiting per (client address, platform).

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::RateLimitConfig;
use crate::http::response::ApiError;
use crate::observability::metrics;
use crate::platforms::Platform;

/// Rate-limit key.
pub type ClientKey = (IpAddr, Platform);

/// One window of activity for a key.
#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Bounded, synchronized fixed-window limiter.
pub struct RateLimiter {
    windows: Mutex<HashMap<ClientKey, Window>>,
    window: Duration,
    max_requests: u32,
    max_entries: usize,
    enabled: bool,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            window: Duration::from_millis(config.window_ms),
            max_requests: config.max_requests,
            max_entries: config.max_entries.max(1),
            enabled: config.enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record a request for `key` now. Returns false when it must be rejected.
    pub fn check(&self, key: ClientKey) -> bool {
        self.check_at(key, Instant::now())
    }

    /// Same as [`check`](Self::check) with an explicit clock.
    pub fn check_at(&self, key: ClientKey, now: Instant) -> bool {
        let mut windows = self.windows.lock().expect("rate limiter mutex poisoned");

        if let Some(entry) = windows.get_mut(&key) {
            if now.saturating_duration_since(entry.started) < self.window {
                if entry.count >= self.max_requests {
                    return false;
                }
                entry.count += 1;
            } else {
                *entry = Window { started: now, count: 1 };
            }
            return true;
        }

        if windows.len() >= self.max_entries {
            let window = self.window;
            windows.retain(|_, w| now.saturating_duration_since(w.started) < window);
        }
        // Live windows are never dropped to make room: a dropped key would
        // restart its count inside its window.
        if windows.len() >= self.max_entries {
            tracing::warn!(tracked = windows.len(), "Rate limiter at capacity, rejecting untracked client");
            metrics::record_rate_limit_overflow();
            return false;
        }
        windows.insert(key, Window { started: now, count: 1 });
        true
    }

    /// Remove keys whose window has elapsed. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut windows = self.windows.lock().expect("rate limiter mutex poisoned");
        let before = windows.len();
        let window = self.window;
        windows.retain(|_, w| now.saturating_duration_since(w.started) < window);
        before - windows.len()
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.windows.lock().expect("rate limiter mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Extract the platform segment from `/api/playlists/{platform}/...`.
fn platform_from_path(path: &str) -> Option<Platform> {
    path.strip_prefix("/api/playlists/")?
        .split('/')
        .next()?
        .parse()
        .ok()
}

/// Middleware applying the limiter to the playlist routes.
///
/// Unknown platforms pass through so the handler can answer 404.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    if !limiter.is_enabled() {
        return next.run(request).await;
    }

    let Some(platform) = platform_from_path(request.uri().path()) else {
        return next.run(request).await;
    };

    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    if limiter.check((client, platform)) {
        next.run(request).await
    } else {
        tracing::warn!(client = %client, platform = %platform, "Rate limit exceeded");
        metrics::record_rate_limited(platform.as_str());
        ApiError::RateLimited.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_entries: usize) -> RateLimiter {
        RateLimiter::new(&RateLimitConfig {
            enabled: true,
            window_ms: 2_000,
            max_requests: 5,
            max_entries,
        })
    }

    fn key(last_octet: u8, platform: Platform) -> ClientKey {
        (IpAddr::V4(Ipv4Addr::new(10, 0, 0, last_octet)), platform)
    }

    #[test]
    fn test_burst_of_six_rejects_the_sixth() {
        let limiter = limiter(100);
        let t0 = Instant::now();
        let k = key(1, Platform::Spotify);

        for i in 0..5 {
            assert!(limiter.check_at(k, t0 + Duration::from_millis(i * 100)), "call {} accepted", i + 1);
        }
        assert!(!limiter.check_at(k, t0 + Duration::from_millis(600)));
    }

    #[test]
    fn test_window_elapsed_resets_after_rejections() {
        let limiter = limiter(100);
        let t0 = Instant::now();
        let k = key(1, Platform::Spotify);

        for _ in 0..8 {
            limiter.check_at(k, t0);
        }
        assert!(!limiter.check_at(k, t0 + Duration::from_millis(1_999)));
        assert!(limiter.check_at(k, t0 + Duration::from_millis(2_000)));
        // New window started with count 1; four more fit.
        for _ in 0..4 {
            assert!(limiter.check_at(k, t0 + Duration::from_millis(2_100)));
        }
        assert!(!limiter.check_at(k, t0 + Duration::from_millis(2_200)));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = limiter(100);
        let t0 = Instant::now();
        for _ in 0..5 {
            limiter.check_at(key(1, Platform::Spotify), t0);
        }
        assert!(!limiter.check_at(key(1, Platform::Spotify), t0));
        assert!(limiter.check_at(key(1, Platform::AppleMusic), t0));
        assert!(limiter.check_at(key(2, Platform::Spotify), t0));
    }

    #[test]
    fn test_sweep_removes_only_stale_keys() {
        let limiter = limiter(100);
        let t0 = Instant::now();
        limiter.check_at(key(1, Platform::Spotify), t0);
        limiter.check_at(key(2, Platform::Spotify), t0 + Duration::from_millis(1_500));

        assert_eq!(limiter.sweep_at(t0 + Duration::from_millis(2_500)), 1);
        assert_eq!(limiter.len(), 1);
    }

    #[test]
    fn test_sweep_does_not_change_outcomes() {
        let swept = limiter(100);
        let unswept = limiter(100);
        let t0 = Instant::now();
        let k = key(3, Platform::YoutubeMusic);

        for i in 0..12u64 {
            let now = t0 + Duration::from_millis(i * 400);
            if i % 3 == 0 {
                swept.sweep_at(now);
            }
            assert_eq!(swept.check_at(k, now), unswept.check_at(k, now), "diverged at step {i}");
        }
    }

    #[test]
    fn test_capacity_bound_holds() {
        let limiter = limiter(3);
        let t0 = Instant::now();
        for i in 0..10u8 {
            let accepted = limiter.check_at(key(i, Platform::Spotify), t0 + Duration::from_millis(i as u64));
            assert_eq!(accepted, i < 3, "key {i}");
            assert!(limiter.len() <= 3);
        }
        // Once the tracked windows go stale there is room again.
        assert!(limiter.check_at(key(42, Platform::Spotify), t0 + Duration::from_millis(2_500)));
        assert_eq!(limiter.len(), 1);
    }

    #[test]
    fn test_capacity_never_resets_a_live_window() {
        let limiter = limiter(2);
        let t0 = Instant::now();
        let a = key(1, Platform::Spotify);

        for _ in 0..5 {
            assert!(limiter.check_at(a, t0));
        }
        assert!(!limiter.check_at(a, t0));

        assert!(limiter.check_at(key(2, Platform::Spotify), t0 + Duration::from_millis(10)));
        // Map is full of live windows: the newcomer is turned away.
        assert!(!limiter.check_at(key(3, Platform::Spotify), t0 + Duration::from_millis(20)));
        // And key A is still limited inside its window.
        assert!(!limiter.check_at(a, t0 + Duration::from_millis(30)));
        assert_eq!(limiter.len(), 2);
    }

    #[test]
    fn test_capacity_evicts_stale_before_active() {
        let limiter = limiter(2);
        let t0 = Instant::now();
        limiter.check_at(key(1, Platform::Spotify), t0);
        limiter.check_at(key(2, Platform::Spotify), t0 + Duration::from_millis(1_900));
        // key 1 is stale at t0 + 2.5 s, key 2 is not.
        limiter.check_at(key(3, Platform::Spotify), t0 + Duration::from_millis(2_500));

        for _ in 0..4 {
            limiter.check_at(key(2, Platform::Spotify), t0 + Duration::from_millis(2_600));
        }
        // key 2 kept its window: this is its sixth call.
        assert!(!limiter.check_at(key(2, Platform::Spotify), t0 + Duration::from_millis(2_700)));
    }

    #[test]
    fn test_platform_from_path() {
        assert_eq!(platform_from_path("/api/playlists/spotify"), Some(Platform::Spotify));
        assert_eq!(
            platform_from_path("/api/playlists/youtube-music/abc/tracks"),
            Some(Platform::YoutubeMusic)
        );
        assert_eq!(platform_from_path("/api/playlists/deezer"), None);
        assert_eq!(platform_from_path("/auth/status"), None);
    }
}
