//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files, and
//! every section has defaults so a minimal file (or none at all) works.

use serde::{Deserialize, Serialize};

/// Root configuration for the service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Per-client, per-platform rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Session cookie and store settings.
    pub session: SessionConfig,

    /// Frontend origin (CORS and post-login redirects).
    pub frontend: FrontendConfig,

    pub spotify: SpotifyConfig,

    pub apple_music: AppleMusicConfig,

    pub youtube_music: YouTubeMusicConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time allowed for one inbound request, in seconds.
    pub request_secs: u64,

    /// Timeout for each call to a vendor API, in seconds.
    pub upstream_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            upstream_secs: 15,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Window length in milliseconds.
    pub window_ms: u64,

    /// Requests accepted per key within one window.
    pub max_requests: u32,

    /// Upper bound on tracked (client, platform) keys.
    pub max_entries: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_ms: 2_000,
            max_requests: 5,
            max_entries: 100_000,
        }
    }
}

/// Session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Secret used to sign session cookies. Must be set.
    pub secret: String,

    /// Cookie name.
    pub cookie_name: String,

    /// Idle lifetime of a session in seconds.
    pub ttl_secs: u64,

    /// Add the `Secure` attribute to the cookie.
    pub secure_cookie: bool,

    /// How often expired sessions and stale rate-limit keys are swept.
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            cookie_name: "pb_session".to_string(),
            ttl_secs: 24 * 60 * 60,
            secure_cookie: false,
            sweep_interval_secs: 60,
        }
    }
}

/// Frontend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FrontendConfig {
    /// Origin of the web frontend (e.g., "http://localhost:3000").
    pub url: String,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:3000".to_string(),
        }
    }
}

/// Spotify OAuth and Web API settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scope: String,

    /// Accounts service base (authorize and token endpoints).
    pub accounts_url: String,

    /// Web API base.
    pub api_url: String,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: "http://localhost:8000/auth/spotify/callback".to_string(),
            scope: "playlist-read-private playlist-read-collaborative playlist-modify-public playlist-modify-private"
                .to_string(),
            accounts_url: "https://accounts.spotify.com".to_string(),
            api_url: "https://api.spotify.com/v1".to_string(),
        }
    }
}

/// Apple Music API settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppleMusicConfig {
    /// Static developer token (JWT) sent with every request.
    pub developer_token: String,

    pub api_url: String,

    /// Synthetic lifetime given to stored user tokens, in seconds.
    pub token_ttl_secs: u64,
}

impl Default for AppleMusicConfig {
    fn default() -> Self {
        Self {
            developer_token: String::new(),
            api_url: "https://api.music.apple.com/v1".to_string(),
            token_ttl_secs: 180 * 24 * 60 * 60,
        }
    }
}

/// YouTube Music (InnerTube) settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct YouTubeMusicConfig {
    pub api_url: String,

    /// Value sent as `Origin` / `X-Origin`.
    pub origin: String,

    /// WEB_REMIX client version announced in the request context.
    pub client_version: String,

    /// Lifetime given to stored browser headers, in seconds.
    pub token_ttl_secs: u64,
}

impl Default for YouTubeMusicConfig {
    fn default() -> Self {
        Self {
            api_url: "https://music.youtube.com/youtubei/v1".to_string(),
            origin: "https://music.youtube.com".to_string(),
            client_version: "1.20240918.01.00".to_string(),
            token_ttl_secs: 7 * 24 * 60 * 60,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable security headers.
    pub enable_headers: bool,
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}
