//! Music platform adapters.
//!
//! # Data Flow
//! ```text
//! handler (api/playlists.rs)
//!     → credential from the session
//!     → spotify.rs | apple_music.rs | youtube_music.rs (vendor HTTP call)
//!     → vendor JSON mapped into models.rs (Playlist / Track)
//!     → JSON response
//! ```
//!
//! # Design Decisions
//! - One shared `reqwest::Client` for all vendors (connection pooling)
//! - Base URLs come from config so tests can point them at a mock
//! - Adapters never touch the session; handlers own credential storage

pub mod apple_music;
pub mod models;
pub mod spotify;
pub mod youtube_music;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::config::ServiceConfig;
use crate::observability::metrics;

pub use apple_music::AppleMusicClient;
pub use models::{Image, Playlist, Track};
pub use spotify::SpotifyClient;
pub use youtube_music::YouTubeMusicClient;

/// A supported streaming platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    Spotify,
    AppleMusic,
    YoutubeMusic,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Spotify, Platform::AppleMusic, Platform::YoutubeMusic];

    /// Identifier used in URLs and JSON (`spotify`, `apple-music`, `youtube-music`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Spotify => "spotify",
            Platform::AppleMusic => "apple-music",
            Platform::YoutubeMusic => "youtube-music",
        }
    }

    /// Human readable name for error messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Spotify => "Spotify",
            Platform::AppleMusic => "Apple Music",
            Platform::YoutubeMusic => "YouTube Music",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a path segment names no supported platform.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Platform not supported: {0}")]
pub struct UnknownPlatform(pub String);

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownPlatform(s.to_string()))
    }
}

/// Errors raised by the vendor adapters.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The vendor rejected the user's credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// A required service-level credential is missing from config.
    #[error("{0}")]
    NotConfigured(String),

    /// Network failure or undecodable body.
    #[error("{platform} request failed: {source}")]
    Transport {
        platform: Platform,
        #[source]
        source: reqwest::Error,
    },

    /// The vendor answered with a non-success status.
    #[error("{platform} returned HTTP {status}")]
    Status { platform: Platform, status: u16 },

    /// The vendor answered 2xx but the payload was not what we expected.
    #[error("unexpected {platform} response: {reason}")]
    InvalidResponse { platform: Platform, reason: String },
}

impl PlatformError {
    pub(crate) fn transport(platform: Platform) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| PlatformError::Transport { platform, source }
    }

    pub(crate) fn invalid(platform: Platform, reason: impl Into<String>) -> Self {
        PlatformError::InvalidResponse {
            platform,
            reason: reason.into(),
        }
    }
}

/// Result type for vendor calls.
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Vendor adapters sharing one HTTP client.
#[derive(Clone)]
pub struct PlatformClients {
    pub spotify: SpotifyClient,
    pub apple_music: AppleMusicClient,
    pub youtube_music: YouTubeMusicClient,
}

impl PlatformClients {
    pub fn new(config: &ServiceConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.upstream_secs))
            .user_agent(concat!("playlist-bridge/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            spotify: SpotifyClient::new(http.clone(), config.spotify.clone()),
            apple_music: AppleMusicClient::new(http.clone(), config.apple_music.clone()),
            youtube_music: YouTubeMusicClient::new(http, config.youtube_music.clone()),
        })
    }
}

/// Build `base/seg1/seg2/...`, percent-encoding each segment.
pub(crate) fn endpoint(platform: Platform, base: &str, segments: &[&str]) -> PlatformResult<Url> {
    let mut url = Url::parse(base)
        .map_err(|e| PlatformError::NotConfigured(format!("invalid {platform} base URL '{base}': {e}")))?;
    url.path_segments_mut()
        .map_err(|_| PlatformError::NotConfigured(format!("{platform} base URL cannot carry a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Check the status of a vendor response and decode its JSON body.
///
/// `unauthorized` lists the statuses the vendor uses for bad user credentials.
pub(crate) async fn read_json<T: DeserializeOwned>(
    platform: Platform,
    response: reqwest::Response,
    unauthorized: &[u16],
) -> PlatformResult<T> {
    let status = response.status().as_u16();

    if unauthorized.contains(&status) {
        metrics::record_upstream_call(platform.as_str(), "unauthorized");
        return Err(PlatformError::Unauthorized(format!(
            "{} authentication expired",
            platform.display_name()
        )));
    }

    if !response.status().is_success() {
        metrics::record_upstream_call(platform.as_str(), "error");
        tracing::warn!(platform = %platform, status, "Vendor returned error status");
        return Err(PlatformError::Status { platform, status });
    }

    metrics::record_upstream_call(platform.as_str(), "ok");
    response
        .json::<T>()
        .await
        .map_err(PlatformError::transport(platform))
}
