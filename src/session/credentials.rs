//! Per-platform credentials held in a session.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::platforms::spotify::{SpotifyToken, SpotifyUser};
use crate::platforms::Platform;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpotifyCredential {
    pub token: SpotifyToken,
    pub user: Option<SpotifyUser>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppleMusicCredential {
    pub user_token: String,
    /// Synthetic expiry; Apple does not tell us when a user token dies.
    pub expires_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YouTubeMusicCredential {
    /// Browser request headers, names lower-cased.
    pub headers: BTreeMap<String, String>,
    pub authenticated: bool,
    pub expires_at: i64,
}

/// Everything a session knows about the user's linked accounts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformCredentials {
    pub spotify: Option<SpotifyCredential>,
    pub apple_music: Option<AppleMusicCredential>,
    pub youtube_music: Option<YouTubeMusicCredential>,
}

impl PlatformCredentials {
    /// A credential is valid while its expiry lies strictly in the future.
    pub fn is_authenticated(&self, platform: Platform, now: i64) -> bool {
        match platform {
            Platform::Spotify => self
                .spotify
                .as_ref()
                .is_some_and(|c| c.token.expires_at > now),
            Platform::AppleMusic => self
                .apple_music
                .as_ref()
                .is_some_and(|c| c.expires_at > now),
            Platform::YoutubeMusic => self
                .youtube_music
                .as_ref()
                .is_some_and(|c| c.authenticated && c.expires_at > now),
        }
    }

    /// Drop the credential for one platform. Returns whether one was stored.
    pub fn clear(&mut self, platform: Platform) -> bool {
        match platform {
            Platform::Spotify => self.spotify.take().is_some(),
            Platform::AppleMusic => self.apple_music.take().is_some(),
            Platform::YoutubeMusic => self.youtube_music.take().is_some(),
        }
    }
}
