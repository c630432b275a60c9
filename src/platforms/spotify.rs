//! Spotify OAuth and Web API adapter.
//!
//! # Responsibilities
//! - Build the authorization-code redirect URL
//! - Exchange codes and refresh tokens at the accounts service
//! - Fetch the user profile, playlists and playlist tracks (following `next`)

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{endpoint, read_json, Image, Platform, PlatformError, PlatformResult, Playlist, Track};
use crate::config::SpotifyConfig;
use crate::session::unix_now;

const PLATFORM: Platform = Platform::Spotify;
const PAGE_SIZE: &str = "50";
/// Upper bound on followed `next` links per listing.
const MAX_PAGES: usize = 200;

/// Access/refresh token pair with absolute expiry (seconds since epoch).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpotifyToken {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
}

impl SpotifyToken {
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at <= now
    }
}

/// The linked Spotify account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpotifyUser {
    pub id: String,
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    items: Vec<T>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPlaylist {
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    tracks: RawTrackCount,
    #[serde(default)]
    public: Option<bool>,
    owner: RawOwner,
    #[serde(default)]
    images: Option<Vec<Image>>,
}

#[derive(Debug, Deserialize)]
struct RawTrackCount {
    total: u32,
}

#[derive(Debug, Deserialize)]
struct RawOwner {
    id: String,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPlaylistItem {
    #[serde(default)]
    track: Option<RawTrack>,
}

#[derive(Debug, Deserialize)]
struct RawTrack {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    artists: Vec<RawName>,
    #[serde(default)]
    album: Option<RawName>,
    #[serde(default)]
    duration_ms: Option<u64>,
    #[serde(default)]
    external_ids: Option<RawExternalIds>,
}

#[derive(Debug, Deserialize)]
struct RawName {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawExternalIds {
    #[serde(default)]
    isrc: Option<String>,
}

fn map_playlist(raw: RawPlaylist) -> Playlist {
    Playlist {
        id: raw.id,
        name: raw.name,
        description: raw.description.unwrap_or_default(),
        track_count: raw.tracks.total,
        public: raw.public.unwrap_or(false),
        owner: raw.owner.display_name.unwrap_or(raw.owner.id),
        images: raw.images.unwrap_or_default(),
        platform: PLATFORM,
    }
}

/// Local files and removed tracks come back with no id and are skipped.
fn map_item(item: RawPlaylistItem) -> Option<Track> {
    let track = item.track?;
    let id = track.id.filter(|id| !id.is_empty())?;
    Some(Track {
        id,
        name: track.name,
        artists: track.artists.into_iter().map(|a| a.name).collect(),
        album: track.album.map(|a| a.name),
        duration_ms: track.duration_ms,
        isrc: track.external_ids.and_then(|ids| ids.isrc),
        platform: PLATFORM,
    })
}

/// Spotify client. Cheap to clone.
#[derive(Clone)]
pub struct SpotifyClient {
    http: reqwest::Client,
    config: SpotifyConfig,
}

impl SpotifyClient {
    pub fn new(http: reqwest::Client, config: SpotifyConfig) -> Self {
        Self { http, config }
    }

    /// URL the browser is sent to for consent.
    pub fn authorize_url(&self, state: &str) -> PlatformResult<String> {
        if self.config.client_id.is_empty() {
            return Err(PlatformError::NotConfigured(
                "Spotify client id is not configured".to_string(),
            ));
        }
        let mut url = endpoint(PLATFORM, &self.config.accounts_url, &["authorize"])?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("scope", &self.config.scope)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("state", state);
        Ok(url.into())
    }

    /// Exchange an authorization code for a token pair.
    pub async fn exchange_code(&self, code: &str) -> PlatformResult<SpotifyToken> {
        let response = self
            .request_token(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
            ])
            .await?;

        Ok(SpotifyToken {
            access_token: response.access_token,
            refresh_token: response.refresh_token.unwrap_or_default(),
            expires_at: unix_now() + response.expires_in,
        })
    }

    /// Obtain a fresh access token. Spotify may omit the refresh token, in
    /// which case the old one stays valid.
    pub async fn refresh(&self, token: &SpotifyToken) -> PlatformResult<SpotifyToken> {
        let response = self
            .request_token(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", token.refresh_token.as_str()),
            ])
            .await?;

        Ok(SpotifyToken {
            access_token: response.access_token,
            refresh_token: response
                .refresh_token
                .unwrap_or_else(|| token.refresh_token.clone()),
            expires_at: unix_now() + response.expires_in,
        })
    }

    async fn request_token(&self, grant: &[(&str, &str)]) -> PlatformResult<TokenResponse> {
        let url = endpoint(PLATFORM, &self.config.accounts_url, &["api", "token"])?;
        let mut form: Vec<(&str, &str)> = grant.to_vec();
        form.push(("client_id", self.config.client_id.as_str()));
        form.push(("client_secret", self.config.client_secret.as_str()));

        let response = self
            .http
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(PlatformError::transport(PLATFORM))?;

        read_json(PLATFORM, response, &[]).await
    }

    pub async fn current_user(&self, access_token: &str) -> PlatformResult<SpotifyUser> {
        let url = endpoint(PLATFORM, &self.config.api_url, &["me"])?;
        self.get_json(access_token, url).await
    }

    pub async fn playlists(&self, access_token: &str) -> PlatformResult<Vec<Playlist>> {
        let mut url = endpoint(PLATFORM, &self.config.api_url, &["me", "playlists"])?;
        url.query_pairs_mut().append_pair("limit", PAGE_SIZE);

        let raw: Vec<RawPlaylist> = self.collect_pages(access_token, url).await?;
        Ok(raw.into_iter().map(map_playlist).collect())
    }

    pub async fn playlist_tracks(&self, access_token: &str, playlist_id: &str) -> PlatformResult<Vec<Track>> {
        let mut url = endpoint(
            PLATFORM,
            &self.config.api_url,
            &["playlists", playlist_id, "tracks"],
        )?;
        url.query_pairs_mut().append_pair("limit", PAGE_SIZE);

        let items: Vec<RawPlaylistItem> = self.collect_pages(access_token, url).await?;
        Ok(items.into_iter().filter_map(map_item).collect())
    }

    async fn collect_pages<T: DeserializeOwned>(&self, access_token: &str, first: Url) -> PlatformResult<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(first);
        let mut pages = 0;

        while let Some(url) = next.take() {
            pages += 1;
            let page: Page<T> = self.get_json(access_token, url).await?;
            items.extend(page.items);

            if pages >= MAX_PAGES {
                tracing::warn!(pages, "Spotify pagination limit reached, truncating");
                break;
            }
            next = match page.next {
                Some(link) => Some(
                    Url::parse(&link)
                        .map_err(|e| PlatformError::invalid(PLATFORM, format!("bad next link '{link}': {e}")))?,
                ),
                None => None,
            };
        }

        Ok(items)
    }

    async fn get_json<T: DeserializeOwned>(&self, access_token: &str, url: Url) -> PlatformResult<T> {
        tracing::debug!(url = %url, "Spotify GET");
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(PlatformError::transport(PLATFORM))?;

        read_json(PLATFORM, response, &[401]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(config: SpotifyConfig) -> SpotifyClient {
        SpotifyClient::new(reqwest::Client::new(), config)
    }

    #[test]
    fn test_authorize_url() {
        let config = SpotifyConfig {
            client_id: "client-1".into(),
            redirect_uri: "http://localhost:8000/auth/spotify/callback".into(),
            ..SpotifyConfig::default()
        };
        let url = Url::parse(&client(config).authorize_url("state-xyz").unwrap()).unwrap();

        assert_eq!(url.host_str(), Some("accounts.spotify.com"));
        assert_eq!(url.path(), "/authorize");
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["response_type"], "code");
        assert_eq!(pairs["client_id"], "client-1");
        assert_eq!(pairs["state"], "state-xyz");
        assert_eq!(pairs["redirect_uri"], "http://localhost:8000/auth/spotify/callback");
        assert!(pairs["scope"].contains("playlist-read-private"));
    }

    #[test]
    fn test_authorize_url_requires_client_id() {
        let err = client(SpotifyConfig::default()).authorize_url("s").unwrap_err();
        assert!(matches!(err, PlatformError::NotConfigured(_)));
    }

    #[test]
    fn test_map_playlist() {
        let raw: RawPlaylist = serde_json::from_value(json!({
            "id": "37i9",
            "name": "Focus",
            "description": "Deep work",
            "tracks": { "total": 42, "href": "..." },
            "public": true,
            "owner": { "id": "spotify", "display_name": "Spotify" },
            "images": [{ "url": "https://i.scdn.co/a.jpg", "width": 640, "height": 640 }]
        }))
        .unwrap();

        let playlist = map_playlist(raw);
        assert_eq!(playlist.id, "37i9");
        assert_eq!(playlist.track_count, 42);
        assert!(playlist.public);
        assert_eq!(playlist.owner, "Spotify");
        assert_eq!(playlist.images[0].width, Some(640));
        assert_eq!(playlist.platform, Platform::Spotify);
    }

    #[test]
    fn test_map_playlist_nulls() {
        let raw: RawPlaylist = serde_json::from_value(json!({
            "id": "p",
            "name": "n",
            "description": null,
            "tracks": { "total": 0 },
            "public": null,
            "owner": { "id": "owner-id", "display_name": null },
            "images": null
        }))
        .unwrap();

        let playlist = map_playlist(raw);
        assert_eq!(playlist.description, "");
        assert!(!playlist.public);
        assert_eq!(playlist.owner, "owner-id");
        assert!(playlist.images.is_empty());
    }

    #[test]
    fn test_map_items_skips_missing_tracks() {
        let page: Page<RawPlaylistItem> = serde_json::from_value(json!({
            "items": [
                { "track": {
                    "id": "t1", "name": "One",
                    "artists": [{ "name": "A" }, { "name": "B" }],
                    "album": { "name": "Album" },
                    "duration_ms": 200000,
                    "external_ids": { "isrc": "USRC17607839" }
                }},
                { "track": null },
                { "track": { "id": null, "name": "Local file", "artists": [] } }
            ],
            "next": null
        }))
        .unwrap();

        let tracks: Vec<Track> = page.items.into_iter().filter_map(map_item).collect();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].artists, vec!["A", "B"]);
        assert_eq!(tracks[0].album.as_deref(), Some("Album"));
        assert_eq!(tracks[0].isrc.as_deref(), Some("USRC17607839"));
        assert_eq!(tracks[0].duration_ms, Some(200_000));
    }

    #[test]
    fn test_token_expiry() {
        let token = SpotifyToken {
            access_token: "a".into(),
            refresh_token: "r".into(),
            expires_at: 100,
        };
        assert!(!token.is_expired(99));
        assert!(token.is_expired(100));
    }
}
