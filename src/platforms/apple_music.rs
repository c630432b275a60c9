//! Apple Music API adapter.
//!
//! Every call carries the service-wide developer token plus the user's
//! Music-User-Token obtained by MusicKit JS in the browser.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use super::{endpoint, read_json, Image, Platform, PlatformError, PlatformResult, Playlist, Track};
use crate::config::AppleMusicConfig;

const PLATFORM: Platform = Platform::AppleMusic;
const PAGE_SIZE: &str = "100";
const MAX_PAGES: usize = 200;
const DEFAULT_ARTWORK_SIZE: u32 = 300;

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LibraryPlaylist {
    id: String,
    #[serde(default)]
    attributes: Option<PlaylistAttributes>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistAttributes {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<Description>,
    #[serde(default)]
    track_count: Option<u32>,
    #[serde(default)]
    is_public: Option<bool>,
    #[serde(default)]
    artwork: Option<Artwork>,
}

#[derive(Debug, Deserialize)]
struct Description {
    #[serde(default)]
    standard: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Artwork {
    url: String,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct LibrarySong {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    attributes: Option<SongAttributes>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SongAttributes {
    name: String,
    #[serde(default)]
    artist_name: Option<String>,
    #[serde(default)]
    album_name: Option<String>,
    #[serde(default)]
    duration_in_millis: Option<u64>,
    #[serde(default)]
    isrc: Option<String>,
}

/// Artwork URLs are templates with `{w}` and `{h}` placeholders.
fn map_artwork(artwork: Artwork) -> Image {
    let width = artwork.width.unwrap_or(DEFAULT_ARTWORK_SIZE);
    let height = artwork.height.unwrap_or(DEFAULT_ARTWORK_SIZE);
    Image {
        url: artwork
            .url
            .replace("{w}", &width.to_string())
            .replace("{h}", &height.to_string()),
        width: Some(width),
        height: Some(height),
    }
}

fn map_playlist(raw: LibraryPlaylist) -> Playlist {
    let attrs = raw.attributes;
    let (name, description, track_count, public, images) = match attrs {
        Some(a) => (
            a.name.unwrap_or_default(),
            a.description.and_then(|d| d.standard).unwrap_or_default(),
            a.track_count.unwrap_or(0),
            a.is_public.unwrap_or(false),
            a.artwork.map(map_artwork).into_iter().collect(),
        ),
        None => (String::new(), String::new(), 0, false, Vec::new()),
    };

    Playlist {
        id: raw.id,
        name,
        description,
        track_count,
        public,
        owner: "Me".to_string(),
        images,
        platform: PLATFORM,
    }
}

fn map_song(raw: LibrarySong) -> Option<Track> {
    let id = raw.id.filter(|id| !id.is_empty())?;
    let attrs = raw.attributes?;
    Some(Track {
        id,
        name: attrs.name,
        artists: attrs.artist_name.into_iter().collect(),
        album: attrs.album_name,
        duration_ms: attrs.duration_in_millis,
        isrc: attrs.isrc,
        platform: PLATFORM,
    })
}

/// Apple Music client. Cheap to clone.
#[derive(Clone)]
pub struct AppleMusicClient {
    http: reqwest::Client,
    config: AppleMusicConfig,
}

impl AppleMusicClient {
    pub fn new(http: reqwest::Client, config: AppleMusicConfig) -> Self {
        Self { http, config }
    }

    /// Lifetime given to a freshly stored user token, in seconds.
    pub fn token_ttl_secs(&self) -> i64 {
        self.config.token_ttl_secs as i64
    }

    pub async fn playlists(&self, user_token: &str) -> PlatformResult<Vec<Playlist>> {
        let mut url = endpoint(PLATFORM, &self.config.api_url, &["me", "library", "playlists"])?;
        url.query_pairs_mut().append_pair("limit", PAGE_SIZE);

        let raw: Vec<LibraryPlaylist> = self.collect_pages(user_token, url).await?;
        Ok(raw.into_iter().map(map_playlist).collect())
    }

    pub async fn playlist_tracks(&self, user_token: &str, playlist_id: &str) -> PlatformResult<Vec<Track>> {
        let mut url = endpoint(
            PLATFORM,
            &self.config.api_url,
            &["me", "library", "playlists", playlist_id, "tracks"],
        )?;
        url.query_pairs_mut().append_pair("limit", PAGE_SIZE);

        let raw: Vec<LibrarySong> = self.collect_pages(user_token, url).await?;
        Ok(raw.into_iter().filter_map(map_song).collect())
    }

    /// Follow `next` links. Apple returns them as root-relative paths
    /// (`/v1/me/library/playlists?offset=100`), resolved against the current URL.
    async fn collect_pages<T: DeserializeOwned>(&self, user_token: &str, first: Url) -> PlatformResult<Vec<T>> {
        if self.config.developer_token.is_empty() {
            return Err(PlatformError::NotConfigured(
                "Apple Music developer token is not configured".to_string(),
            ));
        }

        let mut items = Vec::new();
        let mut next = Some(first);
        let mut pages = 0;

        while let Some(url) = next.take() {
            pages += 1;
            tracing::debug!(url = %url, "Apple Music GET");
            let response = self
                .http
                .get(url.clone())
                .bearer_auth(&self.config.developer_token)
                .header("Music-User-Token", user_token)
                .send()
                .await
                .map_err(PlatformError::transport(PLATFORM))?;

            let page: Page<T> = read_json(PLATFORM, response, &[401, 403]).await?;
            items.extend(page.data);

            if pages >= MAX_PAGES {
                tracing::warn!(pages, "Apple Music pagination limit reached, truncating");
                break;
            }
            next = match page.next {
                Some(link) => Some(
                    url.join(&link)
                        .map_err(|e| PlatformError::invalid(PLATFORM, format!("bad next link '{link}': {e}")))?,
                ),
                None => None,
            };
        }

        Ok(items)
    }
}
