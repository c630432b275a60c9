//! YouTube Music adapter over the unofficial InnerTube `browse` endpoint.
//!
//! # Responsibilities
//! - Normalize browser request headers supplied by the user
//! - Replay them against InnerTube with a WEB_REMIX client context, signing
//!   each request with a fresh `SAPISIDHASH`
//! - Dig playlists and tracks out of the renderer tree
//!
//! # Design Decisions
//! - The renderer tree shifts between YouTube releases, so lookups search for
//!   renderer keys instead of hard-coding full paths
//! - Only the first page of a playlist is read (no continuation tokens)

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};
use sha1::{Digest, Sha1};
use tower_sessions::cookie::Cookie;

use super::{endpoint, read_json, Image, Platform, PlatformError, PlatformResult, Playlist, Track};
use crate::config::YouTubeMusicConfig;
use crate::session::unix_now;

const PLATFORM: Platform = Platform::YoutubeMusic;
const LIBRARY_PLAYLISTS: &str = "FEmusic_liked_playlists";

/// Headers replayed from the user's browser session. `authorization` is
/// derived per request instead.
const FORWARDED_HEADERS: [&str; 4] = [
    "cookie",
    "x-goog-authuser",
    "x-goog-visitor-id",
    "user-agent",
];

/// Browser headers, keyed by lower-cased name.
pub type BrowserHeaders = BTreeMap<String, String>;

/// Parse a raw header block (`Name: value` per line) as copied from devtools.
///
/// Lines without a colon, HTTP/2 pseudo-headers and empty values are skipped.
pub fn parse_raw_headers(raw: &str) -> BrowserHeaders {
    raw.lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
        .filter(|(name, value)| !name.is_empty() && !name.starts_with(':') && !value.is_empty())
        .collect()
}

/// Normalize a JSON object of headers. Non-string values are dropped.
pub fn headers_from_json(object: &Map<String, Value>) -> BrowserHeaders {
    object
        .iter()
        .filter_map(|(name, value)| {
            let value = value.as_str()?.trim();
            (!value.is_empty()).then(|| (name.trim().to_ascii_lowercase(), value.to_string()))
        })
        .collect()
}

/// The `SAPISID` value of a cookie header, preferring `__Secure-3PAPISID`.
pub fn sapisid(cookie_header: &str) -> Option<String> {
    let cookies: Vec<Cookie<'_>> = Cookie::split_parse(cookie_header).filter_map(Result::ok).collect();
    ["__Secure-3PAPISID", "SAPISID"].iter().find_map(|name| {
        cookies
            .iter()
            .find(|c| c.name() == *name && !c.value().is_empty())
            .map(|c| c.value().to_string())
    })
}

/// `SAPISIDHASH <ts>_<hex sha1("<ts> <sapisid> <origin>")>`
pub fn sapisid_hash(sapisid: &str, origin: &str, timestamp: i64) -> String {
    let digest = Sha1::digest(format!("{timestamp} {sapisid} {origin}").as_bytes());
    format!("SAPISIDHASH {timestamp}_{}", hex::encode(digest))
}

/// Depth-first search for the first object stored under `key`.
fn find_key<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map
            .get(key)
            .or_else(|| map.values().find_map(|v| find_key(v, key))),
        Value::Array(items) => items.iter().find_map(|v| find_key(v, key)),
        _ => None,
    }
}

fn runs_text(runs: Option<&Value>) -> Vec<&str> {
    runs.and_then(Value::as_array)
        .map(|runs| {
            runs.iter()
                .filter_map(|run| run.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default()
}

fn first_run(value: &Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn thumbnails(value: Option<&Value>) -> Vec<Image> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|t| {
                    Some(Image {
                        url: t.get("url")?.as_str()?.to_string(),
                        width: t.get("width").and_then(Value::as_u64).map(|w| w as u32),
                        height: t.get("height").and_then(Value::as_u64).map(|h| h as u32),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// "1,024 songs" → 1024. Looks for a number followed by song/track/episode.
fn parse_item_count(texts: &[&str]) -> Option<u32> {
    texts.iter().find_map(|text| {
        let mut words = text.split_whitespace();
        let number = words.next()?.replace(',', "");
        let unit = words.next()?.to_ascii_lowercase();
        if unit.starts_with("song") || unit.starts_with("track") || unit.starts_with("episode") {
            number.parse().ok()
        } else {
            None
        }
    })
}

/// "3:45" → 225000, "1:02:03" → 3723000.
pub fn parse_duration(text: &str) -> Option<u64> {
    let parts: Vec<u64> = text
        .trim()
        .split(':')
        .map(|p| p.parse::<u64>().ok())
        .collect::<Option<_>>()?;
    let seconds = match parts.as_slice() {
        [m, s] => m * 60 + s,
        [h, m, s] => h * 3600 + m * 60 + s,
        _ => return None,
    };
    Some(seconds * 1000)
}

fn map_library_item(item: &Value) -> Option<Playlist> {
    let renderer = item.get("musicTwoRowItemRenderer")?;
    let browse_id = renderer
        .pointer("/navigationEndpoint/browseEndpoint/browseId")
        .and_then(Value::as_str)?;
    // Only real playlists have a VL browse id; the "New playlist" tile does not.
    let id = browse_id.strip_prefix("VL")?;
    let name = first_run(renderer, "/title/runs/0/text")?;
    let subtitle = runs_text(renderer.pointer("/subtitle/runs"));

    Some(Playlist {
        id: id.to_string(),
        name,
        description: String::new(),
        track_count: parse_item_count(&subtitle).unwrap_or(0),
        public: false,
        owner: "Me".to_string(),
        images: thumbnails(renderer.pointer("/thumbnailRenderer/musicThumbnailRenderer/thumbnail/thumbnails")),
        platform: PLATFORM,
    })
}

/// Extract library playlists from a `FEmusic_liked_playlists` browse response.
fn map_library(response: &Value) -> PlatformResult<Vec<Playlist>> {
    let grid = find_key(response, "gridRenderer")
        .ok_or_else(|| PlatformError::invalid(PLATFORM, "no playlist grid in library response"))?;
    let items = grid
        .get("items")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    Ok(items.iter().filter_map(map_library_item).collect())
}

fn flex_column(renderer: &Value, index: usize) -> Option<&Value> {
    renderer
        .get("flexColumns")?
        .get(index)?
        .pointer("/musicResponsiveListItemFlexColumnRenderer/text/runs")
}

fn map_playlist_item(item: &Value) -> Option<Track> {
    let renderer = item.get("musicResponsiveListItemRenderer")?;
    let video_id = renderer
        .pointer("/playlistItemData/videoId")
        .or_else(|| {
            renderer.pointer(
                "/overlay/musicItemThumbnailOverlayRenderer/content/musicPlayButtonRenderer/playNavigationEndpoint/watchEndpoint/videoId",
            )
        })
        .and_then(Value::as_str)?;
    let name = runs_text(flex_column(renderer, 0)).first()?.to_string();

    let mut artists: Vec<String> = runs_text(flex_column(renderer, 1))
        .into_iter()
        .map(str::trim)
        .filter(|t| !t.is_empty() && !matches!(*t, "•" | "," | "&"))
        .map(str::to_string)
        .collect();
    if artists.is_empty() {
        artists.push("Unknown Artist".to_string());
    }

    let album = runs_text(flex_column(renderer, 2))
        .first()
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty());
    let duration_ms = renderer
        .pointer("/fixedColumns/0/musicResponsiveListItemFixedColumnRenderer/text/runs/0/text")
        .and_then(Value::as_str)
        .and_then(parse_duration);

    Some(Track {
        id: video_id.to_string(),
        name,
        artists,
        album,
        duration_ms,
        isrc: None,
        platform: PLATFORM,
    })
}

/// Extract tracks from a `VL<id>` browse response.
fn map_playlist_tracks(response: &Value) -> PlatformResult<Vec<Track>> {
    let shelf = find_key(response, "musicPlaylistShelfRenderer")
        .ok_or_else(|| PlatformError::invalid(PLATFORM, "no track shelf in playlist response"))?;
    let items = shelf
        .get("contents")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    Ok(items.iter().filter_map(map_playlist_item).collect())
}

/// YouTube Music client. Cheap to clone.
#[derive(Clone)]
pub struct YouTubeMusicClient {
    http: reqwest::Client,
    config: YouTubeMusicConfig,
}

impl YouTubeMusicClient {
    pub fn new(http: reqwest::Client, config: YouTubeMusicConfig) -> Self {
        Self { http, config }
    }

    /// Lifetime given to freshly stored headers, in seconds.
    pub fn token_ttl_secs(&self) -> i64 {
        self.config.token_ttl_secs as i64
    }

    /// True when the headers can read the user's library.
    pub async fn validate(&self, headers: &BrowserHeaders) -> bool {
        match self.playlists(headers).await {
            Ok(playlists) => {
                tracing::debug!(count = playlists.len(), "YouTube Music headers validated");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "YouTube Music header validation failed");
                false
            }
        }
    }

    pub async fn playlists(&self, headers: &BrowserHeaders) -> PlatformResult<Vec<Playlist>> {
        let response = self.browse(headers, LIBRARY_PLAYLISTS).await?;
        map_library(&response)
    }

    pub async fn playlist_tracks(&self, headers: &BrowserHeaders, playlist_id: &str) -> PlatformResult<Vec<Track>> {
        let browse_id = if playlist_id.starts_with("VL") {
            playlist_id.to_string()
        } else {
            format!("VL{playlist_id}")
        };
        let response = self.browse(headers, &browse_id).await?;
        map_playlist_tracks(&response)
    }

    async fn browse(&self, headers: &BrowserHeaders, browse_id: &str) -> PlatformResult<Value> {
        let mut url = endpoint(PLATFORM, &self.config.api_url, &["browse"])?;
        url.query_pairs_mut()
            .append_pair("alt", "json")
            .append_pair("prettyPrint", "false");

        let body = json!({
            "context": {
                "client": {
                    "clientName": "WEB_REMIX",
                    "clientVersion": self.config.client_version,
                    "hl": "en",
                },
                "user": {},
            },
            "browseId": browse_id,
        });

        let sid = headers
            .get("cookie")
            .and_then(|cookie| sapisid(cookie))
            .ok_or_else(|| PlatformError::Unauthorized("YouTube Music cookie has no SAPISID".to_string()))?;
        let origin = self.config.origin.as_str();

        let mut request = self
            .http
            .post(url)
            .header("origin", origin)
            .header("x-origin", origin)
            .header("authorization", sapisid_hash(&sid, origin, unix_now()))
            .json(&body);
        for name in FORWARDED_HEADERS {
            if let Some(value) = headers.get(name) {
                request = request.header(name, value.as_str());
            }
        }

        tracing::debug!(browse_id, "YouTube Music browse");
        let response = request
            .send()
            .await
            .map_err(PlatformError::transport(PLATFORM))?;

        read_json(PLATFORM, response, &[401, 403]).await
    }
}
