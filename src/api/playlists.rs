//! Unified playlist and track listings.

use axum::{
    extract::{Path, State},
    Json,
};
use tower_sessions::Session;

use crate::http::response::{ApiError, ApiResult};
use crate::http::server::AppState;
use crate::platforms::{Platform, PlatformClients, Playlist, Track};
use crate::session::{load_credentials, unix_now, update_credentials};

const MAX_PLAYLIST_ID_LEN: usize = 100;

/// A credential ready to use against a platform.
enum Access {
    Spotify(String),
    AppleMusic(String),
    YouTubeMusic(crate::platforms::youtube_music::BrowserHeaders),
}

/// Resolve the caller's credential for `platform`, refreshing an expired
/// Spotify access token when a refresh token is on file.
async fn access_for(platform: Platform, session: &Session, clients: &PlatformClients) -> ApiResult<Access> {
    let credentials = load_credentials(session).await?;
    let now = unix_now();
    let not_authenticated = || ApiError::not_authenticated(platform.display_name());

    match platform {
        Platform::Spotify => {
            let credential = credentials.spotify.ok_or_else(not_authenticated)?;
            if !credential.token.is_expired(now) {
                return Ok(Access::Spotify(credential.token.access_token));
            }
            if credential.token.refresh_token.is_empty() {
                return Err(not_authenticated());
            }

            let token = clients.spotify.refresh(&credential.token).await.map_err(|e| {
                tracing::warn!(error = %e, "Spotify token refresh failed");
                ApiError::Unauthorized("Spotify authentication expired".to_string())
            })?;
            tracing::debug!("Spotify access token refreshed");

            let access_token = token.access_token.clone();
            update_credentials(session, |c| {
                if let Some(spotify) = c.spotify.as_mut() {
                    spotify.token = token;
                }
            })
            .await?;
            Ok(Access::Spotify(access_token))
        }
        Platform::AppleMusic => credentials
            .apple_music
            .filter(|c| c.expires_at > now)
            .map(|c| Access::AppleMusic(c.user_token))
            .ok_or_else(not_authenticated),
        Platform::YoutubeMusic => credentials
            .youtube_music
            .filter(|c| c.authenticated && c.expires_at > now)
            .map(|c| Access::YouTubeMusic(c.headers))
            .ok_or_else(not_authenticated),
    }
}

/// `GET /api/playlists/{platform}`
pub async fn list_playlists(
    State(state): State<AppState>,
    session: Session,
    Path(platform): Path<String>,
) -> ApiResult<Json<Vec<Playlist>>> {
    let platform: Platform = platform.parse()?;
    let clients = &state.platforms;

    let playlists = match access_for(platform, &session, clients).await? {
        Access::Spotify(token) => clients.spotify.playlists(&token).await?,
        Access::AppleMusic(token) => clients.apple_music.playlists(&token).await?,
        Access::YouTubeMusic(headers) => clients.youtube_music.playlists(&headers).await?,
    };

    tracing::debug!(platform = %platform, count = playlists.len(), "Fetched playlists");
    Ok(Json(playlists))
}

/// `GET /api/playlists/{platform}/{playlist_id}/tracks`
pub async fn list_tracks(
    State(state): State<AppState>,
    session: Session,
    Path((platform, playlist_id)): Path<(String, String)>,
) -> ApiResult<Json<Vec<Track>>> {
    let platform: Platform = platform.parse()?;

    let playlist_id = playlist_id.trim();
    if playlist_id.is_empty() || playlist_id.chars().count() >= MAX_PLAYLIST_ID_LEN {
        return Err(ApiError::BadRequest("Invalid playlist ID".to_string()));
    }

    let clients = &state.platforms;
    let tracks = match access_for(platform, &session, clients).await? {
        Access::Spotify(token) => clients.spotify.playlist_tracks(&token, playlist_id).await?,
        Access::AppleMusic(token) => clients.apple_music.playlist_tracks(&token, playlist_id).await?,
        Access::YouTubeMusic(headers) => clients.youtube_music.playlist_tracks(&headers, playlist_id).await?,
    };

    tracing::debug!(platform = %platform, playlist_id, count = tracks.len(), "Fetched tracks");
    Ok(Json(tracks))
}
