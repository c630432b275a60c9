//! Account linking.
//!
//! # Responsibilities
//! - Spotify authorization-code flow with a session-bound `state`
//! - Store Apple Music user tokens and YouTube Music browser headers
//! - Report and revoke linked platforms
//!
//! # Design Decisions
//! - The stored OAuth state is consumed by the callback whatever its outcome
//! - Tokens are validated for shape only (Apple) or by a live call (YouTube)

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::Redirect,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;
use tower_sessions::Session;
use uuid::Uuid;

use crate::http::response::{ApiError, ApiResult};
use crate::http::server::AppState;
use crate::platforms::spotify::SpotifyUser;
use crate::platforms::youtube_music::{headers_from_json, parse_raw_headers, sapisid, BrowserHeaders};
use crate::platforms::{Platform, PlatformError};
use crate::session::{
    load_credentials, remove_credential, set_oauth_state, take_oauth_state, unix_now, update_credentials,
    AppleMusicCredential, SpotifyCredential, YouTubeMusicCredential,
};

/// `{success, message}` body returned by the login and logout endpoints.
#[derive(Debug, Serialize)]
pub struct AuthMessage {
    pub success: bool,
    pub message: String,
}

impl AuthMessage {
    fn ok(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
        })
    }
}

/// Redirect to the frontend with query parameters appended.
fn frontend_redirect(frontend_url: &str, params: &[(&str, &str)]) -> ApiResult<Redirect> {
    let mut url = Url::parse(frontend_url)
        .map_err(|e| ApiError::Internal(format!("Invalid frontend URL: {e}")))?;
    url.query_pairs_mut().extend_pairs(params);
    Ok(Redirect::to(url.as_str()))
}

/// `GET /auth/spotify`
pub async fn spotify_login(
    State(state): State<AppState>,
    session: Session,
) -> ApiResult<Redirect> {
    let oauth_state = Uuid::new_v4().to_string();
    let url = state.platforms.spotify.authorize_url(&oauth_state)?;
    set_oauth_state(&session, &oauth_state).await?;
    Ok(Redirect::to(&url))
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// `GET /auth/spotify/callback`
pub async fn spotify_callback(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<CallbackParams>,
) -> ApiResult<Redirect> {
    let expected = take_oauth_state(&session).await?;

    if let Some(error) = params.error.as_deref() {
        tracing::warn!(error, "Spotify authorization denied");
        return frontend_redirect(&state.frontend_url, &[("error", "spotify_auth_denied")]);
    }

    match (expected.as_deref(), params.state.as_deref()) {
        (Some(expected), Some(received)) if expected == received => {}
        _ => return Err(ApiError::BadRequest("State mismatch".to_string())),
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing authorization code".to_string()))?;

    let spotify = &state.platforms.spotify;
    let credential = async {
        let token = spotify.exchange_code(&code).await?;
        let user = spotify.current_user(&token.access_token).await?;
        Ok::<_, PlatformError>(SpotifyCredential {
            token,
            user: Some(user),
        })
    }
    .await
    .map_err(|e| ApiError::Internal(format!("Authentication failed: {e}")))?;

    tracing::info!(
        user = credential.user.as_ref().map(|u| u.id.as_str()).unwrap_or("unknown"),
        "Spotify account linked"
    );
    update_credentials(&session, |c| c.spotify = Some(credential)).await?;

    frontend_redirect(&state.frontend_url, &[("platform", "spotify"), ("status", "success")])
}

#[derive(Debug, Deserialize)]
pub struct AppleMusicLogin {
    #[serde(rename = "userToken", default)]
    pub user_token: Option<String>,
}

/// Three non-empty base64url segments separated by dots.
fn is_jwt_shaped(token: &str) -> bool {
    let segments: Vec<&str> = token.split('.').collect();
    segments.len() == 3
        && segments.iter().all(|segment| {
            !segment.is_empty()
                && segment
                    .trim_end_matches('=')
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        })
}

/// `POST /auth/apple-music`
pub async fn apple_music_login(
    State(state): State<AppState>,
    session: Session,
    payload: Result<Json<AppleMusicLogin>, JsonRejection>,
) -> ApiResult<Json<AuthMessage>> {
    let Json(body) = payload?;
    let user_token = body
        .user_token
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing user token".to_string()))?;

    if !is_jwt_shaped(&user_token) {
        return Err(ApiError::BadRequest("Invalid user token".to_string()));
    }

    let expires_at = unix_now() + state.platforms.apple_music.token_ttl_secs();
    update_credentials(&session, |c| {
        c.apple_music = Some(AppleMusicCredential {
            user_token,
            expires_at,
        })
    })
    .await?;

    tracing::info!("Apple Music account linked");
    Ok(AuthMessage::ok("Apple Music authenticated successfully"))
}

#[derive(Debug, Deserialize)]
pub struct YouTubeMusicLogin {
    #[serde(default)]
    pub headers_raw: Option<String>,
    #[serde(default)]
    pub headers: Option<Value>,
}

impl YouTubeMusicLogin {
    fn into_headers(self) -> ApiResult<BrowserHeaders> {
        match (self.headers_raw, self.headers) {
            (Some(raw), _) if !raw.trim().is_empty() => Ok(parse_raw_headers(&raw)),
            (_, Some(Value::Object(object))) => Ok(headers_from_json(&object)),
            (_, Some(Value::String(raw))) if !raw.trim().is_empty() => Ok(parse_raw_headers(&raw)),
            (_, Some(_)) => Err(ApiError::BadRequest("Invalid headers provided".to_string())),
            _ => Err(ApiError::BadRequest("Missing headers_raw".to_string())),
        }
    }
}

/// `POST /auth/youtube-music`
pub async fn youtube_music_login(
    State(state): State<AppState>,
    session: Session,
    payload: Result<Json<YouTubeMusicLogin>, JsonRejection>,
) -> ApiResult<Json<AuthMessage>> {
    let Json(body) = payload?;
    let headers = body.into_headers()?;

    let Some(cookie) = headers.get("cookie") else {
        return Err(ApiError::BadRequest(
            "Headers must include a cookie".to_string(),
        ));
    };
    if sapisid(cookie).is_none() {
        return Err(ApiError::BadRequest(
            "Cookie must include SAPISID".to_string(),
        ));
    }

    let youtube = &state.platforms.youtube_music;
    if !youtube.validate(&headers).await {
        return Err(ApiError::Unauthorized("Invalid YouTube Music headers".to_string()));
    }

    let expires_at = unix_now() + youtube.token_ttl_secs();
    update_credentials(&session, |c| {
        c.youtube_music = Some(YouTubeMusicCredential {
            headers,
            authenticated: true,
            expires_at,
        })
    })
    .await?;

    tracing::info!("YouTube Music account linked");
    Ok(AuthMessage::ok("YouTube Music authenticated successfully"))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthFlags {
    pub spotify: bool,
    pub apple_music: bool,
    pub youtube_music: bool,
}

#[derive(Debug, Serialize)]
pub struct UserInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spotify: Option<SpotifyUser>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatusResponse {
    pub status: AuthFlags,
    pub user_info: UserInfo,
}

/// `GET /auth/status`
pub async fn auth_status(session: Session) -> ApiResult<Json<AuthStatusResponse>> {
    let credentials = load_credentials(&session).await?;
    let now = unix_now();

    let spotify = credentials.is_authenticated(Platform::Spotify, now);
    let status = AuthFlags {
        spotify,
        apple_music: credentials.is_authenticated(Platform::AppleMusic, now),
        youtube_music: credentials.is_authenticated(Platform::YoutubeMusic, now),
    };
    let user_info = UserInfo {
        spotify: credentials
            .spotify
            .filter(|_| spotify)
            .and_then(|c| c.user),
    };

    Ok(Json(AuthStatusResponse { status, user_info }))
}

/// `POST /auth/logout/{platform}`
pub async fn logout(
    session: Session,
    Path(platform): Path<String>,
) -> ApiResult<Json<AuthMessage>> {
    let platform: Platform = platform.parse()?;
    let removed = remove_credential(&session, platform).await?;

    tracing::info!(platform = %platform, removed, "Logged out");
    Ok(AuthMessage::ok(format!("Logged out from {platform}")))
}
