//! Cookie-referenced server-side sessions.
//!
//! # Data Flow
//! ```text
//! request
//!     → SessionManagerLayer (verify signed cookie, load record from store.rs)
//!     → handler extracts `tower_sessions::Session`
//!     → credentials read and written through the helpers below
//!     → modified sessions are saved and the cookie is (re)issued
//! ```
//!
//! # Design Decisions
//! - Sessions are created lazily, only when a handler writes
//! - The cookie only carries a signed id; credentials never leave the server

pub mod credentials;
pub mod store;

use sha2::{Digest, Sha512};
use tower_sessions::cookie::{Key, SameSite};
use tower_sessions::service::SignedCookie;
use tower_sessions::{session, Expiry, Session, SessionManagerLayer};

use crate::config::SessionConfig;
use crate::platforms::Platform;

pub use credentials::{AppleMusicCredential, PlatformCredentials, SpotifyCredential, YouTubeMusicCredential};
pub use store::MemorySessionStore;

/// Session key holding the [`PlatformCredentials`].
pub const CREDENTIALS_KEY: &str = "credentials";
/// Session key holding the OAuth `state` of the last Spotify login redirect.
pub const OAUTH_STATE_KEY: &str = "oauth_state";

pub type SessionResult<T> = Result<T, session::Error>;

/// Seconds since the Unix epoch.
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Session layer with a signed `HttpOnly; SameSite=Lax` cookie and an idle expiry.
pub fn session_layer(config: &SessionConfig, store: MemorySessionStore) -> SessionManagerLayer<MemorySessionStore, SignedCookie> {
    // Signing keys are 64 bytes; the configured secret may be shorter.
    let key = Key::from(Sha512::digest(config.secret.as_bytes()).as_slice());

    SessionManagerLayer::new(store)
        .with_name(config.cookie_name.clone())
        .with_path("/")
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_secure(config.secure_cookie)
        .with_expiry(Expiry::OnInactivity(time::Duration::seconds(
            i64::try_from(config.ttl_secs).unwrap_or(i64::MAX),
        )))
        .with_signed(key)
}

/// Stored credentials (empty for callers without a session).
pub async fn load_credentials(session: &Session) -> SessionResult<PlatformCredentials> {
    Ok(session.get(CREDENTIALS_KEY).await?.unwrap_or_default())
}

/// Mutate the stored credentials, creating the session if needed.
pub async fn update_credentials<R>(
    session: &Session,
    f: impl FnOnce(&mut PlatformCredentials) -> R,
) -> SessionResult<R> {
    let mut stored = load_credentials(session).await?;
    let result = f(&mut stored);
    session.insert(CREDENTIALS_KEY, &stored).await?;
    Ok(result)
}

/// Remove one platform's credential. Returns whether one was stored.
pub async fn remove_credential(session: &Session, platform: Platform) -> SessionResult<bool> {
    let Some(mut stored) = session.get::<PlatformCredentials>(CREDENTIALS_KEY).await? else {
        return Ok(false);
    };
    let removed = stored.clear(platform);
    if removed {
        session.insert(CREDENTIALS_KEY, &stored).await?;
    }
    Ok(removed)
}

pub async fn set_oauth_state(session: &Session, state: &str) -> SessionResult<()> {
    session.insert(OAUTH_STATE_KEY, state).await
}

/// Consume the pending OAuth state.
pub async fn take_oauth_state(session: &Session) -> SessionResult<Option<String>> {
    session.remove(OAUTH_STATE_KEY).await
}
