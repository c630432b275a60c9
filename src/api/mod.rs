//! HTTP handlers.
//!
//! - `health.rs`: liveness
//! - `auth.rs`: linking and unlinking platform accounts
//! - `playlists.rs`: unified playlist and track listings

pub mod auth;
pub mod health;
pub mod playlists;
