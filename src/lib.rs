//! Playlist Bridge Library
//!
//! Links a user's Spotify, Apple Music and YouTube Music accounts and serves
//! their playlists through one unified HTTP API.

pub mod api;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod platforms;
pub mod security;
pub mod session;

pub use config::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
