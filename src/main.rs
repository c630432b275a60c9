//! Playlist Bridge
//!
//! Backend that links music-streaming accounts and exposes their playlists
//! through a single API.
//!
//! # Architecture Overview
//!
//! ```text
//!                   ┌──────────────────────────────────────────────────────┐
//!                   │                   PLAYLIST BRIDGE                    │
//!                   │                                                      │
//!   Browser ───────▶│  tower-http layers ─▶ session ─▶ /auth/*            │
//!   (frontend)      │  (trace, request id,          │                      │
//!                   │   timeout, CORS)              ▼                      │
//!                   │                   rate limit ─▶ /api/playlists/*     │
//!                   │                                  │                   │
//!                   │                                  ▼                   │
//!                   │                          platform adapters ──────────┼──▶ Spotify
//!                   │                          (unified models)  ──────────┼──▶ Apple Music
//!                   │                                            ──────────┼──▶ YouTube Music
//!                   │                                                      │
//!                   │  background: sweeper (sessions, limiter windows)     │
//!                   └──────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use playlist_bridge::config::load_config;
use playlist_bridge::lifecycle::{wait_for_signal, Shutdown};
use playlist_bridge::observability::{logging, metrics};
use playlist_bridge::HttpServer;

#[derive(Debug, Parser)]
#[command(name = "playlist-bridge", version, about = "Unified playlist API for music streaming platforms")]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen address (e.g. 127.0.0.1:8000).
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = load_config(args.config.as_deref(), args.bind.as_deref())?;
    logging::init_logging(&config.observability);

    tracing::info!("playlist-bridge v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        frontend = %config.frontend.url,
        rate_limit_enabled = config.rate_limit.enabled,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.spotify.client_id.is_empty() || config.spotify.client_secret.is_empty() {
        tracing::warn!("Spotify client credentials not set, Spotify login will fail");
    }
    if config.apple_music.developer_token.is_empty() {
        tracing::warn!("Apple Music developer token not set, Apple Music requests will fail");
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    let server_shutdown = shutdown.subscribe();

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        signal_shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
