//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with all handlers
//! - Wire up middleware (tracing, request ID, limits, CORS, sessions)
//! - Spawn the background sweeper
//! - Serve until the shutdown broadcast fires

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::api::{auth, health, playlists};
use crate::config::ServiceConfig;
use crate::http::request::{make_span, propagate_request_id_layer, set_request_id_layer};
use crate::http::response::ApiError;
use crate::lifecycle::Sweeper;
use crate::observability::metrics;
use crate::platforms::PlatformClients;
use crate::security::headers::{cors_layer, security_header_layers};
use crate::security::{rate_limit_middleware, RateLimiter};
use crate::session::{session_layer, MemorySessionStore};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: MemorySessionStore,
    pub limiter: Arc<RateLimiter>,
    pub platforms: Arc<PlatformClients>,
    pub frontend_url: String,
}

/// HTTP server for the playlist bridge.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServiceConfig) -> Result<Self, reqwest::Error> {
        let state = AppState {
            sessions: MemorySessionStore::new(),
            limiter: Arc::new(RateLimiter::new(&config.rate_limit)),
            platforms: Arc::new(PlatformClients::new(&config)?),
            frontend_url: config.frontend.url.clone(),
        };

        let router = Self::build_router(&config, state.clone());
        Ok(Self { router, config, state })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ServiceConfig, state: AppState) -> Router {
        let playlist_routes = Router::new()
            .route("/api/playlists/{platform}", get(playlists::list_playlists))
            .route(
                "/api/playlists/{platform}/{playlist_id}/tracks",
                get(playlists::list_tracks),
            )
            .route_layer(middleware::from_fn_with_state(
                state.limiter.clone(),
                rate_limit_middleware,
            ));

        let mut router = Router::new()
            .route("/health", get(health::health))
            .route("/auth/spotify", get(auth::spotify_login))
            .route("/auth/spotify/callback", get(auth::spotify_callback))
            .route("/auth/apple-music", post(auth::apple_music_login))
            .route("/auth/youtube-music", post(auth::youtube_music_login))
            .route("/auth/status", get(auth::auth_status))
            .route("/auth/logout/{platform}", post(auth::logout))
            .merge(playlist_routes)
            .fallback(fallback)
            .layer(session_layer(&config.session, state.sessions.clone()))
            .layer(middleware::from_fn(metrics::track_requests))
            .with_state(state);

        if config.security.enable_headers {
            for layer in security_header_layers() {
                router = router.layer(layer);
            }
        }

        router.layer(
            ServiceBuilder::new()
                .layer(set_request_id_layer())
                .layer(TraceLayer::new_for_http().make_span_with(make_span::<Body>))
                .layer(propagate_request_id_layer())
                .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    Duration::from_secs(config.timeouts.request_secs),
                ))
                .layer(cors_layer(&config.frontend.url)),
        )
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let sweeper = Sweeper::new(
            self.state.sessions.clone(),
            self.state.limiter.clone(),
            Duration::from_secs(self.config.session.sweep_interval_secs),
        );
        tokio::spawn(sweeper.run(shutdown.resubscribe()));

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server received shutdown signal");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The router, for driving the service without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

async fn fallback() -> ApiError {
    ApiError::UnknownPlatform("Not found".to_string())
}
