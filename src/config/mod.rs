//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults (schema.rs)
//!     → optional TOML file (loader.rs)
//!     → environment / .env overrides (loader.rs)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → handed to HttpServer at startup
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup and never reloaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AppleMusicConfig, FrontendConfig, ListenerConfig, ObservabilityConfig, RateLimitConfig,
    SecurityConfig, ServiceConfig, SessionConfig, SpotifyConfig, TimeoutConfig, YouTubeMusicConfig,
};
