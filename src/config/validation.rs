//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (windows > 0, lifetimes > 0)
//! - Check that addresses and URLs parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use url::Url;

use crate::config::schema::ServiceConfig;

/// Minimum accepted length of the session signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 16;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::new("timeouts.upstream_secs", "must be greater than 0"));
    }

    let rl = &config.rate_limit;
    if rl.window_ms == 0 {
        errors.push(ValidationError::new("rate_limit.window_ms", "must be greater than 0"));
    }
    if rl.max_requests == 0 {
        errors.push(ValidationError::new("rate_limit.max_requests", "must be greater than 0"));
    }
    if rl.max_entries == 0 {
        errors.push(ValidationError::new("rate_limit.max_entries", "must be greater than 0"));
    }

    let session = &config.session;
    if session.secret.len() < MIN_SECRET_LEN {
        errors.push(ValidationError::new(
            "session.secret",
            format!("must be at least {MIN_SECRET_LEN} bytes (set SESSION_SECRET_KEY)"),
        ));
    }
    if session.cookie_name.is_empty()
        || !session
            .cookie_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        errors.push(ValidationError::new(
            "session.cookie_name",
            "must be non-empty and use only [A-Za-z0-9_-]",
        ));
    }
    if session.ttl_secs == 0 {
        errors.push(ValidationError::new("session.ttl_secs", "must be greater than 0"));
    }
    if session.sweep_interval_secs == 0 {
        errors.push(ValidationError::new("session.sweep_interval_secs", "must be greater than 0"));
    }

    for (field, value) in [
        ("frontend.url", &config.frontend.url),
        ("spotify.redirect_uri", &config.spotify.redirect_uri),
        ("spotify.accounts_url", &config.spotify.accounts_url),
        ("spotify.api_url", &config.spotify.api_url),
        ("apple_music.api_url", &config.apple_music.api_url),
        ("youtube_music.api_url", &config.youtube_music.api_url),
    ] {
        if let Err(e) = Url::parse(value) {
            errors.push(ValidationError::new(field, format!("'{value}' is not a URL: {e}")));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
