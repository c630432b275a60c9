//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::ServiceConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Validation(_) => None,
        }
    }
}

/// Load configuration: defaults, then the optional TOML file, then the
/// process environment, then the CLI bind override. The result is validated.
pub fn load_config(path: Option<&Path>, bind_override: Option<&str>) -> Result<ServiceConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(ConfigError::Parse)?
        }
        None => ServiceConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    if let Some(bind) = bind_override {
        config.listener.bind_address = bind.to_string();
    }

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply the well-known environment variables to `config`.
///
/// Empty values are ignored so an unset `.env` entry does not clobber a file value.
pub fn apply_env_overrides<F>(config: &mut ServiceConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("SPOTIFY_CLIENT_ID") {
        config.spotify.client_id = v;
    }
    if let Some(v) = get("SPOTIFY_CLIENT_SECRET") {
        config.spotify.client_secret = v;
    }
    if let Some(v) = get("SPOTIFY_REDIRECT_URI") {
        config.spotify.redirect_uri = v;
    }
    if let Some(v) = get("APPLE_DEVELOPER_TOKEN") {
        config.apple_music.developer_token = v;
    }
    if let Some(v) = get("FRONTEND_URL") {
        config.frontend.url = v;
    }
    if let Some(v) = get("SESSION_SECRET_KEY") {
        config.session.secret = v;
    }
    if let Some(v) = get("BIND_ADDRESS") {
        config.listener.bind_address = v;
    }
    if let Some(port) = get("PORT") {
        let host = config
            .listener
            .bind_address
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        config.listener.bind_address = format!("{}:{}", host, port.trim());
    }
}
