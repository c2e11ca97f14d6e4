//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;

/// Default viewport used until the client reports its real dimensions
pub const DEFAULT_VIEWPORT_WIDTH: f32 = 800.0;
pub const DEFAULT_VIEWPORT_HEIGHT: f32 = 600.0;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Supabase project URL (leaderboard is disabled when absent)
    pub supabase_url: Option<String>,
    /// Supabase anonymous key (the game only needs anon-level access)
    pub supabase_anon_key: Option<String>,

    /// Allowed client origin for CORS
    pub client_origin: String,

    /// Initial game viewport, overridden per session by client resize events
    pub viewport_width: f32,
    pub viewport_height: f32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Render provides PORT env var, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            supabase_url: env::var("SUPABASE_URL").ok(),
            supabase_anon_key: env::var("SUPABASE_ANON_KEY").ok(),

            client_origin: env::var("CLIENT_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),

            viewport_width: parse_dimension("GAME_VIEWPORT_WIDTH", DEFAULT_VIEWPORT_WIDTH)?,
            viewport_height: parse_dimension("GAME_VIEWPORT_HEIGHT", DEFAULT_VIEWPORT_HEIGHT)?,
        })
    }

    /// Supabase connection parameters, present only when both are configured.
    /// Checked once at startup; the leaderboard runs in a degraded
    /// "unavailable" mode when this returns None.
    pub fn supabase(&self) -> Option<(&str, &str)> {
        match (&self.supabase_url, &self.supabase_anon_key) {
            (Some(url), Some(key)) => Some((url, key)),
            _ => None,
        }
    }
}

fn parse_dimension(var: &'static str, default: f32) -> Result<f32, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw
            .parse::<f32>()
            .ok()
            .filter(|v| v.is_finite() && *v > 0.0)
            .ok_or(ConfigError::InvalidDimension(var)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid viewport dimension in {0}")]
    InvalidDimension(&'static str),
}
