use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::constants::{
    DEFAULT_EVERYTHING_FEED_URI, DEFAULT_PAGE_LIMIT, DEFAULT_POSTS_FEED_URI, MAX_PAGE_LIMIT,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("failed to parse {name} as number: {source}")]
    ParseFloat {
        name: String,
        #[source]
        source: std::num::ParseFloatError,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Upstream service
    pub service_url: String,
    pub request_timeout: Duration,

    // Pagination
    pub page_limit: u32,
    pub fetch_retries: u32,
    pub retry_backoff: Duration,
    pub visibility_threshold: f64,

    // View cache
    pub feed_stale_after: Duration,
    pub notifications_stale_after: Duration,
    pub view_idle_ttl: Duration,

    // Home feeds
    pub posts_feed_uri: String,
    pub everything_feed_uri: String,

    // Session
    pub session_dir: PathBuf,
    pub identifier: Option<String>,
    pub app_password: Option<String>,

    // Web Server
    pub web_host: String,
    pub web_port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Upstream service
            service_url: env_or_default("BSKY_SERVICE_URL", "https://bsky.social"),
            request_timeout: Duration::from_secs(parse_env_u64("REQUEST_TIMEOUT_SECS", 30)?),

            // Pagination
            page_limit: parse_env_u32("FEED_PAGE_LIMIT", DEFAULT_PAGE_LIMIT)?,
            fetch_retries: parse_env_u32("FETCH_RETRIES", 2)?,
            retry_backoff: Duration::from_millis(parse_env_u64("FETCH_RETRY_BACKOFF_MS", 500)?),
            visibility_threshold: parse_env_f64("VISIBILITY_THRESHOLD", 0.5)?,

            // View cache
            feed_stale_after: Duration::from_secs(parse_env_u64("FEED_STALE_SECS", 30)?),
            notifications_stale_after: Duration::from_secs(parse_env_u64(
                "NOTIFICATIONS_STALE_SECS",
                5,
            )?),
            view_idle_ttl: Duration::from_secs(parse_env_u64("VIEW_IDLE_SECS", 600)?),

            // Home feeds
            posts_feed_uri: env_or_default("POSTS_FEED_URI", DEFAULT_POSTS_FEED_URI),
            everything_feed_uri: env_or_default("EVERYTHING_FEED_URI", DEFAULT_EVERYTHING_FEED_URI),

            // Session
            session_dir: PathBuf::from(env_or_default("SESSION_DIR", "./data")),
            identifier: optional_env("BSKY_IDENTIFIER"),
            app_password: optional_env("BSKY_APP_PASSWORD"),

            // Web Server
            web_host: env_or_default("WEB_HOST", "0.0.0.0"),
            web_port: parse_env_u16("WEB_PORT", 8080)?,
        })
    }

    /// Configuration with defaults and no environment lookups, for tests.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            service_url: "http://127.0.0.1:0".to_string(),
            request_timeout: Duration::from_secs(5),
            page_limit: DEFAULT_PAGE_LIMIT,
            fetch_retries: 2,
            retry_backoff: Duration::ZERO,
            visibility_threshold: 0.5,
            feed_stale_after: Duration::from_secs(30),
            notifications_stale_after: Duration::from_secs(5),
            view_idle_ttl: Duration::from_secs(600),
            posts_feed_uri: DEFAULT_POSTS_FEED_URI.to_string(),
            everything_feed_uri: DEFAULT_EVERYTHING_FEED_URI.to_string(),
            session_dir: std::env::temp_dir().join("skyreader-test"),
            identifier: None,
            app_password: None,
            web_host: "127.0.0.1".to_string(),
            web_port: 0,
        }
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_limit == 0 || self.page_limit > MAX_PAGE_LIMIT {
            return Err(ConfigError::InvalidValue {
                name: "FEED_PAGE_LIMIT".to_string(),
                message: format!("must be between 1 and {MAX_PAGE_LIMIT}"),
            });
        }
        if !(self.visibility_threshold > 0.0 && self.visibility_threshold <= 1.0) {
            return Err(ConfigError::InvalidValue {
                name: "VISIBILITY_THRESHOLD".to_string(),
                message: "must be greater than 0 and at most 1".to_string(),
            });
        }
        if url::Url::parse(&self.service_url).is_err() {
            return Err(ConfigError::InvalidValue {
                name: "BSKY_SERVICE_URL".to_string(),
                message: format!("'{}' is not a valid URL", self.service_url),
            });
        }
        if self.identifier.is_some() != self.app_password.is_some() {
            return Err(ConfigError::InvalidValue {
                name: "BSKY_IDENTIFIER".to_string(),
                message: "BSKY_IDENTIFIER and BSKY_APP_PASSWORD must be set together".to_string(),
            });
        }
        Ok(())
    }
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u32(name: &str, default: u32) -> Result<u32, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u16(name: &str, default: u16) -> Result<u16, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_f64(name: &str, default: f64) -> Result<f64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseFloat {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}
