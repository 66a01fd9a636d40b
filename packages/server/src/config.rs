//! Server configuration
//!
//! `ServerConfig` is read once at startup from environment variables and is
//! immutable afterwards.
//!
//! | Variable | Default |
//! |---|---|
//! | `NUMTREE_HOST` | `127.0.0.1` |
//! | `NUMTREE_PORT` | `3001` |
//! | `NUMTREE_DB_PATH` | `~/.numtree/database/numtree.db` |
//! | `CORS_ALLOW_ORIGIN` | `http://localhost:5173` (comma separated) |
//! | `NUMTREE_SUMMARY_PAGE_SIZE` | `50` (at most 500) |
//! | `NUMTREE_JWT_SECRET` | required, at least 32 bytes |

use axum::http::HeaderValue;
use numtree_core::{DEFAULT_MAX_PAGE_SIZE, PAGE_SIZE_LIMIT};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Configuration errors, reported before anything is started
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {var}: '{value}'")]
    InvalidVar { var: &'static str, value: String },

    #[error("Invalid CORS origin: '{0}'")]
    InvalidOrigin(String),

    #[error("Port must not be 0")]
    ZeroPort,

    #[error("Summary page size must be between 1 and {limit}, got {0}", limit = PAGE_SIZE_LIMIT)]
    PageSizeOutOfRange(u64),

    #[error("NUMTREE_JWT_SECRET is not set")]
    MissingJwtSecret,

    #[error("NUMTREE_JWT_SECRET must be at least {min} bytes", min = MIN_JWT_SECRET_LEN)]
    WeakJwtSecret,

    #[error("Failed to get home directory")]
    NoHomeDir,
}

/// Token signing key; never printed
#[derive(Clone, PartialEq)]
pub struct JwtSecret(String);

impl JwtSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JwtSecret(..)")
    }
}

/// Runtime configuration for the HTTP server
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Database file; parent directories are created on open
    pub db_path: PathBuf,
    pub cors_origins: Vec<String>,
    /// Largest page `/api/trees` will return
    pub summary_page_size: u64,
    pub jwt_secret: JwtSecret,
}

impl ServerConfig {
    /// Build from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any variable source (tests pass a map)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("NUMTREE_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match lookup("NUMTREE_PORT") {
            Some(value) => value.trim().parse::<u16>().map_err(|_| ConfigError::InvalidVar {
                var: "NUMTREE_PORT",
                value,
            })?,
            None => DEFAULT_PORT,
        };

        let db_path = match lookup("NUMTREE_DB_PATH") {
            Some(path) => PathBuf::from(path),
            None => default_db_path()?,
        };

        let cors_origins = lookup("CORS_ALLOW_ORIGIN")
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_else(|| vec![DEFAULT_CORS_ORIGIN.to_string()]);

        let summary_page_size = match lookup("NUMTREE_SUMMARY_PAGE_SIZE") {
            Some(value) => value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidVar {
                var: "NUMTREE_SUMMARY_PAGE_SIZE",
                value,
            })?,
            None => DEFAULT_MAX_PAGE_SIZE,
        };

        let jwt_secret = lookup("NUMTREE_JWT_SECRET")
            .map(JwtSecret::new)
            .ok_or(ConfigError::MissingJwtSecret)?;

        let config = Self {
            host,
            port,
            db_path,
            cors_origins,
            summary_page_size,
            jwt_secret,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::ZeroPort);
        }
        if !(1..=PAGE_SIZE_LIMIT).contains(&self.summary_page_size) {
            return Err(ConfigError::PageSizeOutOfRange(self.summary_page_size));
        }
        if self.jwt_secret.as_bytes().len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::WeakJwtSecret);
        }
        self.origin_headers().map(|_| ())
    }

    /// CORS origins as header values
    pub fn origin_headers(&self) -> Result<Vec<HeaderValue>, ConfigError> {
        self.cors_origins
            .iter()
            .map(|origin| {
                origin
                    .parse::<HeaderValue>()
                    .map_err(|_| ConfigError::InvalidOrigin(origin.clone()))
            })
            .collect()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// `~/.numtree/database/numtree.db`
fn default_db_path() -> Result<PathBuf, ConfigError> {
    let home_dir = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home_dir
        .join(".numtree")
        .join("database")
        .join("numtree.db"))
}
