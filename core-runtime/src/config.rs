//! # Core Configuration Module
//!
//! Provides configuration management for the catalog core.
//!
//! ## Overview
//!
//! A builder constructs a validated `CoreConfig` holding the storage location,
//! pool sizing, logging preferences, the default per-operation deadline and
//! the song credit policy. Validation is fail-fast: `build()` refuses to
//! produce a configuration that the catalog could not start with.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::time::Duration;
//!
//! let config = CoreConfig::builder()
//!     .database_url("sqlite:catalog.db")
//!     .max_connections(8)
//!     .operation_timeout(Duration::from_secs(5))
//!     .build()?;
//! ```
//!
//! ## Environment
//!
//! `CoreConfig::from_env()` reads the same settings from the process
//! environment:
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `CATALOG_DATABASE_URL` | SQLite connection URL | required |
//! | `CATALOG_DB_MAX_CONNECTIONS` | pool size | `5` |
//! | `CATALOG_DB_ACQUIRE_TIMEOUT_SECS` | wait for a pooled connection | `30` |
//! | `CATALOG_LOG_LEVEL` | trace, debug, info, warn, error | `info` |
//! | `CATALOG_LOG_FORMAT` | pretty, json, compact | build dependent |
//! | `CATALOG_OPERATION_TIMEOUT_MS` | default deadline per operation | none |
//! | `CATALOG_ALLOW_REPEATED_SONG_ARTISTS` | same artist under several roles | `true` |
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // Fails: no database URL
//! let config = CoreConfig::builder()
//!     .max_connections(4)
//!     .build()
//!     .expect("Should fail - missing database url");
//! ```

use crate::error::{Error, Result};
use crate::logging::{LogFormat, LogLevel, LoggingConfig};
use std::time::Duration;

pub const ENV_DATABASE_URL: &str = "CATALOG_DATABASE_URL";
pub const ENV_MAX_CONNECTIONS: &str = "CATALOG_DB_MAX_CONNECTIONS";
pub const ENV_ACQUIRE_TIMEOUT_SECS: &str = "CATALOG_DB_ACQUIRE_TIMEOUT_SECS";
pub const ENV_LOG_LEVEL: &str = "CATALOG_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "CATALOG_LOG_FORMAT";
pub const ENV_OPERATION_TIMEOUT_MS: &str = "CATALOG_OPERATION_TIMEOUT_MS";
pub const ENV_ALLOW_REPEATED_SONG_ARTISTS: &str = "CATALOG_ALLOW_REPEATED_SONG_ARTISTS";

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const MAX_CONNECTIONS_LIMIT: u32 = 100;
const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Core configuration for the catalog.
///
/// Use [`CoreConfigBuilder`] or [`CoreConfig::from_env`] to construct
/// instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// SQLite connection URL (`sqlite:catalog.db`, `sqlite::memory:`)
    pub database_url: String,

    /// Maximum number of pooled connections
    pub max_connections: u32,

    /// Maximum time to wait for a pooled connection
    pub acquire_timeout: Duration,

    /// Minimum level for catalog log output
    pub log_level: LogLevel,

    /// Log output format
    pub log_format: LogFormat,

    /// Deadline attached to every catalog operation when set
    pub operation_timeout: Option<Duration>,

    /// Whether one artist may be credited on a song under several roles.
    /// When false each artist appears at most once per song.
    pub allow_repeated_song_artists: bool,
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Load the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if `CATALOG_DATABASE_URL` is missing or any
    /// variable holds an unparseable value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load the configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut builder = CoreConfig::builder();

        if let Some(url) = read(ENV_DATABASE_URL) {
            builder = builder.database_url(url);
        }
        if let Some(raw) = read(ENV_MAX_CONNECTIONS) {
            builder = builder.max_connections(parse_number(ENV_MAX_CONNECTIONS, &raw)?);
        }
        if let Some(raw) = read(ENV_ACQUIRE_TIMEOUT_SECS) {
            builder = builder
                .acquire_timeout(Duration::from_secs(parse_number(ENV_ACQUIRE_TIMEOUT_SECS, &raw)?));
        }
        if let Some(raw) = read(ENV_LOG_LEVEL) {
            builder = builder.log_level(raw.parse()?);
        }
        if let Some(raw) = read(ENV_LOG_FORMAT) {
            builder = builder.log_format(raw.parse()?);
        }
        if let Some(raw) = read(ENV_OPERATION_TIMEOUT_MS) {
            builder = builder
                .operation_timeout(Duration::from_millis(parse_number(ENV_OPERATION_TIMEOUT_MS, &raw)?));
        }
        if let Some(raw) = read(ENV_ALLOW_REPEATED_SONG_ARTISTS) {
            builder = builder.allow_repeated_song_artists(parse_bool(ENV_ALLOW_REPEATED_SONG_ARTISTS, &raw)?);
        }

        builder.build()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - The database URL is a non-empty `sqlite:` URL
    /// - The pool size is between 1 and 100
    /// - Timeouts are non-zero
    pub fn validate(&self) -> Result<()> {
        if self.database_url.trim().is_empty() {
            return Err(Error::Config("Database URL cannot be empty".to_string()));
        }

        if !self.database_url.starts_with("sqlite:") {
            return Err(Error::Config(format!(
                "Unsupported database URL '{}'. Expected a sqlite: URL.",
                self.database_url
            )));
        }

        if self.max_connections == 0 {
            return Err(Error::Config(
                "Max connections must be greater than 0".to_string(),
            ));
        }

        if self.max_connections > MAX_CONNECTIONS_LIMIT {
            return Err(Error::Config(format!(
                "Max connections exceeds the limit of {}",
                MAX_CONNECTIONS_LIMIT
            )));
        }

        if self.acquire_timeout.is_zero() {
            return Err(Error::Config(
                "Acquire timeout must be greater than 0".to_string(),
            ));
        }

        if matches!(self.operation_timeout, Some(timeout) if timeout.is_zero()) {
            return Err(Error::Config(
                "Operation timeout must be greater than 0 when set".to_string(),
            ));
        }

        Ok(())
    }

    /// Logging settings derived from this configuration.
    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig::default()
            .with_level(self.log_level)
            .with_format(self.log_format)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| Error::Config(format!("{} must be a non-negative integer, got '{}'", key, raw)))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!("{} must be true or false, got '{}'", key, raw))),
    }
}

/// Builder for constructing a [`CoreConfig`] instance.
#[derive(Debug, Default)]
pub struct CoreConfigBuilder {
    database_url: Option<String>,
    max_connections: Option<u32>,
    acquire_timeout: Option<Duration>,
    log_level: Option<LogLevel>,
    log_format: Option<LogFormat>,
    operation_timeout: Option<Duration>,
    allow_repeated_song_artists: Option<bool>,
}

impl CoreConfigBuilder {
    /// Sets the SQLite connection URL (required).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder().database_url("sqlite::memory:");
    /// ```
    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    /// Sets the pool size. Defaults to 5.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = Some(max);
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = Some(timeout);
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = Some(level);
        self
    }

    pub fn log_format(mut self, format: LogFormat) -> Self {
        self.log_format = Some(format);
        self
    }

    /// Sets a deadline applied to every catalog operation.
    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }

    /// Allows one artist to hold several roles on the same song.
    pub fn allow_repeated_song_artists(mut self, allow: bool) -> Self {
        self.allow_repeated_song_artists = Some(allow);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns `Ok(CoreConfig)` on success, or an error if:
    /// - The database URL is missing
    /// - Any value fails [`CoreConfig::validate`]
    pub fn build(self) -> Result<CoreConfig> {
        let database_url = self.database_url.ok_or_else(|| {
            Error::Config("Database URL is required. Use .database_url() to set it.".to_string())
        })?;

        let config = CoreConfig {
            database_url,
            max_connections: self.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS),
            acquire_timeout: self.acquire_timeout.unwrap_or(DEFAULT_ACQUIRE_TIMEOUT),
            log_level: self.log_level.unwrap_or(LogLevel::Info),
            log_format: self.log_format.unwrap_or_default(),
            operation_timeout: self.operation_timeout,
            allow_repeated_song_artists: self.allow_repeated_song_artists.unwrap_or(true),
        };

        config.validate()?;

        Ok(config)
    }
}
