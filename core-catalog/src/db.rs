//! # Database Connection Pool Module
//!
//! Provides SQLite connection pooling for the catalog.
//!
//! ## Features
//!
//! - **WAL Mode**: Enabled for file databases (multiple readers, one writer)
//! - **Connection Pooling**: Configurable min/max connections with timeouts
//! - **Foreign Keys**: Enforced for referential integrity of the join tables
//! - **Schema Bootstrap**: Idempotent `CREATE ... IF NOT EXISTS` on startup
//! - **Health Checks**: Connection validation
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_catalog::db::{create_pool, DatabaseConfig};
//!
//! let config = DatabaseConfig::new("catalog.db").max_connections(10);
//! let pool = create_pool(config).await?;
//! ```
//!
//! For tests, use the in-memory helper:
//!
//! ```rust,ignore
//! let pool = create_test_pool().await?;
//! ```

use crate::error::{CatalogError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

pub use sqlx::SqlitePool;

/// Catalog table definitions.
pub const SCHEMA: &str = include_str!("../sql/schema.sql");

/// Database configuration for SQLite connection pool
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Connection URL, e.g. `sqlite:catalog.db` or `sqlite::memory:`
    pub database_url: String,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Maximum time to wait for a connection from the pool
    pub acquire_timeout: Duration,

    /// Maximum lifetime of a connection
    pub max_lifetime: Option<Duration>,

    /// Maximum idle time for a connection before being closed
    pub idle_timeout: Option<Duration>,

    /// Number of prepared statements cached per connection
    pub statement_cache_capacity: usize,
}

impl DatabaseConfig {
    /// Create a configuration for the database file at `database_path`
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let config = DatabaseConfig::new("catalog.db");
    /// assert_eq!(config.database_url, "sqlite:catalog.db");
    /// ```
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        let path = database_path.into();
        Self::from_url(format!("sqlite:{}", path.display()))
    }

    /// Create a configuration from a full connection URL
    pub fn from_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            min_connections: 1,
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            max_lifetime: Some(Duration::from_secs(1800)),
            idle_timeout: Some(Duration::from_secs(600)),
            statement_cache_capacity: 100,
        }
    }

    /// Create a configuration for an in-memory database (useful for testing)
    ///
    /// Every SQLite connection to `:memory:` opens a separate database, so the
    /// pool is pinned to a single connection that never expires.
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            min_connections: 1,
            max_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            max_lifetime: None,
            idle_timeout: None,
            statement_cache_capacity: 100,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }

    /// Set the minimum number of connections
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Set the maximum number of connections
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the connection acquire timeout
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Set the maximum connection lifetime
    pub fn max_lifetime(mut self, lifetime: Option<Duration>) -> Self {
        self.max_lifetime = lifetime;
        self
    }

    /// Set the idle timeout
    pub fn idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the statement cache capacity
    pub fn statement_cache_capacity(mut self, capacity: usize) -> Self {
        self.statement_cache_capacity = capacity;
        self
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// Create a configured SQLite connection pool
///
/// This function:
/// 1. Configures SQLite connection options (WAL mode, foreign keys, etc.)
/// 2. Creates a connection pool with the specified configuration
/// 3. Bootstraps the catalog schema
/// 4. Performs a health check
///
/// # Errors
///
/// Returns an error if:
/// - The database URL is malformed or the file cannot be opened
/// - Connection pool creation fails
/// - The schema cannot be applied
/// - Health check fails
pub async fn create_pool(config: DatabaseConfig) -> Result<Pool<Sqlite>> {
    info!(
        database_url = %config.database_url,
        min_connections = config.min_connections,
        max_connections = config.max_connections,
        "Creating database connection pool"
    );

    let mut connect_options = SqliteConnectOptions::from_str(&config.database_url)
        .map_err(|e| CatalogError::storage("parsing the database url", e))?;

    let journal_mode = if config.is_in_memory() {
        SqliteJournalMode::Memory
    } else {
        SqliteJournalMode::Wal
    };

    connect_options = connect_options
        .journal_mode(journal_mode)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .create_if_missing(true)
        .pragma("cache_size", "-64000")
        .busy_timeout(Duration::from_secs(5))
        .statement_cache_capacity(config.statement_cache_capacity);

    debug!("SQLite connection options configured");

    let pool = SqlitePoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .max_lifetime(config.max_lifetime)
        .idle_timeout(config.idle_timeout)
        .connect_with(connect_options)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to create connection pool");
            CatalogError::storage("opening the connection pool", e)
        })?;

    info!(
        connections = pool.size(),
        "Database connection pool created successfully"
    );

    apply_schema(&pool).await?;
    health_check(&pool).await?;

    Ok(pool)
}

/// Create a connection pool for testing with an in-memory database
///
/// The schema is already applied on return.
pub async fn create_test_pool() -> Result<Pool<Sqlite>> {
    create_pool(DatabaseConfig::in_memory()).await
}

/// Apply the catalog schema. Safe to run against an existing database.
///
/// # Errors
///
/// Returns `CatalogError::Schema` if any statement fails
pub async fn apply_schema(pool: &Pool<Sqlite>) -> Result<()> {
    info!("Applying catalog schema");

    sqlx::raw_sql(SCHEMA).execute(pool).await.map_err(|e| {
        warn!(error = %e, "Schema bootstrap failed");
        CatalogError::Schema(e.to_string())
    })?;

    info!("Catalog schema ready");
    Ok(())
}

/// Perform a health check on the connection pool
///
/// # Errors
///
/// Returns an error if the health check query fails
pub async fn health_check(pool: &Pool<Sqlite>) -> Result<()> {
    debug!("Performing database health check");

    sqlx::query("SELECT 1").fetch_one(pool).await.map_err(|e| {
        warn!(error = %e, "Database health check failed");
        CatalogError::storage("running the health check", e)
    })?;

    debug!("Database health check passed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_in_memory_pool() {
        let pool = create_pool(DatabaseConfig::in_memory()).await;
        assert!(pool.is_ok(), "Should create in-memory pool successfully");
    }

    #[tokio::test]
    async fn test_health_check() {
        let pool = create_test_pool().await.unwrap();
        assert!(health_check(&pool).await.is_ok(), "Health check should pass");
    }

    #[test]
    fn test_database_config_builder() {
        let config = DatabaseConfig::new("catalog.db")
            .min_connections(2)
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(60))
            .statement_cache_capacity(200);

        assert_eq!(config.database_url, "sqlite:catalog.db");
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.acquire_timeout, Duration::from_secs(60));
        assert_eq!(config.statement_cache_capacity, 200);
        assert!(!config.is_in_memory());
        assert!(DatabaseConfig::in_memory().is_in_memory());
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let pool = create_test_pool().await.unwrap();

        let result: (i32,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();

        assert_eq!(result.0, 1, "Foreign keys should be enabled");
    }

    #[tokio::test]
    async fn test_schema_creates_tables() {
        let pool = create_test_pool().await.unwrap();

        for table in [
            "artists",
            "songs",
            "albums",
            "song_artists",
            "album_artists",
            "tracks",
        ] {
            let result: (i32,) =
                sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?")
                    .bind(table)
                    .fetch_one(&pool)
                    .await
                    .unwrap();

            assert_eq!(result.0, 1, "{} table should exist", table);
        }
    }

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let pool = create_test_pool().await.unwrap();
        assert!(apply_schema(&pool).await.is_ok());
    }

    #[tokio::test]
    async fn test_file_database_uses_wal() {
        let path = std::env::temp_dir().join(format!(
            "catalog-wal-{}-{}.db",
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        let pool = create_pool(DatabaseConfig::new(path.clone())).await.unwrap();

        let result: (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(result.0.to_lowercase(), "wal");

        pool.close().await;
        let _ = std::fs::remove_file(&path);
        let _ = std::fs::remove_file(path.with_extension("db-wal"));
        let _ = std::fs::remove_file(path.with_extension("db-shm"));
    }
}
