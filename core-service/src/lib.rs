//! Catalog service façade and bootstrap helpers.
//!
//! This crate wires a validated [`CoreConfig`] into a pooled SQLite catalog
//! and exposes one service per aggregate. Services check identifiers and
//! validate input before anything reaches storage; repository errors are
//! returned unchanged.
//!
//! ```ignore
//! use core_catalog::{ArtistInput, Context};
//! use core_runtime::CoreConfig;
//!
//! let config = CoreConfig::builder().database_url("sqlite:catalog.db").build()?;
//! let catalog = core_service::bootstrap(config).await?;
//!
//! let ctx = Context::new();
//! let artist = catalog.artists().create(&ctx, input).await?;
//! ```

pub mod album;
pub mod artist;
pub mod error;
pub mod song;

pub use album::AlbumService;
pub use artist::ArtistService;
pub use error::{CoreError, Result};
pub use song::SongService;

pub use core_catalog;
pub use core_runtime::CoreConfig;

use core_catalog::db::{create_pool, DatabaseConfig, SqlitePool};
use core_catalog::{
    Context, SongArtistPolicy, SqliteAlbumRepository, SqliteArtistRepository,
    SqliteSongRepository,
};
use core_runtime::logging::init_logging;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Derive the context an operation runs under, adding the configured
/// deadline when there is one.
pub(crate) fn scoped(ctx: &Context, timeout: Option<Duration>) -> Context {
    match timeout {
        Some(timeout) => ctx.with_timeout(timeout),
        None => ctx.clone(),
    }
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CatalogService {
    pool: SqlitePool,
    artists: ArtistService,
    songs: SongService,
    albums: AlbumService,
}

impl CatalogService {
    /// Build the services over an existing pool.
    pub fn new(pool: SqlitePool, artist_policy: SongArtistPolicy) -> Self {
        let artists = ArtistService::new(Arc::new(SqliteArtistRepository::new(pool.clone())));
        let songs = SongService::new(
            Arc::new(SqliteSongRepository::new(pool.clone()).with_artist_policy(artist_policy)),
            artist_policy,
        );
        let albums = AlbumService::new(Arc::new(SqliteAlbumRepository::new(pool.clone())));

        Self {
            pool,
            artists,
            songs,
            albums,
        }
    }

    /// Attach a default deadline to every operation of every service.
    pub fn with_operation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.artists = self.artists.with_operation_timeout(timeout);
        self.songs = self.songs.with_operation_timeout(timeout);
        self.albums = self.albums.with_operation_timeout(timeout);
        self
    }

    pub fn artists(&self) -> &ArtistService {
        &self.artists
    }

    pub fn songs(&self) -> &SongService {
        &self.songs
    }

    pub fn albums(&self) -> &AlbumService {
        &self.albums
    }

    /// Underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Catalog connection pool closed");
    }
}

/// Map the runtime configuration onto storage pool settings.
pub fn database_config(config: &CoreConfig) -> DatabaseConfig {
    let base = DatabaseConfig::from_url(config.database_url.clone());
    if base.is_in_memory() {
        return DatabaseConfig {
            database_url: config.database_url.clone(),
            ..DatabaseConfig::in_memory()
        }
        .acquire_timeout(config.acquire_timeout);
    }

    base.max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
}

/// Song credit policy selected by the configuration.
pub fn song_artist_policy(config: &CoreConfig) -> SongArtistPolicy {
    if config.allow_repeated_song_artists {
        SongArtistPolicy::DistinctRoles
    } else {
        SongArtistPolicy::UniqueArtist
    }
}

/// Open the catalog described by `config`.
///
/// Creates the pool, applies the schema and builds the services. Logging is
/// left to the host; see [`bootstrap_from_env`].
///
/// # Errors
///
/// Returns `CoreError::Config` for an invalid configuration and
/// `CoreError::Catalog` when the database cannot be opened or bootstrapped.
pub async fn bootstrap(config: CoreConfig) -> Result<CatalogService> {
    config.validate()?;

    let pool = create_pool(database_config(&config)).await?;
    let policy = song_artist_policy(&config);

    info!(
        database_url = %config.database_url,
        policy = ?policy,
        operation_timeout = ?config.operation_timeout,
        "Catalog bootstrapped"
    );

    Ok(CatalogService::new(pool, policy).with_operation_timeout(config.operation_timeout))
}

/// Load the configuration from the environment, install logging and open the
/// catalog.
///
/// # Errors
///
/// Returns `CoreError::Config` when the environment is incomplete or invalid.
pub async fn bootstrap_from_env() -> Result<CatalogService> {
    let config = CoreConfig::from_env()?;

    if let Err(err) = init_logging(config.logging()) {
        debug!(error = %err, "Logging already initialized by the host");
    }

    bootstrap(config).await
}
