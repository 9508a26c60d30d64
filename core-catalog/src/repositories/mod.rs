//! # Catalog Repositories
//!
//! Repository traits and their SQLite implementations, one per primary
//! entity. Each repository owns the join rows of its aggregate and is the
//! only place where storage failures are translated into [`CatalogError`].
//!
//! ## Architecture
//!
//! - Traits define the interface and are mockable behind the `mock` feature
//! - SQLite implementations use sqlx for async database access
//! - Every operation takes a [`Context`] and runs inside [`Context::run`]
//! - List operations share predicates between their count and data queries
//!   and return the `Page<T>` envelope
//!
//! ## Available Repositories
//!
//! - `ArtistRepository` - Artists with soft delete
//! - `SongRepository` - Songs with role-tagged artist credits
//! - `AlbumRepository` - Albums with artist primacy and ordered tracks
//!
//! [`CatalogError`]: crate::error::CatalogError
//! [`Context`]: crate::context::Context
//! [`Context::run`]: crate::context::Context::run

pub mod album;
pub mod artist;
pub mod pagination;
pub mod song;
pub(crate) mod support;

pub use album::{AlbumRepository, SqliteAlbumRepository};
pub use artist::{ArtistRepository, SqliteArtistRepository};
pub use pagination::{Page, PageRequest, DEFAULT_LIMIT, DEFAULT_PAGE, MAX_LIMIT};
pub use song::{SongRepository, SqliteSongRepository};

#[cfg(feature = "mock")]
pub use album::MockAlbumRepository;
#[cfg(feature = "mock")]
pub use artist::MockArtistRepository;
#[cfg(feature = "mock")]
pub use song::MockSongRepository;
