//! # Music Catalog Core
//!
//! Persistence and consistency layer for a catalog of artists, songs and
//! albums.
//!
//! ## Overview
//!
//! This crate manages:
//! - The SQLite schema and connection pool
//! - Input sanitization and field-keyed validation
//! - Repositories that keep the join tables (song credits, album credits,
//!   tracklists) consistent through transactional delete-then-reinsert
//! - Filtered pagination with one predicate set shared by count and data
//! - Cancellation and deadlines through [`Context`]

pub mod context;
pub mod db;
pub mod error;
pub mod models;
pub mod query;
pub mod repositories;
pub mod validation;

pub use context::Context;
pub use db::{create_pool, create_test_pool, DatabaseConfig};
pub use error::{CatalogError, Conflict, Entity, ErrorKind, Result};
pub use models::{Album, AlbumArtist, AlbumType, Artist, ArtistRole, Song, SongArtist, Track};
pub use repositories::{
    AlbumRepository, ArtistRepository, Page, PageRequest, SongRepository, SqliteAlbumRepository,
    SqliteArtistRepository, SqliteSongRepository,
};
pub use validation::{
    AlbumArtistInput, AlbumFilter, AlbumInput, ArtistFilter, ArtistInput, SongArtistInput,
    SongArtistPolicy, SongFilter, SongInput, TrackInput, ValidationErrors,
};
