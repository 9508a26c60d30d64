use crate::validation::ValidationErrors;
use std::fmt;
use thiserror::Error;
use tracing::error;

/// Primary catalog entity an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Artist,
    Song,
    Album,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Entity::Artist => "artist",
            Entity::Song => "song",
            Entity::Album => "album",
        })
    }
}

/// Uniqueness rule violated by a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    /// The track number is already used by another track of the album.
    TrackNumberTaken,
    /// The song is already part of the album tracklist.
    SongAlreadyInAlbum,
    /// The artist is already credited on the song with that role, or at all
    /// when repeated artists are disallowed.
    DuplicateSongArtist,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Conflict::TrackNumberTaken => "track number is already taken in this album",
            Conflict::SongAlreadyInAlbum => "song is already part of this album",
            Conflict::DuplicateSongArtist => "artist is already credited on this song",
        })
    }
}

/// Coarse error category, stable across variants, for transport mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    InvalidReference,
    InvalidId,
    Cancelled,
    DeadlineExceeded,
    Internal,
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: Entity, id: i64 },

    #[error("Track not found: song {song_id} is not in album {album_id}")]
    TrackNotFound { album_id: i64, song_id: i64 },

    #[error("Artist {artist_id} is not credited on song {song_id}")]
    SongArtistNotFound { song_id: i64, artist_id: i64 },

    #[error("Conflict: {0}")]
    Conflict(Conflict),

    #[error("Invalid reference: {entity} with id {id} does not exist")]
    InvalidReference { entity: Entity, id: i64 },

    #[error("Invalid {entity} id: {value:?}")]
    InvalidId { entity: Entity, value: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation deadline exceeded")]
    DeadlineExceeded,

    #[error("Storage failure while {context}")]
    Storage {
        context: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Schema bootstrap failed: {0}")]
    Schema(String),
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::Validation(_) => ErrorKind::Validation,
            CatalogError::NotFound { .. }
            | CatalogError::TrackNotFound { .. }
            | CatalogError::SongArtistNotFound { .. } => ErrorKind::NotFound,
            CatalogError::Conflict(_) => ErrorKind::Conflict,
            CatalogError::InvalidReference { .. } => ErrorKind::InvalidReference,
            CatalogError::InvalidId { .. } => ErrorKind::InvalidId,
            CatalogError::Cancelled => ErrorKind::Cancelled,
            CatalogError::DeadlineExceeded => ErrorKind::DeadlineExceeded,
            CatalogError::Storage { .. } | CatalogError::Schema(_) => ErrorKind::Internal,
        }
    }

    pub fn not_found(entity: Entity, id: i64) -> Self {
        CatalogError::NotFound { entity, id }
    }

    /// Wrap a storage failure, logging the underlying cause. The returned
    /// error only displays `context`.
    pub fn storage(context: impl Into<String>, source: sqlx::Error) -> Self {
        let context = context.into();
        error!(error = %source, context = %context, "Storage operation failed");
        CatalogError::Storage { context, source }
    }
}

impl From<sqlx::Error> for CatalogError {
    fn from(source: sqlx::Error) -> Self {
        CatalogError::storage("executing a catalog query", source)
    }
}

impl From<ValidationErrors> for CatalogError {
    fn from(errors: ValidationErrors) -> Self {
        CatalogError::Validation(errors)
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
