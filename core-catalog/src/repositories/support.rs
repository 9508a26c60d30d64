//! Shared repository plumbing: timestamps, reference checks and the mapping
//! from SQLite constraint failures onto catalog errors.

use crate::error::{CatalogError, Conflict, Entity, Result};
use crate::query::{placeholders, MAX_IN_LIST};
use sqlx::error::ErrorKind as DbErrorKind;
use sqlx::{query_as, SqliteConnection};
use std::collections::HashSet;
use tracing::debug;

pub(crate) fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Constraint family reported by the storage engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Violation {
    /// Unique or primary key rule, with the engine message naming the columns.
    Unique(String),
    ForeignKey,
}

pub(crate) fn violation(err: &sqlx::Error) -> Option<Violation> {
    let db_err = err.as_database_error()?;
    match db_err.kind() {
        DbErrorKind::UniqueViolation => Some(Violation::Unique(db_err.message().to_string())),
        DbErrorKind::ForeignKeyViolation => Some(Violation::ForeignKey),
        _ => None,
    }
}

/// Translate a failed `tracks` insert.
pub(crate) fn track_insert_error(err: sqlx::Error, album_id: i64, song_id: i64) -> CatalogError {
    match violation(&err) {
        Some(Violation::Unique(message)) if message.contains("tracks.track_number") => {
            debug!(album_id, song_id, "Track number already taken");
            CatalogError::Conflict(Conflict::TrackNumberTaken)
        }
        Some(Violation::Unique(message)) if message.contains("tracks.song_id") => {
            debug!(album_id, song_id, "Song already in album");
            CatalogError::Conflict(Conflict::SongAlreadyInAlbum)
        }
        Some(Violation::ForeignKey) => CatalogError::InvalidReference {
            entity: Entity::Song,
            id: song_id,
        },
        _ => CatalogError::storage(
            format!("adding song {} to album {}", song_id, album_id),
            err,
        ),
    }
}

/// Translate a failed `song_artists` insert.
pub(crate) fn song_artist_insert_error(err: sqlx::Error, song_id: i64, artist_id: i64) -> CatalogError {
    match violation(&err) {
        Some(Violation::Unique(_)) => CatalogError::Conflict(Conflict::DuplicateSongArtist),
        Some(Violation::ForeignKey) => CatalogError::InvalidReference {
            entity: Entity::Artist,
            id: artist_id,
        },
        None => CatalogError::storage(
            format!("crediting artist {} on song {}", artist_id, song_id),
            err,
        ),
    }
}

/// Translate a failed `album_artists` insert.
pub(crate) fn album_artist_insert_error(
    err: sqlx::Error,
    album_id: i64,
    artist_id: i64,
) -> CatalogError {
    match violation(&err) {
        Some(Violation::ForeignKey) => CatalogError::InvalidReference {
            entity: Entity::Artist,
            id: artist_id,
        },
        _ => CatalogError::storage(
            format!("crediting artist {} on album {}", artist_id, album_id),
            err,
        ),
    }
}

/// Fail with `InvalidReference` on the first id in `ids` that has no active
/// row in `table`.
pub(crate) async fn ensure_active_references(
    conn: &mut SqliteConnection,
    entity: Entity,
    ids: &[i64],
) -> Result<()> {
    if ids.is_empty() {
        return Ok(());
    }

    let table = table_for(entity);
    let mut found = HashSet::with_capacity(ids.len());
    for chunk in ids.chunks(MAX_IN_LIST) {
        let sql = format!(
            "SELECT id FROM {} WHERE deleted_at IS NULL AND id IN ({})",
            table,
            placeholders(chunk.len())
        );
        let mut lookup = query_as::<_, (i64,)>(&sql);
        for id in chunk {
            lookup = lookup.bind(*id);
        }
        for (id,) in lookup.fetch_all(&mut *conn).await? {
            found.insert(id);
        }
    }

    match ids.iter().copied().find(|id| !found.contains(id)) {
        Some(id) => Err(CatalogError::InvalidReference { entity, id }),
        None => Ok(()),
    }
}

/// Whether `id` names a row of `entity` that is not soft-deleted.
pub(crate) async fn is_active(conn: &mut SqliteConnection, entity: Entity, id: i64) -> Result<bool> {
    let sql = format!(
        "SELECT COUNT(*) AS count FROM {} WHERE id = ? AND deleted_at IS NULL",
        table_for(entity)
    );
    let count: i64 = query_as(&sql)
        .bind(id)
        .fetch_one(&mut *conn)
        .await
        .map(|row: (i64,)| row.0)?;
    Ok(count > 0)
}

fn table_for(entity: Entity) -> &'static str {
    match entity {
        Entity::Artist => "artists",
        Entity::Song => "songs",
        Entity::Album => "albums",
    }
}
