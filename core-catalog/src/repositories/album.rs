//! Album repository trait and implementation
//!
//! An album owns two join collections: its credited artists (with a primacy
//! flag) and its ordered tracklist. Both are replaced wholesale on update.
//! Single-album reads return the full aggregate; list reads attach artists in
//! one batched query and leave `tracks` empty.

use crate::context::Context;
use crate::error::{CatalogError, Entity, Result};
use crate::models::{Album, AlbumArtist, Track};
use crate::query::{
    bind_all, contains_pattern, placeholders, search_key, BindValue, Predicates, QuerySpec,
    MAX_IN_LIST,
};
use crate::repositories::support::{
    album_artist_insert_error, ensure_active_references, is_active, now, track_insert_error,
};
use crate::repositories::{Page, PageRequest};
use crate::validation::{AlbumArtistInput, AlbumFilter, AlbumInput, TrackInput};
use async_trait::async_trait;
use sqlx::{query, query_as, FromRow, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, info};

const ALBUM_COLUMNS: &str = "al.id AS id, al.title AS title, al.release_date AS release_date, \
     al.type AS type, al.cover_url AS cover_url, al.created_at AS created_at, \
     al.updated_at AS updated_at, al.deleted_at AS deleted_at";

const ALBUM_ORDER: &str = "al.release_date DESC, al.id ASC";

/// Album repository interface for data access operations
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait AlbumRepository: Send + Sync {
    /// Insert an album with its artists and tracklist in one transaction
    ///
    /// # Errors
    /// Returns error if:
    /// - A referenced artist or song is missing or deleted (`InvalidReference`)
    /// - A track number or song repeats within the album (`Conflict`)
    async fn create(&self, ctx: &Context, input: &AlbumInput) -> Result<Album>;

    /// Full aggregate: row, artists with primacy, tracks by ascending number
    async fn get_by_id(&self, ctx: &Context, id: i64) -> Result<Album>;

    /// Query albums with optional filters and pagination
    ///
    /// # Arguments
    /// * `filter` - Partial title, exact type, exact artist id, partial artist name
    /// * `page_request` - Pagination parameters
    ///
    /// # Returns
    /// Albums by release date (newest first) with artists attached and
    /// `tracks` left empty
    async fn get_all_paginated(
        &self,
        ctx: &Context,
        filter: &AlbumFilter,
        page_request: PageRequest,
    ) -> Result<Page<Album>>;

    /// Active albums crediting `artist_id`; empty when there are none
    async fn get_albums_by_artist_id(&self, ctx: &Context, artist_id: i64) -> Result<Vec<Album>>;

    /// Replace the album row, its artists and its tracklist
    ///
    /// # Errors
    /// Returns `CatalogError::NotFound` if the album is missing or deleted
    async fn update(&self, ctx: &Context, id: i64, input: &AlbumInput) -> Result<Album>;

    /// Insert a single track without touching the rest of the tracklist
    ///
    /// # Errors
    /// Returns error if:
    /// - The album is missing or deleted (`NotFound`)
    /// - The song is missing or deleted (`InvalidReference`)
    /// - The number is taken or the song is already on the album (`Conflict`)
    async fn add_track(&self, ctx: &Context, album_id: i64, track: &TrackInput) -> Result<()>;

    /// Remove the track holding `song_id`
    ///
    /// # Errors
    /// Returns `CatalogError::TrackNotFound` if the song is not on the album
    async fn remove_track(&self, ctx: &Context, album_id: i64, song_id: i64) -> Result<()>;

    /// Soft delete an album
    async fn delete(&self, ctx: &Context, id: i64) -> Result<()>;
}

/// SQLite implementation of AlbumRepository
pub struct SqliteAlbumRepository {
    pool: SqlitePool,
}

#[derive(FromRow)]
struct AlbumArtistRow {
    album_id: i64,
    #[sqlx(flatten)]
    artist: AlbumArtist,
}

impl SqliteAlbumRepository {
    /// Create a new SqliteAlbumRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, id: i64) -> Result<Album> {
        let sql = format!(
            "SELECT {} FROM albums al WHERE al.id = ? AND al.deleted_at IS NULL",
            ALBUM_COLUMNS
        );
        let mut album = query_as::<_, Album>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| CatalogError::not_found(Entity::Album, id))?;

        album.artists = query_as::<_, AlbumArtist>(
            r#"
            SELECT a.id, a.name, aa.is_primary
            FROM album_artists aa
            INNER JOIN artists a ON a.id = aa.artist_id
            WHERE aa.album_id = ? AND a.deleted_at IS NULL
            ORDER BY aa.rowid
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        album.tracks = query_as::<_, Track>(
            r#"
            SELECT t.track_number, t.song_id, s.title, s.duration
            FROM tracks t
            INNER JOIN songs s ON s.id = t.song_id
            WHERE t.album_id = ? AND s.deleted_at IS NULL
            ORDER BY t.track_number ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(album)
    }

    async fn attach_artists(&self, albums: &mut [Album]) -> Result<()> {
        if albums.is_empty() {
            return Ok(());
        }

        let ids: Vec<i64> = albums.iter().map(|album| album.id).collect();
        let mut credits: HashMap<i64, Vec<AlbumArtist>> = HashMap::with_capacity(ids.len());

        for chunk in ids.chunks(MAX_IN_LIST) {
            let sql = format!(
                "SELECT aa.album_id, a.id, a.name, aa.is_primary \
                 FROM album_artists aa \
                 INNER JOIN artists a ON a.id = aa.artist_id \
                 WHERE aa.album_id IN ({}) AND a.deleted_at IS NULL \
                 ORDER BY aa.rowid",
                placeholders(chunk.len())
            );
            let mut batch = query_as::<_, AlbumArtistRow>(&sql);
            for id in chunk {
                batch = batch.bind(*id);
            }
            for row in batch.fetch_all(&self.pool).await? {
                credits.entry(row.album_id).or_default().push(row.artist);
            }
        }

        for album in albums.iter_mut() {
            album.artists = credits.remove(&album.id).unwrap_or_default();
        }
        Ok(())
    }
}

async fn insert_artists(
    conn: &mut SqliteConnection,
    album_id: i64,
    artists: &[AlbumArtistInput],
) -> Result<()> {
    let artist_ids: Vec<i64> = artists.iter().map(|artist| artist.artist_id).collect();
    ensure_active_references(&mut *conn, Entity::Artist, &artist_ids).await?;

    for artist in artists {
        query("INSERT INTO album_artists (album_id, artist_id, is_primary) VALUES (?, ?, ?)")
            .bind(album_id)
            .bind(artist.artist_id)
            .bind(artist.is_primary)
            .execute(&mut *conn)
            .await
            .map_err(|e| album_artist_insert_error(e, album_id, artist.artist_id))?;
    }
    Ok(())
}

async fn insert_tracks(conn: &mut SqliteConnection, album_id: i64, tracks: &[TrackInput]) -> Result<()> {
    let song_ids: Vec<i64> = tracks.iter().map(|track| track.song_id).collect();
    ensure_active_references(&mut *conn, Entity::Song, &song_ids).await?;

    for track in tracks {
        insert_track(&mut *conn, album_id, track).await?;
    }
    Ok(())
}

async fn insert_track(conn: &mut SqliteConnection, album_id: i64, track: &TrackInput) -> Result<()> {
    query("INSERT INTO tracks (album_id, song_id, track_number) VALUES (?, ?, ?)")
        .bind(album_id)
        .bind(track.song_id)
        .bind(track.track_number)
        .execute(&mut *conn)
        .await
        .map_err(|e| track_insert_error(e, album_id, track.song_id))?;
    Ok(())
}

fn album_query_spec(filter: &AlbumFilter) -> QuerySpec {
    let mut predicates = Predicates::new();

    if let Some(title) = &filter.title {
        predicates.push_like("al.title_key", title);
    }
    if let Some(album_type) = &filter.album_type {
        predicates.push("al.type = ?", BindValue::Text(album_type.clone()));
    }
    if let Some(artist_id) = filter.artist_id {
        predicates.push(
            "al.id IN (SELECT aa.album_id FROM album_artists aa WHERE aa.artist_id = ?)",
            BindValue::I64(artist_id),
        );
    }
    if let Some(artist_name) = &filter.artist_name {
        predicates.push(
            "al.id IN (SELECT aa.album_id FROM album_artists aa \
             INNER JOIN artists a ON a.id = aa.artist_id \
             WHERE a.deleted_at IS NULL AND a.name_key LIKE ? ESCAPE '\\')",
            BindValue::Text(contains_pattern(artist_name)),
        );
    }

    QuerySpec::build(
        ALBUM_COLUMNS,
        "albums al",
        &["al.deleted_at IS NULL"],
        &predicates,
        ALBUM_ORDER,
    )
}

#[async_trait]
impl AlbumRepository for SqliteAlbumRepository {
    async fn create(&self, ctx: &Context, input: &AlbumInput) -> Result<Album> {
        ctx.run(async {
            let release_date = input.parsed_release_date()?;
            let mut tx = self.pool.begin().await?;
            let timestamp = now();

            let album_id = query(
                "INSERT INTO albums (title, title_key, release_date, type, cover_url, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&input.title)
            .bind(search_key(&input.title))
            .bind(release_date)
            .bind(&input.album_type)
            .bind(&input.cover_url)
            .bind(timestamp)
            .bind(timestamp)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

            insert_artists(&mut tx, album_id, &input.artists).await?;
            insert_tracks(&mut tx, album_id, &input.tracks).await?;
            tx.commit().await?;

            info!(
                album_id,
                artists = input.artists.len(),
                tracks = input.tracks.len(),
                "Album created"
            );
            self.fetch(album_id).await
        })
        .await
    }

    async fn get_by_id(&self, ctx: &Context, id: i64) -> Result<Album> {
        ctx.run(self.fetch(id)).await
    }

    async fn get_all_paginated(
        &self,
        ctx: &Context,
        filter: &AlbumFilter,
        page_request: PageRequest,
    ) -> Result<Page<Album>> {
        let mut filter = filter.clone();
        filter.sanitize();
        let page_request = page_request.normalized();

        ctx.run(async {
            let spec = album_query_spec(&filter);
            debug!(sql = %spec.select_sql, page = page_request.page, "Querying albums");

            let total: i64 = bind_all(query_as::<_, (i64,)>(&spec.count_sql), &spec.binds)
                .fetch_one(&self.pool)
                .await
                .map(|row| row.0)?;

            let mut albums = bind_all(query_as::<_, Album>(&spec.select_sql), &spec.binds)
                .bind(page_request.limit())
                .bind(page_request.offset())
                .fetch_all(&self.pool)
                .await?;

            self.attach_artists(&mut albums).await?;
            Ok(Page::new(albums, total, page_request))
        })
        .await
    }

    async fn get_albums_by_artist_id(&self, ctx: &Context, artist_id: i64) -> Result<Vec<Album>> {
        ctx.run(async {
            let sql = format!(
                "SELECT {} FROM albums al \
                 INNER JOIN album_artists aa ON aa.album_id = al.id \
                 WHERE aa.artist_id = ? AND al.deleted_at IS NULL \
                 ORDER BY {}",
                ALBUM_COLUMNS, ALBUM_ORDER
            );
            let mut albums = query_as::<_, Album>(&sql)
                .bind(artist_id)
                .fetch_all(&self.pool)
                .await?;

            self.attach_artists(&mut albums).await?;
            debug!(artist_id, count = albums.len(), "Fetched albums for artist");
            Ok(albums)
        })
        .await
    }

    async fn update(&self, ctx: &Context, id: i64, input: &AlbumInput) -> Result<Album> {
        ctx.run(async {
            let release_date = input.parsed_release_date()?;
            let mut tx = self.pool.begin().await?;

            let result = query(
                "UPDATE albums SET title = ?, title_key = ?, release_date = ?, type = ?, cover_url = ?, \
                 updated_at = ? WHERE id = ? AND deleted_at IS NULL",
            )
            .bind(&input.title)
            .bind(search_key(&input.title))
            .bind(release_date)
            .bind(&input.album_type)
            .bind(&input.cover_url)
            .bind(now())
            .bind(id)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(CatalogError::not_found(Entity::Album, id));
            }

            query("DELETE FROM album_artists WHERE album_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_artists(&mut tx, id, &input.artists).await?;

            query("DELETE FROM tracks WHERE album_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_tracks(&mut tx, id, &input.tracks).await?;

            tx.commit().await?;

            info!(album_id = id, tracks = input.tracks.len(), "Album updated");
            self.fetch(id).await
        })
        .await
    }

    async fn add_track(&self, ctx: &Context, album_id: i64, track: &TrackInput) -> Result<()> {
        ctx.run(async {
            let mut tx = self.pool.begin().await?;

            if !is_active(&mut tx, Entity::Album, album_id).await? {
                return Err(CatalogError::not_found(Entity::Album, album_id));
            }
            ensure_active_references(&mut tx, Entity::Song, &[track.song_id]).await?;
            insert_track(&mut tx, album_id, track).await?;
            tx.commit().await?;

            info!(
                album_id,
                song_id = track.song_id,
                track_number = track.track_number,
                "Track added"
            );
            Ok(())
        })
        .await
    }

    async fn remove_track(&self, ctx: &Context, album_id: i64, song_id: i64) -> Result<()> {
        ctx.run(async {
            let result = query("DELETE FROM tracks WHERE album_id = ? AND song_id = ?")
                .bind(album_id)
                .bind(song_id)
                .execute(&self.pool)
                .await?;

            if result.rows_affected() == 0 {
                return Err(CatalogError::TrackNotFound { album_id, song_id });
            }

            info!(album_id, song_id, "Track removed");
            Ok(())
        })
        .await
    }

    async fn delete(&self, ctx: &Context, id: i64) -> Result<()> {
        ctx.run(async {
            let timestamp = now();
            let result = query(
                "UPDATE albums SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
            )
            .bind(timestamp)
            .bind(timestamp)
            .bind(id)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(CatalogError::not_found(Entity::Album, id));
            }

            info!(album_id = id, "Album deleted");
            Ok(())
        })
        .await
    }
}
