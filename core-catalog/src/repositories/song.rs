//! Song repository trait and implementation
//!
//! Songs own their artist credits (`song_artists`). Full updates replace the
//! whole credit set inside one transaction; list reads enrich every song on
//! the page with a single batched join query.

use crate::context::Context;
use crate::error::{CatalogError, Conflict, Entity, Result};
use crate::models::{Song, SongArtist};
use crate::query::{
    bind_all, contains_pattern, placeholders, search_key, BindValue, Predicates, QuerySpec,
    MAX_IN_LIST,
};
use crate::repositories::support::{
    ensure_active_references, is_active, now, song_artist_insert_error,
};
use crate::repositories::{Page, PageRequest};
use crate::validation::{SongArtistInput, SongArtistPolicy, SongFilter, SongInput};
use async_trait::async_trait;
use sqlx::{query, query_as, FromRow, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, info};

const SONG_COLUMNS: &str = "s.id AS id, s.title AS title, s.duration AS duration, \
     s.created_at AS created_at, s.updated_at AS updated_at, s.deleted_at AS deleted_at";

/// Song repository interface for data access operations
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait SongRepository: Send + Sync {
    /// Insert a song together with its artist credits
    ///
    /// # Errors
    /// Returns error if:
    /// - A credited artist does not exist (`InvalidReference`)
    /// - The same (artist, role) pair is submitted twice (`Conflict`)
    ///
    /// Nothing is persisted when any credit fails.
    async fn create(&self, ctx: &Context, input: &SongInput) -> Result<Song>;

    /// Find an active song with its credited artists
    async fn get_by_id(&self, ctx: &Context, id: i64) -> Result<Song>;

    /// All active songs ordered by ID, with artists
    async fn get_all(&self, ctx: &Context) -> Result<Vec<Song>>;

    /// Query songs with optional filters and pagination
    ///
    /// # Arguments
    /// * `filter` - Partial title, exact artist id, partial artist name
    /// * `page_request` - Pagination parameters
    async fn get_all_paginated(
        &self,
        ctx: &Context,
        filter: &SongFilter,
        page_request: PageRequest,
    ) -> Result<Page<Song>>;

    /// Replace the song row and its complete credit set
    ///
    /// # Errors
    /// Returns `CatalogError::NotFound` if the song is missing or deleted
    async fn update(&self, ctx: &Context, id: i64, input: &SongInput) -> Result<Song>;

    /// Soft delete a song
    async fn delete(&self, ctx: &Context, id: i64) -> Result<()>;

    /// Credit one more artist on an existing song
    ///
    /// # Errors
    /// Returns error if:
    /// - The song is missing or deleted (`NotFound`)
    /// - The artist is missing or deleted (`InvalidReference`)
    /// - The credit already exists under the repeated-artist policy (`Conflict`)
    async fn add_artist(&self, ctx: &Context, song_id: i64, input: &SongArtistInput) -> Result<()>;

    /// Remove every credit of `artist_id` from the song
    ///
    /// # Errors
    /// Returns `SongArtistNotFound` if the artist was not credited
    async fn remove_artist(&self, ctx: &Context, song_id: i64, artist_id: i64) -> Result<()>;
}

/// SQLite implementation of SongRepository
pub struct SqliteSongRepository {
    pool: SqlitePool,
    artist_policy: SongArtistPolicy,
}

#[derive(FromRow)]
struct SongArtistRow {
    song_id: i64,
    #[sqlx(flatten)]
    artist: SongArtist,
}

impl SqliteSongRepository {
    /// Create a new SqliteSongRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            artist_policy: SongArtistPolicy::default(),
        }
    }

    /// Override how often one artist may be credited on a song
    pub fn with_artist_policy(mut self, policy: SongArtistPolicy) -> Self {
        self.artist_policy = policy;
        self
    }

    pub fn artist_policy(&self) -> SongArtistPolicy {
        self.artist_policy
    }

    async fn fetch(&self, id: i64) -> Result<Song> {
        let sql = format!(
            "SELECT {} FROM songs s WHERE s.id = ? AND s.deleted_at IS NULL",
            SONG_COLUMNS
        );
        let mut song = query_as::<_, Song>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| CatalogError::not_found(Entity::Song, id))?;

        song.artists = query_as::<_, SongArtist>(
            r#"
            SELECT a.id, a.name, sa.role
            FROM song_artists sa
            INNER JOIN artists a ON a.id = sa.artist_id
            WHERE sa.song_id = ? AND a.deleted_at IS NULL
            ORDER BY sa.rowid
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(song)
    }

    /// Fill `artists` on every song using one query per id batch.
    async fn attach_artists(&self, songs: &mut [Song]) -> Result<()> {
        if songs.is_empty() {
            return Ok(());
        }

        let ids: Vec<i64> = songs.iter().map(|song| song.id).collect();
        let mut credits: HashMap<i64, Vec<SongArtist>> = HashMap::with_capacity(ids.len());

        for chunk in ids.chunks(MAX_IN_LIST) {
            let sql = format!(
                "SELECT sa.song_id, a.id, a.name, sa.role \
                 FROM song_artists sa \
                 INNER JOIN artists a ON a.id = sa.artist_id \
                 WHERE sa.song_id IN ({}) AND a.deleted_at IS NULL \
                 ORDER BY sa.rowid",
                placeholders(chunk.len())
            );
            let mut batch = query_as::<_, SongArtistRow>(&sql);
            for id in chunk {
                batch = batch.bind(*id);
            }
            for row in batch.fetch_all(&self.pool).await? {
                credits.entry(row.song_id).or_default().push(row.artist);
            }
        }

        for song in songs.iter_mut() {
            song.artists = credits.remove(&song.id).unwrap_or_default();
        }
        Ok(())
    }
}

async fn insert_credits(
    conn: &mut SqliteConnection,
    song_id: i64,
    artists: &[SongArtistInput],
) -> Result<()> {
    let artist_ids: Vec<i64> = artists.iter().map(|artist| artist.artist_id).collect();
    ensure_active_references(&mut *conn, Entity::Artist, &artist_ids).await?;

    for artist in artists {
        query("INSERT INTO song_artists (song_id, artist_id, role) VALUES (?, ?, ?)")
            .bind(song_id)
            .bind(artist.artist_id)
            .bind(&artist.role)
            .execute(&mut *conn)
            .await
            .map_err(|e| song_artist_insert_error(e, song_id, artist.artist_id))?;
    }
    Ok(())
}

fn song_query_spec(filter: &SongFilter) -> QuerySpec {
    let mut predicates = Predicates::new();

    if let Some(title) = &filter.title {
        predicates.push_like("s.title_key", title);
    }
    if let Some(artist_id) = filter.artist_id {
        predicates.push(
            "s.id IN (SELECT sa.song_id FROM song_artists sa WHERE sa.artist_id = ?)",
            BindValue::I64(artist_id),
        );
    }
    if let Some(artist_name) = &filter.artist_name {
        predicates.push(
            "s.id IN (SELECT sa.song_id FROM song_artists sa \
             INNER JOIN artists a ON a.id = sa.artist_id \
             WHERE a.deleted_at IS NULL AND a.name_key LIKE ? ESCAPE '\\')",
            BindValue::Text(contains_pattern(artist_name)),
        );
    }

    QuerySpec::build(
        SONG_COLUMNS,
        "songs s",
        &["s.deleted_at IS NULL"],
        &predicates,
        "s.id ASC",
    )
}

#[async_trait]
impl SongRepository for SqliteSongRepository {
    async fn create(&self, ctx: &Context, input: &SongInput) -> Result<Song> {
        ctx.run(async {
            let mut tx = self.pool.begin().await?;
            let timestamp = now();

            let song_id = query(
                "INSERT INTO songs (title, title_key, duration, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&input.title)
            .bind(search_key(&input.title))
            .bind(input.duration)
            .bind(timestamp)
            .bind(timestamp)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

            insert_credits(&mut tx, song_id, &input.artists).await?;
            tx.commit().await?;

            info!(song_id, artists = input.artists.len(), "Song created");
            self.fetch(song_id).await
        })
        .await
    }

    async fn get_by_id(&self, ctx: &Context, id: i64) -> Result<Song> {
        ctx.run(self.fetch(id)).await
    }

    async fn get_all(&self, ctx: &Context) -> Result<Vec<Song>> {
        ctx.run(async {
            let sql = format!(
                "SELECT {} FROM songs s WHERE s.deleted_at IS NULL ORDER BY s.id ASC",
                SONG_COLUMNS
            );
            let mut songs = query_as::<_, Song>(&sql).fetch_all(&self.pool).await?;
            self.attach_artists(&mut songs).await?;
            Ok(songs)
        })
        .await
    }

    async fn get_all_paginated(
        &self,
        ctx: &Context,
        filter: &SongFilter,
        page_request: PageRequest,
    ) -> Result<Page<Song>> {
        let mut filter = filter.clone();
        filter.sanitize();
        let page_request = page_request.normalized();

        ctx.run(async {
            let spec = song_query_spec(&filter);
            debug!(sql = %spec.select_sql, page = page_request.page, "Querying songs");

            let total: i64 = bind_all(query_as::<_, (i64,)>(&spec.count_sql), &spec.binds)
                .fetch_one(&self.pool)
                .await
                .map(|row| row.0)?;

            let mut songs = bind_all(query_as::<_, Song>(&spec.select_sql), &spec.binds)
                .bind(page_request.limit())
                .bind(page_request.offset())
                .fetch_all(&self.pool)
                .await?;

            self.attach_artists(&mut songs).await?;
            Ok(Page::new(songs, total, page_request))
        })
        .await
    }

    async fn update(&self, ctx: &Context, id: i64, input: &SongInput) -> Result<Song> {
        ctx.run(async {
            let mut tx = self.pool.begin().await?;

            let result = query(
                "UPDATE songs SET title = ?, title_key = ?, duration = ?, updated_at = ? \
                 WHERE id = ? AND deleted_at IS NULL",
            )
            .bind(&input.title)
            .bind(search_key(&input.title))
            .bind(input.duration)
            .bind(now())
            .bind(id)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(CatalogError::not_found(Entity::Song, id));
            }

            query("DELETE FROM song_artists WHERE song_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_credits(&mut tx, id, &input.artists).await?;
            tx.commit().await?;

            info!(song_id = id, artists = input.artists.len(), "Song updated");
            self.fetch(id).await
        })
        .await
    }

    async fn delete(&self, ctx: &Context, id: i64) -> Result<()> {
        ctx.run(async {
            let timestamp = now();
            let result = query(
                "UPDATE songs SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
            )
            .bind(timestamp)
            .bind(timestamp)
            .bind(id)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(CatalogError::not_found(Entity::Song, id));
            }

            info!(song_id = id, "Song deleted");
            Ok(())
        })
        .await
    }

    async fn add_artist(&self, ctx: &Context, song_id: i64, input: &SongArtistInput) -> Result<()> {
        ctx.run(async {
            let mut tx = self.pool.begin().await?;

            if !is_active(&mut tx, Entity::Song, song_id).await? {
                return Err(CatalogError::not_found(Entity::Song, song_id));
            }
            ensure_active_references(&mut tx, Entity::Artist, &[input.artist_id]).await?;

            if self.artist_policy == SongArtistPolicy::UniqueArtist {
                let existing: i64 = query_as(
                    "SELECT COUNT(*) AS count FROM song_artists WHERE song_id = ? AND artist_id = ?",
                )
                .bind(song_id)
                .bind(input.artist_id)
                .fetch_one(&mut *tx)
                .await
                .map(|row: (i64,)| row.0)?;

                if existing > 0 {
                    return Err(CatalogError::Conflict(Conflict::DuplicateSongArtist));
                }
            }

            query("INSERT INTO song_artists (song_id, artist_id, role) VALUES (?, ?, ?)")
                .bind(song_id)
                .bind(input.artist_id)
                .bind(&input.role)
                .execute(&mut *tx)
                .await
                .map_err(|e| song_artist_insert_error(e, song_id, input.artist_id))?;
            tx.commit().await?;

            info!(song_id, artist_id = input.artist_id, role = %input.role, "Artist credited on song");
            Ok(())
        })
        .await
    }

    async fn remove_artist(&self, ctx: &Context, song_id: i64, artist_id: i64) -> Result<()> {
        ctx.run(async {
            let mut tx = self.pool.begin().await?;

            if !is_active(&mut tx, Entity::Song, song_id).await? {
                return Err(CatalogError::not_found(Entity::Song, song_id));
            }

            let result = query("DELETE FROM song_artists WHERE song_id = ? AND artist_id = ?")
                .bind(song_id)
                .bind(artist_id)
                .execute(&mut *tx)
                .await?;

            if result.rows_affected() == 0 {
                return Err(CatalogError::SongArtistNotFound { song_id, artist_id });
            }
            tx.commit().await?;

            info!(song_id, artist_id, "Artist credit removed from song");
            Ok(())
        })
        .await
    }
}
