//! Artist repository trait and implementation

use crate::context::Context;
use crate::error::{CatalogError, Entity, Result};
use crate::models::Artist;
use crate::query::{bind_all, search_key, Predicates, QuerySpec};
use crate::repositories::support::now;
use crate::repositories::{Page, PageRequest};
use crate::validation::{ArtistFilter, ArtistInput};
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};
use tracing::{debug, info};

const ARTIST_COLUMNS: &str =
    "id, name, genre, country, bio, image_url, created_at, updated_at, deleted_at";

/// Artist repository interface for data access operations
///
/// Soft-deleted artists are invisible to every operation.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait ArtistRepository: Send + Sync {
    /// Insert a new artist and return the stored row
    async fn create(&self, ctx: &Context, input: &ArtistInput) -> Result<Artist>;

    /// Find an active artist by its ID
    ///
    /// # Errors
    /// Returns `CatalogError::NotFound` if no active artist has this ID
    async fn get_by_id(&self, ctx: &Context, id: i64) -> Result<Artist>;

    /// All active artists ordered by ID
    async fn get_all(&self, ctx: &Context) -> Result<Vec<Artist>>;

    /// Query artists with optional partial-match filters and pagination
    ///
    /// # Arguments
    /// * `filter` - Case-insensitive partial matches on name, genre, country
    /// * `page_request` - Pagination parameters
    async fn get_all_paginated(
        &self,
        ctx: &Context,
        filter: &ArtistFilter,
        page_request: PageRequest,
    ) -> Result<Page<Artist>>;

    /// Replace the mutable fields of an artist
    ///
    /// # Errors
    /// Returns `CatalogError::NotFound` if the artist is missing or deleted
    async fn update(&self, ctx: &Context, id: i64, input: &ArtistInput) -> Result<Artist>;

    /// Soft delete an artist
    ///
    /// # Errors
    /// Returns `CatalogError::NotFound` if the artist is missing or already deleted
    async fn delete(&self, ctx: &Context, id: i64) -> Result<()>;

    /// Count active artists
    async fn count(&self, ctx: &Context) -> Result<i64>;
}

/// SQLite implementation of ArtistRepository
pub struct SqliteArtistRepository {
    pool: SqlitePool,
}

impl SqliteArtistRepository {
    /// Create a new SqliteArtistRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, id: i64) -> Result<Artist> {
        let sql = format!(
            "SELECT {} FROM artists WHERE id = ? AND deleted_at IS NULL",
            ARTIST_COLUMNS
        );
        query_as::<_, Artist>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| CatalogError::not_found(Entity::Artist, id))
    }
}

#[async_trait]
impl ArtistRepository for SqliteArtistRepository {
    async fn create(&self, ctx: &Context, input: &ArtistInput) -> Result<Artist> {
        ctx.run(async {
            let timestamp = now();
            let id = query(
                r#"
                INSERT INTO artists (name, genre, country, name_key, genre_key, country_key,
                                     bio, image_url, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&input.name)
            .bind(&input.genre)
            .bind(&input.country)
            .bind(search_key(&input.name))
            .bind(search_key(&input.genre))
            .bind(search_key(&input.country))
            .bind(&input.bio)
            .bind(&input.image_url)
            .bind(timestamp)
            .bind(timestamp)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();

            info!(artist_id = id, name = %input.name, "Artist created");
            self.fetch(id).await
        })
        .await
    }

    async fn get_by_id(&self, ctx: &Context, id: i64) -> Result<Artist> {
        ctx.run(self.fetch(id)).await
    }

    async fn get_all(&self, ctx: &Context) -> Result<Vec<Artist>> {
        ctx.run(async {
            let sql = format!(
                "SELECT {} FROM artists WHERE deleted_at IS NULL ORDER BY id ASC",
                ARTIST_COLUMNS
            );
            let artists = query_as::<_, Artist>(&sql).fetch_all(&self.pool).await?;
            Ok(artists)
        })
        .await
    }

    async fn get_all_paginated(
        &self,
        ctx: &Context,
        filter: &ArtistFilter,
        page_request: PageRequest,
    ) -> Result<Page<Artist>> {
        let mut filter = filter.clone();
        filter.sanitize();
        let page_request = page_request.normalized();

        ctx.run(async {
            let mut predicates = Predicates::new();
            if let Some(name) = &filter.name {
                predicates.push_like("name_key", name);
            }
            if let Some(genre) = &filter.genre {
                predicates.push_like("genre_key", genre);
            }
            if let Some(country) = &filter.country {
                predicates.push_like("country_key", country);
            }

            let spec = QuerySpec::build(
                ARTIST_COLUMNS,
                "artists",
                &["deleted_at IS NULL"],
                &predicates,
                "id ASC",
            );
            debug!(filters = predicates.len(), page = page_request.page, "Querying artists");

            let total: i64 = bind_all(query_as::<_, (i64,)>(&spec.count_sql), &spec.binds)
                .fetch_one(&self.pool)
                .await
                .map(|row| row.0)?;

            let artists = bind_all(query_as::<_, Artist>(&spec.select_sql), &spec.binds)
                .bind(page_request.limit())
                .bind(page_request.offset())
                .fetch_all(&self.pool)
                .await?;

            Ok(Page::new(artists, total, page_request))
        })
        .await
    }

    async fn update(&self, ctx: &Context, id: i64, input: &ArtistInput) -> Result<Artist> {
        ctx.run(async {
            let result = query(
                r#"
                UPDATE artists
                SET name = ?, genre = ?, country = ?, name_key = ?, genre_key = ?, country_key = ?,
                    bio = ?, image_url = ?, updated_at = ?
                WHERE id = ? AND deleted_at IS NULL
                "#,
            )
            .bind(&input.name)
            .bind(&input.genre)
            .bind(&input.country)
            .bind(search_key(&input.name))
            .bind(search_key(&input.genre))
            .bind(search_key(&input.country))
            .bind(&input.bio)
            .bind(&input.image_url)
            .bind(now())
            .bind(id)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(CatalogError::not_found(Entity::Artist, id));
            }

            info!(artist_id = id, "Artist updated");
            self.fetch(id).await
        })
        .await
    }

    async fn delete(&self, ctx: &Context, id: i64) -> Result<()> {
        ctx.run(async {
            let timestamp = now();
            let result = query(
                "UPDATE artists SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
            )
            .bind(timestamp)
            .bind(timestamp)
            .bind(id)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(CatalogError::not_found(Entity::Artist, id));
            }

            info!(artist_id = id, "Artist deleted");
            Ok(())
        })
        .await
    }

    async fn count(&self, ctx: &Context) -> Result<i64> {
        ctx.run(async {
            let count: i64 =
                query_as("SELECT COUNT(*) as count FROM artists WHERE deleted_at IS NULL")
                    .fetch_one(&self.pool)
                    .await
                    .map(|row: (i64,)| row.0)?;

            Ok(count)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    async fn setup_test_pool() -> SqlitePool {
        create_test_pool().await.unwrap()
    }

    fn input(name: &str, genre: &str, country: &str) -> ArtistInput {
        ArtistInput {
            name: name.to_string(),
            genre: genre.to_string(),
            country: country.to_string(),
            bio: None,
            image_url: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_artist() {
        let repo = SqliteArtistRepository::new(setup_test_pool().await);
        let ctx = Context::new();

        let mut new_artist = input("Nina Simone", "Jazz", "US");
        new_artist.bio = Some("High Priestess of Soul".to_string());
        let created = repo.create(&ctx, &new_artist).await.unwrap();

        assert!(created.id > 0);
        assert_eq!(created.created_at, created.updated_at);

        let found = repo.get_by_id(&ctx, created.id).await.unwrap();
        assert_eq!(found, created);
        assert_eq!(found.bio.as_deref(), Some("High Priestess of Soul"));
        assert_eq!(found.deleted_at, None);
    }

    #[tokio::test]
    async fn test_get_missing_artist() {
        let repo = SqliteArtistRepository::new(setup_test_pool().await);
        let result = repo.get_by_id(&Context::new(), 99).await;
        assert!(matches!(
            result,
            Err(CatalogError::NotFound {
                entity: Entity::Artist,
                id: 99
            })
        ));
    }

    #[tokio::test]
    async fn test_update_artist() {
        let repo = SqliteArtistRepository::new(setup_test_pool().await);
        let ctx = Context::new();
        let created = repo
            .create(&ctx, &input("Original", "Rock", "GB"))
            .await
            .unwrap();

        let mut changes = input("Renamed", "Blues", "US");
        changes.image_url = Some("https://img.example/a.png".to_string());
        let updated = repo.update(&ctx, created.id, &changes).await.unwrap();

        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.genre, "Blues");
        assert_eq!(updated.country, "US");
        assert_eq!(updated.image_url, changes.image_url);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn test_update_missing_artist() {
        let repo = SqliteArtistRepository::new(setup_test_pool().await);
        let result = repo
            .update(&Context::new(), 5, &input("x", "y", "z"))
            .await;
        assert!(matches!(result, Err(CatalogError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_soft_delete_artist() {
        let pool = setup_test_pool().await;
        let repo = SqliteArtistRepository::new(pool.clone());
        let ctx = Context::new();
        let created = repo
            .create(&ctx, &input("Ghost", "Ambient", "IS"))
            .await
            .unwrap();

        repo.delete(&ctx, created.id).await.unwrap();

        assert!(matches!(
            repo.get_by_id(&ctx, created.id).await,
            Err(CatalogError::NotFound { .. })
        ));
        assert!(matches!(
            repo.delete(&ctx, created.id).await,
            Err(CatalogError::NotFound { .. })
        ));
        assert!(matches!(
            repo.update(&ctx, created.id, &input("a", "b", "c")).await,
            Err(CatalogError::NotFound { .. })
        ));

        let (deleted_at,): (Option<i64>,) =
            sqlx::query_as("SELECT deleted_at FROM artists WHERE id = ?")
                .bind(created.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert!(deleted_at.is_some(), "Row should remain with deleted_at set");
    }

    #[tokio::test]
    async fn test_count_and_get_all_skip_deleted() {
        let repo = SqliteArtistRepository::new(setup_test_pool().await);
        let ctx = Context::new();
        assert_eq!(repo.count(&ctx).await.unwrap(), 0);

        let mut ids = Vec::new();
        for i in 1..=3 {
            let artist = repo
                .create(&ctx, &input(&format!("Artist {}", i), "Pop", "CL"))
                .await
                .unwrap();
            ids.push(artist.id);
        }
        repo.delete(&ctx, ids[1]).await.unwrap();

        assert_eq!(repo.count(&ctx).await.unwrap(), 2);
        let all = repo.get_all(&ctx).await.unwrap();
        let listed: Vec<i64> = all.iter().map(|a| a.id).collect();
        assert_eq!(listed, vec![ids[0], ids[2]]);
    }

    #[tokio::test]
    async fn test_paginated_filters() {
        let repo = SqliteArtistRepository::new(setup_test_pool().await);
        let ctx = Context::new();

        repo.create(&ctx, &input("Los Prisioneros", "Rock", "Chile"))
            .await
            .unwrap();
        repo.create(&ctx, &input("Los Jaivas", "Folk Rock", "Chile"))
            .await
            .unwrap();
        repo.create(&ctx, &input("Soda Stereo", "Rock", "Argentina"))
            .await
            .unwrap();
        repo.create(&ctx, &input("100% Natural", "Pop", "Chile"))
            .await
            .unwrap();

        let filter = ArtistFilter {
            name: Some("los".to_string()),
            genre: Some("ROCK".to_string()),
            country: None,
        };
        let page = repo
            .get_all_paginated(&ctx, &filter, PageRequest::new(1, 1))
            .await
            .unwrap();
        assert_eq!(page.total_items, 2);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].name, "Los Prisioneros");

        let second = repo
            .get_all_paginated(&ctx, &filter, PageRequest::new(2, 1))
            .await
            .unwrap();
        assert_eq!(second.items[0].name, "Los Jaivas");

        let literal = ArtistFilter {
            name: Some("%".to_string()),
            ..Default::default()
        };
        let page = repo
            .get_all_paginated(&ctx, &literal, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total_items, 1, "Wildcards in input match literally");

        let blank = ArtistFilter {
            country: Some("   ".to_string()),
            ..Default::default()
        };
        let page = repo
            .get_all_paginated(&ctx, &blank, PageRequest::new(0, 0))
            .await
            .unwrap();
        assert_eq!(page.total_items, 4);
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, 10);
    }

    #[tokio::test]
    async fn test_filters_fold_non_ascii_case() {
        let repo = SqliteArtistRepository::new(setup_test_pool().await);
        let ctx = Context::new();

        let created = repo
            .create(&ctx, &input("Beyoncé", "R&B", "US"))
            .await
            .unwrap();
        repo.create(&ctx, &input("Sigur Rós", "Post-Rock", "Ísland"))
            .await
            .unwrap();

        let shouting = ArtistFilter {
            name: Some("BEYONCÉ".to_string()),
            ..Default::default()
        };
        let page = repo
            .get_all_paginated(&ctx, &shouting, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total_items, 1);
        assert_eq!(page.items[0].name, "Beyoncé");

        let country = ArtistFilter {
            country: Some("ísl".to_string()),
            ..Default::default()
        };
        let page = repo
            .get_all_paginated(&ctx, &country, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total_items, 1);

        repo.update(&ctx, created.id, &input("Ÿvette Ñúñez", "Pop", "ES"))
            .await
            .unwrap();
        let renamed = ArtistFilter {
            name: Some("ÿvette ñ".to_string()),
            ..Default::default()
        };
        let page = repo
            .get_all_paginated(&ctx, &renamed, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total_items, 1);
        let page = repo
            .get_all_paginated(&ctx, &shouting, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total_items, 0);
    }

    #[tokio::test]
    async fn test_empty_page_has_one_page() {
        let repo = SqliteArtistRepository::new(setup_test_pool().await);
        let page = repo
            .get_all_paginated(&Context::new(), &ArtistFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total_items, 0);
        assert_eq!(page.total_pages, 1);
    }

    #[tokio::test]
    async fn test_cancelled_context_skips_storage() {
        let repo = SqliteArtistRepository::new(setup_test_pool().await);
        let ctx = Context::new();
        ctx.cancel();

        let result = repo.create(&ctx, &input("Never", "Stored", "XX")).await;
        assert!(matches!(result, Err(CatalogError::Cancelled)));
        assert_eq!(repo.count(&Context::new()).await.unwrap(), 0);
    }
}
