//! Album use cases.
//!
//! Albums are the only aggregate with two owned collections, so most of the
//! pre-storage work happens here: the submitted artists and tracklist are
//! checked as a whole before the repository opens a transaction.

use crate::scoped;
use core_catalog::validation::ensure_id;
use core_catalog::{
    Album, AlbumFilter, AlbumInput, AlbumRepository, Context, Entity, Page, PageRequest, Result,
    TrackInput,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Clone)]
pub struct AlbumService {
    repository: Arc<dyn AlbumRepository>,
    operation_timeout: Option<Duration>,
}

impl AlbumService {
    pub fn new(repository: Arc<dyn AlbumRepository>) -> Self {
        Self {
            repository,
            operation_timeout: None,
        }
    }

    pub fn with_operation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Validate and store an album with its artists and tracks
    ///
    /// # Errors
    /// Returns error if:
    /// - The input fails validation (`Validation`, storage untouched)
    /// - A referenced artist or song does not exist (`InvalidReference`)
    #[instrument(skip(self, ctx, input))]
    pub async fn create(&self, ctx: &Context, mut input: AlbumInput) -> Result<Album> {
        input.validate()?;
        let ctx = scoped(ctx, self.operation_timeout);
        self.repository.create(&ctx, &input).await
    }

    #[instrument(skip(self, ctx))]
    pub async fn get_by_id(&self, ctx: &Context, id: i64) -> Result<Album> {
        let id = ensure_id(Entity::Album, id)?;
        let ctx = scoped(ctx, self.operation_timeout);
        self.repository.get_by_id(&ctx, id).await
    }

    #[instrument(skip(self, ctx, filter))]
    pub async fn get_all_paginated(
        &self,
        ctx: &Context,
        filter: AlbumFilter,
        page_request: PageRequest,
    ) -> Result<Page<Album>> {
        let ctx = scoped(ctx, self.operation_timeout);
        let page = self
            .repository
            .get_all_paginated(&ctx, &filter, page_request.normalized())
            .await?;
        debug!(total = page.total_items, returned = page.items.len(), "Listed albums");
        Ok(page)
    }

    #[instrument(skip(self, ctx))]
    pub async fn get_albums_by_artist_id(&self, ctx: &Context, artist_id: i64) -> Result<Vec<Album>> {
        let artist_id = ensure_id(Entity::Artist, artist_id)?;
        let ctx = scoped(ctx, self.operation_timeout);
        self.repository.get_albums_by_artist_id(&ctx, artist_id).await
    }

    #[instrument(skip(self, ctx, input))]
    pub async fn update(&self, ctx: &Context, id: i64, mut input: AlbumInput) -> Result<Album> {
        let id = ensure_id(Entity::Album, id)?;
        input.validate()?;
        let ctx = scoped(ctx, self.operation_timeout);
        self.repository.update(&ctx, id, &input).await
    }

    #[instrument(skip(self, ctx))]
    pub async fn add_track(&self, ctx: &Context, album_id: i64, track: TrackInput) -> Result<()> {
        let album_id = ensure_id(Entity::Album, album_id)?;
        track.validate()?;
        let ctx = scoped(ctx, self.operation_timeout);
        self.repository.add_track(&ctx, album_id, &track).await
    }

    #[instrument(skip(self, ctx))]
    pub async fn remove_track(&self, ctx: &Context, album_id: i64, song_id: i64) -> Result<()> {
        let album_id = ensure_id(Entity::Album, album_id)?;
        let song_id = ensure_id(Entity::Song, song_id)?;
        let ctx = scoped(ctx, self.operation_timeout);
        self.repository.remove_track(&ctx, album_id, song_id).await
    }

    #[instrument(skip(self, ctx))]
    pub async fn delete(&self, ctx: &Context, id: i64) -> Result<()> {
        let id = ensure_id(Entity::Album, id)?;
        let ctx = scoped(ctx, self.operation_timeout);
        self.repository.delete(&ctx, id).await
    }
}
