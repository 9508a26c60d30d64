//! Song use cases.

use crate::scoped;
use core_catalog::validation::ensure_id;
use core_catalog::{
    Context, Entity, Page, PageRequest, Result, Song, SongArtistInput, SongArtistPolicy,
    SongFilter, SongInput, SongRepository,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Clone)]
pub struct SongService {
    repository: Arc<dyn SongRepository>,
    artist_policy: SongArtistPolicy,
    operation_timeout: Option<Duration>,
}

impl SongService {
    /// Create a service validating credits under `artist_policy`. Pass the
    /// same policy the repository was built with.
    pub fn new(repository: Arc<dyn SongRepository>, artist_policy: SongArtistPolicy) -> Self {
        Self {
            repository,
            artist_policy,
            operation_timeout: None,
        }
    }

    pub fn with_operation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.operation_timeout = timeout;
        self
    }

    pub fn artist_policy(&self) -> SongArtistPolicy {
        self.artist_policy
    }

    #[instrument(skip(self, ctx, input))]
    pub async fn create(&self, ctx: &Context, mut input: SongInput) -> Result<Song> {
        input.validate_with(self.artist_policy)?;
        let ctx = scoped(ctx, self.operation_timeout);
        self.repository.create(&ctx, &input).await
    }

    #[instrument(skip(self, ctx))]
    pub async fn get_by_id(&self, ctx: &Context, id: i64) -> Result<Song> {
        let id = ensure_id(Entity::Song, id)?;
        let ctx = scoped(ctx, self.operation_timeout);
        self.repository.get_by_id(&ctx, id).await
    }

    #[instrument(skip(self, ctx))]
    pub async fn get_all(&self, ctx: &Context) -> Result<Vec<Song>> {
        let ctx = scoped(ctx, self.operation_timeout);
        self.repository.get_all(&ctx).await
    }

    #[instrument(skip(self, ctx, filter))]
    pub async fn get_all_paginated(
        &self,
        ctx: &Context,
        filter: SongFilter,
        page_request: PageRequest,
    ) -> Result<Page<Song>> {
        let ctx = scoped(ctx, self.operation_timeout);
        let page = self
            .repository
            .get_all_paginated(&ctx, &filter, page_request.normalized())
            .await?;
        debug!(total = page.total_items, returned = page.items.len(), "Listed songs");
        Ok(page)
    }

    /// Replace a song and its complete list of credits
    #[instrument(skip(self, ctx, input))]
    pub async fn update(&self, ctx: &Context, id: i64, mut input: SongInput) -> Result<Song> {
        let id = ensure_id(Entity::Song, id)?;
        input.validate_with(self.artist_policy)?;
        let ctx = scoped(ctx, self.operation_timeout);
        self.repository.update(&ctx, id, &input).await
    }

    #[instrument(skip(self, ctx))]
    pub async fn delete(&self, ctx: &Context, id: i64) -> Result<()> {
        let id = ensure_id(Entity::Song, id)?;
        let ctx = scoped(ctx, self.operation_timeout);
        self.repository.delete(&ctx, id).await
    }

    #[instrument(skip(self, ctx, input))]
    pub async fn add_artist(
        &self,
        ctx: &Context,
        song_id: i64,
        mut input: SongArtistInput,
    ) -> Result<()> {
        let song_id = ensure_id(Entity::Song, song_id)?;
        input.validate()?;
        let ctx = scoped(ctx, self.operation_timeout);
        self.repository.add_artist(&ctx, song_id, &input).await
    }

    #[instrument(skip(self, ctx))]
    pub async fn remove_artist(&self, ctx: &Context, song_id: i64, artist_id: i64) -> Result<()> {
        let song_id = ensure_id(Entity::Song, song_id)?;
        let artist_id = ensure_id(Entity::Artist, artist_id)?;
        let ctx = scoped(ctx, self.operation_timeout);
        self.repository.remove_artist(&ctx, song_id, artist_id).await
    }
}
