//! Artist use cases: id checks and input validation ahead of the repository.

use crate::scoped;
use core_catalog::validation::ensure_id;
use core_catalog::{
    Artist, ArtistFilter, ArtistInput, ArtistRepository, Context, Entity, Page, PageRequest,
    Result,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Clone)]
pub struct ArtistService {
    repository: Arc<dyn ArtistRepository>,
    operation_timeout: Option<Duration>,
}

impl ArtistService {
    pub fn new(repository: Arc<dyn ArtistRepository>) -> Self {
        Self {
            repository,
            operation_timeout: None,
        }
    }

    /// Attach a deadline to every operation issued through this service
    pub fn with_operation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Validate and store a new artist
    ///
    /// # Errors
    /// Returns `CatalogError::Validation` without touching storage when the
    /// input is invalid
    #[instrument(skip(self, ctx, input))]
    pub async fn create(&self, ctx: &Context, mut input: ArtistInput) -> Result<Artist> {
        input.validate()?;
        let ctx = scoped(ctx, self.operation_timeout);
        self.repository.create(&ctx, &input).await
    }

    #[instrument(skip(self, ctx))]
    pub async fn get_by_id(&self, ctx: &Context, id: i64) -> Result<Artist> {
        let id = ensure_id(Entity::Artist, id)?;
        let ctx = scoped(ctx, self.operation_timeout);
        self.repository.get_by_id(&ctx, id).await
    }

    #[instrument(skip(self, ctx))]
    pub async fn get_all(&self, ctx: &Context) -> Result<Vec<Artist>> {
        let ctx = scoped(ctx, self.operation_timeout);
        self.repository.get_all(&ctx).await
    }

    #[instrument(skip(self, ctx, filter))]
    pub async fn get_all_paginated(
        &self,
        ctx: &Context,
        filter: ArtistFilter,
        page_request: PageRequest,
    ) -> Result<Page<Artist>> {
        let ctx = scoped(ctx, self.operation_timeout);
        let page = self
            .repository
            .get_all_paginated(&ctx, &filter, page_request.normalized())
            .await?;
        debug!(total = page.total_items, returned = page.items.len(), "Listed artists");
        Ok(page)
    }

    #[instrument(skip(self, ctx, input))]
    pub async fn update(&self, ctx: &Context, id: i64, mut input: ArtistInput) -> Result<Artist> {
        let id = ensure_id(Entity::Artist, id)?;
        input.validate()?;
        let ctx = scoped(ctx, self.operation_timeout);
        self.repository.update(&ctx, id, &input).await
    }

    #[instrument(skip(self, ctx))]
    pub async fn delete(&self, ctx: &Context, id: i64) -> Result<()> {
        let id = ensure_id(Entity::Artist, id)?;
        let ctx = scoped(ctx, self.operation_timeout);
        self.repository.delete(&ctx, id).await
    }

    #[instrument(skip(self, ctx))]
    pub async fn count(&self, ctx: &Context) -> Result<i64> {
        let ctx = scoped(ctx, self.operation_timeout);
        self.repository.count(&ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_catalog::repositories::MockArtistRepository;
    use crate::span_capture::SpanNames;
    use core_catalog::{CatalogError, ErrorKind};

    fn stored(id: i64, input: &ArtistInput) -> Artist {
        Artist {
            id,
            name: input.name.clone(),
            genre: input.genre.clone(),
            country: input.country.clone(),
            bio: input.bio.clone(),
            image_url: input.image_url.clone(),
            created_at: 1_700_000_000,
            updated_at: 1_700_000_000,
            deleted_at: None,
        }
    }

    #[tokio::test]
    async fn test_create_sanitizes_before_storing() {
        let mut repo = MockArtistRepository::new();
        repo.expect_create()
            .withf(|_, input| input.name == "Björk" && input.bio.is_none())
            .times(1)
            .returning(|_, input| Ok(stored(1, input)));

        let service = ArtistService::new(Arc::new(repo));
        let artist = service
            .create(
                &Context::new(),
                ArtistInput {
                    name: "  Björk ".to_string(),
                    genre: "Art Pop".to_string(),
                    country: "IS".to_string(),
                    bio: Some("   ".to_string()),
                    image_url: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(artist.name, "Björk");
    }

    #[tokio::test]
    async fn test_invalid_input_never_reaches_repository() {
        let mut repo = MockArtistRepository::new();
        repo.expect_create().times(0);

        let service = ArtistService::new(Arc::new(repo));
        let err = service
            .create(&Context::new(), ArtistInput::default())
            .await
            .unwrap_err();

        match err {
            CatalogError::Validation(errors) => {
                assert!(errors.contains("name"));
                assert!(errors.contains("genre"));
                assert!(errors.contains("country"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_positive_id_is_rejected() {
        let mut repo = MockArtistRepository::new();
        repo.expect_get_by_id().times(0);
        repo.expect_delete().times(0);

        let service = ArtistService::new(Arc::new(repo));
        let get = service.get_by_id(&Context::new(), 0).await.unwrap_err();
        let delete = service.delete(&Context::new(), -3).await.unwrap_err();

        assert_eq!(get.kind(), ErrorKind::InvalidId);
        assert_eq!(delete.kind(), ErrorKind::InvalidId);
    }

    #[tokio::test]
    async fn test_repository_errors_pass_through() {
        let mut repo = MockArtistRepository::new();
        repo.expect_get_by_id()
            .returning(|_, id| Err(CatalogError::not_found(Entity::Artist, id)));

        let service = ArtistService::new(Arc::new(repo));
        let err = service.get_by_id(&Context::new(), 9).await.unwrap_err();
        assert!(matches!(
            err,
            CatalogError::NotFound {
                entity: Entity::Artist,
                id: 9
            }
        ));
    }

    #[tokio::test]
    async fn test_paginated_request_is_normalized() {
        let mut repo = MockArtistRepository::new();
        repo.expect_get_all_paginated()
            .withf(|_, _, page| page.page == 1 && page.limit == 10)
            .returning(|_, _, page| Ok(Page::new(Vec::new(), 0, page)));

        let service = ArtistService::new(Arc::new(repo));
        let page = service
            .get_all_paginated(
                &Context::new(),
                ArtistFilter::default(),
                PageRequest { page: 0, limit: -5 },
            )
            .await
            .unwrap();
        assert_eq!(page.total_pages, 1);
    }

    #[tokio::test]
    async fn test_list_operations_open_spans() {
        let mut repo = MockArtistRepository::new();
        repo.expect_get_all().returning(|_| Ok(Vec::new()));
        repo.expect_count().returning(|_| Ok(0));

        let spans = SpanNames::default();
        let _guard = spans.install();
        let service = ArtistService::new(Arc::new(repo));
        service.get_all(&Context::new()).await.unwrap();
        service.count(&Context::new()).await.unwrap();

        assert_eq!(spans.names(), vec!["get_all", "count"]);
    }

    #[tokio::test]
    async fn test_operation_timeout_sets_deadline() {
        let mut repo = MockArtistRepository::new();
        repo.expect_count()
            .withf(|ctx| ctx.deadline().is_some())
            .returning(|_| Ok(3));

        let service = ArtistService::new(Arc::new(repo))
            .with_operation_timeout(Some(Duration::from_secs(5)));
        assert_eq!(service.count(&Context::new()).await.unwrap(), 3);
    }
}
