//! End-to-end catalog flows through the service façade against an in-memory
//! database.

use anyhow::Result;
use core_catalog::{
    AlbumArtistInput, AlbumFilter, AlbumInput, ArtistFilter, ArtistInput, ArtistRole,
    CatalogError, Conflict, Context, Entity, ErrorKind, PageRequest, SongArtistInput, SongFilter,
    SongInput, TrackInput,
};
use core_service::{bootstrap, CatalogService, CoreConfig};
use std::time::Duration;

async fn catalog() -> Result<CatalogService> {
    let config = CoreConfig::builder()
        .database_url("sqlite::memory:")
        .operation_timeout(Duration::from_secs(10))
        .build()?;
    Ok(bootstrap(config).await?)
}

fn artist_input(name: &str, genre: &str) -> ArtistInput {
    ArtistInput {
        name: name.to_string(),
        genre: genre.to_string(),
        country: "UK".to_string(),
        bio: None,
        image_url: None,
    }
}

fn song_input(title: &str, credits: &[(i64, &str)]) -> SongInput {
    SongInput {
        title: title.to_string(),
        duration: 180,
        artists: credits
            .iter()
            .map(|&(artist_id, role)| SongArtistInput {
                artist_id,
                role: role.to_string(),
            })
            .collect(),
    }
}

fn album_input(title: &str, artists: &[(i64, bool)], tracks: &[(i64, i64)]) -> AlbumInput {
    AlbumInput {
        title: title.to_string(),
        release_date: "1997-05-21".to_string(),
        album_type: "LP".to_string(),
        cover_url: Some(" https://covers.example/ok.jpg ".to_string()),
        artists: artists
            .iter()
            .map(|&(artist_id, is_primary)| AlbumArtistInput {
                artist_id,
                is_primary,
            })
            .collect(),
        tracks: tracks
            .iter()
            .map(|&(track_number, song_id)| TrackInput {
                song_id,
                track_number,
            })
            .collect(),
    }
}

#[tokio::test]
async fn test_album_lifecycle() -> Result<()> {
    let catalog = catalog().await?;
    let ctx = Context::new();

    let radiohead = catalog
        .artists()
        .create(&ctx, artist_input("Radiohead", "Alternative"))
        .await?;
    let airbag = catalog
        .songs()
        .create(&ctx, song_input("Airbag", &[(radiohead.id, "main")]))
        .await?;
    let paranoid = catalog
        .songs()
        .create(&ctx, song_input("Paranoid Android", &[(radiohead.id, "main")]))
        .await?;
    let karma = catalog
        .songs()
        .create(&ctx, song_input("Karma Police", &[(radiohead.id, "main")]))
        .await?;

    let album = catalog
        .albums()
        .create(
            &ctx,
            album_input(
                "OK Computer",
                &[(radiohead.id, true)],
                &[(2, paranoid.id), (1, airbag.id)],
            ),
        )
        .await?;

    assert_eq!(album.cover_url.as_deref(), Some("https://covers.example/ok.jpg"));
    assert_eq!(album.tracks[0].title, "Airbag");
    assert_eq!(album.tracks[1].title, "Paranoid Android");

    let conflict = catalog
        .albums()
        .add_track(
            &ctx,
            album.id,
            TrackInput {
                song_id: karma.id,
                track_number: 2,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        conflict,
        CatalogError::Conflict(Conflict::TrackNumberTaken)
    ));

    catalog
        .albums()
        .add_track(
            &ctx,
            album.id,
            TrackInput {
                song_id: karma.id,
                track_number: 6,
            },
        )
        .await?;

    let replaced = catalog
        .albums()
        .update(
            &ctx,
            album.id,
            album_input("OK Computer OKNOTOK", &[(radiohead.id, true)], &[(1, karma.id)]),
        )
        .await?;
    assert_eq!(replaced.tracks.len(), 1);
    assert_eq!(replaced.tracks[0].song_id, karma.id);

    let by_artist = catalog
        .albums()
        .get_albums_by_artist_id(&ctx, radiohead.id)
        .await?;
    assert_eq!(by_artist.len(), 1);
    assert_eq!(by_artist[0].title, "OK Computer OKNOTOK");

    catalog.albums().delete(&ctx, album.id).await?;
    let gone = catalog.albums().get_by_id(&ctx, album.id).await.unwrap_err();
    assert_eq!(gone.kind(), ErrorKind::NotFound);

    catalog.close().await;
    Ok(())
}

#[tokio::test]
async fn test_song_credits_and_filters() -> Result<()> {
    let catalog = catalog().await?;
    let ctx = Context::new();

    let massive = catalog
        .artists()
        .create(&ctx, artist_input("Massive Attack", "Trip Hop"))
        .await?;
    let fraser = catalog
        .artists()
        .create(&ctx, artist_input("Elizabeth Fraser", "Dream Pop"))
        .await?;

    let teardrop = catalog
        .songs()
        .create(
            &ctx,
            song_input("Teardrop", &[(massive.id, "main"), (fraser.id, "ft")]),
        )
        .await?;
    catalog
        .songs()
        .create(&ctx, song_input("Angel", &[(massive.id, "main")]))
        .await?;

    assert_eq!(teardrop.artists.len(), 2);
    assert_eq!(teardrop.artists[1].role, ArtistRole::Ft);

    let page = catalog
        .songs()
        .get_all_paginated(
            &ctx,
            SongFilter {
                title: Some(" tear ".to_string()),
                artist_name: Some("fraser".to_string()),
                artist_id: None,
            },
            PageRequest::default(),
        )
        .await?;
    assert_eq!(page.total_items, 1);
    assert_eq!(page.items[0].id, teardrop.id);

    catalog
        .songs()
        .add_artist(
            &ctx,
            teardrop.id,
            SongArtistInput {
                artist_id: massive.id,
                role: "producer".to_string(),
            },
        )
        .await?;
    catalog
        .songs()
        .remove_artist(&ctx, teardrop.id, fraser.id)
        .await?;

    let reloaded = catalog.songs().get_by_id(&ctx, teardrop.id).await?;
    let roles: Vec<ArtistRole> = reloaded.artists.iter().map(|a| a.role).collect();
    assert_eq!(roles, vec![ArtistRole::Main, ArtistRole::Producer]);

    let artists = catalog
        .artists()
        .get_all_paginated(
            &ctx,
            ArtistFilter {
                genre: Some("trip".to_string()),
                ..Default::default()
            },
            PageRequest::new(1, 5),
        )
        .await?;
    assert_eq!(artists.total_items, 1);
    assert_eq!(catalog.artists().count(&ctx).await?, 2);

    Ok(())
}

#[tokio::test]
async fn test_invalid_references_roll_back() -> Result<()> {
    let catalog = catalog().await?;
    let ctx = Context::new();

    let artist = catalog
        .artists()
        .create(&ctx, artist_input("Portishead", "Trip Hop"))
        .await?;

    let err = catalog
        .albums()
        .create(&ctx, album_input("Dummy", &[(artist.id, true)], &[(1, 4040)]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CatalogError::InvalidReference {
            entity: Entity::Song,
            id: 4040
        }
    ));

    let albums = catalog
        .albums()
        .get_all_paginated(&ctx, AlbumFilter::default(), PageRequest::default())
        .await?;
    assert_eq!(albums.total_items, 0);
    assert_eq!(albums.total_pages, 1);

    Ok(())
}

#[tokio::test]
async fn test_cancelled_context_stores_nothing() -> Result<()> {
    let catalog = catalog().await?;
    let ctx = Context::new();
    ctx.cancel();

    let err = catalog
        .artists()
        .create(&ctx, artist_input("Tricky", "Trip Hop"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);

    assert_eq!(catalog.artists().count(&Context::new()).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_validation_errors_serialize_by_field() -> Result<()> {
    let catalog = catalog().await?;

    let err = catalog
        .albums()
        .create(
            &Context::new(),
            AlbumInput {
                title: " ".to_string(),
                release_date: "21/05/1997".to_string(),
                album_type: "Mixtape".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    let CatalogError::Validation(errors) = err else {
        anyhow::bail!("expected validation error");
    };
    let json = serde_json::to_value(&errors)?;
    for field in ["title", "release_date", "type", "artists"] {
        assert!(json.get(field).is_some(), "missing {} in {}", field, json);
    }
    Ok(())
}
