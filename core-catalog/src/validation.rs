//! Input DTOs, sanitization and field-keyed validation.
//!
//! Every input type exposes `sanitize` (idempotent whitespace cleanup) and
//! `validate`, which sanitizes first and then collects every failing field
//! into a [`ValidationErrors`] map. Repositories assume their inputs already
//! passed validation.

use crate::error::{CatalogError, Entity, Result};
use crate::models::{AlbumType, ArtistRole};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Date layout accepted for album release dates.
pub const RELEASE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a release date, accepting only the zero-padded `YYYY-MM-DD` form.
pub fn parse_release_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, RELEASE_DATE_FORMAT)
        .ok()
        .filter(|date| date.format(RELEASE_DATE_FORMAT).to_string() == value)
}

/// Field name to message map describing why an input was rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message for `field`, replacing any earlier one.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> std::result::Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, message)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", field, message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

// =============================================================================
// Sanitization helpers
// =============================================================================

pub fn sanitize_string(value: &str) -> String {
    value.trim().to_string()
}

/// Trim an optional string, collapsing blank values to `None`.
pub fn sanitize_optional(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Parse a caller-supplied identifier into a positive integer.
///
/// # Errors
/// Returns `CatalogError::InvalidId` when `raw` is not a positive integer.
pub fn parse_id(entity: Entity, raw: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| CatalogError::InvalidId {
            entity,
            value: raw.to_string(),
        })
}

/// Reject non-positive identifiers before any storage call.
pub fn ensure_id(entity: Entity, id: i64) -> Result<i64> {
    if id > 0 {
        Ok(id)
    } else {
        Err(CatalogError::InvalidId {
            entity,
            value: id.to_string(),
        })
    }
}

// =============================================================================
// Artist
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistInput {
    pub name: String,
    pub genre: String,
    pub country: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl ArtistInput {
    pub fn sanitize(&mut self) {
        self.name = sanitize_string(&self.name);
        self.genre = sanitize_string(&self.genre);
        self.country = sanitize_string(&self.country);
        self.bio = sanitize_optional(self.bio.take());
        self.image_url = sanitize_optional(self.image_url.take());
    }

    pub fn validate(&mut self) -> std::result::Result<(), ValidationErrors> {
        self.sanitize();
        let mut errors = ValidationErrors::new();

        if self.name.is_empty() {
            errors.add("name", "name is required");
        }
        if self.genre.is_empty() {
            errors.add("genre", "genre is required");
        }
        if self.country.is_empty() {
            errors.add("country", "country is required");
        }

        errors.into_result()
    }
}

/// Optional partial-match constraints for artist listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistFilter {
    pub name: Option<String>,
    pub genre: Option<String>,
    pub country: Option<String>,
}

impl ArtistFilter {
    pub fn sanitize(&mut self) {
        self.name = sanitize_optional(self.name.take());
        self.genre = sanitize_optional(self.genre.take());
        self.country = sanitize_optional(self.country.take());
    }
}

// =============================================================================
// Song
// =============================================================================

/// How often one artist may be credited on the same song.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SongArtistPolicy {
    /// An artist may hold several distinct roles; an identical
    /// (artist, role) pair is rejected.
    #[default]
    DistinctRoles,
    /// Each artist appears at most once per song.
    UniqueArtist,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongArtistInput {
    pub artist_id: i64,
    pub role: String,
}

impl SongArtistInput {
    pub fn sanitize(&mut self) {
        self.role = sanitize_string(&self.role);
    }

    pub fn validate(&mut self) -> std::result::Result<(), ValidationErrors> {
        self.sanitize();
        let mut errors = ValidationErrors::new();

        if self.artist_id <= 0 {
            errors.add("artist", "artist id must be greater than 0");
        }
        if self.role.parse::<ArtistRole>().is_err() {
            errors.add("role", "artist role must be main, ft or producer");
        }

        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongInput {
    pub title: String,
    /// Length in seconds.
    pub duration: i64,
    #[serde(default)]
    pub artists: Vec<SongArtistInput>,
}

impl SongInput {
    pub fn sanitize(&mut self) {
        self.title = sanitize_string(&self.title);
        for artist in &mut self.artists {
            artist.sanitize();
        }
    }

    pub fn validate(&mut self) -> std::result::Result<(), ValidationErrors> {
        self.validate_with(SongArtistPolicy::default())
    }

    pub fn validate_with(
        &mut self,
        policy: SongArtistPolicy,
    ) -> std::result::Result<(), ValidationErrors> {
        self.sanitize();
        let mut errors = ValidationErrors::new();

        if self.title.is_empty() {
            errors.add("title", "title is required");
        }
        if self.duration <= 0 {
            errors.add("duration", "duration must be greater than 0 seconds");
        }

        for artist in &self.artists {
            if artist.artist_id <= 0 {
                errors.add("artists", "one of the artists has an invalid id");
                break;
            }
            if artist.role.parse::<ArtistRole>().is_err() {
                errors.add("role", "artist role must be main, ft or producer");
            }
        }

        if !errors.contains("artists") {
            if let Some(artist_id) = repeated_song_artist(&self.artists, policy) {
                errors.add(
                    "artists",
                    format!("artist {} is credited more than once", artist_id),
                );
            }
        }

        errors.into_result()
    }
}

fn repeated_song_artist(artists: &[SongArtistInput], policy: SongArtistPolicy) -> Option<i64> {
    let mut seen = HashSet::new();
    artists.iter().find_map(|artist| {
        let fresh = match policy {
            SongArtistPolicy::DistinctRoles => seen.insert((artist.artist_id, artist.role.clone())),
            SongArtistPolicy::UniqueArtist => seen.insert((artist.artist_id, String::new())),
        };
        (!fresh).then_some(artist.artist_id)
    })
}

/// Optional constraints for song listings, combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongFilter {
    pub title: Option<String>,
    pub artist_id: Option<i64>,
    pub artist_name: Option<String>,
}

impl SongFilter {
    pub fn sanitize(&mut self) {
        self.title = sanitize_optional(self.title.take());
        self.artist_name = sanitize_optional(self.artist_name.take());
        self.artist_id = self.artist_id.filter(|id| *id > 0);
    }
}

// =============================================================================
// Album
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumArtistInput {
    pub artist_id: i64,
    #[serde(default)]
    pub is_primary: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInput {
    pub song_id: i64,
    pub track_number: i64,
}

impl TrackInput {
    pub fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.song_id <= 0 {
            errors.add("song_id", "song id is required and must be greater than 0");
        }
        if self.track_number <= 0 {
            errors.add("track_number", "track number must be greater than 0");
        }

        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumInput {
    pub title: String,
    /// Calendar date in `YYYY-MM-DD` form.
    pub release_date: String,
    #[serde(rename = "type")]
    pub album_type: String,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub artists: Vec<AlbumArtistInput>,
    #[serde(default)]
    pub tracks: Vec<TrackInput>,
}

impl AlbumInput {
    pub fn sanitize(&mut self) {
        self.title = sanitize_string(&self.title);
        self.release_date = sanitize_string(&self.release_date);
        self.album_type = sanitize_string(&self.album_type);
        self.cover_url = sanitize_optional(self.cover_url.take());
    }

    pub fn validate(&mut self) -> std::result::Result<(), ValidationErrors> {
        self.sanitize();
        let mut errors = ValidationErrors::new();

        if self.title.is_empty() {
            errors.add("title", "album title is required");
        }
        if self.album_type.parse::<AlbumType>().is_err() {
            errors.add("type", "album type must be EP, LP or Single");
        }
        if self.release_date.is_empty() {
            errors.add("release_date", "release date is required");
        } else if parse_release_date(&self.release_date).is_none() {
            errors.add("release_date", "release date must use the YYYY-MM-DD format");
        }

        if self.artists.is_empty() {
            errors.add("artists", "album needs at least one artist");
        } else if let Some(message) = album_artists_problem(&self.artists) {
            errors.add("artists", message);
        }

        if let Some(message) = tracklist_problem(&self.tracks) {
            errors.add("tracks", message);
        }

        errors.into_result()
    }

    /// The release date as a calendar date, for inputs that skipped
    /// [`AlbumInput::validate`].
    pub fn parsed_release_date(&self) -> Result<NaiveDate> {
        parse_release_date(&self.release_date).ok_or_else(|| {
            let mut errors = ValidationErrors::new();
            errors.add("release_date", "release date must use the YYYY-MM-DD format");
            CatalogError::Validation(errors)
        })
    }
}

fn album_artists_problem(artists: &[AlbumArtistInput]) -> Option<String> {
    let mut has_primary = false;
    let mut seen = HashSet::new();
    for artist in artists {
        if artist.artist_id <= 0 {
            return Some("one of the artists has an invalid id".to_string());
        }
        if !seen.insert(artist.artist_id) {
            return Some(format!("artist {} is listed more than once", artist.artist_id));
        }
        has_primary |= artist.is_primary;
    }
    if has_primary {
        None
    } else {
        Some("album needs at least one artist marked as primary".to_string())
    }
}

/// Report the first offending track entry, if any.
fn tracklist_problem(tracks: &[TrackInput]) -> Option<String> {
    let mut numbers = HashSet::new();
    let mut songs = HashSet::new();

    for track in tracks {
        if track.track_number <= 0 {
            return Some("track numbers must be greater than 0".to_string());
        }
        if track.song_id <= 0 {
            return Some("one of the song ids is invalid".to_string());
        }
        if !numbers.insert(track.track_number) {
            return Some(format!("track number {} is duplicated", track.track_number));
        }
        if !songs.insert(track.song_id) {
            return Some(format!(
                "song {} appears more than once in the tracklist",
                track.song_id
            ));
        }
    }
    None
}

/// Optional constraints for album listings, combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumFilter {
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub album_type: Option<String>,
    pub artist_id: Option<i64>,
    pub artist_name: Option<String>,
}

impl AlbumFilter {
    pub fn sanitize(&mut self) {
        self.title = sanitize_optional(self.title.take());
        self.album_type = sanitize_optional(self.album_type.take());
        self.artist_name = sanitize_optional(self.artist_name.take());
        self.artist_id = self.artist_id.filter(|id| *id > 0);
    }
}
