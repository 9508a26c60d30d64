//! Domain models for the music catalog
//!
//! Row types map directly onto the catalog tables through `sqlx::FromRow`.
//! Relationship collections (`Song::artists`, `Album::artists`,
//! `Album::tracks`) are filled in by the repositories from the join tables.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Enumerations
// =============================================================================

/// Credit an artist holds on a song.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ArtistRole {
    Main,
    Ft,
    Producer,
}

impl ArtistRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtistRole::Main => "main",
            ArtistRole::Ft => "ft",
            ArtistRole::Producer => "producer",
        }
    }
}

impl FromStr for ArtistRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "main" => Ok(ArtistRole::Main),
            "ft" => Ok(ArtistRole::Ft),
            "producer" => Ok(ArtistRole::Producer),
            other => Err(format!("unknown artist role: {}", other)),
        }
    }
}

impl fmt::Display for ArtistRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Release format of an album. Stored with its exact casing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
pub enum AlbumType {
    #[serde(rename = "EP")]
    #[sqlx(rename = "EP")]
    Ep,
    #[serde(rename = "LP")]
    #[sqlx(rename = "LP")]
    Lp,
    #[serde(rename = "Single")]
    #[sqlx(rename = "Single")]
    Single,
}

impl AlbumType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlbumType::Ep => "EP",
            AlbumType::Lp => "LP",
            AlbumType::Single => "Single",
        }
    }
}

impl FromStr for AlbumType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EP" => Ok(AlbumType::Ep),
            "LP" => Ok(AlbumType::Lp),
            "Single" => Ok(AlbumType::Single),
            other => Err(format!("unknown album type: {}", other)),
        }
    }
}

impl fmt::Display for AlbumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Artist
// =============================================================================

/// A performer, band or producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Artist {
    pub id: i64,
    pub name: String,
    pub genre: String,
    pub country: String,
    pub bio: Option<String>,
    pub image_url: Option<String>,
    /// Unix timestamp (seconds)
    pub created_at: i64,
    /// Unix timestamp (seconds)
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<i64>,
}

impl Artist {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Artist as credited on a song.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SongArtist {
    pub id: i64,
    pub name: String,
    pub role: ArtistRole,
}

/// Artist as credited on an album.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AlbumArtist {
    pub id: i64,
    pub name: String,
    pub is_primary: bool,
}

// =============================================================================
// Song
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Song {
    pub id: i64,
    pub title: String,
    /// Length in seconds, always positive
    pub duration: i64,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<i64>,
    #[sqlx(skip)]
    #[serde(default)]
    pub artists: Vec<SongArtist>,
}

// =============================================================================
// Album
// =============================================================================

/// Position of a song inside an album, enriched with the song's title and
/// duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Track {
    pub track_number: i64,
    pub song_id: i64,
    pub title: String,
    pub duration: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Album {
    pub id: i64,
    pub title: String,
    pub release_date: NaiveDate,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub album_type: AlbumType,
    pub cover_url: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<i64>,
    #[sqlx(skip)]
    #[serde(default)]
    pub artists: Vec<AlbumArtist>,
    /// Ordered by track number. Left empty in list views.
    #[sqlx(skip)]
    #[serde(default)]
    pub tracks: Vec<Track>,
}

impl Album {
    /// Artists flagged as primary.
    pub fn primary_artists(&self) -> impl Iterator<Item = &AlbumArtist> {
        self.artists.iter().filter(|artist| artist.is_primary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_strings() {
        for role in [ArtistRole::Main, ArtistRole::Ft, ArtistRole::Producer] {
            assert_eq!(role.as_str().parse::<ArtistRole>().unwrap(), role);
        }
        assert!("Main".parse::<ArtistRole>().is_err());
    }

    #[test]
    fn album_type_is_case_sensitive() {
        assert_eq!("EP".parse::<AlbumType>().unwrap(), AlbumType::Ep);
        assert_eq!("Single".parse::<AlbumType>().unwrap(), AlbumType::Single);
        assert!("single".parse::<AlbumType>().is_err());
    }

    #[test]
    fn album_serializes_type_field() {
        let album = Album {
            id: 1,
            title: "Discovery".to_string(),
            release_date: NaiveDate::from_ymd_opt(2001, 3, 12).unwrap(),
            album_type: AlbumType::Lp,
            cover_url: None,
            created_at: 0,
            updated_at: 0,
            deleted_at: None,
            artists: vec![AlbumArtist {
                id: 3,
                name: "Daft Punk".to_string(),
                is_primary: true,
            }],
            tracks: vec![],
        };

        let json = serde_json::to_value(&album).unwrap();
        assert_eq!(json["type"], "LP");
        assert_eq!(json["release_date"], "2001-03-12");
        assert!(json.get("deleted_at").is_none());
        assert_eq!(album.primary_artists().count(), 1);
    }

    #[test]
    fn song_artist_role_serializes_lowercase() {
        let credit = SongArtist {
            id: 2,
            name: "Pharrell".to_string(),
            role: ArtistRole::Ft,
        };
        let json = serde_json::to_value(&credit).unwrap();
        assert_eq!(json["role"], "ft");
    }
}
