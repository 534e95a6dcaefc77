// src/discography/types.rs
use crate::names::NameSet;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

static VGMDB_ARTIST_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://(?:www\.)?vgmdb\.(?:net|info)/artist/(\d+)/?(?:[?#].*)?$").unwrap());

static MUSICBRAINZ_ARTIST_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://(?:www\.|beta\.)?musicbrainz\.org/artist/([0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12})/?(?:[?#].*)?$").unwrap()
});

/// Whether the user has the release in their library
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseStatus {
    #[default]
    Unobtained,
    ObtainedLossless,
    ObtainedLossy,
    Skipped,
}

impl FromStr for ReleaseStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "unobtained" => Ok(ReleaseStatus::Unobtained),
            "obtained_lossless" | "lossless" => Ok(ReleaseStatus::ObtainedLossless),
            "obtained_lossy" | "lossy" => Ok(ReleaseStatus::ObtainedLossy),
            "skipped" => Ok(ReleaseStatus::Skipped),
            other => anyhow::bail!("Unknown release status: {}", other),
        }
    }
}

impl fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReleaseStatus::Unobtained => "unobtained",
            ReleaseStatus::ObtainedLossless => "obtained_lossless",
            ReleaseStatus::ObtainedLossy => "obtained_lossy",
            ReleaseStatus::Skipped => "skipped",
        };
        f.pad(s)
    }
}

/// The cataloging service a source or album id belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Vgmdb,
    Musicbrainz,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Vgmdb => f.write_str("VGMdb"),
            SourceKind::Musicbrainz => f.write_str("MusicBrainz"),
        }
    }
}

impl SourceKind {
    /// Identify an artist page URL.
    ///
    /// Only VGMdb and MusicBrainz artist URLs are accepted.
    pub fn parse_artist_url(url: &str) -> anyhow::Result<(SourceKind, String)> {
        let url = url.trim();
        if let Some(caps) = VGMDB_ARTIST_URL.captures(url) {
            return Ok((SourceKind::Vgmdb, caps[1].to_string()));
        }
        if let Some(caps) = MUSICBRAINZ_ARTIST_URL.captures(url) {
            return Ok((SourceKind::Musicbrainz, caps[1].to_lowercase()));
        }
        anyhow::bail!(
            "Unrecognized source URL: {} (expected https://vgmdb.net/artist/<id> or https://musicbrainz.org/artist/<mbid>)",
            url
        )
    }

    /// VGMdb lists Japanese personal names Forename-Surname
    pub fn western_name_order(&self) -> bool {
        matches!(self, SourceKind::Vgmdb)
    }

    pub fn artist_url(&self, external_id: &str) -> String {
        match self {
            SourceKind::Vgmdb => format!("https://vgmdb.net/artist/{}", external_id),
            SourceKind::Musicbrainz => format!("https://musicbrainz.org/artist/{}", external_id),
        }
    }
}

/// A user-created collection of one artist's releases
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Discography {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// An external artist identity feeding releases into a discography
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Source {
    pub id: String,
    pub discography_id: String,
    pub kind: SourceKind,
    pub external_id: String,
}

impl Source {
    pub fn url(&self) -> String {
        self.kind.artist_url(&self.external_id)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} artist {}", self.kind, self.external_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Release {
    pub id: String,
    pub discography_id: String,
    pub release_date: Option<String>,
    pub catalog_number: Option<String>,
    pub vgmdb_album_id: Option<String>,
    pub musicbrainz_release_id: Option<String>,
    pub names: Option<NameSet>,
    pub role: Option<String>,
    pub status: ReleaseStatus,
    pub local_path: Option<String>,
}

impl Release {
    /// Display title picked from the name set
    pub fn title(&self) -> String {
        self.names
            .as_ref()
            .map(NameSet::preferred)
            .unwrap_or_else(|| crate::names::UNKNOWN_NAME.to_string())
    }

    pub fn album_id(&self, kind: SourceKind) -> Option<&str> {
        match kind {
            SourceKind::Vgmdb => self.vgmdb_album_id.as_deref(),
            SourceKind::Musicbrainz => self.musicbrainz_release_id.as_deref(),
        }
    }
}

/// A release as reported by a source, before it joins a discography
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReleaseCandidate {
    pub kind: SourceKind,
    pub album_id: Option<String>,
    pub release_date: Option<String>,
    pub catalog_number: Option<String>,
    pub names: Option<NameSet>,
    pub role: Option<String>,
}

impl ReleaseCandidate {
    pub fn into_release(self, discography_id: &str) -> Release {
        let mut release = Release {
            id: uuid::Uuid::new_v4().to_string(),
            discography_id: discography_id.to_string(),
            release_date: self.release_date,
            catalog_number: self.catalog_number,
            names: self.names,
            role: self.role,
            ..Default::default()
        };
        match self.kind {
            SourceKind::Vgmdb => release.vgmdb_album_id = self.album_id,
            SourceKind::Musicbrainz => release.musicbrainz_release_id = self.album_id,
        }
        release
    }
}
