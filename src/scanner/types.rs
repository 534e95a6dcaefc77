// src/scanner/types.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Field names, in the order diffs are reported
pub const TRACK_FIELDS: &[&str] = &[
    "disc_number",
    "track_number",
    "title",
    "artist",
    "album",
    "album_artist",
    "year",
    "date",
    "grouping",
    "catalog_number",
    "barcode",
];

/// One audio file's tag record
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Track {
    pub path: String,
    pub filename: String,
    pub directory: String,
    #[serde(default)]
    pub disc_number: u32,
    #[serde(default)]
    pub track_number: u32,
    #[serde(default)]
    pub title: String,
    /// Semicolon-joined artist list
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub album_artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grouping: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
}

impl Track {
    /// Name of the directory holding the file, without its parents
    pub fn base_directory(&self) -> String {
        Path::new(&self.directory)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.directory.clone())
    }

    /// String form of a field, empty when unset
    pub fn field(&self, name: &str) -> String {
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();
        match name {
            "disc_number" => number_field(self.disc_number),
            "track_number" => number_field(self.track_number),
            "title" => self.title.clone(),
            "artist" => self.artist.clone(),
            "album" => self.album.clone(),
            "album_artist" => self.album_artist.clone(),
            "year" => opt(&self.year),
            "date" => opt(&self.date),
            "grouping" => opt(&self.grouping),
            "catalog_number" => opt(&self.catalog_number),
            "barcode" => opt(&self.barcode),
            _ => String::new(),
        }
    }

    /// Set a field from its string form. Unknown fields are rejected.
    pub fn set_field(&mut self, name: &str, value: &str) -> anyhow::Result<()> {
        let value = value.trim();
        let opt = || (!value.is_empty()).then(|| value.to_string());
        match name {
            "disc_number" => self.disc_number = crate::normalize::parse_leading_int(value).unwrap_or(0),
            "track_number" => self.track_number = crate::normalize::parse_leading_int(value).unwrap_or(0),
            "title" => self.title = value.to_string(),
            "artist" => self.artist = value.to_string(),
            "album" => self.album = value.to_string(),
            "album_artist" => self.album_artist = value.to_string(),
            "year" => self.year = opt(),
            "date" => self.date = opt(),
            "grouping" => self.grouping = opt(),
            "catalog_number" => self.catalog_number = opt(),
            "barcode" => self.barcode = opt(),
            other => anyhow::bail!("Unknown track field: {}", other),
        }
        Ok(())
    }
}

fn number_field(n: u32) -> String {
    if n == 0 {
        String::new()
    } else {
        n.to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetadataChange {
    pub old: String,
    pub new: String,
}

/// A track as currently edited, with the tags it was read with
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackRecord {
    pub id: String,
    pub original: Track,
    pub current: Track,
}

impl TrackRecord {
    pub fn new(track: Track) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            original: track.clone(),
            current: track,
        }
    }

    pub fn path(&self) -> &str {
        &self.original.path
    }

    /// Per-field differences between the original and current tags
    pub fn changes(&self) -> BTreeMap<String, MetadataChange> {
        TRACK_FIELDS
            .iter()
            .filter_map(|field| {
                let old = self.original.field(field);
                let new = self.current.field(field);
                (old != new).then(|| (field.to_string(), MetadataChange { old, new }))
            })
            .collect()
    }

    pub fn is_modified(&self) -> bool {
        self.original != self.current
    }

    /// Replace the editable fields, keeping the file identity of the original
    pub fn apply(&mut self, mut edited: Track) {
        edited.path = self.original.path.clone();
        edited.filename = self.original.filename.clone();
        edited.directory = self.original.directory.clone();
        self.current = edited;
    }

    pub fn reset(&mut self) {
        self.current = self.original.clone();
    }

    pub fn reset_field(&mut self, name: &str) -> anyhow::Result<()> {
        let original = self.original.field(name);
        self.current.set_field(name, &original)
    }
}

/// Tracks found in one directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlbumDirectory {
    pub directory: String,
    pub name: String,
    /// Catalog numbers detected in the directory name
    pub catalog_numbers: Vec<String>,
    pub tracks: Vec<Track>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub albums: Vec<AlbumDirectory>,
    pub total_files: usize,
    pub unreadable: Vec<String>,
}

// RawFileData - a file found by the collector, tags not read yet
#[derive(Debug, Clone)]
pub struct RawFileData {
    pub path: String,
    pub filename: String,
    pub parent_dir: String,
}
