// src/replacements.rs
//! Saved artist-name replacements applied after reconciliation
use crate::discography::store::{decode, encode};
use crate::normalize::{dedupe_artists, join_artists, split_artists};
use crate::scanner::Track;
use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtistReplacement {
    pub original: String,
    pub replacement: String,
}

/// Keyed by original name, so each name has at most one replacement
#[derive(Clone)]
pub struct ReplacementStore {
    tree: sled::Tree,
}

impl ReplacementStore {
    pub fn new(db: &sled::Db) -> Result<Self> {
        Ok(Self {
            tree: db.open_tree("artist_replacements")?,
        })
    }

    /// Add or overwrite the replacement for `original`
    pub fn set(&self, original: &str, replacement: &str) -> Result<ArtistReplacement> {
        let original = original.trim();
        let replacement = replacement.trim();
        if original.is_empty() || replacement.is_empty() {
            anyhow::bail!("Both the original and the replacement name are required");
        }

        let entry = ArtistReplacement {
            original: original.to_string(),
            replacement: replacement.to_string(),
        };
        self.tree.insert(original.as_bytes(), encode(&entry)?)?;
        Ok(entry)
    }

    pub fn remove(&self, original: &str) -> Result<()> {
        if self.tree.remove(original.trim().as_bytes())?.is_none() {
            anyhow::bail!("No replacement saved for '{}'", original.trim());
        }
        Ok(())
    }

    pub fn list(&self) -> Result<Vec<ArtistReplacement>> {
        self.tree.iter().values().map(|bytes| decode(&bytes?)).collect()
    }

    pub fn load(&self) -> Result<Replacements> {
        Ok(Replacements::new(self.list()?))
    }
}

/// An in-memory snapshot of the saved replacements
#[derive(Debug, Clone, Default)]
pub struct Replacements {
    entries: Vec<ArtistReplacement>,
}

impl Replacements {
    pub fn new(entries: Vec<ArtistReplacement>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn replace_name(&self, name: &str) -> String {
        self.entries
            .iter()
            .find(|e| e.original == name)
            .map(|e| e.replacement.clone())
            .unwrap_or_else(|| name.to_string())
    }

    /// Replace whole artist names in a semicolon-joined list
    pub fn apply_to_artists(&self, artists: &str) -> String {
        let replaced: Vec<String> = split_artists(artists)
            .iter()
            .map(|name| self.replace_name(name))
            .collect();
        join_artists(&dedupe_artists(replaced))
    }

    /// Returns true when the track changed
    pub fn apply_to_track(&self, track: &mut Track) -> bool {
        if self.is_empty() {
            return false;
        }
        let artist = self.apply_to_artists(&track.artist);
        let album_artist = self.apply_to_artists(&track.album_artist);
        let changed = artist != track.artist || album_artist != track.album_artist;
        track.artist = artist;
        track.album_artist = album_artist;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ReplacementStore {
        let db = sled::Config::new().temporary(true).open().unwrap();
        ReplacementStore::new(&db).unwrap()
    }

    #[test]
    fn test_original_name_is_unique() {
        let store = store();
        store.set("Nobuo Uematsu", "Uematsu Nobuo").unwrap();
        store.set(" Nobuo Uematsu ", "UEMATSU Nobuo").unwrap();

        let all = store.list().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].replacement, "UEMATSU Nobuo");

        store.remove("Nobuo Uematsu").unwrap();
        assert!(store.remove("Nobuo Uematsu").is_err());
        assert!(store.set("", "x").is_err());
    }

    #[test]
    fn test_apply_to_track_dedupes() {
        let replacements = Replacements::new(vec![ArtistReplacement {
            original: "Nobuo Uematsu".to_string(),
            replacement: "Uematsu Nobuo".to_string(),
        }]);

        let mut track = Track {
            artist: "Nobuo Uematsu; Uematsu Nobuo; Hamauzu Masashi".to_string(),
            album_artist: "Nobuo Uematsu".to_string(),
            ..Default::default()
        };
        assert!(replacements.apply_to_track(&mut track));
        assert_eq!(track.artist, "Uematsu Nobuo; Hamauzu Masashi");
        assert_eq!(track.album_artist, "Uematsu Nobuo");
        assert!(!replacements.apply_to_track(&mut track));
    }
}
