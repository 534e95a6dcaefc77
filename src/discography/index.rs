// src/discography/index.rs
use super::types::{Release, SourceKind};
use std::collections::HashSet;

/// Which identity field matched an existing release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateMatch {
    CatalogNumber,
    SourceAlbumId,
    Names,
}

/// Lookup tables over a discography's releases used to suppress duplicates.
///
/// A release is a duplicate when any one of its catalog number, source album
/// id or name set matches a release already in the index.
#[derive(Debug, Default)]
pub struct ReleaseIndex {
    by_catalog_number: HashSet<String>,
    by_source_album_id: HashSet<(SourceKind, String)>,
    by_names: HashSet<String>,
}

fn catalog_key(catalog_number: &str) -> Option<String> {
    let key = catalog_number.trim().to_uppercase();
    (!key.is_empty()).then_some(key)
}

fn source_keys(release: &Release) -> Vec<(SourceKind, String)> {
    [SourceKind::Vgmdb, SourceKind::Musicbrainz]
        .into_iter()
        .filter_map(|kind| {
            release
                .album_id(kind)
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(|id| (kind, id.to_string()))
        })
        .collect()
}

impl ReleaseIndex {
    pub fn new<'a>(releases: impl IntoIterator<Item = &'a Release>) -> Self {
        let mut index = Self::default();
        for release in releases {
            index.add(release);
        }
        index
    }

    pub fn add(&mut self, release: &Release) {
        if let Some(key) = release.catalog_number.as_deref().and_then(catalog_key) {
            self.by_catalog_number.insert(key);
        }
        self.by_source_album_id.extend(source_keys(release));
        if let Some(key) = release.names.as_ref().and_then(|n| n.dedup_key()) {
            self.by_names.insert(key);
        }
    }

    /// The first identity field of `release` already present in the index
    pub fn find_match(&self, release: &Release) -> Option<DuplicateMatch> {
        if release
            .catalog_number
            .as_deref()
            .and_then(catalog_key)
            .is_some_and(|key| self.by_catalog_number.contains(&key))
        {
            return Some(DuplicateMatch::CatalogNumber);
        }
        if source_keys(release)
            .iter()
            .any(|key| self.by_source_album_id.contains(key))
        {
            return Some(DuplicateMatch::SourceAlbumId);
        }
        if release
            .names
            .as_ref()
            .and_then(|n| n.dedup_key())
            .is_some_and(|key| self.by_names.contains(&key))
        {
            return Some(DuplicateMatch::Names);
        }
        None
    }

    pub fn contains(&self, release: &Release) -> bool {
        self.find_match(release).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::NameSet;

    fn release(catalog: Option<&str>, vgmdb: Option<&str>, name: Option<&str>) -> Release {
        Release {
            id: uuid::Uuid::new_v4().to_string(),
            catalog_number: catalog.map(str::to_string),
            vgmdb_album_id: vgmdb.map(str::to_string),
            names: name.map(|n| NameSet::single("en", n)),
            ..Default::default()
        }
    }

    #[test]
    fn test_any_single_field_matches() {
        let index = ReleaseIndex::new(&[release(Some("SSCX-10040"), Some("1"), Some("Chrono Cross OST"))]);

        assert_eq!(
            index.find_match(&release(Some("sscx-10040 "), None, None)),
            Some(DuplicateMatch::CatalogNumber)
        );
        assert_eq!(
            index.find_match(&release(None, Some("1"), Some("Other"))),
            Some(DuplicateMatch::SourceAlbumId)
        );
        assert_eq!(
            index.find_match(&release(None, None, Some("Chrono Cross OST"))),
            Some(DuplicateMatch::Names)
        );
        assert!(!index.contains(&release(Some("SSCX-10041"), Some("2"), Some("Chrono Trigger OST"))));
    }

    #[test]
    fn test_blank_fields_never_match() {
        let index = ReleaseIndex::new(&[release(Some(""), Some(" "), Some(""))]);
        assert!(!index.contains(&release(Some(""), Some(" "), Some(""))));
    }

    #[test]
    fn test_same_id_different_source_is_not_a_match() {
        let index = ReleaseIndex::new(&[release(None, Some("42"), None)]);
        let mut other = release(None, None, None);
        other.musicbrainz_release_id = Some("42".to_string());
        assert!(!index.contains(&other));
    }
}
