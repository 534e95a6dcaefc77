// src/discography/merge.rs
use super::index::ReleaseIndex;
use super::store::DiscographyStore;
use super::types::{Release, ReleaseCandidate, ReleaseStatus, Source};
use anyhow::Result;
use async_trait::async_trait;
use indexmap::IndexSet;
use serde::Serialize;

/// Anything that can list the releases credited to a source's artist
#[async_trait]
pub trait DiscographyFetcher: Send + Sync {
    async fn fetch_discography(&self, source: &Source) -> Result<Vec<ReleaseCandidate>>;
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct RefetchResult {
    pub added: usize,
    pub errors: Vec<String>,
}

/// Pull every source of a discography and insert the releases not yet known.
///
/// A candidate is skipped when its catalog number, source album id or name
/// set matches an existing or already staged release. A failing source is
/// recorded in `errors` and the remaining sources still run.
pub async fn refetch_discography(
    store: &DiscographyStore,
    fetcher: &dyn DiscographyFetcher,
    discography_id: &str,
) -> Result<RefetchResult> {
    let discography = store.find_discography(discography_id)?;
    let existing = store.list_releases(&discography.id)?;
    let sources = store.list_sources(&discography.id)?;

    log::info!(
        "Refetching '{}': {} sources, {} known releases",
        discography.name,
        sources.len(),
        existing.len()
    );

    let mut index = ReleaseIndex::new(&existing);
    let mut staged: Vec<Release> = Vec::new();
    let mut errors = Vec::new();

    for source in &sources {
        let candidates = match fetcher.fetch_discography(source).await {
            Ok(candidates) => candidates,
            Err(e) => {
                log::warn!("Refetch of {} failed: {:#}", source, e);
                errors.push(format!("{}: {:#}", source, e));
                continue;
            }
        };

        let mut skipped = 0;
        for candidate in candidates {
            let release = candidate.into_release(&discography.id);
            if let Some(matched) = index.find_match(&release) {
                log::debug!("Skipping '{}' ({:?} match)", release.title(), matched);
                skipped += 1;
                continue;
            }
            index.add(&release);
            staged.push(release);
        }
        log::debug!("{}: {} duplicates skipped", source, skipped);
    }

    let added = if staged.is_empty() {
        0
    } else {
        store.insert_releases(&staged)?
    };

    log::info!(
        "Refetch of '{}' added {} releases ({} source errors)",
        discography.name,
        added,
        errors.len()
    );
    Ok(RefetchResult { added, errors })
}

/// Combine releases field by field, first non-empty value in input order.
///
/// The status is the first one that is not `unobtained`. The result gets a
/// fresh id.
pub fn merge_release_fields(releases: &[Release]) -> Result<Release> {
    if releases.len() < 2 {
        anyhow::bail!("At least two releases are required to merge");
    }

    fn first<T: Clone>(releases: &[Release], field: impl Fn(&Release) -> &Option<T>) -> Option<T> {
        releases.iter().find_map(|r| field(r).clone())
    }

    Ok(Release {
        id: uuid::Uuid::new_v4().to_string(),
        discography_id: releases[0].discography_id.clone(),
        release_date: first(releases, |r| &r.release_date),
        catalog_number: first(releases, |r| &r.catalog_number),
        vgmdb_album_id: first(releases, |r| &r.vgmdb_album_id),
        musicbrainz_release_id: first(releases, |r| &r.musicbrainz_release_id),
        names: first(releases, |r| &r.names),
        role: first(releases, |r| &r.role),
        status: releases
            .iter()
            .map(|r| r.status)
            .find(|s| *s != ReleaseStatus::Unobtained)
            .unwrap_or_default(),
        local_path: first(releases, |r| &r.local_path),
    })
}

/// Replace the given releases with one merged release
pub fn merge_releases(
    store: &DiscographyStore,
    discography_id: &str,
    release_ids: &[String],
) -> Result<Release> {
    let release_ids: Vec<String> = release_ids.iter().cloned().collect::<IndexSet<_>>().into_iter().collect();
    if release_ids.len() < 2 {
        anyhow::bail!("At least two distinct releases are required to merge");
    }

    let releases = release_ids
        .iter()
        .map(|id| {
            store
                .get_release(discography_id, id)?
                .ok_or_else(|| anyhow::anyhow!("Release {} not found", id))
        })
        .collect::<Result<Vec<_>>>()?;

    let merged = merge_release_fields(&releases)?;
    store.replace_releases(discography_id, &release_ids, &merged)?;
    log::info!("Merged {} releases into '{}'", releases.len(), merged.title());
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discography::types::SourceKind;
    use crate::names::NameSet;

    struct FakeFetcher;

    #[async_trait]
    impl DiscographyFetcher for FakeFetcher {
        async fn fetch_discography(&self, source: &Source) -> Result<Vec<ReleaseCandidate>> {
            match source.kind {
                SourceKind::Vgmdb => Ok(vec![
                    candidate(SourceKind::Vgmdb, "100", Some("SQEX-10001"), "Album One"),
                    candidate(SourceKind::Vgmdb, "101", Some("SQEX-10002"), "Album Two"),
                    // Same catalog number as an earlier candidate
                    candidate(SourceKind::Vgmdb, "102", Some("sqex-10001"), "Album One (Reprint)"),
                ]),
                SourceKind::Musicbrainz => anyhow::bail!("503 Service Unavailable"),
            }
        }
    }

    fn candidate(kind: SourceKind, id: &str, catalog: Option<&str>, name: &str) -> ReleaseCandidate {
        ReleaseCandidate {
            kind,
            album_id: Some(id.to_string()),
            release_date: None,
            catalog_number: catalog.map(str::to_string),
            names: Some(NameSet::single("en", name)),
            role: Some("Composer".to_string()),
        }
    }

    fn store() -> DiscographyStore {
        let db = sled::Config::new().temporary(true).open().unwrap();
        DiscographyStore::new(&db).unwrap()
    }

    #[tokio::test]
    async fn test_refetch_records_failed_source_and_continues() {
        let store = store();
        let disc = store.create_discography("Ishimoto Takeharu").unwrap();
        store.add_source(&disc.id, "https://vgmdb.net/artist/1234").unwrap();
        store
            .add_source(&disc.id, "https://musicbrainz.org/artist/0383dadf-2a4e-4d10-a46a-e9e041da8eb3")
            .unwrap();

        let result = refetch_discography(&store, &FakeFetcher, &disc.id).await.unwrap();
        assert_eq!(result.added, 2);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("MusicBrainz artist"));
        assert!(result.errors[0].contains("503"));

        // Nothing new the second time
        let again = refetch_discography(&store, &FakeFetcher, &disc.id).await.unwrap();
        assert_eq!(again.added, 0);
        assert_eq!(store.list_releases(&disc.id).unwrap().len(), 2);
    }

    #[test]
    fn test_merge_release_fields() {
        let a = Release {
            id: "a".into(),
            discography_id: "d".into(),
            names: Some(NameSet::single("en", "Album")),
            ..Default::default()
        };
        let b = Release {
            id: "b".into(),
            discography_id: "d".into(),
            catalog_number: Some("ABC-123".into()),
            names: Some(NameSet::single("en", "Album (alt)")),
            status: ReleaseStatus::ObtainedLossy,
            ..Default::default()
        };

        let merged = merge_release_fields(&[a.clone(), b]).unwrap();
        assert_eq!(merged.catalog_number.as_deref(), Some("ABC-123"));
        assert_eq!(merged.status, ReleaseStatus::ObtainedLossy);
        assert_eq!(merged.title(), "Album");
        assert_ne!(merged.id, "a");

        assert!(merge_release_fields(&[a]).is_err());
    }

    #[test]
    fn test_merge_releases_replaces_originals() {
        let store = store();
        let disc = store.create_discography("Merge").unwrap();
        let a = Release {
            id: "a".into(),
            discography_id: disc.id.clone(),
            release_date: Some("2001-01-01".into()),
            ..Default::default()
        };
        let b = Release {
            id: "b".into(),
            discography_id: disc.id.clone(),
            vgmdb_album_id: Some("55".into()),
            ..Default::default()
        };
        store.insert_releases(&[a, b]).unwrap();

        let merged = merge_releases(&store, &disc.id, &["a".to_string(), "b".to_string()]).unwrap();
        let remaining = store.list_releases(&disc.id).unwrap();
        assert_eq!(remaining, vec![merged.clone()]);
        assert_eq!(merged.release_date.as_deref(), Some("2001-01-01"));
        assert_eq!(merged.vgmdb_album_id.as_deref(), Some("55"));

        assert!(merge_releases(&store, &disc.id, &["missing".into(), merged.id.clone()]).is_err());
    }

    #[test]
    fn test_merge_rejects_repeated_id() {
        let store = store();
        let disc = store.create_discography("Repeats").unwrap();
        let a = Release {
            id: "a".into(),
            discography_id: disc.id.clone(),
            ..Default::default()
        };
        store.insert_releases(&[a.clone()]).unwrap();

        let err = merge_releases(&store, &disc.id, &["a".to_string(), "a".to_string()]).unwrap_err();
        assert!(err.to_string().contains("two distinct releases"));
        assert_eq!(store.list_releases(&disc.id).unwrap(), vec![a]);
    }
}
