// src/discography/store.rs
use super::types::{Discography, Release, ReleaseStatus, Source, SourceKind};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| anyhow::anyhow!("{}", e))
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    bincode::deserialize(bytes).map_err(|e| anyhow::anyhow!("{}", e))
}

fn child_key(discography_id: &str, id: &str) -> String {
    format!("{}/{}", discography_id, id)
}

fn prefix(discography_id: &str) -> String {
    format!("{}/", discography_id)
}

/// Persisted discographies, their sources and releases.
///
/// Sources and releases are keyed `<discography id>/<id>` so a prefix scan
/// lists everything belonging to one discography. Discography names are
/// unique through a separate name index.
#[derive(Clone)]
pub struct DiscographyStore {
    discographies: sled::Tree,
    discography_names: sled::Tree,
    sources: sled::Tree,
    releases: sled::Tree,
}

impl DiscographyStore {
    pub fn new(db: &sled::Db) -> Result<Self> {
        Ok(Self {
            discographies: db.open_tree("discographies")?,
            discography_names: db.open_tree("discography_names")?,
            sources: db.open_tree("sources")?,
            releases: db.open_tree("releases")?,
        })
    }

    pub fn create_discography(&self, name: &str) -> Result<Discography> {
        let name = name.trim();
        if name.is_empty() {
            anyhow::bail!("Discography name cannot be empty");
        }

        let discography = Discography {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            created_at: chrono::Utc::now(),
        };

        let claimed = self.discography_names.compare_and_swap(
            name.to_lowercase(),
            None as Option<&[u8]>,
            Some(discography.id.as_bytes()),
        )?;
        if claimed.is_err() {
            anyhow::bail!("A discography named '{}' already exists", name);
        }

        self.discographies
            .insert(discography.id.as_bytes(), encode(&discography)?)?;
        log::info!("Created discography '{}' ({})", discography.name, discography.id);
        Ok(discography)
    }

    pub fn get_discography(&self, id: &str) -> Result<Option<Discography>> {
        self.discographies
            .get(id.as_bytes())?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    /// Look a discography up by id or (case-insensitive) name
    pub fn find_discography(&self, id_or_name: &str) -> Result<Discography> {
        if let Some(discography) = self.get_discography(id_or_name)? {
            return Ok(discography);
        }
        if let Some(id) = self
            .discography_names
            .get(id_or_name.trim().to_lowercase())?
        {
            let id = String::from_utf8_lossy(&id).to_string();
            if let Some(discography) = self.get_discography(&id)? {
                return Ok(discography);
            }
        }
        anyhow::bail!("No discography named or identified by '{}'", id_or_name)
    }

    pub fn list_discographies(&self) -> Result<Vec<Discography>> {
        let mut all: Vec<Discography> = self
            .discographies
            .iter()
            .values()
            .map(|bytes| decode(&bytes?))
            .collect::<Result<_>>()?;
        all.sort_by(|a, b| natord::compare_ignore_case(&a.name, &b.name));
        Ok(all)
    }

    /// Delete a discography together with its sources and releases
    pub fn delete_discography(&self, id: &str) -> Result<()> {
        let discography = self
            .get_discography(id)?
            .with_context(|| format!("Discography {} not found", id))?;

        for tree in [&self.sources, &self.releases] {
            let mut batch = sled::Batch::default();
            for key in tree.scan_prefix(prefix(id)).keys() {
                batch.remove(key?);
            }
            tree.apply_batch(batch)?;
        }

        self.discographies.remove(id.as_bytes())?;
        self.discography_names
            .remove(discography.name.to_lowercase())?;
        log::info!("Deleted discography '{}'", discography.name);
        Ok(())
    }

    /// Register a source from an artist page URL
    pub fn add_source(&self, discography_id: &str, url: &str) -> Result<Source> {
        if self.get_discography(discography_id)?.is_none() {
            anyhow::bail!("Discography {} not found", discography_id);
        }

        let (kind, external_id) = SourceKind::parse_artist_url(url)?;
        if let Some(existing) = self
            .list_sources(discography_id)?
            .into_iter()
            .find(|s| s.kind == kind && s.external_id == external_id)
        {
            anyhow::bail!("Source already added: {}", existing);
        }

        let source = Source {
            id: uuid::Uuid::new_v4().to_string(),
            discography_id: discography_id.to_string(),
            kind,
            external_id,
        };
        self.sources
            .insert(child_key(discography_id, &source.id), encode(&source)?)?;
        Ok(source)
    }

    pub fn remove_source(&self, discography_id: &str, source_id: &str) -> Result<()> {
        if self
            .sources
            .remove(child_key(discography_id, source_id))?
            .is_none()
        {
            anyhow::bail!("Source {} not found", source_id);
        }
        Ok(())
    }

    pub fn list_sources(&self, discography_id: &str) -> Result<Vec<Source>> {
        self.sources
            .scan_prefix(prefix(discography_id))
            .values()
            .map(|bytes| decode(&bytes?))
            .collect()
    }

    /// Releases ordered by release date, undated last
    pub fn list_releases(&self, discography_id: &str) -> Result<Vec<Release>> {
        let mut releases: Vec<Release> = self
            .releases
            .scan_prefix(prefix(discography_id))
            .values()
            .map(|bytes| decode(&bytes?))
            .collect::<Result<_>>()?;
        releases.sort_by(|a, b| {
            let date = |r: &Release| r.release_date.clone().unwrap_or_else(|| "9999".to_string());
            date(a)
                .cmp(&date(b))
                .then_with(|| a.catalog_number.cmp(&b.catalog_number))
        });
        Ok(releases)
    }

    pub fn get_release(&self, discography_id: &str, release_id: &str) -> Result<Option<Release>> {
        self.releases
            .get(child_key(discography_id, release_id))?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    /// Insert releases in one atomic batch
    pub fn insert_releases(&self, releases: &[Release]) -> Result<usize> {
        let mut batch = sled::Batch::default();
        for release in releases {
            batch.insert(
                child_key(&release.discography_id, &release.id).as_bytes(),
                encode(release)?,
            );
        }
        self.releases.apply_batch(batch)?;
        Ok(releases.len())
    }

    /// Atomically delete `remove_ids` and insert `replacement`
    pub fn replace_releases(
        &self,
        discography_id: &str,
        remove_ids: &[String],
        replacement: &Release,
    ) -> Result<()> {
        let mut batch = sled::Batch::default();
        for id in remove_ids {
            batch.remove(child_key(discography_id, id).as_bytes());
        }
        batch.insert(
            child_key(discography_id, &replacement.id).as_bytes(),
            encode(replacement)?,
        );
        self.releases.apply_batch(batch)?;
        Ok(())
    }

    pub fn update_release_status(
        &self,
        discography_id: &str,
        release_id: &str,
        status: ReleaseStatus,
        local_path: Option<String>,
    ) -> Result<Release> {
        let mut release = self
            .get_release(discography_id, release_id)?
            .with_context(|| format!("Release {} not found", release_id))?;

        release.status = status;
        release.local_path = match status {
            ReleaseStatus::ObtainedLossless | ReleaseStatus::ObtainedLossy => {
                local_path.or(release.local_path)
            }
            ReleaseStatus::Unobtained | ReleaseStatus::Skipped => None,
        };

        self.releases
            .insert(child_key(discography_id, release_id), encode(&release)?)?;
        Ok(release)
    }

    pub fn delete_release(&self, discography_id: &str, release_id: &str) -> Result<()> {
        if self
            .releases
            .remove(child_key(discography_id, release_id))?
            .is_none()
        {
            anyhow::bail!("Release {} not found", release_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::NameSet;

    fn store() -> DiscographyStore {
        let db = sled::Config::new().temporary(true).open().unwrap();
        DiscographyStore::new(&db).unwrap()
    }

    fn release(discography_id: &str, catalog: &str, date: Option<&str>) -> Release {
        Release {
            id: uuid::Uuid::new_v4().to_string(),
            discography_id: discography_id.to_string(),
            catalog_number: Some(catalog.to_string()),
            release_date: date.map(str::to_string),
            names: Some(NameSet::single("en", catalog)),
            ..Default::default()
        }
    }

    #[test]
    fn test_discography_names_are_unique() {
        let store = store();
        let created = store.create_discography("Mitsuda Yasunori").unwrap();
        let err = store.create_discography("mitsuda yasunori").unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert!(store.create_discography("  ").is_err());

        assert_eq!(store.find_discography("MITSUDA YASUNORI").unwrap().id, created.id);
        assert_eq!(store.find_discography(&created.id).unwrap().name, "Mitsuda Yasunori");
        assert_eq!(store.list_discographies().unwrap().len(), 1);
    }

    #[test]
    fn test_sources() {
        let store = store();
        let disc = store.create_discography("Shimomura Yoko").unwrap();

        let source = store.add_source(&disc.id, "https://vgmdb.net/artist/152").unwrap();
        assert_eq!(source.kind, SourceKind::Vgmdb);
        assert!(store.add_source(&disc.id, "https://vgmdb.net/artist/152/").is_err());
        assert!(store.add_source(&disc.id, "https://example.org/152").is_err());
        assert!(store.add_source("missing", "https://vgmdb.net/artist/1").is_err());

        assert_eq!(store.list_sources(&disc.id).unwrap(), vec![source.clone()]);
        store.remove_source(&disc.id, &source.id).unwrap();
        assert!(store.list_sources(&disc.id).unwrap().is_empty());
    }

    #[test]
    fn test_releases_are_scoped_and_sorted() {
        let store = store();
        let a = store.create_discography("A").unwrap();
        let b = store.create_discography("B").unwrap();

        store
            .insert_releases(&[
                release(&a.id, "AAA-002", Some("2005-01-01")),
                release(&a.id, "AAA-003", None),
                release(&a.id, "AAA-001", Some("1999-05-05")),
                release(&b.id, "BBB-001", None),
            ])
            .unwrap();

        let catalogs: Vec<_> = store
            .list_releases(&a.id)
            .unwrap()
            .into_iter()
            .filter_map(|r| r.catalog_number)
            .collect();
        assert_eq!(catalogs, vec!["AAA-001", "AAA-002", "AAA-003"]);

        store.delete_discography(&a.id).unwrap();
        assert!(store.list_releases(&a.id).unwrap().is_empty());
        assert_eq!(store.list_releases(&b.id).unwrap().len(), 1);
        // The name can be reused once deleted
        store.create_discography("A").unwrap();
    }

    #[test]
    fn test_update_release_status() {
        let store = store();
        let disc = store.create_discography("C").unwrap();
        let r = release(&disc.id, "CCC-001", None);
        store.insert_releases(&[r.clone()]).unwrap();

        let updated = store
            .update_release_status(&disc.id, &r.id, ReleaseStatus::ObtainedLossless, Some("/music/ccc".into()))
            .unwrap();
        assert_eq!(updated.status, ReleaseStatus::ObtainedLossless);
        assert_eq!(updated.local_path.as_deref(), Some("/music/ccc"));

        let skipped = store
            .update_release_status(&disc.id, &r.id, ReleaseStatus::Skipped, None)
            .unwrap();
        assert_eq!(skipped.local_path, None);

        store.delete_release(&disc.id, &r.id).unwrap();
        assert!(store.delete_release(&disc.id, &r.id).is_err());
    }
}
