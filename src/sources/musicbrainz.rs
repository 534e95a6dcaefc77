//! MusicBrainz web service client.
//!
//! Requests are spaced slightly over one second apart per MusicBrainz API
//! policy; detailed release lookups run through a bounded concurrent stream.

use super::{non_empty, Credit, JsonFetcher, SupplementalAlbum, SupplementalDisc, SupplementalTrack};
use crate::catalog_number::searchable_catalog_numbers;
use crate::config::Config;
use crate::discography::{ReleaseCandidate, SourceKind};
use crate::names::NameSet;
use crate::normalize;
use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use indexmap::IndexSet;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const MUSICBRAINZ_API_BASE: &str = "https://musicbrainz.org/ws/2";
const RATE_LIMIT_INTERVAL: Duration = Duration::from_millis(1100);
const BROWSE_PAGE_SIZE: usize = 100;
const RELEASE_INCLUDES: &str =
    "recordings+artist-credits+labels+artist-rels+recording-level-rels+work-rels+work-level-rels";

#[derive(Debug, Deserialize)]
struct ReleaseList {
    #[serde(rename = "release-count", default)]
    release_count: usize,
    #[serde(default)]
    releases: Vec<ReleaseSummary>,
}

#[derive(Debug, Deserialize)]
struct ReleaseSummary {
    id: String,
    title: Option<String>,
    date: Option<String>,
    #[serde(rename = "label-info", default)]
    label_info: Vec<LabelInfo>,
}

#[derive(Debug, Deserialize)]
struct LabelInfo {
    #[serde(rename = "catalog-number")]
    catalog_number: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReleaseDetail {
    id: String,
    title: Option<String>,
    date: Option<String>,
    #[serde(rename = "label-info", default)]
    label_info: Vec<LabelInfo>,
    #[serde(rename = "artist-credit", default)]
    artist_credit: Vec<ArtistCredit>,
    #[serde(default)]
    media: Vec<Medium>,
    #[serde(default)]
    relations: Vec<Relation>,
}

#[derive(Debug, Deserialize)]
struct ArtistCredit {
    name: Option<String>,
    artist: Option<ArtistRef>,
}

#[derive(Debug, Deserialize)]
struct ArtistRef {
    name: String,
    #[serde(rename = "sort-name")]
    sort_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Medium {
    position: Option<u32>,
    #[serde(default)]
    tracks: Vec<MediumTrack>,
}

#[derive(Debug, Deserialize)]
struct MediumTrack {
    position: Option<u32>,
    title: Option<String>,
    #[serde(rename = "artist-credit", default)]
    artist_credit: Vec<ArtistCredit>,
    recording: Option<Recording>,
}

#[derive(Debug, Deserialize)]
struct Recording {
    #[serde(default)]
    relations: Vec<Relation>,
}

#[derive(Debug, Deserialize)]
struct Relation {
    #[serde(rename = "type")]
    kind: String,
    artist: Option<ArtistRef>,
    work: Option<Work>,
}

#[derive(Debug, Deserialize)]
struct Work {
    #[serde(default)]
    relations: Vec<Relation>,
}

#[derive(Clone)]
pub struct MusicBrainzClient {
    http: JsonFetcher,
    concurrency: usize,
}

impl MusicBrainzClient {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            http: JsonFetcher::new("MusicBrainz", config)?.with_min_interval(RATE_LIMIT_INTERVAL),
            concurrency: config.musicbrainz_concurrency.max(1),
        })
    }

    /// Every release credited to the artist, paging through the browse API
    pub async fn fetch_artist_releases(&self, artist_id: &str) -> Result<Vec<ReleaseCandidate>> {
        let mut candidates = Vec::new();
        let mut offset = 0;

        loop {
            let url = format!(
                "{}/release?artist={}&inc=labels&fmt=json&limit={}&offset={}",
                MUSICBRAINZ_API_BASE, artist_id, BROWSE_PAGE_SIZE, offset
            );
            let page: ReleaseList = serde_json::from_value(self.http.get(&url).await?)
                .with_context(|| format!("Unexpected MusicBrainz response for artist {}", artist_id))?;

            let count = page.releases.len();
            candidates.extend(page.releases.into_iter().map(summary_to_candidate));
            offset += count;

            if count == 0 || offset >= page.release_count {
                break;
            }
        }

        log::debug!("MusicBrainz artist {}: {} candidate releases", artist_id, candidates.len());
        Ok(candidates)
    }

    pub async fn fetch_release(&self, release_id: &str) -> Result<SupplementalAlbum> {
        let url = format!(
            "{}/release/{}?inc={}&fmt=json",
            MUSICBRAINZ_API_BASE, release_id, RELEASE_INCLUDES
        );
        let body = self.http.get(&url).await?;
        parse_release(body)
    }

    /// Release ids whose catalog number matches `catalog_number`
    pub async fn search_by_catalog_number(&self, catalog_number: &str) -> Result<Vec<String>> {
        let query = format!("catno:\"{}\"", catalog_number);
        let url = format!(
            "{}/release?query={}&fmt=json&limit=5",
            MUSICBRAINZ_API_BASE,
            urlencoding::encode(&query)
        );
        let list: ReleaseList = serde_json::from_value(self.http.get(&url).await?)
            .context("Unexpected MusicBrainz search response")?;
        Ok(list.releases.into_iter().map(|r| r.id).collect())
    }

    /// Search each catalog number and fetch the full details of every hit.
    ///
    /// Range and variant literals are not searched, only bare numbers.
    /// Lookups that fail are logged and left out. Results keep search order.
    pub async fn lookup_by_catalog_numbers(&self, catalog_numbers: &[String]) -> Result<Vec<SupplementalAlbum>> {
        let mut release_ids = IndexSet::new();
        for catalog_number in &searchable_catalog_numbers(catalog_numbers) {
            match self.search_by_catalog_number(catalog_number).await {
                Ok(ids) => release_ids.extend(ids),
                Err(e) => log::warn!("MusicBrainz search for {} failed: {:#}", catalog_number, e),
            }
        }

        let mut found: Vec<(usize, SupplementalAlbum)> = stream::iter(release_ids.into_iter().enumerate())
            .map(|(position, id)| async move {
                match self.fetch_release(&id).await {
                    Ok(album) => Some((position, album)),
                    Err(e) => {
                        log::warn!("MusicBrainz release {} lookup failed: {:#}", id, e);
                        None
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .filter_map(|result| async move { result })
            .collect()
            .await;

        found.sort_by_key(|(position, _)| *position);
        Ok(found.into_iter().map(|(_, album)| album).collect())
    }
}

fn first_catalog_number(label_info: Vec<LabelInfo>) -> Option<String> {
    label_info
        .into_iter()
        .find_map(|info| non_empty(info.catalog_number))
}

fn summary_to_candidate(release: ReleaseSummary) -> ReleaseCandidate {
    ReleaseCandidate {
        kind: SourceKind::Musicbrainz,
        album_id: Some(release.id),
        release_date: non_empty(release.date),
        catalog_number: first_catalog_number(release.label_info),
        names: non_empty(release.title).map(|title| NameSet::single("en", title)),
        role: None,
    }
}

fn artist_names(artist: &ArtistRef) -> NameSet {
    let mut names = NameSet::single("name", artist.name.clone());
    if let Some(sort_name) = &artist.sort_name {
        names.insert("sort-name", sort_name.clone());
    }
    names
}

fn role_label(kind: &str) -> String {
    match kind {
        "vocal" | "instrument" | "performer" | "performing orchestra" => "Performer".to_string(),
        other => {
            let mut chars = other.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
    }
}

/// Artist relations, following recording-to-work links one level down
fn relation_credits(relations: &[Relation], credits: &mut Vec<Credit>) {
    for relation in relations {
        if let Some(artist) = &relation.artist {
            let credit = Credit {
                role: role_label(&relation.kind),
                name: artist.name.clone(),
                names: artist_names(artist),
            };
            if !credits.iter().any(|c| c.role == credit.role && c.name == credit.name) {
                credits.push(credit);
            }
        }
        if let Some(work) = &relation.work {
            relation_credits(&work.relations, credits);
        }
    }
}

fn credited_names(credits: &[ArtistCredit]) -> Vec<String> {
    normalize::dedupe_artists(
        credits
            .iter()
            .filter_map(|c| c.name.clone().or_else(|| c.artist.as_ref().map(|a| a.name.clone()))),
    )
}

fn parse_release(body: Value) -> Result<SupplementalAlbum> {
    let release: ReleaseDetail =
        serde_json::from_value(body).context("Unexpected MusicBrainz release response")?;

    let title = non_empty(release.title).unwrap_or_else(|| crate::names::UNKNOWN_NAME.to_string());

    let mut credits = Vec::new();
    relation_credits(&release.relations, &mut credits);

    let discs = release
        .media
        .into_iter()
        .enumerate()
        .map(|(index, medium)| SupplementalDisc {
            number: medium.position.unwrap_or(index as u32 + 1),
            tracks: medium
                .tracks
                .into_iter()
                .enumerate()
                .map(|(track_index, track)| {
                    let mut track_credits: Vec<Credit> = credited_names(&track.artist_credit)
                        .into_iter()
                        .map(|name| Credit {
                            role: "Artist".to_string(),
                            names: NameSet::single("name", name.clone()),
                            name,
                        })
                        .collect();
                    if let Some(recording) = &track.recording {
                        relation_credits(&recording.relations, &mut track_credits);
                    }
                    let title = non_empty(track.title).unwrap_or_default();
                    SupplementalTrack {
                        number: track.position.unwrap_or(track_index as u32 + 1),
                        names: NameSet::single("en", title.clone()),
                        title,
                        credits: track_credits,
                    }
                })
                .collect(),
        })
        .collect();

    Ok(SupplementalAlbum {
        source: SourceKind::Musicbrainz,
        album_id: release.id,
        names: NameSet::single("en", title.clone()),
        title,
        catalog_number: first_catalog_number(release.label_info),
        release_date: non_empty(release.date),
        album_artists: credited_names(&release.artist_credit),
        credits,
        discs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_release() {
        let body = json!({
            "id": "b1a9c0e9-d987-4042-ae91-78d6a3267d69",
            "title": "Xenogears Original Soundtrack",
            "date": "1998-02-21",
            "label-info": [{"catalog-number": null}, {"catalog-number": "SSCX-10004"}],
            "artist-credit": [{"name": "光田康典", "artist": {"name": "光田康典", "sort-name": "Mitsuda, Yasunori"}}],
            "media": [{
                "position": 1,
                "tracks": [{
                    "position": 1,
                    "title": "Dreams of the Strong",
                    "artist-credit": [{"name": "光田康典"}],
                    "recording": {"relations": [
                        {"type": "arranger", "artist": {"name": "Yasunori Mitsuda", "sort-name": "Mitsuda, Yasunori"}},
                        {"type": "performance", "work": {"relations": [
                            {"type": "composer", "artist": {"name": "Yasunori Mitsuda"}},
                            {"type": "lyricist", "artist": {"name": "Kato Masato"}}
                        ]}}
                    ]}
                }]
            }]
        });

        let album = parse_release(body).unwrap();
        assert_eq!(album.title, "Xenogears Original Soundtrack");
        assert_eq!(album.catalog_number.as_deref(), Some("SSCX-10004"));
        assert_eq!(album.album_artists, vec!["光田康典"]);
        assert!(!album.source.western_name_order());

        let track = &album.discs[0].tracks[0];
        let roles: Vec<_> = track.credits.iter().map(|c| c.role.as_str()).collect();
        assert_eq!(roles, vec!["Artist", "Arranger", "Composer", "Lyricist"]);
        assert_eq!(track.credits[1].names.get("sort-name"), Some("Mitsuda, Yasunori"));
    }

    #[test]
    fn test_summary_to_candidate() {
        let list: ReleaseList = serde_json::from_value(json!({
            "release-count": 1,
            "releases": [{"id": "abc", "title": "Album", "date": "", "label-info": [{"catalog-number": "[none]"}]}]
        }))
        .unwrap();
        let candidate = summary_to_candidate(list.releases.into_iter().next().unwrap());
        assert_eq!(candidate.album_id.as_deref(), Some("abc"));
        assert_eq!(candidate.release_date, None);
        assert_eq!(candidate.names.unwrap().preferred(), "Album");
    }

    #[test]
    fn test_role_label() {
        assert_eq!(role_label("composer"), "Composer");
        assert_eq!(role_label("vocal"), "Performer");
        assert_eq!(role_label(""), "");
    }
}
