// src/sources/vgmdb.rs
use super::{non_empty, Credit, JsonFetcher, SupplementalAlbum, SupplementalDisc, SupplementalTrack};
use crate::config::Config;
use crate::discography::{ReleaseCandidate, SourceKind};
use crate::names::{get_preferred_vgmdb_name, NameSet};
use crate::roles;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

const VGMDB_API_BASE: &str = "https://vgmdb.info";

#[derive(Debug, Deserialize)]
struct ArtistResponse {
    #[serde(default)]
    discography: Option<Vec<ArtistAlbum>>,
    #[serde(default)]
    featured_on: Vec<ArtistAlbum>,
}

#[derive(Debug, Deserialize)]
struct ArtistAlbum {
    catalog: Option<String>,
    date: Option<String>,
    link: Option<String>,
    #[serde(default)]
    roles: Vec<String>,
    #[serde(default)]
    titles: NameSet,
}

#[derive(Debug, Deserialize)]
struct AlbumResponse {
    link: Option<String>,
    name: Option<String>,
    #[serde(default)]
    names: NameSet,
    catalog: Option<String>,
    release_date: Option<String>,
    #[serde(default)]
    discs: Vec<Disc>,
    #[serde(default)]
    composers: Vec<Person>,
    #[serde(default)]
    arrangers: Vec<Person>,
    #[serde(default)]
    performers: Vec<Person>,
    #[serde(default)]
    lyricists: Vec<Person>,
}

#[derive(Debug, Deserialize)]
struct Disc {
    #[serde(default)]
    tracks: Vec<DiscTrack>,
}

#[derive(Debug, Deserialize)]
struct DiscTrack {
    #[serde(default)]
    names: NameSet,
}

#[derive(Debug, Deserialize)]
struct Person {
    #[serde(default)]
    names: NameSet,
}

#[derive(Clone)]
pub struct VgmdbClient {
    http: JsonFetcher,
}

impl VgmdbClient {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            http: JsonFetcher::new("VGMdb", config)?,
        })
    }

    /// Releases the artist is credited on, excluding non-musical credits
    pub async fn fetch_artist_discography(&self, artist_id: &str) -> Result<Vec<ReleaseCandidate>> {
        let url = format!("{}/artist/{}?format=json", VGMDB_API_BASE, artist_id);
        let body = self.http.get(&url).await?;
        parse_artist_discography(artist_id, body)
    }

    pub async fn fetch_album(&self, album_id: &str) -> Result<SupplementalAlbum> {
        let url = format!("{}/album/{}?format=json", VGMDB_API_BASE, album_id);
        let body = self.http.get(&url).await?;
        parse_album(album_id, body)
    }
}

/// `"album/79"` or `"https://vgmdb.net/album/79"` to `"79"`
fn album_id_from_link(link: &str) -> Option<String> {
    let id = link.trim_end_matches('/').rsplit('/').next()?;
    (!id.is_empty() && id.chars().all(|c| c.is_ascii_digit())).then(|| id.to_string())
}

/// VGMdb writes some dates as `2000.12.18`
fn normalize_date(date: Option<String>) -> Option<String> {
    non_empty(date).map(|d| d.replace('.', "-"))
}

fn parse_artist_discography(artist_id: &str, body: Value) -> Result<Vec<ReleaseCandidate>> {
    let artist: ArtistResponse = serde_json::from_value(body)
        .with_context(|| format!("Unexpected VGMdb response for artist {}", artist_id))?;

    let discography = artist
        .discography
        .with_context(|| format!("No discography data for VGMdb artist {}", artist_id))?;

    let candidates: Vec<ReleaseCandidate> = discography
        .into_iter()
        .chain(artist.featured_on)
        .filter_map(|album| {
            let joined = album.roles.join(", ");
            if roles::are_all_roles_ignored(&joined) {
                log::debug!("Skipping {:?}: only non-musical roles ({})", album.link, joined);
                return None;
            }
            let role = roles::clean_vgmdb_roles(&joined, false);
            Some(ReleaseCandidate {
                kind: SourceKind::Vgmdb,
                album_id: album.link.as_deref().and_then(album_id_from_link),
                release_date: normalize_date(album.date),
                catalog_number: non_empty(album.catalog),
                names: (!album.titles.is_empty()).then_some(album.titles),
                role: (!role.is_empty()).then_some(role),
            })
        })
        .collect();

    log::debug!("VGMdb artist {}: {} candidate releases", artist_id, candidates.len());
    Ok(candidates)
}

fn person_credits(role: &str, people: Vec<Person>) -> impl Iterator<Item = Credit> + '_ {
    people
        .into_iter()
        .filter(|p| !p.names.is_empty())
        .map(move |p| Credit {
            role: role.to_string(),
            name: get_preferred_vgmdb_name(&p.names),
            names: p.names,
        })
}

fn parse_album(album_id: &str, body: Value) -> Result<SupplementalAlbum> {
    let album: AlbumResponse = serde_json::from_value(body)
        .with_context(|| format!("Unexpected VGMdb response for album {}", album_id))?;

    let mut names = album.names;
    if names.is_empty() {
        if let Some(name) = non_empty(album.name) {
            names.insert("en", name);
        }
    }

    let credits: Vec<Credit> = person_credits("Composer", album.composers)
        .chain(person_credits("Arranger", album.arrangers))
        .chain(person_credits("Performer", album.performers))
        .chain(person_credits("Lyricist", album.lyricists))
        .collect();

    let discs = album
        .discs
        .into_iter()
        .enumerate()
        .map(|(disc_index, disc)| SupplementalDisc {
            number: disc_index as u32 + 1,
            tracks: disc
                .tracks
                .into_iter()
                .enumerate()
                .map(|(track_index, track)| SupplementalTrack {
                    number: track_index as u32 + 1,
                    title: get_preferred_vgmdb_name(&track.names),
                    names: track.names,
                    credits: Vec::new(),
                })
                .collect(),
        })
        .collect();

    Ok(SupplementalAlbum {
        source: SourceKind::Vgmdb,
        album_id: album
            .link
            .as_deref()
            .and_then(album_id_from_link)
            .unwrap_or_else(|| album_id.to_string()),
        title: get_preferred_vgmdb_name(&names),
        names,
        catalog_number: non_empty(album.catalog),
        release_date: normalize_date(album.release_date),
        album_artists: Vec::new(),
        credits,
        discs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_artist_discography() {
        let body = json!({
            "name": "Mitsuda Yasunori",
            "discography": [
                {
                    "catalog": "SQEX-10001~3",
                    "date": "2005.01.01",
                    "link": "album/100",
                    "roles": ["Composer (as Yasunori Mitsuda)*", "Director"],
                    "titles": {"en": "Chrono Trigger OST", "ja": "クロノ・トリガー"}
                },
                {
                    "catalog": "N/A",
                    "link": "album/101",
                    "roles": ["Director", "Mixing Engineer"],
                    "titles": {"en": "Not music"}
                }
            ],
            "featured_on": [
                {
                    "catalog": "SSCX-10040",
                    "link": "album/102",
                    "roles": ["Arranger"],
                    "titles": {"en": "Arrange Album"}
                }
            ]
        });

        let candidates = parse_artist_discography("77", body).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].album_id.as_deref(), Some("100"));
        assert_eq!(candidates[0].role.as_deref(), Some("Composer"));
        assert_eq!(candidates[0].release_date.as_deref(), Some("2005-01-01"));
        assert_eq!(candidates[0].catalog_number.as_deref(), Some("SQEX-10001~3"));
        assert_eq!(candidates[1].album_id.as_deref(), Some("102"));
    }

    #[test]
    fn test_missing_discography_is_an_error() {
        let err = parse_artist_discography("5", json!({"name": "Someone"})).unwrap_err();
        assert!(err.to_string().contains("No discography data"));
    }

    #[test]
    fn test_parse_album() {
        let body = json!({
            "link": "album/79",
            "names": {"en": "Chrono Cross Original Soundtrack", "ja": "クロノ・クロス"},
            "catalog": "SSCX-10040",
            "release_date": "1999-12-18",
            "composers": [{"names": {"en": "Yasunori Mitsuda", "ja": "光田康典"}}],
            "discs": [
                {"tracks": [
                    {"names": {"English": "Scars of Time", "Japanese": "時の傷痕"}},
                    {"names": {"Japanese": "夢の岸辺", "Romaji": "Yume no Kishibe"}}
                ]},
                {"tracks": [{"names": {"English": "Radical Dreamers"}}]}
            ]
        });

        let album = parse_album("79", body).unwrap();
        assert_eq!(album.title, "Chrono Cross Original Soundtrack");
        assert_eq!(album.track_count(), 3);
        assert_eq!(album.discs[0].tracks[1].title, "Yume no Kishibe");
        assert_eq!(album.discs[1].number, 2);
        assert_eq!(album.credits[0].role, "Composer");
        assert_eq!(album.credits[0].name, "Yasunori Mitsuda");
        assert!(album.source.western_name_order());
    }

    #[test]
    fn test_album_id_from_link() {
        assert_eq!(album_id_from_link("album/79").as_deref(), Some("79"));
        assert_eq!(album_id_from_link("https://vgmdb.net/album/79/").as_deref(), Some("79"));
        assert_eq!(album_id_from_link("artist/x"), None);
    }
}
