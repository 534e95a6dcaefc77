//! Catalog lookups against VGMdb and MusicBrainz
//!
//! Both clients cache raw JSON responses in a [`TtlCache`] keyed by URL, so
//! repeated album and artist lookups within the TTL never leave the process.

pub mod musicbrainz;
pub mod vgmdb;

pub use musicbrainz::MusicBrainzClient;
pub use vgmdb::VgmdbClient;

use crate::cache::TtlCache;
use crate::config::Config;
use crate::discography::{DiscographyFetcher, ReleaseCandidate, Source, SourceKind};
use crate::names::NameSet;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One person credited with one role on an album or track
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Credit {
    pub role: String,
    pub name: String,
    pub names: NameSet,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SupplementalTrack {
    pub number: u32,
    pub title: String,
    pub names: NameSet,
    pub credits: Vec<Credit>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SupplementalDisc {
    pub number: u32,
    pub tracks: Vec<SupplementalTrack>,
}

/// Album data from a catalog, handed to the reconciliation prompt
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SupplementalAlbum {
    pub source: SourceKind,
    pub album_id: String,
    pub title: String,
    pub names: NameSet,
    pub catalog_number: Option<String>,
    pub release_date: Option<String>,
    pub album_artists: Vec<String>,
    pub credits: Vec<Credit>,
    pub discs: Vec<SupplementalDisc>,
}

impl SupplementalAlbum {
    pub fn track_count(&self) -> usize {
        self.discs.iter().map(|d| d.tracks.len()).sum()
    }
}

/// Minimum spacing between upstream requests
#[derive(Clone)]
struct Throttle {
    interval: Duration,
    last_request: Arc<tokio::sync::Mutex<Option<Instant>>>,
}

impl Throttle {
    async fn wait(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.interval {
                tokio::time::sleep(self.interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Shared HTTP plumbing: one reqwest client plus a response cache
#[derive(Clone)]
pub(crate) struct JsonFetcher {
    client: reqwest::Client,
    cache: TtlCache<Value>,
    service: &'static str,
    throttle: Option<Throttle>,
}

impl JsonFetcher {
    pub(crate) fn new(service: &'static str, config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            cache: TtlCache::new(config.cache_capacity, Duration::from_secs(config.cache_ttl_secs)),
            service,
            throttle: None,
        })
    }

    /// Space uncached requests at least `interval` apart
    pub(crate) fn with_min_interval(mut self, interval: Duration) -> Self {
        self.throttle = Some(Throttle {
            interval,
            last_request: Arc::new(tokio::sync::Mutex::new(None)),
        });
        self
    }

    pub(crate) async fn get(&self, url: &str) -> Result<Value> {
        let client = self.client.clone();
        let service = self.service;
        let owned_url = url.to_string();
        let throttle = self.throttle.clone();

        self.cache
            .get_or_fetch(url, move || async move {
                if let Some(throttle) = &throttle {
                    throttle.wait().await;
                }
                log::debug!("GET {}", owned_url);
                let response = client
                    .get(&owned_url)
                    .send()
                    .await
                    .with_context(|| format!("{} request failed", service))?;

                if !response.status().is_success() {
                    anyhow::bail!("{} request failed with status {}", service, response.status());
                }

                let body: Value = response
                    .json()
                    .await
                    .with_context(|| format!("Invalid {} response", service))?;
                Ok::<_, anyhow::Error>(body)
            })
            .await
    }
}

/// Both catalog clients behind one handle
#[derive(Clone)]
pub struct CatalogClients {
    pub vgmdb: VgmdbClient,
    pub musicbrainz: MusicBrainzClient,
}

impl CatalogClients {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            vgmdb: VgmdbClient::new(config)?,
            musicbrainz: MusicBrainzClient::new(config)?,
        })
    }

    pub async fn fetch_album(&self, kind: SourceKind, album_id: &str) -> Result<SupplementalAlbum> {
        match kind {
            SourceKind::Vgmdb => self.vgmdb.fetch_album(album_id).await,
            SourceKind::Musicbrainz => self.musicbrainz.fetch_release(album_id).await,
        }
    }
}

#[async_trait]
impl DiscographyFetcher for CatalogClients {
    async fn fetch_discography(&self, source: &Source) -> Result<Vec<ReleaseCandidate>> {
        match source.kind {
            SourceKind::Vgmdb => self.vgmdb.fetch_artist_discography(&source.external_id).await,
            SourceKind::Musicbrainz => {
                self.musicbrainz
                    .fetch_artist_releases(&source.external_id)
                    .await
            }
        }
    }
}

/// Treat blank and placeholder strings as absent
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("N/A") && v != "[none]")
}
