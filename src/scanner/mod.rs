// src/scanner/mod.rs
pub mod collector;
pub mod types;

pub use types::*;

use crate::catalog_number;
use crate::tags;
use anyhow::Result;
use indexmap::IndexSet;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;

/// Scan `paths` for audio files and group them into album directories.
///
/// Tags are read on a rayon pool of `max_workers` threads. Files whose tags
/// cannot be read are reported in `unreadable` instead of failing the scan.
pub async fn scan_directories(paths: &[String], max_workers: usize) -> Result<ScanResult> {
    let paths = paths.to_vec();
    tokio::task::spawn_blocking(move || scan_directories_sync(&paths, max_workers)).await?
}

pub fn scan_directories_sync(paths: &[String], max_workers: usize) -> Result<ScanResult> {
    log::info!("Starting scan of {} paths", paths.len());

    let files = collector::collect_audio_files(paths)?;
    let total_files = files.len();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(max_workers.max(1))
        .build()?;

    let results: Vec<(RawFileData, Result<Track>)> = pool.install(|| {
        files
            .into_par_iter()
            .map(|file| {
                let track = tags::read_track(&file.path);
                (file, track)
            })
            .collect()
    });

    let mut by_directory: BTreeMap<String, Vec<Track>> = BTreeMap::new();
    let mut unreadable = Vec::new();

    for (file, result) in results {
        match result {
            Ok(track) => by_directory.entry(file.parent_dir).or_default().push(track),
            Err(e) => {
                log::warn!("Could not read tags of {}: {:#}", file.path, e);
                unreadable.push(file.path);
            }
        }
    }

    let albums: Vec<AlbumDirectory> = by_directory
        .into_iter()
        .map(|(directory, tracks)| group_album(directory, tracks))
        .collect();

    log::info!(
        "Found {} album directories with {} readable files",
        albums.len(),
        total_files - unreadable.len()
    );

    Ok(ScanResult { albums, total_files, unreadable })
}

/// Build an album directory from its tracks, sorted by disc, track and
/// filename, with catalog numbers from the directory name and tags.
pub fn group_album(directory: String, mut tracks: Vec<Track>) -> AlbumDirectory {
    sort_tracks(&mut tracks);

    let name = Path::new(&directory)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| directory.clone());

    let mut catalog_numbers: IndexSet<String> =
        catalog_number::extract_catalog_numbers(&name).into_iter().collect();
    for track in &tracks {
        if let Some(value) = &track.catalog_number {
            catalog_numbers.extend(catalog_number::extract_catalog_numbers(value));
        }
    }

    AlbumDirectory {
        directory,
        name,
        catalog_numbers: catalog_numbers.into_iter().collect(),
        tracks,
    }
}

pub fn sort_tracks(tracks: &mut [Track]) {
    tracks.sort_by(|a, b| {
        a.disc_number
            .cmp(&b.disc_number)
            .then(a.track_number.cmp(&b.track_number))
            .then_with(|| natord::compare(&a.filename, &b.filename))
    });
}

/// Read one directory (non-recursively grouped) as a single album
pub async fn read_album(directory: &str, max_workers: usize) -> Result<AlbumDirectory> {
    let result = scan_directories(&[directory.to_string()], max_workers).await?;
    let tracks: Vec<Track> = result.albums.into_iter().flat_map(|a| a.tracks).collect();
    if tracks.is_empty() {
        anyhow::bail!("No readable audio files in {}", directory);
    }
    Ok(group_album(directory.trim_end_matches('/').to_string(), tracks))
}
