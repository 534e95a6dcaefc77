use crate::normalize;
use crate::scanner::{MetadataChange, Track, TrackRecord};
use anyhow::{Context, Result};
use lofty::file::TaggedFileExt;
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::{ItemKey, Tag};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Containers the tag reader and writer understand
pub const AUDIO_EXTENSIONS: &[&str] = &["flac", "mp3", "ogg"];

#[derive(Debug, Serialize, Deserialize)]
pub struct WriteResult {
    pub success: usize,
    pub failed: usize,
    pub errors: Vec<WriteError>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WriteError {
    pub file_id: String,
    pub path: String,
    pub error: String,
}

fn check_supported(path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    if !AUDIO_EXTENSIONS.contains(&ext.as_str()) {
        anyhow::bail!("Unsupported format: {}", ext);
    }
    Ok(())
}

/// Read the tag record of one audio file
pub fn read_track(file_path: &str) -> Result<Track> {
    let path = Path::new(file_path);
    check_supported(path)?;

    let tagged_file = Probe::open(path)
        .with_context(|| format!("Failed to open {}", file_path))?
        .read()
        .with_context(|| format!("Failed to read tags of {}", file_path))?;

    let mut track = Track {
        path: file_path.to_string(),
        filename: path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string(),
        directory: path
            .parent()
            .unwrap_or(Path::new(""))
            .to_string_lossy()
            .to_string(),
        ..Default::default()
    };

    let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) else {
        return Ok(track);
    };

    let text = |key: &ItemKey| {
        tag.get_string(key)
            .map(normalize::clean_text)
            .filter(|v| !v.is_empty())
    };

    track.title = tag.title().map(|s| normalize::clean_text(&s)).unwrap_or_default();
    // Multi-value artist fields are folded into one semicolon-joined value
    let artists: Vec<String> = tag.get_strings(&ItemKey::TrackArtist).map(str::to_string).collect();
    track.artist = normalize::join_artists(&normalize::dedupe_artists(artists));
    track.album = tag.album().map(|s| normalize::clean_text(&s)).unwrap_or_default();
    track.album_artist = text(&ItemKey::AlbumArtist).unwrap_or_default();
    track.track_number = tag.track().unwrap_or(0);
    track.disc_number = tag.disk().unwrap_or(0);
    track.date = text(&ItemKey::RecordingDate);
    track.year = tag
        .year()
        .map(|y| y.to_string())
        .or_else(|| track.date.as_deref().and_then(normalize::validate_year));
    track.grouping = text(&ItemKey::ContentGroup);
    track.catalog_number = text(&ItemKey::CatalogNumber);
    track.barcode = text(&ItemKey::Barcode);

    Ok(track)
}

fn set_text(tag: &mut Tag, key: ItemKey, value: &str) {
    tag.remove_key(&key);
    if !value.is_empty() {
        tag.insert_text(key, value.to_string());
    }
}

/// Apply changed fields to the file at `file_path`.
///
/// A `<file>.<ext>.backup` copy is made first when `backup` is set.
pub fn write_file_tags_sync(
    file_path: &str,
    changes: &BTreeMap<String, MetadataChange>,
    backup: bool,
) -> Result<()> {
    let path = Path::new(file_path);

    if !path.exists() {
        anyhow::bail!("File does not exist: {}", file_path);
    }
    check_supported(path)?;

    if std::fs::metadata(path)?.len() == 0 {
        anyhow::bail!("File is empty (0 bytes)");
    }

    if backup {
        let backup_path = path.with_extension(format!(
            "{}.backup",
            path.extension().unwrap_or_default().to_string_lossy()
        ));
        std::fs::copy(path, &backup_path)
            .with_context(|| format!("Failed to back up {}", file_path))?;
    }

    let mut tagged_file = Probe::open(path)?.read()?;
    if tagged_file.primary_tag().is_none() {
        let tag_type = tagged_file.primary_tag_type();
        tagged_file.insert_tag(Tag::new(tag_type));
    }
    let tag = tagged_file
        .primary_tag_mut()
        .ok_or_else(|| anyhow::anyhow!("No writable tag for {}", file_path))?;

    for (field, change) in changes {
        let value = change.new.trim();
        match field.as_str() {
            "title" => {
                tag.remove_key(&ItemKey::TrackTitle);
                if !value.is_empty() {
                    tag.set_title(value.to_string());
                }
            }
            "artist" => {
                tag.remove_key(&ItemKey::TrackArtist);
                for artist in normalize::split_artists(value) {
                    tag.push(lofty::tag::TagItem::new(
                        ItemKey::TrackArtist,
                        lofty::tag::ItemValue::Text(artist),
                    ));
                }
            }
            "album" => {
                tag.remove_key(&ItemKey::AlbumTitle);
                if !value.is_empty() {
                    tag.set_album(value.to_string());
                }
            }
            "album_artist" => set_text(tag, ItemKey::AlbumArtist, value),
            "track_number" => match normalize::parse_leading_int(value) {
                Some(n) if n > 0 => tag.set_track(n),
                _ => tag.remove_track(),
            },
            "disc_number" => match normalize::parse_leading_int(value) {
                Some(n) if n > 0 => tag.set_disk(n),
                _ => tag.remove_disk(),
            },
            "year" => match value.parse::<u32>() {
                Ok(year) => tag.set_year(year),
                Err(_) => tag.remove_year(),
            },
            "date" => set_text(tag, ItemKey::RecordingDate, value),
            "grouping" => set_text(tag, ItemKey::ContentGroup, value),
            "catalog_number" => set_text(tag, ItemKey::CatalogNumber, value),
            "barcode" => set_text(tag, ItemKey::Barcode, value),
            other => log::debug!("Ignoring unknown field {} for {}", other, file_path),
        }
    }

    tagged_file.save_to_path(path, lofty::config::WriteOptions::default())?;
    Ok(())
}

/// Write every modified record, `max_workers` files at a time.
///
/// `on_progress` is called with the number of files finished so far.
pub async fn write_tracks<F>(
    records: &[TrackRecord],
    backup: bool,
    max_workers: usize,
    on_progress: F,
) -> WriteResult
where
    F: Fn(usize) + Send + Sync + 'static,
{
    let pending: Vec<(String, String, BTreeMap<String, MetadataChange>)> = records
        .iter()
        .filter(|r| r.is_modified())
        .map(|r| (r.id.clone(), r.path().to_string(), r.changes()))
        .collect();

    log::info!("Writing {} files with {} parallel workers", pending.len(), max_workers);

    let start_time = std::time::Instant::now();
    let semaphore = Arc::new(tokio::sync::Semaphore::new(max_workers.max(1)));
    let completed = Arc::new(AtomicUsize::new(0));
    let on_progress = Arc::new(on_progress);
    let mut handles = Vec::new();

    for (file_id, path, changes) in pending {
        let sem = Arc::clone(&semaphore);
        let completed = Arc::clone(&completed);
        let on_progress = Arc::clone(&on_progress);

        handles.push(tokio::spawn(async move {
            let _permit = sem.acquire_owned().await;
            let write_path = path.clone();
            let result = tokio::task::spawn_blocking(move || {
                write_file_tags_sync(&write_path, &changes, backup)
            })
            .await
            .map_err(|e| anyhow::anyhow!("Write task failed: {}", e))
            .and_then(|r| r);

            let current = completed.fetch_add(1, Ordering::SeqCst) + 1;
            on_progress(current);
            (file_id, path, result)
        }));
    }

    let mut success = 0;
    let mut failed = 0;
    let mut errors = Vec::new();

    for handle in handles {
        match handle.await {
            Ok((_, _, Ok(()))) => success += 1,
            Ok((file_id, path, Err(e))) => {
                failed += 1;
                log::warn!("Failed to write {}: {:#}", path, e);
                errors.push(WriteError { file_id, path, error: format!("{:#}", e) });
            }
            Err(e) => {
                failed += 1;
                errors.push(WriteError {
                    file_id: String::new(),
                    path: String::new(),
                    error: e.to_string(),
                });
            }
        }
    }

    log::info!(
        "Wrote {} files ({} failed) in {:?}",
        success,
        failed,
        start_time.elapsed()
    );

    WriteResult { success, failed, errors }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::Track;

    #[test]
    fn test_unsupported_format() {
        let err = read_track("/tmp/cover.jpg").unwrap_err();
        assert!(err.to_string().contains("Unsupported format"));
    }

    #[test]
    fn test_write_missing_file() {
        let mut changes = BTreeMap::new();
        changes.insert(
            "title".to_string(),
            MetadataChange { old: String::new(), new: "X".to_string() },
        );
        let err = write_file_tags_sync("/nonexistent/file.flac", &changes, false).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[tokio::test]
    async fn test_write_tracks_collects_errors() {
        let track = Track {
            path: "/nonexistent/dir/01.mp3".to_string(),
            filename: "01.mp3".to_string(),
            directory: "/nonexistent/dir".to_string(),
            title: "Old".to_string(),
            ..Default::default()
        };
        let mut modified = TrackRecord::new(track.clone());
        let mut edited = track.clone();
        edited.title = "New".to_string();
        modified.apply(edited);
        let untouched = TrackRecord::new(track);

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let result = write_tracks(&[modified, untouched], false, 2, move |n| {
            counter.store(n, Ordering::SeqCst);
        })
        .await;

        assert_eq!(result.success, 0);
        assert_eq!(result.failed, 1);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].path, "/nonexistent/dir/01.mp3");
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
