// src/scanner/collector.rs
use super::types::*;
use crate::tags::AUDIO_EXTENSIONS;
use anyhow::Result;
use std::path::Path;
use walkdir::WalkDir;

/// Find every supported audio file below `paths`
pub fn collect_audio_files(paths: &[String]) -> Result<Vec<RawFileData>> {
    let mut all_files = Vec::new();

    for path in paths {
        if !Path::new(path).exists() {
            anyhow::bail!("Path does not exist: {}", path);
        }
        all_files.extend(collect_audio_files_from_path(path));
    }

    log::info!("Collected {} audio files", all_files.len());
    Ok(all_files)
}

fn collect_audio_files_from_path(path: &str) -> Vec<RawFileData> {
    let mut files = Vec::new();

    for entry in WalkDir::new(path)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| {
            let Some(name) = e.path().file_name().and_then(|n| n.to_str()) else {
                return true;
            };
            // AppleDouble files and tag-writer backups
            if name.starts_with("._") {
                return false;
            }
            if e.file_type().is_dir() && (name == "backups" || name == ".backups") {
                log::debug!("Skipping backup directory: {}", e.path().display());
                return false;
            }
            true
        })
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Some(ext) = path.extension() else {
            continue;
        };
        let ext_lower = ext.to_string_lossy().to_lowercase();
        if !AUDIO_EXTENSIONS.contains(&ext_lower.as_str()) {
            continue;
        }

        files.push(RawFileData {
            path: path.to_string_lossy().to_string(),
            filename: path
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string(),
            parent_dir: path
                .parent()
                .unwrap_or(Path::new(""))
                .to_string_lossy()
                .to_string(),
        });
    }

    files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_only_audio_files() {
        let dir = tempfile::tempdir().unwrap();
        let album = dir.path().join("[KSLC-0036] Album");
        std::fs::create_dir_all(album.join("backups")).unwrap();
        std::fs::write(album.join("01.flac"), b"").unwrap();
        std::fs::write(album.join("02.MP3"), b"").unwrap();
        std::fs::write(album.join("cover.jpg"), b"").unwrap();
        std::fs::write(album.join("._01.flac"), b"").unwrap();
        std::fs::write(album.join("backups").join("01.flac"), b"").unwrap();

        let root = dir.path().to_string_lossy().to_string();
        let mut files = collect_audio_files(&[root]).unwrap();
        files.sort_by(|a, b| a.filename.cmp(&b.filename));

        let names: Vec<_> = files.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, vec!["01.flac", "02.MP3"]);
        assert!(files[0].parent_dir.ends_with("[KSLC-0036] Album"));
    }

    #[test]
    fn test_missing_path() {
        assert!(collect_audio_files(&["/definitely/not/here".to_string()]).is_err());
    }
}
