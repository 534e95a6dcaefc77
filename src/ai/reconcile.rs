//! AI metadata reconciliation: prompt, call, and deterministic cleanup.
//!
//! Provider failures never reach the caller. The original album data comes
//! back instead, with `failed` set.

use super::prompt;
use super::provider::{CompletionRequest, LlmProvider, TokenUsage};
use crate::normalize::{clean_text, coerce_number, dedupe_artists, join_artists, split_artists};
use crate::scanner::Track;
use crate::sources::SupplementalAlbum;
use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileMode {
    /// Album fields and every track
    Full,
    /// Album name and album artist only
    AlbumOnly,
}

#[derive(Debug, Clone)]
pub struct ReconcileInput {
    pub album: String,
    pub album_artist: String,
    pub tracks: Vec<Track>,
    pub supplemental: Option<SupplementalAlbum>,
    pub instructions: Option<String>,
    pub mode: ReconcileMode,
}

impl ReconcileInput {
    /// Take album and album artist from the first track that has them
    pub fn from_tracks(tracks: Vec<Track>, mode: ReconcileMode) -> Self {
        Self {
            album: first_non_empty(tracks.iter().map(|t| t.album.as_str())),
            album_artist: first_non_empty(tracks.iter().map(|t| t.album_artist.as_str())),
            tracks,
            supplemental: None,
            instructions: None,
            mode,
        }
    }
}

fn first_non_empty<'a>(mut values: impl Iterator<Item = &'a str>) -> String {
    values
        .find(|v| !v.trim().is_empty())
        .unwrap_or_default()
        .to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOutcome {
    pub album: String,
    pub album_artist: String,
    pub tracks: Vec<Track>,
    pub usage: Option<TokenUsage>,
    pub failed: bool,
}

impl ReconcileOutcome {
    fn original(input: &ReconcileInput) -> Self {
        Self {
            album: input.album.clone(),
            album_artist: input.album_artist.clone(),
            tracks: match input.mode {
                ReconcileMode::Full => input.tracks.clone(),
                ReconcileMode::AlbumOnly => Vec::new(),
            },
            usage: None,
            failed: true,
        }
    }
}

/// Ask the model for corrected metadata, falling back to the input on error
pub async fn reconcile(provider: &dyn LlmProvider, input: &ReconcileInput) -> ReconcileOutcome {
    match try_reconcile(provider, input).await {
        Ok(outcome) => outcome,
        Err(e) => {
            log::error!("AI reconciliation failed, keeping original metadata: {:#}", e);
            ReconcileOutcome::original(input)
        }
    }
}

async fn try_reconcile(provider: &dyn LlmProvider, input: &ReconcileInput) -> Result<ReconcileOutcome> {
    let request = build_request(input)?;

    log::info!(
        "Reconciling '{}' ({} tracks) with {} / {}",
        input.album,
        input.tracks.len(),
        provider.name(),
        provider.model()
    );

    let response = provider.complete(&request).await?;
    let (album, album_artist, tracks) = clean_response(&response.content, &input.tracks, input.mode)?;

    Ok(ReconcileOutcome {
        album,
        album_artist,
        tracks,
        usage: Some(response.usage),
        failed: false,
    })
}

pub fn build_request(input: &ReconcileInput) -> Result<CompletionRequest> {
    let prompt_tracks: &[Track] = match input.mode {
        ReconcileMode::Full => &input.tracks,
        ReconcileMode::AlbumOnly => &[],
    };

    Ok(CompletionRequest {
        system: prompt::system_prompt(input.supplemental.as_ref().map(|s| s.source), input.mode),
        user: prompt::user_prompt(
            &input.album,
            &input.album_artist,
            prompt_tracks,
            input.supplemental.as_ref(),
            input.instructions.as_deref(),
        )?,
        schema_name: prompt::SCHEMA_NAME.to_string(),
        schema: prompt::output_schema(input.mode),
    })
}

fn text_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => Some(clean_text(s)),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn artists_field(value: &Value) -> Option<Vec<String>> {
    match value.get("artists")? {
        Value::Array(items) => Some(dedupe_artists(items.iter().filter_map(Value::as_str))),
        Value::String(s) => Some(dedupe_artists(split_artists(s))),
        _ => None,
    }
}

/// Normalize a model response into album fields and tracks.
///
/// Text is trimmed and stripped of line breaks, numbers are coerced, and each
/// returned track is matched to an input track by base directory and
/// filename, falling back to its position. Applying this to its own output
/// echoed back gives the same tracks.
pub fn clean_response(
    response: &Value,
    input_tracks: &[Track],
    mode: ReconcileMode,
) -> Result<(String, String, Vec<Track>)> {
    if !response.is_object() {
        anyhow::bail!("Expected a JSON object from the model");
    }

    let album = text_field(response, "album").context("Response is missing the album name")?;
    let album_artist = text_field(response, "album_artist").unwrap_or_default();

    if mode == ReconcileMode::AlbumOnly {
        return Ok((album, album_artist, Vec::new()));
    }

    let items = response
        .get("tracks")
        .and_then(Value::as_array)
        .context("Response is missing the track list")?;

    let by_location: HashMap<(String, &str), usize> = input_tracks
        .iter()
        .enumerate()
        .map(|(i, t)| ((t.base_directory(), t.filename.as_str()), i))
        .collect();

    let mut tracks = Vec::with_capacity(items.len());
    for (position, item) in items.iter().enumerate() {
        let directory = text_field(item, "directory").unwrap_or_default();
        let filename = text_field(item, "filename").unwrap_or_default();

        let Some(&index) = by_location
            .get(&(directory, filename.as_str()))
            .or_else(|| (position < input_tracks.len()).then_some(&position))
        else {
            log::warn!("Dropping unmatched track from response: {}", filename);
            continue;
        };

        let mut track = input_tracks[index].clone();
        if let Some(title) = text_field(item, "title") {
            track.title = title;
        }
        if let Some(artists) = artists_field(item) {
            track.artist = join_artists(&artists);
        }
        if let Some(number) = item.get("track_number") {
            track.track_number = coerce_number(number);
        }
        if let Some(number) = item.get("disc_number") {
            track.disc_number = coerce_number(number);
        }
        track.album = album.clone();
        track.album_artist = album_artist.clone();
        tracks.push(track);
    }

    Ok((album, album_artist, tracks))
}

/// The response shape for `tracks`, as the model would return it
pub fn echo_response(album: &str, album_artist: &str, tracks: &[Track]) -> Value {
    serde_json::json!({
        "album": album,
        "album_artist": album_artist,
        "tracks": tracks.iter().map(|t| serde_json::json!({
            "directory": t.base_directory(),
            "filename": t.filename,
            "title": t.title,
            "artists": split_artists(&t.artist),
            "track_number": t.track_number,
            "disc_number": t.disc_number,
        })).collect::<Vec<_>>(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::CompletionResponse;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct ScriptedProvider {
        response: Option<Value>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedProvider {
        fn new(response: Option<Value>) -> Self {
            Self {
                response,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "test"
        }

        async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
            self.requests.lock().unwrap().push(request.clone());
            match &self.response {
                Some(content) => Ok(CompletionResponse {
                    content: content.clone(),
                    usage: TokenUsage {
                        prompt_tokens: 10,
                        completion_tokens: 5,
                        total_tokens: 15,
                    },
                }),
                None => anyhow::bail!("quota exceeded"),
            }
        }
    }

    fn track(filename: &str, title: &str, number: u32) -> Track {
        Track {
            path: format!("/music/Chrono Cross/{}", filename),
            filename: filename.to_string(),
            directory: "/music/Chrono Cross".to_string(),
            disc_number: 1,
            track_number: number,
            title: title.to_string(),
            artist: "Yasunori Mitsuda".to_string(),
            album: "chrono cross ost".to_string(),
            ..Default::default()
        }
    }

    fn input(mode: ReconcileMode) -> ReconcileInput {
        ReconcileInput::from_tracks(
            vec![track("01.flac", "scars of time", 1), track("02.flac", "yume no kishibe", 2)],
            mode,
        )
    }

    #[test]
    fn test_clean_response_matches_by_location_then_position() {
        let tracks = input(ReconcileMode::Full).tracks;
        let response = json!({
            "album": " Chrono Cross\nOriginal Soundtrack ",
            "album_artist": "Mitsuda Yasunori",
            "tracks": [
                {
                    "directory": "Chrono Cross", "filename": "02.flac",
                    "title": "Yume no Kishibe (Instrumental)\n",
                    "artists": ["Mitsuda Yasunori", "mitsuda yasunori", " Noriko Mitose "],
                    "track_number": "2/18", "disc_number": "x"
                },
                {
                    "directory": "Elsewhere", "filename": "unknown.flac",
                    "title": "Scars of Time", "artists": "Mitsuda Yasunori",
                    "track_number": 1, "disc_number": 1
                }
            ]
        });

        let (album, album_artist, cleaned) = clean_response(&response, &tracks, ReconcileMode::Full).unwrap();
        assert_eq!(album, "Chrono Cross Original Soundtrack");
        assert_eq!(album_artist, "Mitsuda Yasunori");

        assert_eq!(cleaned[0].filename, "02.flac");
        assert_eq!(cleaned[0].title, "Yume no Kishibe (Instrumental)");
        assert_eq!(cleaned[0].artist, "Mitsuda Yasunori; Noriko Mitose");
        assert_eq!(cleaned[0].track_number, 2);
        assert_eq!(cleaned[0].disc_number, 0);

        // Unknown location falls back to the second input track
        assert_eq!(cleaned[1].filename, "02.flac");
        assert_eq!(cleaned[1].title, "Scars of Time");
        assert_eq!(cleaned[1].album, "Chrono Cross Original Soundtrack");
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let tracks = input(ReconcileMode::Full).tracks;
        let response = json!({
            "album": "Chrono Cross ",
            "album_artist": "Mitsuda Yasunori",
            "tracks": [
                {"directory": "Chrono Cross", "filename": "01.flac", "title": " Scars of Time",
                 "artists": ["Mitsuda Yasunori", "Mitsuda Yasunori"], "track_number": "1", "disc_number": 1},
                {"directory": "Chrono Cross", "filename": "02.flac", "title": "Yume no Kishibe",
                 "artists": ["Noriko Mitose"], "track_number": 2, "disc_number": "1"}
            ]
        });

        let (album, album_artist, first) = clean_response(&response, &tracks, ReconcileMode::Full).unwrap();
        let echoed = echo_response(&album, &album_artist, &first);
        let (_, _, second) = clean_response(&echoed, &tracks, ReconcileMode::Full).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_clean_response_rejects_malformed_output() {
        let tracks = input(ReconcileMode::Full).tracks;
        assert!(clean_response(&json!([]), &tracks, ReconcileMode::Full).is_err());
        assert!(clean_response(&json!({"album": "A"}), &tracks, ReconcileMode::Full).is_err());
        let (_, _, none) = clean_response(&json!({"album": "A"}), &tracks, ReconcileMode::AlbumOnly).unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_fails_open() {
        let provider = ScriptedProvider::new(None);

        let full = input(ReconcileMode::Full);
        let outcome = reconcile(&provider, &full).await;
        assert!(outcome.failed);
        assert_eq!(outcome.album, "chrono cross ost");
        assert_eq!(outcome.tracks, full.tracks);
        assert_eq!(outcome.usage, None);

        let album_only = reconcile(&provider, &input(ReconcileMode::AlbumOnly)).await;
        assert!(album_only.failed);
        assert!(album_only.tracks.is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_success_reports_usage() {
        let provider = ScriptedProvider::new(Some(json!({
            "album": "Chrono Cross OST",
            "album_artist": "Mitsuda Yasunori"
        })));

        let outcome = reconcile(&provider, &input(ReconcileMode::AlbumOnly)).await;
        assert!(!outcome.failed);
        assert_eq!(outcome.album, "Chrono Cross OST");
        assert_eq!(outcome.usage.map(|u| u.total_tokens), Some(15));

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(!requests[0].user.contains("CURRENT TRACKS"));
    }
}
