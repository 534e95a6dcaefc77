// src/ai/prompt.rs
use super::reconcile::ReconcileMode;
use crate::discography::SourceKind;
use crate::scanner::Track;
use crate::sources::SupplementalAlbum;
use anyhow::Result;
use serde::Serialize;
use serde_json::{json, Value};

pub const SCHEMA_NAME: &str = "album_metadata";

const ROLE: &str = "You clean up music file metadata for a soundtrack and game music collection. \
You receive the tags currently stored in the files and, when available, supplemental data from an \
online catalog. Return corrected metadata as JSON that matches the response schema exactly.";

const TITLE_RULES: &str = "\
TITLES
- Use the official track and album titles. Prefer the supplemental data over the file tags when they disagree.
- Instrumental and karaoke versions end with exactly one canonical marker: \"(Instrumental)\". \
Rewrite variants such as \"(Inst.)\", \"-instrumental-\", \"(Off Vocal)\", \"(off vocal ver.)\" or \"(Karaoke)\" to it.
- Keep version, remix and rearrange suffixes verbatim, e.g. \"(TV Size)\", \"(Remix)\", \"-Arrange Ver.-\".
- Do not add or remove disc or track numbers from titles.";

const ARTIST_RULES: &str = "\
TRACK ARTISTS
- Rebuild each track's artists as an ordered list: performers and vocalists first, then the composer, \
then the arranger, then the remixer.
- Leave out lyricists and every other role unless that person also holds one of the included roles.
- Never list the same person twice. A person holding several included roles appears once, at the \
position of their first role.";

const ALBUM_ARTIST_RULES: &str = "\
ALBUM ARTIST
Pick a single album artist:
- a band or idol group release: the group name;
- a game, anime or film soundtrack: the primary composer;
- a solo artist's album: that artist;
- a rearrangement album: the primary arranger;
- a compilation with many performers: the circle or label that released it.";

const ROMANIZATION_RULES: &str = "\
ROMANIZATION
- If the supplemental data supplies a romanized (Romaji) title or name, use it.
- Otherwise romanize Japanese automatically using modified Hepburn. Spell long vowels from the kana: \
おお becomes \"oo\" and おう becomes \"ou\"; do not use macrons.
- Keep English loanwords and English words in their English spelling (\"ファイナルファンタジー\" is \"Final Fantasy\").
- Never replace a non-English title with an English translation.
- Write personal names Surname-Forename (\"Uematsu Nobuo\", not \"Nobuo Uematsu\").";

const WESTERN_ORDER_RULE: &str = "- The supplemental data below lists Japanese personal names in Western \
Forename-Surname order. Swap them to Surname-Forename. Do not swap names of non-Japanese people.";

const ALBUM_ONLY_RULE: &str = "Only correct the album name and album artist. Do not return tracks.";

const TRACK_OUTPUT_RULE: &str = "Return every input track exactly once. Copy each track's \"directory\" \
and \"filename\" unchanged so it can be matched to its file.";

/// The file tag data shown to the model for one track
#[derive(Debug, Serialize)]
struct PromptTrack<'a> {
    directory: String,
    filename: &'a str,
    disc_number: u32,
    track_number: u32,
    title: &'a str,
    artist: &'a str,
    album: &'a str,
    album_artist: &'a str,
}

impl<'a> From<&'a Track> for PromptTrack<'a> {
    fn from(track: &'a Track) -> Self {
        Self {
            directory: track.base_directory(),
            filename: &track.filename,
            disc_number: track.disc_number,
            track_number: track.track_number,
            title: &track.title,
            artist: &track.artist,
            album: &track.album,
            album_artist: &track.album_artist,
        }
    }
}

/// Instructions for the model. Deterministic for a given source and mode.
pub fn system_prompt(source: Option<SourceKind>, mode: ReconcileMode) -> String {
    let mut sections = vec![ROLE.to_string(), TITLE_RULES.to_string()];
    if mode == ReconcileMode::Full {
        sections.push(ARTIST_RULES.to_string());
    }
    sections.push(ALBUM_ARTIST_RULES.to_string());

    let mut romanization = ROMANIZATION_RULES.to_string();
    if source.is_some_and(|s| s.western_name_order()) {
        romanization.push('\n');
        romanization.push_str(WESTERN_ORDER_RULE);
    }
    sections.push(romanization);

    sections.push(match mode {
        ReconcileMode::Full => TRACK_OUTPUT_RULE.to_string(),
        ReconcileMode::AlbumOnly => ALBUM_ONLY_RULE.to_string(),
    });
    sections.join("\n\n")
}

/// The data half of the prompt: current tags, supplemental data and any
/// user instructions
pub fn user_prompt(
    album: &str,
    album_artist: &str,
    tracks: &[Track],
    supplemental: Option<&SupplementalAlbum>,
    instructions: Option<&str>,
) -> Result<String> {
    let mut out = String::new();

    out.push_str("CURRENT ALBUM\n");
    out.push_str(&serde_json::to_string_pretty(&json!({
        "album": album,
        "album_artist": album_artist,
    }))?);

    if !tracks.is_empty() {
        let prompt_tracks: Vec<PromptTrack> = tracks.iter().map(PromptTrack::from).collect();
        out.push_str("\n\nCURRENT TRACKS\n");
        out.push_str(&serde_json::to_string_pretty(&prompt_tracks)?);
    }

    match supplemental {
        Some(data) => {
            out.push_str(&format!("\n\nSUPPLEMENTAL DATA (source: {})\n", data.source));
            out.push_str(&serde_json::to_string_pretty(data)?);
        }
        None => out.push_str("\n\nNo supplemental data is available; work from the file tags."),
    }

    if let Some(text) = instructions.map(str::trim).filter(|t| !t.is_empty()) {
        out.push_str("\n\nUSER INSTRUCTIONS (these take priority over the rules above)\n");
        out.push_str(text);
    }

    Ok(out)
}

/// The strict JSON schema for the response
pub fn output_schema(mode: ReconcileMode) -> Value {
    match mode {
        ReconcileMode::AlbumOnly => json!({
            "type": "object",
            "properties": {
                "album": { "type": "string" },
                "album_artist": { "type": "string" }
            },
            "required": ["album", "album_artist"],
            "additionalProperties": false
        }),
        ReconcileMode::Full => json!({
            "type": "object",
            "properties": {
                "album": { "type": "string" },
                "album_artist": { "type": "string" },
                "tracks": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "directory": { "type": "string" },
                            "filename": { "type": "string" },
                            "title": { "type": "string" },
                            "artists": { "type": "array", "items": { "type": "string" } },
                            "track_number": { "type": "integer" },
                            "disc_number": { "type": "integer" }
                        },
                        "required": ["directory", "filename", "title", "artists", "track_number", "disc_number"],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["album", "album_artist", "tracks"],
            "additionalProperties": false
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::NameSet;

    fn supplemental(source: SourceKind) -> SupplementalAlbum {
        SupplementalAlbum {
            source,
            album_id: "79".to_string(),
            title: "Chrono Cross".to_string(),
            names: NameSet::single("en", "Chrono Cross"),
            catalog_number: Some("SSCX-10040".to_string()),
            release_date: None,
            album_artists: Vec::new(),
            credits: Vec::new(),
            discs: Vec::new(),
        }
    }

    #[test]
    fn test_system_prompt_is_deterministic() {
        let a = system_prompt(Some(SourceKind::Vgmdb), ReconcileMode::Full);
        let b = system_prompt(Some(SourceKind::Vgmdb), ReconcileMode::Full);
        assert_eq!(a, b);
        assert!(a.contains("(Instrumental)"));
        assert!(a.contains("おお becomes \"oo\""));
        assert!(a.contains("Forename-Surname order"));
    }

    #[test]
    fn test_name_order_correction_depends_on_source() {
        assert!(!system_prompt(Some(SourceKind::Musicbrainz), ReconcileMode::Full).contains("Western"));
        assert!(!system_prompt(None, ReconcileMode::Full).contains("Western"));
    }

    #[test]
    fn test_album_only_prompt_skips_track_rules() {
        let prompt = system_prompt(None, ReconcileMode::AlbumOnly);
        assert!(prompt.contains("Do not return tracks"));
        assert!(!prompt.contains("TRACK ARTISTS"));
        assert!(output_schema(ReconcileMode::AlbumOnly)["properties"].get("tracks").is_none());
    }

    #[test]
    fn test_user_prompt_sections() {
        let track = Track {
            path: "/music/[SSCX-10040] Chrono Cross/01.flac".into(),
            filename: "01.flac".into(),
            directory: "/music/[SSCX-10040] Chrono Cross".into(),
            title: "Scars of Time".into(),
            ..Default::default()
        };
        let data = supplemental(SourceKind::Vgmdb);
        let prompt = user_prompt("Chrono Cross", "", &[track], Some(&data), Some("  Keep kanji titles ")).unwrap();

        assert!(prompt.contains("\"directory\": \"[SSCX-10040] Chrono Cross\""));
        assert!(prompt.contains("SUPPLEMENTAL DATA (source: VGMdb)"));
        assert!(prompt.ends_with("Keep kanji titles"));

        let bare = user_prompt("A", "B", &[], None, Some("   ")).unwrap();
        assert!(bare.contains("No supplemental data"));
        assert!(!bare.contains("USER INSTRUCTIONS"));
    }
}
