//! Text normalization utilities for track metadata
//!
//! This module provides the deterministic cleanup applied to tag values,
//! both when reading files and after an AI response comes back.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;

/// Separator used when several artists share one tag value
pub const ARTIST_SEPARATOR: &str = "; ";

static YEAR_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(19|20)\d{2}").unwrap());

/// Trim a field and strip embedded line breaks
///
/// # Examples
/// ```
/// use vgm_tagger::normalize::clean_text;
/// assert_eq!(clean_text("  Opening\r\nTheme "), "Opening Theme");
/// ```
pub fn clean_text(value: &str) -> String {
    value
        .replace('\r', "\n")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split a semicolon-joined artist string into cleaned names
pub fn split_artists(value: &str) -> Vec<String> {
    value
        .split(';')
        .map(clean_text)
        .filter(|name| !name.is_empty())
        .collect()
}

pub fn join_artists(artists: &[String]) -> String {
    artists.join(ARTIST_SEPARATOR)
}

/// Remove duplicate artist names, keeping the first spelling seen.
///
/// Names are compared case-insensitively; entries that themselves contain
/// semicolons are split first.
pub fn dedupe_artists<I, S>(artists: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut result = Vec::new();

    for entry in artists {
        for name in split_artists(entry.as_ref()) {
            if seen.insert(name.to_lowercase()) {
                result.push(name);
            }
        }
    }

    result
}

/// Read the leading integer of a string the way `"3/12"` means track 3
pub fn parse_leading_int(value: &str) -> Option<u32> {
    let digits: String = value
        .trim()
        .trim_start_matches('+')
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Coerce a track/disc number that may arrive as a number or a string.
///
/// Anything unparseable becomes 0.
pub fn coerce_number(value: &Value) -> u32 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .map(|n| n.min(u32::MAX as u64) as u32)
            .unwrap_or(0),
        Value::String(s) => parse_leading_int(s).unwrap_or(0),
        _ => 0,
    }
}

/// Validate and potentially fix a year value
///
/// Returns None if the year is invalid
pub fn validate_year(year: &str) -> Option<String> {
    if let Ok(year_num) = year.trim().parse::<u32>() {
        if (1900..=2100).contains(&year_num) {
            return Some(year_num.to_string());
        }
    }

    // Dates like "2008-03-26" or "2008.03.26"
    YEAR_REGEX.find(year).map(|m| m.as_str().to_string())
}
