//! Catalog number extraction for directory and album names
//!
//! Soundtrack releases are usually identified by a label catalog number such
//! as `KSLC-0036`. Multi-disc sets are often written in shorthand, e.g.
//! `KSLC-0036~9` for the four discs `KSLC-0036` through `KSLC-0039`.

use indexmap::IndexSet;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// `PREFIX-NNNNN[R]` followed by an optional `~N` range or `-X` variant suffix.
///
/// Token boundaries are checked by hand in [`extract_catalog_numbers`]: only
/// ASCII letters and digits may not touch a token, so names written flush
/// against kana or kanji still match.
static CATALOG_NUMBER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Z]{2,5})-([0-9]{3,5})(R?)(?:[~〜～]([0-9]{1,3})|[-~]([A-Za-z0-9]{1,3}))?").unwrap()
});

/// A bare `PREFIX-NNNNN[R]` number, as catalogs index them
static PLAIN_CATALOG_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{2,5}-[0-9]{3,5}R?$").unwrap());

static BARCODE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([0-9]{6,})R?$").unwrap());

/// What a free-form identifier field turned out to contain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Identifier {
    Barcode(String),
    CatalogNumbers(Vec<String>),
}

/// Extract every catalog number mentioned in `text`.
///
/// For each match the literal token comes first, then the base catalog
/// number (when it differs from the literal), then the range expansion.
/// Duplicates across matches are dropped, first occurrence wins.
///
/// # Examples
/// ```
/// use vgm_tagger::catalog_number::extract_catalog_numbers;
/// assert_eq!(
///     extract_catalog_numbers("[KSLC-0036~8] Soundtrack"),
///     vec!["KSLC-0036~8", "KSLC-0036", "KSLC-0037", "KSLC-0038"]
/// );
/// ```
pub fn extract_catalog_numbers(text: &str) -> Vec<String> {
    let mut found: IndexSet<String> = IndexSet::new();

    for caps in CATALOG_NUMBER_REGEX.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let before = text[..whole.start()].chars().next_back();
        let after = text[whole.end()..].chars().next();
        let has_suffix = caps.get(4).is_some() || caps.get(5).is_some();
        // A suffix running into more letters or digits is dropped, the base still counts
        let suffix_ok = is_token_edge(after);
        if !is_token_edge(before) || (!suffix_ok && !has_suffix) {
            continue;
        }

        let prefix = &caps[1];
        let digits = &caps[2];
        let reissue = &caps[3];

        let base = format!("{}-{}{}", prefix, digits, reissue);
        if suffix_ok {
            found.insert(whole.as_str().to_string());
        }
        found.insert(base);

        if let Some(range) = caps.get(4).filter(|_| suffix_ok) {
            for number in expand_range(digits, range.as_str()) {
                found.insert(format!("{}-{}{}", prefix, number, reissue));
            }
        }
    }

    found.into_iter().collect()
}

fn is_token_edge(neighbour: Option<char>) -> bool {
    !neighbour.is_some_and(|c| c.is_ascii_alphanumeric())
}

/// Keep only the bare catalog numbers, dropping range and variant literals
/// such as `KSLC-0036~9` or `LACA-9100-A` that no catalog indexes.
pub fn searchable_catalog_numbers(numbers: &[String]) -> Vec<String> {
    numbers
        .iter()
        .filter(|n| PLAIN_CATALOG_NUMBER.is_match(n))
        .cloned()
        .collect()
}

/// Expand the digits of a range suffix against a base number.
///
/// The suffix replaces the rightmost digits of the base. Returns the numbers
/// after the base up to and including the computed end, zero-padded to the
/// base width. When the end would not exceed the base the suffix is read as
/// rolling over into the next block (`0098~03` ends at `0103`).
pub fn expand_range(base_digits: &str, suffix_digits: &str) -> Vec<String> {
    let width = base_digits.len();
    let (Ok(base), Ok(suffix)) = (base_digits.parse::<u64>(), suffix_digits.parse::<u64>()) else {
        return Vec::new();
    };

    let modulus = 10u64.pow(suffix_digits.len().min(width) as u32);
    let mut end = base - base % modulus + suffix % modulus;
    if end <= base {
        end += modulus;
    }

    // The expansion must keep the width of the base number
    if end >= 10u64.pow(width as u32) {
        return Vec::new();
    }

    (base + 1..=end)
        .map(|n| format!("{:0width$}", n, width = width))
        .collect()
}

/// True when the whole value looks like a barcode (6+ digits, optional `R`)
pub fn is_barcode(value: &str) -> bool {
    BARCODE_REGEX.is_match(value.trim())
}

/// Classify an identifier field as either a barcode or a set of catalog numbers.
///
/// Returns `None` when the value contains neither.
pub fn classify_identifier(value: &str) -> Option<Identifier> {
    let trimmed = value.trim();
    if let Some(caps) = BARCODE_REGEX.captures(trimmed) {
        return Some(Identifier::Barcode(caps[1].to_string()));
    }

    let numbers = extract_catalog_numbers(trimmed);
    if numbers.is_empty() {
        None
    } else {
        Some(Identifier::CatalogNumbers(numbers))
    }
}
