//! Multi-locale name handling for catalog data

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fallback when a name bag carries nothing usable
pub const UNKNOWN_NAME: &str = "Unknown";

/// Locale keys in the order a display name is picked from them.
///
/// VGMdb labels track names `Romaji`/`English`/`Japanese` and album or
/// artist names `ja-latn`/`en`/`ja`.
const PREFERRED_KEYS: &[&str] = &["Romaji", "ja-latn", "English", "en", "Japanese", "ja"];

/// A mapping from locale key (`en`, `ja`, `ja-latn`, ...) to a display string
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NameSet(IndexMap<String, String>);

impl NameSet {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Build a name set holding a single locale
    pub fn single(locale: &str, name: impl Into<String>) -> Self {
        let mut names = Self::new();
        names.insert(locale, name);
        names
    }

    pub fn insert(&mut self, locale: &str, name: impl Into<String>) {
        self.0.insert(locale.to_string(), name.into());
    }

    pub fn get(&self, locale: &str) -> Option<&str> {
        self.0.get(locale).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|v| v.trim().is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The display name, see [`get_preferred_vgmdb_name`]
    pub fn preferred(&self) -> String {
        get_preferred_vgmdb_name(self)
    }

    /// Canonical JSON for identity comparisons (keys sorted, blanks dropped)
    pub fn dedup_key(&self) -> Option<String> {
        let sorted: BTreeMap<&str, &str> = self
            .iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .collect();
        if sorted.is_empty() {
            return None;
        }
        serde_json::to_string(&sorted).ok()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for NameSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Pick a single display name out of a multi-locale name bag.
///
/// Romaji beats English beats Japanese; anything else falls back to the
/// first non-empty value, and an empty bag yields `"Unknown"`.
pub fn get_preferred_vgmdb_name(names: &NameSet) -> String {
    PREFERRED_KEYS
        .iter()
        .filter_map(|key| names.get(key))
        .chain(names.0.values().map(String::as_str))
        .map(str::trim)
        .find(|name| !name.is_empty())
        .unwrap_or(UNKNOWN_NAME)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_bag_is_unknown() {
        assert_eq!(get_preferred_vgmdb_name(&NameSet::new()), "Unknown");

        let blanks: NameSet = [("en", ""), ("ja", "  ")].into_iter().collect();
        assert_eq!(get_preferred_vgmdb_name(&blanks), "Unknown");
    }

    #[test]
    fn test_preference_order() {
        let names: NameSet = [
            ("ja", "光田康典"),
            ("en", "Yasunori Mitsuda"),
            ("ja-latn", "Mitsuda Yasunori"),
        ]
        .into_iter()
        .collect();
        assert_eq!(names.preferred(), "Mitsuda Yasunori");

        let track: NameSet = [("Japanese", "風の憧憬"), ("English", "Yearnings of the Wind")]
            .into_iter()
            .collect();
        assert_eq!(track.preferred(), "Yearnings of the Wind");

        let japanese_only = NameSet::single("ja", "植松伸夫");
        assert_eq!(japanese_only.preferred(), "植松伸夫");
    }

    #[test]
    fn test_first_available_fallback() {
        let names: NameSet = [("fr", ""), ("de", "Der Name"), ("es", "El Nombre")]
            .into_iter()
            .collect();
        assert_eq!(names.preferred(), "Der Name");
    }

    #[test]
    fn test_dedup_key_ignores_order() {
        let a: NameSet = [("en", "Chrono Cross"), ("ja", "クロノ・クロス")].into_iter().collect();
        let b: NameSet = [("ja", "クロノ・クロス"), ("en", "Chrono Cross")].into_iter().collect();
        assert_eq!(a.dedup_key(), b.dedup_key());
        assert_eq!(NameSet::single("en", " ").dedup_key(), None);
    }
}
