//! VGMdb credit role normalization
//!
//! VGMdb role strings are free text like `"Composer (as Nobuo), Director*"`.
//! Annotations are stripped for display and non-musical credits can be
//! filtered out so a discography only lists releases the artist made music for.

use once_cell::sync::Lazy;
use regex::Regex;

/// Credits that say nothing about who made the music
const IGNORED_ROLES: &[&str] = &[
    "director",
    "sound director",
    "music director",
    "planner",
    "planning",
    "writer",
    "scenario writer",
    "lyricist",
    "lyrics",
    "designer",
    "design",
    "art director",
    "illustrator",
    "illustration",
    "cover illustration",
    "cover art",
    "recording engineer",
    "mixing engineer",
    "mastering engineer",
    "vocal recording engineer",
    "recording & mixing engineer",
    "engineer",
];

const ROLE_SEPARATOR: &str = ", ";

static ALIAS_ANNOTATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s*\(as [^)]*\)").unwrap());

/// Strip `(as ...)` annotations and trailing `*` markers from one role
pub fn clean_role(role: &str) -> String {
    let without_alias = ALIAS_ANNOTATION.replace_all(role, "");
    without_alias.trim().trim_end_matches('*').trim().to_string()
}

/// True when a cleaned role is on the denylist
pub fn is_ignored_role(role: &str) -> bool {
    let lower = clean_role(role).to_lowercase();
    IGNORED_ROLES.contains(&lower.as_str())
}

/// Normalize a comma-separated role string for display.
///
/// Denylisted roles are dropped unless `include_ignored` is set.
///
/// # Examples
/// ```
/// use vgm_tagger::roles::clean_vgmdb_roles;
/// assert_eq!(
///     clean_vgmdb_roles("Director, Composer (as X)*, Mixing Engineer", false),
///     "Composer"
/// );
/// ```
pub fn clean_vgmdb_roles(roles: &str, include_ignored: bool) -> String {
    roles
        .split(ROLE_SEPARATOR)
        .map(clean_role)
        .filter(|role| !role.is_empty())
        .filter(|role| include_ignored || !is_ignored_role(role))
        .collect::<Vec<_>>()
        .join(ROLE_SEPARATOR)
}

/// True iff every role in the string is denylisted.
///
/// An empty role string is not "all ignored".
pub fn are_all_roles_ignored(roles: &str) -> bool {
    let cleaned: Vec<String> = roles
        .split(ROLE_SEPARATOR)
        .map(clean_role)
        .filter(|role| !role.is_empty())
        .collect();

    !cleaned.is_empty() && cleaned.iter().all(|role| is_ignored_role(role))
}
