use regex::Regex;
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};
use uuid::Uuid;

use super::error::{Result, SyncError};

/// Default maximum slug length accepted by the catalog store.
pub const DEFAULT_SLUG_MAX_LEN: usize = 28;

/// Length of the hash slug used for names without any Latin letter or digit.
const HASHED_SLUG_LEN: usize = 16;

lazy_static::lazy_static! {
    static ref NON_SLUG_RUN: Regex = Regex::new("[^a-z0-9]+").unwrap();
}

/// Derives a URL slug from a display name.
///
/// Accents are folded to their base letters (`años` becomes `anos`), then the
/// name is lowercased, every run of non `[a-z0-9]` characters collapses into
/// one hyphen, hyphens are trimmed at both ends and the result is truncated
/// to `max_len`. Names with nothing left after folding, such as Cyrillic
/// titles, get a slug hashed from the name instead.
/// The same input always yields the same slug.
pub fn derive_slug(name: &str, max_len: usize) -> String {
    let folded: String = name
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();
    let collapsed = NON_SLUG_RUN.replace_all(&folded, "-");
    let slug = truncate(collapsed.trim_matches('-'), max_len);

    if slug.is_empty() && !name.trim().is_empty() {
        return hashed_slug(name.trim(), max_len);
    }
    slug
}

fn truncate(slug: &str, max_len: usize) -> String {
    // Only ASCII survives the substitution, so byte slicing is safe.
    let truncated = &slug[..slug.len().min(max_len)];
    truncated.trim_end_matches('-').to_string()
}

fn hashed_slug(name: &str, max_len: usize) -> String {
    let digest = Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes())
        .simple()
        .to_string();
    digest[..HASHED_SLUG_LEN.min(max_len)].to_string()
}

/// Returns the slug for a create request: the caller's slug normalized, or
/// one derived from the name.
pub fn resolve_slug(name: &str, provided: Option<&str>, max_len: usize) -> Result<String> {
    let slug = match provided.map(str::trim).filter(|s| !s.is_empty()) {
        Some(explicit) => derive_slug(explicit, max_len),
        None => derive_slug(name, max_len),
    };

    if slug.is_empty() {
        return Err(SyncError::validation("name must not be empty"));
    }
    Ok(slug)
}
