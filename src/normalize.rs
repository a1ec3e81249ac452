//! Free-text canonicalization shared by every source adapter.
//!
//! All titles, artist names and album names pass through here before they are
//! used as merge keys or search terms, so that equality and substring checks
//! are stable across sources that disagree on character width or quoting.

use unicode_normalization::UnicodeNormalization;

/// Canonicalize a free-text field.
///
/// Replaces typographic apostrophes with plain ones, applies Unicode NFKC
/// compatibility folding (fullwidth/halfwidth variants collapse to their
/// canonical forms) and trims surrounding whitespace.
pub fn normalize(value: &str) -> String {
    value
        .replace('\u{2019}', "'")
        .nfkc()
        .collect::<String>()
        .trim()
        .to_string()
}

/// Canonicalize an ordered sequence of fields as one value.
///
/// The parts are joined with `", "` first, so a multi-artist credit ends up
/// identical to its pre-joined string form.
pub fn normalize_parts<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let joined = parts
        .into_iter()
        .map(|p| p.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    normalize(&joined)
}
