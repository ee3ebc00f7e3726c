//! Slug generation.
//!
//! Turns a notebook file stem into a lowercase, dash-separated name that is
//! safe as a directory and file stem on every target filesystem.

use std::sync::LazyLock;

use regex::Regex;

use nbcatalog_shared::Slug;

/// Placeholder used when nothing survives normalization.
pub const FALLBACK_SLUG: &str = "notebook";

/// Longest slug in bytes. Leaves room under the common 255-byte file name
/// limit for artifact suffixes and the `.<name>.tmp` staging file.
pub const MAX_SLUG_LEN: usize = 200;

/// Generate a slug from a raw title or file stem.
///
/// Parentheses, underscores and dashes act as word separators; any token in
/// `stopwords` is dropped. Characters outside `[a-z0-9-]` become dashes and
/// dash runs collapse to one. Slugs longer than [`MAX_SLUG_LEN`] are cut at
/// the last dash that fits.
pub fn slugify(raw: &str, stopwords: &[String]) -> Slug {
    static DASH_RUN_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"-{2,}").expect("valid regex"));

    let spaced = raw
        .to_lowercase()
        .replace(['(', ')', '_', '-'], " ");

    let tokens: Vec<&str> = spaced
        .split_whitespace()
        .filter(|token| !stopwords.iter().any(|w| w == token))
        .collect();

    let joined = if tokens.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        tokens.join("-")
    };

    let safe: String = joined
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();

    let collapsed = DASH_RUN_RE.replace_all(&safe, "-");
    let trimmed = truncate(collapsed.trim_matches('-'));

    if trimmed.is_empty() {
        Slug::from_normalized(FALLBACK_SLUG)
    } else {
        Slug::from_normalized(trimmed)
    }
}

// Input is ASCII here, so any byte index is a char boundary.
fn truncate(slug: &str) -> &str {
    if slug.len() <= MAX_SLUG_LEN {
        return slug;
    }
    let head = &slug[..MAX_SLUG_LEN];
    let cut = match head.rfind('-') {
        Some(i) if i > 0 => &head[..i],
        _ => head,
    };
    cut.trim_end_matches('-')
}

/// Human-readable catalogue title for a slug (`rag-intro` → `Rag Intro`).
pub fn display_name(slug: &Slug) -> String {
    slug.as_str()
        .split('-')
        .filter(|token| !token.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(c) => {
                    let upper: String = c.to_uppercase().collect();
                    format!("{upper}{}", chars.collect::<String>())
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
