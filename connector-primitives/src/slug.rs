//! Identifier-safe normalisation of human-readable names.

use std::collections::HashSet;

const SEPARATOR: char = '_';

/// Normalises a display name into a slug.
///
/// The name is lowercased, every run of characters outside `[a-z0-9]` is
/// collapsed to a single `_`, and leading/trailing separators are stripped.
/// The function is idempotent. The result may be empty when the input holds
/// no ASCII alphanumerics.
#[must_use]
pub fn to_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;

    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_separator && !slug.is_empty() {
                slug.push(SEPARATOR);
            }
            pending_separator = false;
            slug.push(c);
        } else {
            pending_separator = true;
        }
    }

    slug
}

/// Slugs every name and resolves collisions deterministically.
///
/// The first occurrence of a slug keeps the bare form; later collisions get
/// `_2`, `_3`, ... in input order. Names in `reserved` count as already taken,
/// and an empty slug is replaced by `fallback` before deduplication. The
/// output is aligned with the input.
#[must_use]
pub fn dedupe_slugs<S: AsRef<str>>(names: &[S], reserved: &[&str], fallback: &str) -> Vec<String> {
    let mut taken: HashSet<String> = reserved.iter().map(|r| (*r).to_owned()).collect();
    let mut out = Vec::with_capacity(names.len());

    for name in names {
        let mut base = to_slug(name.as_ref());
        if base.is_empty() {
            base = fallback.to_owned();
        }

        let mut candidate = base.clone();
        let mut suffix = 2_usize;
        while taken.contains(&candidate) {
            candidate = format!("{base}{SEPARATOR}{suffix}");
            suffix += 1;
        }

        taken.insert(candidate.clone());
        out.push(candidate);
    }

    out
}
