//! Pulls candidate email addresses out of fetched page text.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")
        .expect("email pattern is a valid regex")
});

/// Asset suffixes that make a `name@2x.png`-style filename look like an address.
pub const IGNORED_HOST_EXTENSIONS: [&str; 7] =
    [".png", ".jpg", ".jpeg", ".gif", ".bmp", ".tiff", ".webp"];

/// True if `candidate` matches the same pattern the extractor scans for.
pub fn is_email_syntax(candidate: &str) -> bool {
    EMAIL_REGEX
        .find(candidate)
        .is_some_and(|m| m.start() == 0 && m.end() == candidate.len())
}

/// Scans `page_text` in order of appearance and returns the accepted
/// addresses exactly as written on the page.
///
/// A match is discarded when its host ends in an image extension or is a
/// member of `excluded_domains`. Both checks are case-insensitive;
/// `excluded_domains` is expected to hold lower-case entries. Scanning stops
/// once `max_emails` matches have been accepted, repeats included. Repeats
/// differing only in case collapse onto the first spelling seen.
pub fn extract_emails(
    page_text: &str,
    max_emails: usize,
    excluded_domains: &HashSet<String>,
) -> BTreeSet<String> {
    let mut accepted = BTreeSet::new();
    let mut seen = HashSet::new();
    let mut matches = 0usize;

    for found in EMAIL_REGEX.find_iter(page_text) {
        if matches >= max_emails {
            break;
        }
        let email = found.as_str();
        let key = email.to_lowercase();
        let Some((_, host)) = key.rsplit_once('@') else {
            continue;
        };

        if IGNORED_HOST_EXTENSIONS.iter().any(|ext| host.ends_with(ext)) {
            tracing::trace!("Ignoring asset-like match: {}", email);
            continue;
        }
        if excluded_domains.contains(host) {
            tracing::trace!("Ignoring excluded sender domain: {}", email);
            continue;
        }

        matches += 1;
        if seen.insert(key) {
            accepted.insert(email.to_string());
        }
    }

    accepted
}
