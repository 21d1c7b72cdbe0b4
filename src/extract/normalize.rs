// src/extract/normalize.rs
// =============================================================================
// Cleans raw attribute values into image references.
//
// A srcset candidate looks like "photo-640.jpg 640w" or "photo@2x.jpg 2x".
// The part after the space is a hint for the browser, not part of the URL,
// so we strip it along with any surrounding whitespace.
// =============================================================================

use std::sync::LazyLock;

use regex::Regex;

// whitespace, then digits (optionally fractional), then an optional w or x
static DESCRIPTOR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s+[0-9]*(?:\.[0-9]+)?[wx]?$").expect("descriptor pattern is valid")
});

/// One image URL taken from an HTML attribute, with any srcset descriptor
/// removed. May still be relative, or empty when the attribute was missing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageReference(String);

impl ImageReference {
    pub fn new(raw: &str) -> Self {
        Self(normalize_url(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for ImageReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// Trailing whitespace is trimmed first so a srcset that ends in a newline
// still has its last descriptor removed.
fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim_end();
    DESCRIPTOR_PATTERN.replace(trimmed, "").trim().to_string()
}
