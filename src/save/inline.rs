// src/save/inline.rs
// =============================================================================
// Handles images embedded as base64 data URIs.
//
// A reference like `data:image/png;base64,iVBORw0...` carries the image bytes
// itself. Sending it to the network makes no sense, so the pipeline hands it
// here instead: we decode the payload and write it straight to disk as
// base64Image_<n>.<ext>.
// =============================================================================

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::LazyLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use url::Url;

use super::filename::{extension_for, UNKNOWN_EXTENSION};

static INLINE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^image/([^;,]+);base64,(.*)$").expect("inline image pattern is valid")
});

#[derive(Debug, Error)]
pub enum InlineImageError {
    #[error("invalid base64 payload for {content_type}: {source}")]
    Decode {
        content_type: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The opaque part of a `data:` URL that holds a base64 image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineTarget {
    subtype: String,
    payload: String,
}

impl InlineTarget {
    /// Recognizes `data:image/<subtype>;base64,<payload>`.
    pub fn from_url(url: &Url) -> Option<Self> {
        if url.scheme() != "data" {
            return None;
        }
        Self::parse(url.path())
    }

    /// Recognizes the opaque form `image/<subtype>;base64,<payload>`.
    pub fn parse(opaque: &str) -> Option<Self> {
        let captures = INLINE_PATTERN.captures(opaque)?;
        Some(Self {
            subtype: captures[1].to_string(),
            payload: captures[2].to_string(),
        })
    }

    pub fn content_type(&self) -> String {
        format!("image/{}", self.subtype)
    }

    /// Registry extension for the subtype, or `unknown`.
    pub fn extension(&self) -> &'static str {
        extension_for(&self.content_type()).unwrap_or(UNKNOWN_EXTENSION)
    }

    pub fn decode(&self) -> Result<Vec<u8>, InlineImageError> {
        STANDARD
            .decode(self.payload.as_bytes())
            .map_err(|source| InlineImageError::Decode {
                content_type: self.content_type(),
                source,
            })
    }
}

/// Hands out 1, 2, 3, ... for inline image file names, safe across tasks.
#[derive(Debug, Default)]
pub struct InlineSequence(AtomicUsize);

impl InlineSequence {
    pub fn next(&self) -> usize {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }
}

pub fn inline_file_name(sequence: usize, extension: &str) -> String {
    format!("base64Image_{sequence}.{extension}")
}

/// Creates `dest/name`, writes the bytes and syncs them to disk.
///
/// A partially written file is removed again on failure.
pub async fn write_inline_image(
    dest: &Path,
    name: &str,
    bytes: &[u8],
) -> Result<PathBuf, InlineImageError> {
    let path = dest.join(name);
    let result = async {
        let mut file = tokio::fs::File::create(&path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await
    }
    .await;

    match result {
        Ok(()) => Ok(path),
        Err(source) => {
            let _ = tokio::fs::remove_file(&path).await;
            Err(InlineImageError::Write { path, source })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // 1x1 transparent PNG
    const PIXEL_PNG: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    #[test]
    fn test_parse_data_url() {
        let url = Url::parse(&format!("data:image/png;base64,{PIXEL_PNG}")).unwrap();
        let target = InlineTarget::from_url(&url).unwrap();
        assert_eq!(target.content_type(), "image/png");
        assert_eq!(target.extension(), "png");
        assert_eq!(target.decode().unwrap().len(), 70);
    }

    #[test]
    fn test_non_data_urls_are_ignored() {
        let url = Url::parse("https://example.com/image/png;base64,AAAA").unwrap();
        assert!(InlineTarget::from_url(&url).is_none());
    }

    #[test]
    fn test_non_base64_data_urls_are_ignored() {
        assert!(InlineTarget::parse("image/svg+xml;utf8,<svg></svg>").is_none());
        assert!(InlineTarget::parse("text/plain;base64,aGVsbG8=").is_none());
    }

    #[test]
    fn test_unregistered_subtype_uses_unknown() {
        let target = InlineTarget::parse("image/x-made-up;base64,AAAA").unwrap();
        assert_eq!(target.extension(), UNKNOWN_EXTENSION);
    }

    #[test]
    fn test_invalid_payload() {
        let target = InlineTarget::parse("image/png;base64,@@not base64@@").unwrap();
        assert!(matches!(target.decode(), Err(InlineImageError::Decode { .. })));
    }

    #[test]
    fn test_sequence_counts_from_one() {
        let sequence = InlineSequence::default();
        assert_eq!(sequence.next(), 1);
        assert_eq!(sequence.next(), 2);
        assert_eq!(inline_file_name(2, "png"), "base64Image_2.png");
    }

    #[tokio::test]
    async fn test_write_inline_image() {
        let dir = TempDir::new().unwrap();
        let bytes = InlineTarget::parse(&format!("image/png;base64,{PIXEL_PNG}"))
            .unwrap()
            .decode()
            .unwrap();
        let path = write_inline_image(dir.path(), "base64Image_1.png", &bytes)
            .await
            .unwrap();
        assert_eq!(path, dir.path().join("base64Image_1.png"));
        assert_eq!(std::fs::read(&path).unwrap(), bytes);
    }

    #[tokio::test]
    async fn test_write_into_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("gone");
        let err = write_inline_image(&missing, "x.png", b"abc").await.unwrap_err();
        assert!(matches!(err, InlineImageError::Write { .. }));
    }
}
