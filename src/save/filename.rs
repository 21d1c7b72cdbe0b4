// src/save/filename.rs
// =============================================================================
// Works out the on-disk name for a downloaded image.
//
// Two steps:
// 1. suggested_filename: what the response itself suggests (Content-Disposition,
//    otherwise the URL path), sanitized. A name without an extension gets the
//    placeholder extension "unknown".
// 2. ResolvedFilename::resolve: make the extension agree with the declared
//    Content-Type using the mime_guess registry.
// =============================================================================

use url::Url;

/// Placeholder extension for names that arrive without one.
pub const UNKNOWN_EXTENSION: &str = "unknown";

const FALLBACK_STEM: &str = "image";
// Linux NAME_MAX, minus room for an appended extension
const MAX_STEM_BYTES: usize = 200;

/// Picks the registry extension for a content type.
///
/// Parameters after `;` are ignored. When the registry knows several
/// extensions, the one equal to the subtype wins (`image/jpeg` -> `jpeg`),
/// otherwise the first one listed. Returns None for unregistered types.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    let extensions = mime_guess::get_mime_extensions_str(&essence)?;
    let subtype = essence.split('/').nth(1).unwrap_or("");

    extensions
        .iter()
        .copied()
        .find(|ext| *ext == subtype)
        .or_else(|| extensions.first().copied())
}

fn is_registered_for(extension: &str, content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    mime_guess::get_mime_extensions_str(&essence)
        .map(|exts| exts.iter().any(|ext| ext.eq_ignore_ascii_case(extension)))
        .unwrap_or(false)
}

/// A filename that is safe to create inside the destination directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFilename(String);

impl ResolvedFilename {
    /// Derives the final name from a suggested name and a Content-Type.
    ///
    /// - the name is sanitized first
    /// - an `unknown` placeholder extension is replaced by the registry's one
    /// - a name whose extension is not registered for the type gets the
    ///   registry's extension appended (`photo.php` -> `photo.php.png`)
    /// - when the registry has nothing for the type, the sanitized name is kept
    pub fn resolve(suggested: &str, content_type: &str) -> Self {
        let sanitized = sanitize_file_name(suggested);
        let Some(extension) = extension_for(content_type) else {
            return Self(sanitized);
        };

        let (stem, current) = split_extension(&sanitized);
        if current == Some(UNKNOWN_EXTENSION) {
            return Self(format!("{stem}.{extension}"));
        }
        if current.is_some_and(|ext| is_registered_for(ext, content_type)) {
            return Self(sanitized);
        }
        Self(format!("{sanitized}.{extension}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResolvedFilename {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The name a response suggests for itself.
///
/// A `filename` (or RFC 5987 `filename*`) in Content-Disposition wins.
/// Otherwise the URL path is used without its leading slash, with the query
/// appended after an underscore so `thumb?id=1` and `thumb?id=2` differ.
pub fn suggested_filename(url: &Url, content_disposition: Option<&str>) -> String {
    if let Some(name) = content_disposition.and_then(parse_content_disposition) {
        return sanitize_file_name(&name);
    }

    let path = url.path().trim_start_matches('/');
    let raw = match url.query() {
        Some(query) if !query.is_empty() => format!("{path}_{query}"),
        _ => path.to_string(),
    };
    sanitize_file_name(&raw)
}

/// Makes a name safe for the filesystem.
///
/// Everything except ASCII letters, digits, `-` and `_` becomes `_` (dots in
/// the stem included), runs of `_` collapse. The extension keeps only letters
/// and digits; if nothing is left it becomes `unknown`.
pub fn sanitize_file_name(name: &str) -> String {
    let (stem, extension) = split_extension(name);

    let mut stem = clean_component(stem, |c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if stem.is_empty() {
        stem = FALLBACK_STEM.to_string();
    }
    truncate_to_boundary(&mut stem, MAX_STEM_BYTES);

    let extension: String = extension
        .unwrap_or("")
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(16)
        .collect::<String>()
        .to_ascii_lowercase();
    let extension = if extension.is_empty() {
        UNKNOWN_EXTENSION.to_string()
    } else {
        extension
    };

    format!("{stem}.{extension}")
}

// "dir/photo.final.png" -> ("dir/photo.final", Some("png"))
// The extension lives in the last path segment only.
fn split_extension(name: &str) -> (&str, Option<&str>) {
    let segment_start = name.rfind(['/', '\\']).map_or(0, |i| i + 1);
    match name[segment_start..].rfind('.') {
        Some(dot) => {
            let dot = segment_start + dot;
            (&name[..dot], Some(&name[dot + 1..]))
        }
        None => (name, None),
    }
}

fn clean_component(value: &str, keep: impl Fn(char) -> bool) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_underscore = false;
    for c in value.chars() {
        let mapped = if keep(c) { c } else { '_' };
        if mapped == '_' {
            if !prev_underscore {
                out.push('_');
            }
            prev_underscore = true;
        } else {
            out.push(mapped);
            prev_underscore = false;
        }
    }
    out.trim_matches('_').to_string()
}

fn truncate_to_boundary(value: &mut String, max: usize) {
    if value.len() <= max {
        return;
    }
    let mut take = max;
    while take > 0 && !value.is_char_boundary(take) {
        take -= 1;
    }
    value.truncate(take);
}

// Handles:
// - attachment; filename="photo.png"
// - attachment; filename=photo.png
// - attachment; filename*=UTF-8''ph%C3%B6to.png
fn parse_content_disposition(header: &str) -> Option<String> {
    let mut plain = None;
    for part in header.split(';').map(str::trim) {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();
        if key == "filename*" {
            let encoded = value.rsplit("''").next().unwrap_or(value);
            // Undecodable bytes keep the raw value
            let decoded = urlencoding::decode(encoded)
                .map(|name| name.into_owned())
                .unwrap_or_else(|_| encoded.to_string());
            if !decoded.is_empty() {
                return Some(decoded);
            }
        } else if key == "filename" {
            let unquoted = value.trim_matches('"');
            if !unquoted.is_empty() {
                plain = Some(unquoted.to_string());
            }
        }
    }
    plain
}
