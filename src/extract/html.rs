// src/extract/html.rs
// =============================================================================
// This module extracts image references from HTML pages.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Supports CSS selectors for finding elements
// - Is built on html5ever (Mozilla's HTML parser)
//
// And the `url` crate to resolve relative references against the page.
//
// Every <img> and <source> contributes its src plus each srcset candidate.
// Nothing is deduplicated: two elements pointing at the same file produce
// two follow-up requests.
// =============================================================================

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::normalize::ImageReference;

// These selectors are constants and known to be valid
static IMAGE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img, source").expect("image selector is valid"));
static BASE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("base[href]").expect("base selector is valid"));

/// Lists the candidate image references of one `<img>` or `<source>` element.
///
/// Order is `src` first, then every comma-separated `srcset` segment in
/// document order. A missing attribute counts as an empty value, so the
/// result always has at least two entries and may contain empty references.
pub fn image_references(element: ElementRef<'_>) -> Vec<ImageReference> {
    let attrs = element.value();
    let src = attrs.attr("src").unwrap_or("");
    let srcset = attrs.attr("srcset").unwrap_or("");

    std::iter::once(src)
        .chain(srcset.split(','))
        .map(ImageReference::new)
        .collect()
}

// Extracts all image URLs from a page
//
// Parameters:
//   html: the HTML content to parse
//   page_url: the URL the page was served from
//
// Returns: absolute URLs in document order
//
// Example:
//   html = r#"<img src="/a.png" srcset="b.png 2x">"#
//   page_url = "https://example.com/gallery/"
//   result = ["https://example.com/a.png", "https://example.com/gallery/b.png"]
pub fn discover_images(html: &str, page_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let base = document_base(&document, page_url);

    let mut urls = Vec::new();
    for element in document.select(&IMAGE_SELECTOR) {
        for reference in image_references(element) {
            // An empty reference resolves to the page itself
            if reference.is_empty() {
                continue;
            }
            match resolve_url(&base, &reference) {
                Some(url) => urls.push(url),
                None => tracing::debug!(reference = %reference, "could not resolve image reference"),
            }
        }
    }

    urls
}

// The first <base href> overrides the page URL for relative references
fn document_base(document: &Html, page_url: &Url) -> Url {
    document
        .select(&BASE_SELECTOR)
        .next()
        .and_then(|base| base.value().attr("href"))
        .and_then(|href| page_url.join(href.trim()).ok())
        .unwrap_or_else(|| page_url.clone())
}

// Resolves a possibly-relative reference to an absolute URL
//
// Examples:
//   base = "https://example.com/page/"
//   "/a.png" -> Some("https://example.com/a.png")
//   "../b.png#top" -> Some("https://example.com/b.png")
//   "data:image/png;base64,AAAA" -> Some("data:image/png;base64,AAAA")
//   "http://[::1" -> None
fn resolve_url(base: &Url, reference: &ImageReference) -> Option<Url> {
    let mut url = base.join(reference.as_str()).ok()?;
    url.set_fragment(None);
    Some(url)
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why LazyLock for the selectors?
//    - Selector::parse does real work, so we only want to do it once
//    - LazyLock runs the closure on first use and caches the result
//    - The .expect() can only fire if the literal selector is wrong
//
// 2. What is ElementRef?
//    - A borrowed handle to one element inside the parsed Html
//    - It cannot outlive the document, hence the lifetime in ElementRef<'_>
//
// 3. Why split srcset on commas?
//    - srcset="a.png 1x, b.png 2x" lists several candidates
//    - Each segment is "URL descriptor"; ImageReference::new drops the descriptor
//
// 4. What does url.join() do with "//cdn.example.com/x.png"?
//    - It keeps the page's scheme and swaps the host, like a browser
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn first_element(html: &str) -> Vec<ImageReference> {
        let document = Html::parse_fragment(html);
        let element = document.select(&IMAGE_SELECTOR).next().unwrap();
        image_references(element)
    }

    fn strs(refs: &[ImageReference]) -> Vec<&str> {
        refs.iter().map(ImageReference::as_str).collect()
    }

    #[test]
    fn test_src_then_srcset_in_order() {
        let refs = first_element(r#"<img src="a.png" srcset="b.png 1x, c.png 2x">"#);
        assert_eq!(strs(&refs), vec!["a.png", "b.png", "c.png"]);
    }

    #[test]
    fn test_missing_attributes_give_empty_candidates() {
        let refs = first_element(r#"<img src="a.png">"#);
        assert_eq!(strs(&refs), vec!["a.png", ""]);

        let refs = first_element(r#"<picture><source srcset="x.webp 480w, y.webp 960w"></picture>"#);
        assert_eq!(strs(&refs), vec!["", "x.webp", "y.webp"]);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let refs = first_element(r#"<img src="a.png" srcset="a.png 1x, a.png 2x">"#);
        assert_eq!(strs(&refs), vec!["a.png", "a.png", "a.png"]);
    }

    #[test]
    fn test_discover_resolves_relative_urls() {
        let html = r#"
            <img src="/a.png">
            <img src="b.png" srcset="b-2x.png 2x">
            <img src="https://cdn.example.org/c.png#frag">
        "#;
        let page = Url::parse("https://example.com/gallery/").unwrap();
        let urls: Vec<String> = discover_images(html, &page)
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/a.png",
                "https://example.com/gallery/b.png",
                "https://example.com/gallery/b-2x.png",
                "https://cdn.example.org/c.png",
            ]
        );
    }

    #[test]
    fn test_discover_skips_empty_references() {
        let html = r#"<img alt="no source"><img src="">"#;
        let page = Url::parse("https://example.com/").unwrap();
        assert!(discover_images(html, &page).is_empty());
    }

    #[test]
    fn test_discover_honours_base_href() {
        let html = r#"<head><base href="https://static.example.com/img/"></head><img src="a.png">"#;
        let page = Url::parse("https://example.com/page").unwrap();
        let urls = discover_images(html, &page);
        assert_eq!(urls[0].as_str(), "https://static.example.com/img/a.png");
    }

    #[test]
    fn test_discover_keeps_data_uris() {
        let html = r#"<img src="data:image/png;base64,iVBORw0KGgo=">"#;
        let page = Url::parse("https://example.com/").unwrap();
        let urls = discover_images(html, &page);
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].scheme(), "data");
        assert_eq!(urls[0].path(), "image/png;base64,iVBORw0KGgo=");
    }

    #[test]
    fn test_ignores_other_elements() {
        let html = r#"<a href="/x.png">link</a><div style="background:url(y.png)"></div>"#;
        let page = Url::parse("https://example.com/").unwrap();
        assert!(discover_images(html, &page).is_empty());
    }
}
