//! URL helpers for crawler-facing tags
//!
//! Crawlers read `og:image` and `og:url` out of context and do not resolve
//! relative references, so everything placed there must be absolute.

use url::Url;

/// Path prefix of the interactive smart-link page
pub const LINK_PAGE_PREFIX: &str = "link";

/// Make an image or page reference absolute against `origin`
///
/// `origin` has no trailing slash (`https://soundraiser.io`). Absolute
/// `http(s)` references pass through unchanged, protocol-relative ones get
/// `https:`, everything else is joined onto the origin.
pub fn absolute_url(origin: &str, reference: &str) -> String {
    let reference = reference.trim();
    let lowered = reference.to_ascii_lowercase();
    if lowered.starts_with("https://") || lowered.starts_with("http://") {
        reference.to_string()
    } else if reference.starts_with("//") {
        format!("https:{}", reference)
    } else if reference.starts_with('/') {
        format!("{}{}", origin, reference)
    } else if reference.is_empty() {
        origin.to_string()
    } else {
        format!("{}/{}", origin, reference)
    }
}

/// Canonical interactive page for a link: `{origin}/link/{locator}`
///
/// The locator is percent-encoded as a single path segment.
pub fn canonical_url(origin: &Url, locator: &str) -> String {
    let mut url = origin.clone();
    url.set_query(None);
    url.set_fragment(None);
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(LINK_PAGE_PREFIX).push(locator);
    }
    url.to_string()
}

/// True if `raw` is an absolute `http` or `https` URL
///
/// Outbound targets are user-supplied; anything else (`javascript:`,
/// `data:`, relative paths) is never rendered as a link.
pub fn is_web_url(raw: &str) -> bool {
    Url::parse(raw.trim())
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host().is_some())
        .unwrap_or(false)
}
