//! Sitemap generation
//!
//! Public links are split into fixed-size `links-<n>.xml` pages (1-based)
//! listed by a single sitemap index. The protocol limits both a page and
//! the index to 50,000 entries: configuration clamps the page size, and
//! `effective_page_size` grows it when the index would overflow.

use std::fmt::Write as _;
use url::Url;

use soundraiser_common::config::MAX_SITEMAP_URLS;
use soundraiser_common::SitemapEntry;

use crate::render::{canonical_url, escape_html};

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Path prefix the page files are served under
pub const SITEMAP_DIR: &str = "sitemaps";

/// Protocol limit on `<sitemap>` entries in one index
pub const MAX_INDEX_ENTRIES: u64 = 50_000;

/// Page size actually used for `total` links
///
/// The configured size, raised just enough that the index stays within
/// `MAX_INDEX_ENTRIES`, and never above `MAX_SITEMAP_URLS`.
pub fn effective_page_size(total: u64, configured: u64) -> u64 {
    configured
        .max(total.div_ceil(MAX_INDEX_ENTRIES))
        .clamp(1, MAX_SITEMAP_URLS)
}

/// Number of `links-<n>.xml` pages for `total` links; at least one
pub fn page_count(total: u64, page_size: u64) -> u64 {
    let page_size = page_size.max(1);
    total.div_ceil(page_size).max(1)
}

/// Page number from a file name like `links-3.xml`
///
/// Returns `None` for anything else, including page 0.
pub fn parse_page_file(file: &str) -> Option<u64> {
    let number = file.strip_prefix("links-")?.strip_suffix(".xml")?;
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    number.parse().ok().filter(|&n| n >= 1)
}

/// Row offset of a 1-based page
pub fn page_offset(page: u64, page_size: u64) -> u64 {
    page.saturating_sub(1).saturating_mul(page_size)
}

pub fn page_file_name(page: u64) -> String {
    format!("links-{}.xml", page)
}

/// Sitemap index listing pages `1..=pages`, at most `MAX_INDEX_ENTRIES`
pub fn render_index(origin: &str, pages: u64) -> String {
    let pages = pages.min(MAX_INDEX_ENTRIES);
    let mut xml = String::with_capacity(128 + pages as usize * 96);
    xml.push_str(XML_DECLARATION);
    let _ = writeln!(xml, "<sitemapindex xmlns=\"{}\">", SITEMAP_NS);
    for page in 1..=pages {
        let loc = format!("{}/{}/{}", origin, SITEMAP_DIR, page_file_name(page));
        let _ = writeln!(
            xml,
            "  <sitemap>\n    <loc>{}</loc>\n  </sitemap>",
            escape_html(&loc)
        );
    }
    xml.push_str("</sitemapindex>\n");
    xml
}

/// One `urlset` page with the canonical page of each link
pub fn render_urlset(origin: &Url, entries: &[SitemapEntry]) -> String {
    let mut xml = String::with_capacity(128 + entries.len() * 160);
    xml.push_str(XML_DECLARATION);
    let _ = writeln!(xml, "<urlset xmlns=\"{}\">", SITEMAP_NS);
    for entry in entries {
        xml.push_str("  <url>\n");
        let _ = writeln!(
            xml,
            "    <loc>{}</loc>",
            escape_html(&canonical_url(origin, &entry.slug))
        );
        if let Some(date) = entry.lastmod() {
            let _ = writeln!(xml, "    <lastmod>{}</lastmod>", date.format("%Y-%m-%d"));
        }
        xml.push_str("    <changefreq>weekly</changefreq>\n");
        xml.push_str("  </url>\n");
    }
    xml.push_str("</urlset>\n");
    xml
}
