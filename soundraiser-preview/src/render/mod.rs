//! HTML rendering for smart-link previews
//!
//! Two document shapes are produced from the same meta block:
//! - **Crawler**: meta tags and a short text body. No script at all, since
//!   a script redirect makes some crawlers index the destination instead
//!   of the card.
//! - **Browser**: meta tags, JSON-LD, a visible card with the streaming
//!   destinations, and a short delayed `location.replace` to the
//!   interactive page.
//!
//! Rendering is a pure function of its inputs: the same record, kind and
//! settings always produce byte-identical output. Every user-supplied value
//! goes through `escape_html` (or `json_for_script` inside scripts).

pub mod escape;
pub mod urls;

use serde_json::{json, Value};
use soundraiser_common::config::ServiceConfig;
use soundraiser_common::LinkRecord;
use std::time::Duration;
use url::Url;

use crate::classifier::ClientKind;
pub use escape::{escape_html, json_for_script};
pub use urls::{absolute_url, canonical_url, is_web_url};

/// Declared preview image size; not measured from the artwork
pub const OG_IMAGE_WIDTH: u32 = 1200;
pub const OG_IMAGE_HEIGHT: u32 = 630;

/// Platform names listed in a generated description before "and more"
const DESCRIPTION_PLATFORM_LIMIT: usize = 3;

const CARD_CSS: &str = "\
*{box-sizing:border-box;margin:0;padding:0}\
body{font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,sans-serif;\
background:#0f0f14;color:#f2f2f5;min-height:100vh;display:flex;\
align-items:center;justify-content:center;padding:24px}\
.card{width:100%;max-width:420px;background:#1b1b24;border-radius:16px;\
padding:24px;text-align:center;box-shadow:0 12px 40px rgba(0,0,0,.45)}\
.artwork{width:100%;height:auto;aspect-ratio:1/1;object-fit:cover;border-radius:12px;margin-bottom:16px}\
h1{font-size:22px;margin-bottom:4px}\
.artist{color:#a8a8b8;margin-bottom:8px}\
.release{color:#7c7c8c;font-size:13px;margin-bottom:16px}\
.targets{list-style:none;margin-bottom:16px}\
.targets li{margin:8px 0}\
.targets a,.open{display:block;padding:12px;border-radius:10px;background:#2a2a38;\
color:#f2f2f5;text-decoration:none;font-weight:600}\
.open{background:#7c5cff}\
.branding{margin-top:16px;font-size:12px;color:#7c7c8c}\
.branding a{color:#a8a8b8}";

/// Site-level values the renderer needs
#[derive(Debug, Clone)]
pub struct RenderSettings {
    /// Public origin, parsed
    pub origin: Url,
    /// Public origin without trailing slash
    pub origin_str: String,
    pub site_name: String,
    /// Default artwork reference, absolute or site-relative
    pub default_image: String,
    pub redirect_delay: Duration,
}

impl RenderSettings {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            origin: config.site_origin.clone(),
            origin_str: config.origin_str().to_string(),
            site_name: config.site_name.clone(),
            default_image: config.default_image.clone(),
            redirect_delay: config.redirect_delay,
        }
    }

    fn default_image_url(&self) -> String {
        absolute_url(&self.origin_str, &self.default_image)
    }

    fn home_url(&self) -> String {
        format!("{}/", self.origin_str)
    }
}

/// Unescaped values for the shared meta block
struct PageMeta {
    page_title: String,
    description: String,
    canonical: String,
    image: String,
    image_alt: String,
    og_type: &'static str,
}

/// Render the preview document for `record` tailored to `kind`
pub fn render_preview(record: &LinkRecord, kind: ClientKind, settings: &RenderSettings) -> String {
    let meta = link_meta(record, settings);
    match kind {
        ClientKind::Crawler => crawler_document(&meta, record, settings),
        ClientKind::Browser => browser_document(&meta, record, settings),
    }
}

/// Generic page served when the link cannot be loaded
///
/// Still a complete preview card (status 200) so crawlers show something.
pub fn render_fallback(kind: ClientKind, settings: &RenderSettings) -> String {
    let meta = PageMeta {
        page_title: settings.site_name.clone(),
        description: format!(
            "Discover and stream new music on {}.",
            settings.site_name
        ),
        canonical: settings.home_url(),
        image: settings.default_image_url(),
        image_alt: settings.site_name.clone(),
        og_type: "website",
    };
    let head = meta_tags(&meta, &settings.site_name);
    let site = escape_html(&settings.site_name);
    let home = escape_html(&meta.canonical);

    match kind {
        ClientKind::Crawler => format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n{head}</head>\n\
             <body>\n<h1>{site}</h1>\n<p>This link is not available.</p>\n\
             <p><a href=\"{home}\">Visit {site}</a></p>\n</body>\n</html>\n"
        ),
        ClientKind::Browser => {
            let target = json_for_script(&Value::String(meta.canonical.clone()));
            let delay = settings.redirect_delay.as_millis();
            format!(
                "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
                 <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n{head}\
                 <noscript><meta http-equiv=\"refresh\" content=\"0;url={home}\"></noscript>\n\
                 <style>{CARD_CSS}</style>\n</head>\n<body>\n<main class=\"card\">\n\
                 <h1>{site}</h1>\n<p class=\"artist\">This link is not available.</p>\n\
                 <a class=\"open\" href=\"{home}\">Visit {site}</a>\n</main>\n\
                 <script>setTimeout(function(){{window.location.replace({target});}},{delay});</script>\n\
                 </body>\n</html>\n"
            )
        }
    }
}

fn link_meta(record: &LinkRecord, settings: &RenderSettings) -> PageMeta {
    let title = record.title_or_empty();
    let artist = record.artist_or_empty();

    let page_title = match (title.is_empty(), artist.is_empty()) {
        (false, false) => format!("{} by {} | {}", title, artist, settings.site_name),
        (false, true) => format!("{} | {}", title, settings.site_name),
        (true, false) => format!("{} | {}", artist, settings.site_name),
        (true, true) => settings.site_name.clone(),
    };

    let image = record
        .artwork_url
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|s| absolute_url(&settings.origin_str, s))
        .unwrap_or_else(|| settings.default_image_url());

    PageMeta {
        page_title,
        description: describe(record, &settings.site_name),
        canonical: canonical_url(&settings.origin, record.locator()),
        image,
        image_alt: subject(title, artist).unwrap_or_else(|| settings.site_name.clone()),
        og_type: "music.song",
    }
}

/// "Title by Artist", whichever parts exist
fn subject(title: &str, artist: &str) -> Option<String> {
    match (title.is_empty(), artist.is_empty()) {
        (false, false) => Some(format!("{} by {}", title, artist)),
        (false, true) => Some(title.to_string()),
        (true, false) => Some(artist.to_string()),
        (true, true) => None,
    }
}

/// Stored description, or one generated from the platform names
fn describe(record: &LinkRecord, site_name: &str) -> String {
    if let Some(description) = record
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
    {
        return description.to_string();
    }

    let what = subject(record.title_or_empty(), record.artist_or_empty())
        .unwrap_or_else(|| "this release".to_string());

    let names: Vec<&str> = record
        .targets
        .iter()
        .map(|t| t.platform_name.trim())
        .filter(|n| !n.is_empty())
        .collect();

    match names.len() {
        0 => format!("Listen to {} on {}.", what, site_name),
        n if n <= DESCRIPTION_PLATFORM_LIMIT => {
            format!("Listen to {} on {}.", what, names.join(", "))
        }
        _ => format!(
            "Listen to {} on {} and more.",
            what,
            names[..DESCRIPTION_PLATFORM_LIMIT].join(", ")
        ),
    }
}

fn meta_tags(meta: &PageMeta, site_name: &str) -> String {
    let title = escape_html(&meta.page_title);
    let description = escape_html(&meta.description);
    let canonical = escape_html(&meta.canonical);
    let image = escape_html(&meta.image);
    let alt = escape_html(&meta.image_alt);
    let site = escape_html(site_name);
    let og_type = meta.og_type;

    format!(
        "<title>{title}</title>\n\
         <meta name=\"description\" content=\"{description}\">\n\
         <link rel=\"canonical\" href=\"{canonical}\">\n\
         <meta property=\"og:type\" content=\"{og_type}\">\n\
         <meta property=\"og:site_name\" content=\"{site}\">\n\
         <meta property=\"og:title\" content=\"{title}\">\n\
         <meta property=\"og:description\" content=\"{description}\">\n\
         <meta property=\"og:url\" content=\"{canonical}\">\n\
         <meta property=\"og:image\" content=\"{image}\">\n\
         <meta property=\"og:image:width\" content=\"{OG_IMAGE_WIDTH}\">\n\
         <meta property=\"og:image:height\" content=\"{OG_IMAGE_HEIGHT}\">\n\
         <meta property=\"og:image:alt\" content=\"{alt}\">\n\
         <meta name=\"twitter:card\" content=\"summary_large_image\">\n\
         <meta name=\"twitter:title\" content=\"{title}\">\n\
         <meta name=\"twitter:description\" content=\"{description}\">\n\
         <meta name=\"twitter:image\" content=\"{image}\">\n"
    )
}

fn crawler_document(meta: &PageMeta, record: &LinkRecord, settings: &RenderSettings) -> String {
    let head = meta_tags(meta, &settings.site_name);
    let title = escape_html(record.title_or_empty());
    let artist = escape_html(record.artist_or_empty());
    let canonical = escape_html(&meta.canonical);
    let site = escape_html(&settings.site_name);

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n{head}</head>\n\
         <body>\n<h1>{title}</h1>\n<p>{artist}</p>\n\
         <p><a href=\"{canonical}\">Listen on {site}</a></p>\n</body>\n</html>\n"
    )
}

fn browser_document(meta: &PageMeta, record: &LinkRecord, settings: &RenderSettings) -> String {
    let head = meta_tags(meta, &settings.site_name);
    let structured = json_for_script(&structured_data(meta, record));
    let title = escape_html(record.title_or_empty());
    let artist = escape_html(record.artist_or_empty());
    let canonical = escape_html(&meta.canonical);
    let image = escape_html(&meta.image);
    let alt = escape_html(&meta.image_alt);
    let target = json_for_script(&Value::String(meta.canonical.clone()));
    let delay = settings.redirect_delay.as_millis();

    let release = record
        .parsed_release_date()
        .map(|d| format!("<p class=\"release\">Released {}</p>\n", d.format("%B %-d, %Y")))
        .unwrap_or_default();

    let targets: String = record
        .targets
        .iter()
        .filter(|t| is_web_url(&t.url))
        .map(|t| {
            format!(
                "<li><a href=\"{}\" data-platform=\"{}\" rel=\"noopener\">{}</a></li>\n",
                escape_html(t.url.trim()),
                escape_html(&t.platform_id),
                escape_html(&t.platform_name)
            )
        })
        .collect();

    let branding = if record.hide_branding {
        String::new()
    } else {
        format!(
            "<p class=\"branding\">Powered by <a href=\"{}\">{}</a></p>\n",
            escape_html(&settings.home_url()),
            escape_html(&settings.site_name)
        )
    };

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n{head}\
         <script type=\"application/ld+json\">{structured}</script>\n\
         <noscript><meta http-equiv=\"refresh\" content=\"0;url={canonical}\"></noscript>\n\
         <style>{CARD_CSS}</style>\n</head>\n<body>\n<main class=\"card\">\n\
         <img class=\"artwork\" src=\"{image}\" alt=\"{alt}\">\n\
         <h1>{title}</h1>\n<p class=\"artist\">{artist}</p>\n{release}\
         <ul class=\"targets\">\n{targets}</ul>\n\
         <a class=\"open\" href=\"{canonical}\">Open smart link</a>\n{branding}</main>\n\
         <script>setTimeout(function(){{window.location.replace({target});}},{delay});</script>\n\
         </body>\n</html>\n"
    )
}

/// schema.org `MusicRecording` for search engines
fn structured_data(meta: &PageMeta, record: &LinkRecord) -> Value {
    let mut data = json!({
        "@context": "https://schema.org",
        "@type": "MusicRecording",
        "name": record.title_or_empty(),
        "url": meta.canonical,
        "image": meta.image,
        "description": meta.description,
    });

    let artist = record.artist_or_empty();
    if !artist.is_empty() {
        data["byArtist"] = json!({ "@type": "MusicGroup", "name": artist });
    }
    if let Some(date) = record.parsed_release_date() {
        data["datePublished"] = json!(date.format("%Y-%m-%d").to_string());
    }
    let same_as: Vec<&str> = record
        .targets
        .iter()
        .map(|t| t.url.trim())
        .filter(|u| is_web_url(u))
        .collect();
    if !same_as.is_empty() {
        data["sameAs"] = json!(same_as);
    }
    data
}
