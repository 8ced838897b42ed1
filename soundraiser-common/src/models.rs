//! Smart link data model
//!
//! These records are read-only from the preview service's point of view.
//! They are created and edited by the dashboard and land here through a
//! `LinkStore` backend.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One shareable smart link with its streaming destinations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    /// Primary identifier (UUID in the hosted backend)
    pub id: String,
    /// Human-readable URL-safe identifier, absent on links created before slugs existed
    #[serde(default)]
    pub slug: Option<String>,
    /// Release title
    #[serde(default)]
    pub title: Option<String>,
    /// Owning artist's display name
    #[serde(default)]
    pub artist_name: Option<String>,
    /// Artwork reference, either an absolute URL or a site-relative `/path`
    #[serde(default)]
    pub artwork_url: Option<String>,
    /// Free-text description
    #[serde(default)]
    pub description: Option<String>,
    /// Release date as stored (`YYYY-MM-DD`, sometimes a full timestamp)
    #[serde(default)]
    pub release_date: Option<String>,
    /// Destinations in backend order; order carries no meaning
    #[serde(default)]
    pub targets: Vec<OutboundTarget>,
    /// Owner has opted out of the "Powered by" footer
    #[serde(default)]
    pub hide_branding: bool,
}

impl LinkRecord {
    /// Locator used for the canonical page: the slug when present, else the id
    pub fn locator(&self) -> &str {
        self.slug
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.id)
    }

    pub fn title_or_empty(&self) -> &str {
        self.title.as_deref().map(str::trim).unwrap_or("")
    }

    pub fn artist_or_empty(&self) -> &str {
        self.artist_name.as_deref().map(str::trim).unwrap_or("")
    }

    /// Parsed release date, tolerant of `YYYY-MM-DD` and RFC 3339 timestamps
    pub fn parsed_release_date(&self) -> Option<NaiveDate> {
        let raw = self.release_date.as_deref()?.trim();
        let date_part = raw.get(..10).unwrap_or(raw);
        NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
    }
}

/// One streaming-service destination belonging to a link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundTarget {
    pub id: String,
    /// Short platform code, e.g. `spotify`
    pub platform_id: String,
    /// Display name, e.g. `Spotify`
    pub platform_name: String,
    pub url: String,
}

/// One human view of a smart link, written fire-and-forget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewEvent {
    pub link_id: String,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    pub viewed_at: DateTime<Utc>,
}

/// One public link as listed in the sitemap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SitemapEntry {
    pub slug: String,
    /// Last modification timestamp as stored, if any
    pub updated_at: Option<String>,
}

impl SitemapEntry {
    /// `YYYY-MM-DD` portion of `updated_at`, if it looks like a date
    pub fn lastmod(&self) -> Option<NaiveDate> {
        let raw = self.updated_at.as_deref()?.trim();
        NaiveDate::parse_from_str(raw.get(..10).unwrap_or(raw), "%Y-%m-%d").ok()
    }
}
