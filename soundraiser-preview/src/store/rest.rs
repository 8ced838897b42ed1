//! PostgREST (Supabase) link store
//!
//! Each lookup is a single request: `smart_links` with its `platform_links`
//! and the owner's `profiles` row embedded through foreign keys.
//!
//! The identifier fallback only runs for locators that parse as a UUID, the
//! type of the hosted `id` column. Numeric or other opaque identifiers from
//! old URLs cannot match that column (PostgREST rejects the filter with
//! 400), so they resolve to not-found without a second request and get the
//! fallback page. The SQLite mirror has a text `id` and tries every locator.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_RANGE};
use reqwest::{Method, RequestBuilder, Response};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use soundraiser_common::{Error, LinkRecord, OutboundTarget, Result, SitemapEntry, ViewEvent};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use super::LinkStore;

const USER_AGENT: &str = concat!("soundraiser-preview/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 10;

const LINK_SELECT: &str = "id,slug,title,artist_name,artwork_url,description,release_date,\
                           platform_links(id,platform_id,platform_name,url),\
                           profiles(hide_branding)";

/// Link store backed by a Supabase project's REST endpoint
pub struct RestLinkStore {
    http: reqwest::Client,
    rest_url: String,
    key: String,
}

impl RestLinkStore {
    /// `base_url` is the project URL, e.g. `https://abc.supabase.co`
    pub fn new(base_url: &str, key: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Internal(format!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            http,
            rest_url: format!("{}/rest/v1", base_url.trim_end_matches('/')),
            key: key.to_string(),
        })
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/{}", self.rest_url, table))
            .header("apikey", &self.key)
            .header(AUTHORIZATION, format!("Bearer {}", self.key))
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<Option<LinkRecord>> {
        let filter = format!("eq.{}", value);
        debug!(column = %column, value = %value, "Querying smart_links");

        let response = self
            .request(Method::GET, "smart_links")
            .header(ACCEPT, "application/json")
            .query(&[
                ("select", LINK_SELECT),
                (column, filter.as_str()),
                ("limit", "1"),
            ])
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("smart_links request failed: {}", e)))?;

        let response = ensure_success(response, "smart_links").await?;
        let rows: Vec<LinkRow> = response
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("Invalid smart_links response: {}", e)))?;

        Ok(rows.into_iter().next().map(LinkRow::into_record))
    }
}

#[async_trait]
impl LinkStore for RestLinkStore {
    fn backend_name(&self) -> &'static str {
        "postgrest"
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<LinkRecord>> {
        self.find_one("slug", slug).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<LinkRecord>> {
        // The id column is a UUID; PostgREST rejects anything else with 400
        if Uuid::parse_str(id).is_err() {
            debug!(id = %id, "Locator is not a UUID, skipping id lookup");
            return Ok(None);
        }
        self.find_one("id", id).await
    }

    async fn record_view(&self, view: &ViewEvent) -> Result<()> {
        let body = json!({
            "smart_link_id": view.link_id,
            "user_agent": view.user_agent,
            "referrer": view.referrer,
            "viewed_at": view.viewed_at.to_rfc3339(),
        });

        let response = self
            .request(Method::POST, "link_views")
            .header("Prefer", "return=minimal")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("link_views insert failed: {}", e)))?;

        ensure_success(response, "link_views").await?;
        Ok(())
    }

    async fn count_public_links(&self) -> Result<u64> {
        let response = self
            .request(Method::GET, "smart_links")
            .header("Prefer", "count=exact")
            .query(&[("select", "slug"), ("slug", "not.is.null"), ("limit", "1")])
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("smart_links count failed: {}", e)))?;

        let response = ensure_success(response, "smart_links").await?;
        let range = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        parse_content_range_total(range).ok_or_else(|| {
            Error::Upstream(format!("Missing or invalid Content-Range: {:?}", range))
        })
    }

    async fn list_public_links(&self, offset: u64, limit: u64) -> Result<Vec<SitemapEntry>> {
        let offset = offset.to_string();
        let limit = limit.to_string();

        let response = self
            .request(Method::GET, "smart_links")
            .header(ACCEPT, "application/json")
            .query(&[
                ("select", "slug,updated_at"),
                ("slug", "not.is.null"),
                ("order", "slug.asc"),
                ("offset", offset.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("smart_links listing failed: {}", e)))?;

        let response = ensure_success(response, "smart_links").await?;
        let rows: Vec<SitemapRow> = response
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("Invalid smart_links listing: {}", e)))?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                row.slug.map(|slug| SitemapEntry {
                    slug,
                    updated_at: row.updated_at,
                })
            })
            .collect())
    }
}

async fn ensure_success(response: Response, table: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::Upstream(format!(
        "PostgREST {} on {}: {}",
        status.as_u16(),
        table,
        body
    )))
}

/// Total from a PostgREST `Content-Range` header (`0-0/42`, `*/0`)
fn parse_content_range_total(range: &str) -> Option<u64> {
    range.rsplit_once('/')?.1.trim().parse().ok()
}

#[derive(Debug, Deserialize)]
struct LinkRow {
    #[serde(deserialize_with = "id_string")]
    id: String,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    artist_name: Option<String>,
    #[serde(default)]
    artwork_url: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    platform_links: Vec<TargetRow>,
    #[serde(default)]
    profiles: Option<ProfileRow>,
}

#[derive(Debug, Deserialize)]
struct TargetRow {
    #[serde(deserialize_with = "id_string")]
    id: String,
    #[serde(default)]
    platform_id: Option<String>,
    #[serde(default)]
    platform_name: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProfileRow {
    #[serde(default)]
    hide_branding: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct SitemapRow {
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
}

impl LinkRow {
    fn into_record(self) -> LinkRecord {
        let targets = self
            .platform_links
            .into_iter()
            .filter_map(|t| {
                let url = t.url?;
                let platform_id = t.platform_id.unwrap_or_default();
                let platform_name = t.platform_name.unwrap_or_else(|| platform_id.clone());
                Some(OutboundTarget {
                    id: t.id,
                    platform_id,
                    platform_name,
                    url,
                })
            })
            .collect();

        LinkRecord {
            id: self.id,
            slug: self.slug,
            title: self.title,
            artist_name: self.artist_name,
            artwork_url: self.artwork_url,
            description: self.description,
            release_date: self.release_date,
            targets,
            hide_branding: self
                .profiles
                .and_then(|p| p.hide_branding)
                .unwrap_or(false),
        }
    }
}

/// Accept string or numeric identifiers
fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Vec<TargetRow>, D::Error> {
    Ok(Option::<Vec<TargetRow>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_embedded_row() {
        let body = r#"[{
            "id": "2b1c6a4e-93f2-4a57-a5a3-0d4b8c1e7f10",
            "slug": "my-song",
            "title": "My Song",
            "artist_name": "DJ X",
            "artwork_url": "/a.png",
            "description": null,
            "release_date": "2024-05-01",
            "platform_links": [
                {"id": 7, "platform_id": "spotify", "platform_name": "Spotify", "url": "https://open.spotify.com/track/1"},
                {"id": "x", "platform_id": "apple", "platform_name": null, "url": "https://music.apple.com/1"},
                {"id": "y", "platform_id": "tidal", "platform_name": "Tidal", "url": null}
            ],
            "profiles": {"hide_branding": true}
        }]"#;

        let rows: Vec<LinkRow> = serde_json::from_str(body).unwrap();
        let record = rows.into_iter().next().unwrap().into_record();

        assert_eq!(record.slug.as_deref(), Some("my-song"));
        assert_eq!(record.artist_name.as_deref(), Some("DJ X"));
        assert!(record.hide_branding);
        assert_eq!(record.targets.len(), 2);
        assert_eq!(record.targets[0].id, "7");
        assert_eq!(record.targets[1].platform_name, "apple");
    }

    #[test]
    fn test_decode_sparse_row() {
        let body = r#"[{"id": 42, "platform_links": null, "profiles": null}]"#;
        let rows: Vec<LinkRow> = serde_json::from_str(body).unwrap();
        let record = rows.into_iter().next().unwrap().into_record();
        assert_eq!(record.id, "42");
        assert!(record.title.is_none());
        assert!(record.targets.is_empty());
        assert!(!record.hide_branding);
    }

    #[test]
    fn test_content_range_total() {
        assert_eq!(parse_content_range_total("0-0/42"), Some(42));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("0-0/*"), None);
        assert_eq!(parse_content_range_total(""), None);
    }

    #[tokio::test]
    async fn test_non_uuid_id_skips_request() {
        // Unroutable base URL: any request would fail with Upstream
        let store = RestLinkStore::new("http://127.0.0.1:9", "key").unwrap();
        assert_eq!(store.find_by_id("my-song").await.unwrap(), None);
        assert_eq!(store.find_by_id("12345").await.unwrap(), None);
    }

    #[test]
    fn test_rest_url_normalized() {
        let store = RestLinkStore::new("https://abc.supabase.co/", "key").unwrap();
        assert_eq!(store.rest_url, "https://abc.supabase.co/rest/v1");
    }
}
