//! Link metadata access
//!
//! `LinkStore` abstracts the data backend. Two implementations exist:
//! - `RestLinkStore`: the hosted Supabase project through PostgREST
//! - `SqliteLinkStore`: a local SQLite mirror (development, tests)
//!
//! The Metadata Fetcher (`fetch_link`) tries the slug first and the
//! primary identifier second, so links shared before slugs existed keep
//! resolving. Nothing here retries; upstream errors go straight back to
//! the caller.

mod rest;
mod sqlite;

pub use rest::RestLinkStore;
pub use sqlite::SqliteLinkStore;

use async_trait::async_trait;
use soundraiser_common::config::{BackendKind, ServiceConfig};
use soundraiser_common::{Error, LinkRecord, Result, SitemapEntry, ViewEvent};
use std::sync::Arc;
use tracing::{debug, info};

/// Read access to smart links plus the view-counter write
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Short backend name for logs and health output
    fn backend_name(&self) -> &'static str;

    /// Link whose slug equals `slug`
    async fn find_by_slug(&self, slug: &str) -> Result<Option<LinkRecord>>;

    /// Link whose primary identifier equals `id`
    async fn find_by_id(&self, id: &str) -> Result<Option<LinkRecord>>;

    /// Append one view to the analytics table
    async fn record_view(&self, view: &ViewEvent) -> Result<()>;

    /// Number of public links with a slug
    async fn count_public_links(&self) -> Result<u64>;

    /// One page of public links ordered by slug
    async fn list_public_links(&self, offset: u64, limit: u64) -> Result<Vec<SitemapEntry>>;
}

/// Load a link by slug, falling back to its primary identifier
///
/// # Errors
///
/// - `Error::NotFound` when neither lookup matches
/// - `Error::Upstream` / `Error::Database` when the backend fails
pub async fn fetch_link(store: &dyn LinkStore, locator: &str) -> Result<LinkRecord> {
    if let Some(record) = store.find_by_slug(locator).await? {
        return Ok(record);
    }

    debug!(locator = %locator, "No link with this slug, trying identifier");

    store
        .find_by_id(locator)
        .await?
        .ok_or_else(|| Error::NotFound(format!("smart link {:?}", locator)))
}

/// Build the store named by the configured backend URL
pub async fn connect(config: &ServiceConfig) -> Result<Arc<dyn LinkStore>> {
    match config.backend_kind {
        BackendKind::Rest => {
            let key = config.backend_key.as_deref().ok_or_else(|| {
                Error::Config("Backend key is required for HTTP backends".to_string())
            })?;
            let store = RestLinkStore::new(&config.backend_url, key)?;
            info!("Using PostgREST backend at {}", config.backend_url);
            Ok(Arc::new(store))
        }
        BackendKind::Sqlite => {
            let store = SqliteLinkStore::connect(&config.backend_url).await?;
            info!("Using SQLite backend at {}", config.backend_url);
            Ok(Arc::new(store))
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{link, MemoryStore};
    use super::*;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_fetch_by_slug() {
        let store = MemoryStore::with_links(vec![link("id-1", Some("my-song"), "My Song")]);
        let record = fetch_link(&store, "my-song").await.unwrap();
        assert_eq!(record.id, "id-1");
        assert_eq!(store.id_lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fetch_falls_back_to_id() {
        let store = MemoryStore::with_links(vec![link("legacy-42", None, "Old Song")]);
        let record = fetch_link(&store, "legacy-42").await.unwrap();
        assert_eq!(record.title.as_deref(), Some("Old Song"));
        assert_eq!(store.slug_lookups.load(Ordering::SeqCst), 1);
        assert_eq!(store.id_lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_slug_wins_over_id() {
        // A slug that happens to equal another link's id resolves to the slug owner
        let store = MemoryStore::with_links(vec![
            link("abc", Some("first"), "By Id"),
            link("other", Some("abc"), "By Slug"),
        ]);
        let record = fetch_link(&store, "abc").await.unwrap();
        assert_eq!(record.title.as_deref(), Some("By Slug"));
    }

    #[tokio::test]
    async fn test_fetch_not_found() {
        let store = MemoryStore::default();
        let err = fetch_link(&store, "missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_upstream_failure_not_retried() {
        let store = MemoryStore::with_links(vec![link("id-1", Some("my-song"), "My Song")]);
        store.fail.store(true, Ordering::SeqCst);
        let err = fetch_link(&store, "my-song").await.unwrap_err();
        assert!(err.is_upstream());
        assert_eq!(store.slug_lookups.load(Ordering::SeqCst), 1);
        assert_eq!(store.id_lookups.load(Ordering::SeqCst), 0);
    }
}
