//! Rendered-page cache
//!
//! Pages are memoized per (client kind, locator) for a fixed TTL. The cache
//! is constructed once at startup and handed to the router through
//! `AppState`, so a shared store can replace `MemoryCache` without touching
//! handler code.
//!
//! There is no eviction beyond staleness and no invalidation when a link is
//! edited: an edited link may serve its previous preview for up to one TTL.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::classifier::ClientKind;

/// A rendered preview as held in the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPage {
    /// Identifier of the link the page was rendered from (for view attribution)
    pub link_id: String,
    /// Complete HTML document
    pub body: String,
}

/// Key → rendered page store with time-based expiry
#[async_trait]
pub trait PreviewCache: Send + Sync {
    /// Page stored under `key` if it is younger than the TTL
    ///
    /// Never-stored and expired keys are indistinguishable to the caller.
    async fn lookup(&self, key: &str) -> Option<CachedPage>;

    /// Store `page` under `key`, replacing any previous entry
    async fn store(&self, key: &str, page: CachedPage);
}

/// Cache key for a locator rendered for a given client kind
pub fn cache_key(kind: ClientKind, locator: &str) -> String {
    format!("{}:{}", kind.as_str(), locator)
}

struct CacheEntry {
    page: CachedPage,
    stored_at: Instant,
}

/// In-process cache; lifetime is the process lifetime
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl MemoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of resident entries, stale ones included
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl PreviewCache for MemoryCache {
    async fn lookup(&self, key: &str) -> Option<CachedPage> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        // An entry exactly TTL old is already expired
        if entry.stored_at.elapsed() < self.ttl {
            Some(entry.page.clone())
        } else {
            None
        }
    }

    async fn store(&self, key: &str, page: CachedPage) {
        let entry = CacheEntry {
            page,
            stored_at: Instant::now(),
        };
        self.entries.write().await.insert(key.to_string(), entry);
    }
}
