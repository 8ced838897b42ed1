//! soundraiser-preview library - Smart-link preview renderer
//!
//! Serves crawler-aware HTML previews of smart links: social-media preview
//! bots get a static card of meta tags, browsers get the same tags plus a
//! visible card and a short redirect to the interactive page. Rendered pages
//! are cached per client kind for the configured TTL.

use axum::Router;
use soundraiser_common::config::ServiceConfig;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod cache;
pub mod classifier;
pub mod error;
pub mod render;
pub mod sitemap;
pub mod store;
pub mod views;

use cache::{MemoryCache, PreviewCache};
use render::RenderSettings;
use store::LinkStore;
use views::ViewRecorder;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Link metadata backend
    pub store: Arc<dyn LinkStore>,
    /// Rendered-page cache, constructed once at startup
    pub cache: Arc<dyn PreviewCache>,
    pub render: Arc<RenderSettings>,
    pub views: ViewRecorder,
    /// `max-age` advertised on successful previews
    pub cache_ttl: Duration,
    pub stale_while_revalidate: Duration,
    pub sitemap_page_size: u64,
}

impl AppState {
    /// Create application state with an in-process `MemoryCache`
    pub fn new(store: Arc<dyn LinkStore>, config: &ServiceConfig) -> Self {
        let cache = Arc::new(MemoryCache::new(config.cache_ttl));
        Self::with_cache(store, cache, config)
    }

    /// Create application state around an existing cache
    pub fn with_cache(
        store: Arc<dyn LinkStore>,
        cache: Arc<dyn PreviewCache>,
        config: &ServiceConfig,
    ) -> Self {
        Self {
            views: ViewRecorder::new(Arc::clone(&store), config.record_views),
            store,
            cache,
            render: Arc::new(RenderSettings::from_config(config)),
            cache_ttl: config.cache_ttl,
            stale_while_revalidate: config.stale_while_revalidate,
            sitemap_page_size: config.sitemap_page_size,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::preview_routes())
        .merge(api::sitemap_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
