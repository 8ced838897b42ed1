//! Smart-link preview endpoints
//!
//! `GET /preview?slug=<locator>` and `GET /preview/:locator` run the same
//! pipeline: classify the client, consult the cache, fetch and render on a
//! miss. Every fetch failure (not found or upstream) becomes the generic
//! fallback page with status 200, since crawlers drop the card on any other
//! status. Only a missing locator is rejected, with a plain-text 400.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use soundraiser_common::ViewEvent;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cache::{cache_key, CachedPage};
use crate::classifier::{classify, ClientKind};
use crate::render::{render_fallback, render_preview};
use crate::store::fetch_link;
use crate::AppState;

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Fallback pages are short-lived in shared caches so an outage is not pinned
const FALLBACK_CACHE_CONTROL: &str = "public, max-age=60";

const X_PREVIEW_CACHE: HeaderName = HeaderName::from_static("x-preview-cache");

/// Query parameters for `GET /preview`
#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    /// Link slug or primary identifier
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

/// GET /preview?slug=<locator>
pub async fn preview_by_query(
    State(state): State<AppState>,
    Query(query): Query<PreviewQuery>,
    headers: HeaderMap,
) -> Response {
    match query.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(locator) => serve_preview(&state, locator, &headers).await,
        None => missing_locator(),
    }
}

/// GET /preview/:locator
pub async fn preview_by_path(
    State(state): State<AppState>,
    Path(locator): Path<String>,
    headers: HeaderMap,
) -> Response {
    let locator = locator.trim();
    if locator.is_empty() {
        return missing_locator();
    }
    serve_preview(&state, locator, &headers).await
}

/// GET /preview/ (empty path segment)
pub async fn preview_without_locator() -> Response {
    missing_locator()
}

/// Build preview routes
pub fn preview_routes() -> Router<AppState> {
    Router::new()
        .route("/preview", get(preview_by_query))
        // `:locator` never matches an empty segment
        .route("/preview/", get(preview_without_locator))
        .route("/preview/:locator", get(preview_by_path))
}

async fn serve_preview(state: &AppState, locator: &str, headers: &HeaderMap) -> Response {
    let user_agent = header_str(headers, header::USER_AGENT);
    let kind = classify(user_agent.unwrap_or_default());
    let key = cache_key(kind, locator);

    if let Some(page) = state.cache.lookup(&key).await {
        debug!(key = %key, "Preview cache hit");
        count_view(state, kind, &page.link_id, headers);
        return html_response(page.body, success_cache_control(state), CacheStatus::Hit);
    }

    debug!(key = %key, "Preview cache miss");

    match fetch_link(state.store.as_ref(), locator).await {
        Ok(record) => {
            let body = render_preview(&record, kind, &state.render);
            state
                .cache
                .store(
                    &key,
                    CachedPage {
                        link_id: record.id.clone(),
                        body: body.clone(),
                    },
                )
                .await;
            count_view(state, kind, &record.id, headers);
            html_response(body, success_cache_control(state), CacheStatus::Miss)
        }
        Err(e) => {
            if e.is_not_found() {
                info!(locator = %locator, "Link not found, serving fallback page");
            } else {
                warn!(locator = %locator, "Link lookup failed, serving fallback page: {}", e);
            }
            html_response(
                render_fallback(kind, &state.render),
                FALLBACK_CACHE_CONTROL.to_string(),
                CacheStatus::Miss,
            )
        }
    }
}

/// Browser views only; crawler fetches are not audience
fn count_view(state: &AppState, kind: ClientKind, link_id: &str, headers: &HeaderMap) {
    if kind != ClientKind::Browser {
        return;
    }
    state.views.record(ViewEvent {
        link_id: link_id.to_string(),
        user_agent: header_str(headers, header::USER_AGENT).map(str::to_string),
        referrer: header_str(headers, header::REFERER).map(str::to_string),
        viewed_at: Utc::now(),
    });
}

fn header_str(headers: &HeaderMap, name: HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn success_cache_control(state: &AppState) -> String {
    cache_control(state.cache_ttl, state.stale_while_revalidate)
}

fn cache_control(ttl: Duration, stale_while_revalidate: Duration) -> String {
    format!(
        "public, max-age={}, stale-while-revalidate={}",
        ttl.as_secs(),
        stale_while_revalidate.as_secs()
    )
}

fn html_response(body: String, cache_control: String, cache_status: CacheStatus) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HTML_CONTENT_TYPE.to_string()),
            (header::CACHE_CONTROL, cache_control),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*".to_string()),
            (header::VARY, "User-Agent".to_string()),
            (X_PREVIEW_CACHE, cache_status.as_str().to_string()),
        ],
        body,
    )
        .into_response()
}

fn missing_locator() -> Response {
    (
        StatusCode::BAD_REQUEST,
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        ],
        "Missing slug parameter",
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_router;
    use crate::store::testing::{link, MemoryStore};
    use axum::body::Body;
    use axum::http::Request;
    use soundraiser_common::config::{ConfigOverrides, ServiceConfig, TomlConfig};
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use tower::util::ServiceExt;

    const BROWSER_UA: &str =
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_0) AppleWebKit/605.1.15 Safari/605.1.15";
    const CRAWLER_UA: &str = "facebookexternalhit/1.1";

    fn config() -> ServiceConfig {
        ServiceConfig::resolve(
            ConfigOverrides {
                backend_url: Some("sqlite::memory:".to_string()),
                site_origin: Some("https://example.test".to_string()),
                ..Default::default()
            },
            TomlConfig::default(),
        )
        .unwrap()
    }

    fn app(store: Arc<MemoryStore>) -> Router {
        build_router(AppState::new(store, &config()))
    }

    fn get(uri: &str, user_agent: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::USER_AGENT, user_agent)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn wait_for_views(store: &MemoryStore, expected: usize) -> usize {
        for _ in 0..50 {
            let count = store.views.lock().unwrap().len();
            if count >= expected {
                return count;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        store.views.lock().unwrap().len()
    }

    #[tokio::test]
    async fn test_upstream_failure_serves_fallback() {
        let store = Arc::new(MemoryStore::with_links(vec![link("id-1", Some("my-song"), "My Song")]));
        store.fail.store(true, Ordering::SeqCst);

        let response = app(store)
            .oneshot(get("/preview?slug=my-song", CRAWLER_UA))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CACHE_CONTROL], FALLBACK_CACHE_CONTROL);
        let body = body_text(response).await;
        assert!(body.contains("og:type\" content=\"website\""));
        assert!(!body.contains("My Song"));
    }

    #[tokio::test]
    async fn test_fallback_is_not_cached() {
        let store = Arc::new(MemoryStore::with_links(vec![link("id-1", Some("my-song"), "My Song")]));
        store.fail.store(true, Ordering::SeqCst);
        let router = app(store.clone());

        let first = router
            .clone()
            .oneshot(get("/preview?slug=my-song", CRAWLER_UA))
            .await
            .unwrap();
        assert!(!body_text(first).await.contains("My Song"));

        // Backend recovers: the next request renders the link
        store.fail.store(false, Ordering::SeqCst);
        let second = router
            .oneshot(get("/preview?slug=my-song", CRAWLER_UA))
            .await
            .unwrap();
        assert_eq!(second.headers()[&X_PREVIEW_CACHE], "MISS");
        assert!(body_text(second).await.contains("My Song"));
    }

    #[tokio::test]
    async fn test_cache_hit_skips_backend() {
        let store = Arc::new(MemoryStore::with_links(vec![link("id-1", Some("my-song"), "My Song")]));
        let router = app(store.clone());

        let first = router
            .clone()
            .oneshot(get("/preview/my-song", CRAWLER_UA))
            .await
            .unwrap();
        assert_eq!(first.headers()[&X_PREVIEW_CACHE], "MISS");
        let first_body = body_text(first).await;

        let second = router
            .oneshot(get("/preview/my-song", CRAWLER_UA))
            .await
            .unwrap();
        assert_eq!(second.headers()[&X_PREVIEW_CACHE], "HIT");
        assert_eq!(body_text(second).await, first_body);
        assert_eq!(store.slug_lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_variants_cached_separately() {
        let store = Arc::new(MemoryStore::with_links(vec![link("id-1", Some("my-song"), "My Song")]));
        let router = app(store.clone());

        let crawler = router
            .clone()
            .oneshot(get("/preview/my-song", CRAWLER_UA))
            .await
            .unwrap();
        assert!(!body_text(crawler).await.contains("<script"));

        let browser = router
            .oneshot(get("/preview/my-song", BROWSER_UA))
            .await
            .unwrap();
        assert_eq!(browser.headers()[&X_PREVIEW_CACHE], "MISS");
        assert!(body_text(browser).await.contains("location.replace"));
    }

    #[tokio::test]
    async fn test_browser_views_counted_on_hit_and_miss() {
        let store = Arc::new(MemoryStore::with_links(vec![link("id-1", Some("my-song"), "My Song")]));
        let router = app(store.clone());

        for _ in 0..2 {
            let request = Request::builder()
                .uri("/preview?slug=my-song")
                .header(header::USER_AGENT, BROWSER_UA)
                .header(header::REFERER, "https://instagram.com/")
                .body(Body::empty())
                .unwrap();
            router.clone().oneshot(request).await.unwrap();
        }

        assert_eq!(wait_for_views(&store, 2).await, 2);
        let views = store.views.lock().unwrap();
        assert!(views.iter().all(|v| v.link_id == "id-1"));
        assert_eq!(views[0].referrer.as_deref(), Some("https://instagram.com/"));
    }

    #[tokio::test]
    async fn test_crawler_fetch_not_counted() {
        let store = Arc::new(MemoryStore::with_links(vec![link("id-1", Some("my-song"), "My Song")]));
        let response = app(store.clone())
            .oneshot(get("/preview?slug=my-song", CRAWLER_UA))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(store.views.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_slug_rejected() {
        let store = Arc::new(MemoryStore::default());
        let response = app(store.clone())
            .oneshot(get("/preview?slug=%20%20", BROWSER_UA))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(store.slug_lookups.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cache_control_format() {
        assert_eq!(
            cache_control(Duration::from_secs(3600), Duration::from_secs(86_400)),
            "public, max-age=3600, stale-while-revalidate=86400"
        );
    }
}
