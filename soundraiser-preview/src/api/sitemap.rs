//! Sitemap endpoints
//!
//! `GET /sitemap.xml` is the index; `GET /sitemaps/links-<n>.xml` is one
//! page of public links. Unlike previews these surface backend failures
//! as 502, since search engines retry sitemaps.

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::sitemap::{
    effective_page_size, page_count, page_offset, parse_page_file, render_index, render_urlset,
};
use crate::AppState;

const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";
const SITEMAP_CACHE_CONTROL: &str = "public, max-age=3600";

/// GET /sitemap.xml
pub async fn sitemap_index(State(state): State<AppState>) -> ApiResult<Response> {
    let total = state.store.count_public_links().await?;
    let pages = page_count(total, effective_page_size(total, state.sitemap_page_size));
    debug!(total, pages, "Rendering sitemap index");

    Ok(xml_response(render_index(&state.render.origin_str, pages)))
}

/// GET /sitemaps/:file
pub async fn sitemap_page(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> ApiResult<Response> {
    let page = parse_page_file(&file)
        .ok_or_else(|| ApiError::NotFound(format!("sitemap {}", file)))?;

    let total = state.store.count_public_links().await?;
    let page_size = effective_page_size(total, state.sitemap_page_size);
    let pages = page_count(total, page_size);
    if page > pages {
        return Err(ApiError::NotFound(format!(
            "sitemap page {} (of {})",
            page, pages
        )));
    }

    let entries = state
        .store
        .list_public_links(page_offset(page, page_size), page_size)
        .await?;
    debug!(page, entries = entries.len(), "Rendering sitemap page");

    Ok(xml_response(render_urlset(&state.render.origin, &entries)))
}

/// Build sitemap routes
pub fn sitemap_routes() -> Router<AppState> {
    Router::new()
        .route("/sitemap.xml", get(sitemap_index))
        .route("/sitemaps/:file", get(sitemap_page))
}

fn xml_response(body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, XML_CONTENT_TYPE),
            (header::CACHE_CONTROL, SITEMAP_CACHE_CONTROL),
        ],
        body,
    )
        .into_response()
}
