//! SQLite mirror link store
//!
//! Mirrors the hosted tables closely enough to serve previews offline and
//! to back the integration tests. A link and its targets come from one
//! `LEFT JOIN` query; the rows are folded into a single `LinkRecord`.

use async_trait::async_trait;
use chrono::SecondsFormat;
use soundraiser_common::{LinkRecord, OutboundTarget, Result, SitemapEntry, ViewEvent};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::time::Duration;

use super::LinkStore;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS profiles (
        id TEXT PRIMARY KEY,
        hide_branding INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS smart_links (
        id TEXT PRIMARY KEY,
        slug TEXT UNIQUE,
        title TEXT,
        artist_name TEXT,
        artwork_url TEXT,
        description TEXT,
        release_date TEXT,
        user_id TEXT REFERENCES profiles(id),
        updated_at TEXT
    )",
    "CREATE TABLE IF NOT EXISTS platform_links (
        id TEXT PRIMARY KEY,
        smart_link_id TEXT NOT NULL REFERENCES smart_links(id) ON DELETE CASCADE,
        platform_id TEXT NOT NULL,
        platform_name TEXT NOT NULL,
        url TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS link_views (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        smart_link_id TEXT NOT NULL,
        user_agent TEXT,
        referrer TEXT,
        viewed_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_platform_links_smart_link ON platform_links(smart_link_id)",
];

/// Column a link lookup filters on
#[derive(Debug, Clone, Copy)]
enum LookupField {
    Slug,
    Id,
}

impl LookupField {
    fn column(&self) -> &'static str {
        match self {
            LookupField::Slug => "l.slug",
            LookupField::Id => "l.id",
        }
    }
}

/// Link store over a SQLite database
#[derive(Clone)]
pub struct SqliteLinkStore {
    pool: SqlitePool,
}

impl SqliteLinkStore {
    /// Open (creating if needed) the database at `url` and ensure the schema
    pub async fn connect(url: &str) -> Result<Self> {
        let in_memory = url.contains(":memory:");
        let url = if url.contains('?') || in_memory {
            url.to_string()
        } else {
            format!("{}?mode=rwc", url)
        };

        let mut options = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5));
        if in_memory {
            // Each connection to :memory: opens its own empty database, and
            // closing the last one drops it
            options = options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = options.connect(&url).await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Wrap an existing pool; the caller is responsible for the schema
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create mirror tables if they do not exist
    pub async fn init_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn find(&self, field: LookupField, value: &str) -> Result<Option<LinkRecord>> {
        let sql = format!(
            "SELECT l.id, l.slug, l.title, l.artist_name, l.artwork_url, l.description,
                    l.release_date, COALESCE(p.hide_branding, 0) AS hide_branding,
                    t.id AS target_id, t.platform_id, t.platform_name, t.url
             FROM smart_links l
             LEFT JOIN profiles p ON p.id = l.user_id
             LEFT JOIN platform_links t ON t.smart_link_id = l.id
             WHERE {} = ?",
            field.column()
        );

        let rows = sqlx::query(&sql).bind(value).fetch_all(&self.pool).await?;
        fold_rows(&rows)
    }
}

/// Fold joined rows (one per target, or one with NULL target) into a record
fn fold_rows(rows: &[SqliteRow]) -> Result<Option<LinkRecord>> {
    let Some(first) = rows.first() else {
        return Ok(None);
    };

    let mut record = LinkRecord {
        id: first.try_get("id")?,
        slug: first.try_get("slug")?,
        title: first.try_get("title")?,
        artist_name: first.try_get("artist_name")?,
        artwork_url: first.try_get("artwork_url")?,
        description: first.try_get("description")?,
        release_date: first.try_get("release_date")?,
        targets: Vec::with_capacity(rows.len()),
        hide_branding: first.try_get::<i64, _>("hide_branding")? != 0,
    };

    for row in rows {
        let Some(target_id) = row.try_get::<Option<String>, _>("target_id")? else {
            continue;
        };
        record.targets.push(OutboundTarget {
            id: target_id,
            platform_id: row.try_get("platform_id")?,
            platform_name: row.try_get("platform_name")?,
            url: row.try_get("url")?,
        });
    }

    Ok(Some(record))
}

#[async_trait]
impl LinkStore for SqliteLinkStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<LinkRecord>> {
        self.find(LookupField::Slug, slug).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<LinkRecord>> {
        self.find(LookupField::Id, id).await
    }

    async fn record_view(&self, view: &ViewEvent) -> Result<()> {
        sqlx::query(
            "INSERT INTO link_views (smart_link_id, user_agent, referrer, viewed_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&view.link_id)
        .bind(&view.user_agent)
        .bind(&view.referrer)
        .bind(view.viewed_at.to_rfc3339_opts(SecondsFormat::Secs, true))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn count_public_links(&self) -> Result<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM smart_links WHERE slug IS NOT NULL")
                .fetch_one(&self.pool)
                .await?;
        Ok(count.max(0) as u64)
    }

    async fn list_public_links(&self, offset: u64, limit: u64) -> Result<Vec<SitemapEntry>> {
        let rows = sqlx::query(
            "SELECT slug, updated_at FROM smart_links
             WHERE slug IS NOT NULL
             ORDER BY slug ASC
             LIMIT ? OFFSET ?",
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .bind(i64::try_from(offset).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(SitemapEntry {
                    slug: row.try_get("slug")?,
                    updated_at: row.try_get("updated_at")?,
                })
            })
            .collect()
    }
}
