use crate::types::{MediaItem, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use tokio::sync::RwLock;
use tracing::{debug, info};

pub const CACHE_TTL_HOURS: i64 = 24;

pub fn cache_ttl() -> Duration {
    Duration::hours(CACHE_TTL_HOURS)
}

/// Ordered item list stored per category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub items: Vec<MediaItem>,
    pub written_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(items: Vec<MediaItem>) -> Self {
        Self {
            items,
            written_at: Utc::now(),
        }
    }

    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.written_at) > cache_ttl()
    }

    pub fn is_stale(&self) -> bool {
        self.is_stale_at(Utc::now())
    }
}

/// Put fresh items the cache has not seen in front of the cached list.
pub fn merge_fresh(cached: &[MediaItem], fresh: Vec<MediaItem>) -> Vec<MediaItem> {
    let mut known: HashSet<String> = cached.iter().map(|item| item.content_url.clone()).collect();
    let mut merged: Vec<MediaItem> = fresh
        .into_iter()
        .filter(|item| known.insert(item.content_url.clone()))
        .collect();
    debug!("Merging {} new items ahead of {} cached", merged.len(), cached.len());
    merged.extend(cached.iter().cloned());
    merged
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, category: &str) -> Result<Option<CacheEntry>>;

    async fn put(&self, category: &str, entry: &CacheEntry) -> Result<()>;

    async fn evict(&self, category: &str) -> Result<()>;

    /// Drop every entry older than the TTL; returns how many went.
    async fn evict_stale(&self, now: DateTime<Utc>) -> Result<usize>;
}

#[derive(Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, category: &str) -> Result<Option<CacheEntry>> {
        Ok(self.entries.read().await.get(category).cloned())
    }

    async fn put(&self, category: &str, entry: &CacheEntry) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(category.to_string(), entry.clone());
        Ok(())
    }

    async fn evict(&self, category: &str) -> Result<()> {
        self.entries.write().await.remove(category);
        Ok(())
    }

    async fn evict_stale(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_stale_at(now));
        Ok(before - entries.len())
    }
}

/// One row per category: the item list as JSON plus its write time.
pub struct SqliteCacheStore {
    db: SqlitePool,
}

impl SqliteCacheStore {
    /// Open (creating if needed) the database file behind `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let db = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Self::from_pool(db).await
    }

    /// In-memory databases are per connection, so the pool is pinned to one.
    pub async fn in_memory() -> Result<Self> {
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::from_pool(db).await
    }

    pub async fn from_pool(db: SqlitePool) -> Result<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS media_cache (
                category TEXT PRIMARY KEY,
                items TEXT NOT NULL,
                written_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&db)
        .await?;

        info!("Media cache table ready");
        Ok(Self { db })
    }
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn get(&self, category: &str) -> Result<Option<CacheEntry>> {
        let row = sqlx::query("SELECT items, written_at FROM media_cache WHERE category = ?")
            .bind(category)
            .fetch_optional(&self.db)
            .await?;

        match row {
            Some(row) => {
                let items: String = row.try_get("items")?;
                let written_at: DateTime<Utc> = row.try_get("written_at")?;
                Ok(Some(CacheEntry {
                    items: serde_json::from_str(&items)?,
                    written_at,
                }))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, category: &str, entry: &CacheEntry) -> Result<()> {
        let items = serde_json::to_string(&entry.items)?;
        sqlx::query(
            r#"
            INSERT INTO media_cache (category, items, written_at)
            VALUES (?, ?, ?)
            ON CONFLICT(category) DO UPDATE SET items = excluded.items, written_at = excluded.written_at
            "#,
        )
        .bind(category)
        .bind(items)
        .bind(entry.written_at)
        .execute(&self.db)
        .await?;

        debug!("Cached {} items for {}", entry.items.len(), category);
        Ok(())
    }

    async fn evict(&self, category: &str) -> Result<()> {
        sqlx::query("DELETE FROM media_cache WHERE category = ?")
            .bind(category)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn evict_stale(&self, now: DateTime<Utc>) -> Result<usize> {
        let cutoff = now - cache_ttl();
        let result = sqlx::query("DELETE FROM media_cache WHERE written_at < ?")
            .bind(cutoff)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() as usize)
    }
}
