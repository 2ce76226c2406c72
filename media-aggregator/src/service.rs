use crate::aggregator::MediaAggregator;
use crate::cache::{merge_fresh, CacheEntry, CacheStore};
use crate::pagination::page;
use crate::types::{MediaItem, MediaKind, Page};
use std::sync::Arc;
use tracing::{info, warn};

pub const DEFAULT_LIMIT: usize = 24;

#[derive(Debug, Clone)]
pub struct MediaQuery {
    pub category: String,
    pub limit: usize,
    pub offset: usize,
    pub filter: Option<MediaKind>,
    /// Drop the cached list before answering.
    pub reset: bool,
    /// Aggregate again and merge new items in front of the cached list.
    pub refresh: bool,
}

impl MediaQuery {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            limit: DEFAULT_LIMIT,
            offset: 0,
            filter: None,
            reset: false,
            refresh: false,
        }
    }
}

/// Serves pages of a category from the cache, aggregating when the cache
/// has nothing usable. Cache failures degrade to an uncached answer.
pub struct MediaService {
    aggregator: Arc<MediaAggregator>,
    cache: Arc<dyn CacheStore>,
}

impl MediaService {
    pub fn new(aggregator: Arc<MediaAggregator>, cache: Arc<dyn CacheStore>) -> Self {
        Self { aggregator, cache }
    }

    pub fn categories(&self) -> Vec<String> {
        self.aggregator.categories().category_names()
    }

    pub async fn media(&self, query: &MediaQuery) -> Page {
        let category = query.category.as_str();
        if !self.aggregator.categories().contains(category) {
            warn!("Unknown category requested: {}", category);
            return page(&[], query.offset, query.limit, query.filter);
        }

        if query.reset {
            info!("Resetting cache for {}", category);
            if let Err(e) = self.cache.evict(category).await {
                warn!("Failed to evict {}: {}", category, e);
            }
        }

        let items = match self.cached(category).await {
            None => {
                let items = self.aggregator.aggregate(category).await;
                self.store(category, &items).await;
                items
            }
            Some(entry) if query.refresh => {
                let fresh = self.aggregator.aggregate(category).await;
                let merged = merge_fresh(&entry.items, fresh);
                self.store(category, &merged).await;
                merged
            }
            Some(entry) => entry.items,
        };

        page(&items, query.offset, query.limit, query.filter)
    }

    async fn cached(&self, category: &str) -> Option<CacheEntry> {
        match self.cache.get(category).await {
            Ok(Some(entry)) if entry.is_stale() => {
                info!("Cache for {} expired", category);
                if let Err(e) = self.cache.evict(category).await {
                    warn!("Failed to evict {}: {}", category, e);
                }
                None
            }
            Ok(entry) => entry,
            Err(e) => {
                warn!("Cache read for {} failed: {}", category, e);
                None
            }
        }
    }

    async fn store(&self, category: &str, items: &[MediaItem]) {
        let entry = CacheEntry::new(items.to_vec());
        if let Err(e) = self.cache.put(category, &entry).await {
            warn!("Cache write for {} failed: {}", category, e);
        }
    }
}
