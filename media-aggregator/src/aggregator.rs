use crate::normalizer::{is_candidate, is_gallery, normalize};
use crate::selector::{dedup_channels, CategoryConfig};
use crate::traits::{ClipResolver, PostSource};
use crate::types::{AggregatorConfig, MediaItem, Result};
use crate::utils::url::unescape;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// One category in, one deduplicated newest-first item list out.
pub struct MediaAggregator {
    source: Arc<dyn PostSource>,
    clips: Arc<dyn ClipResolver>,
    categories: Arc<CategoryConfig>,
    config: AggregatorConfig,
}

impl MediaAggregator {
    pub fn new(
        source: Arc<dyn PostSource>,
        clips: Arc<dyn ClipResolver>,
        categories: Arc<CategoryConfig>,
        config: AggregatorConfig,
    ) -> Self {
        Self {
            source,
            clips,
            categories,
            config,
        }
    }

    pub fn categories(&self) -> &CategoryConfig {
        &self.categories
    }

    /// Run one aggregation. An unknown category yields an empty list.
    pub async fn aggregate(&self, category: &str) -> Vec<MediaItem> {
        match self.try_aggregate(category).await {
            Ok(items) => items,
            Err(e) => {
                warn!("Aggregation for {} returned nothing: {}", category, e);
                Vec::new()
            }
        }
    }

    /// Like [`aggregate`](Self::aggregate) but reports an unknown category
    /// as `AggregatorError::InvalidCategory`. Channel failures are still
    /// absorbed.
    pub async fn try_aggregate(&self, category: &str) -> Result<Vec<MediaItem>> {
        let selected = {
            let mut rng = rand::rng();
            self.categories.select_channels(category, &mut rng)?
        };
        let channels = dedup_channels(selected);
        let allow_clips = self.categories.allows_clips(category);

        let batch_size = self.config.batch_size.max(1);
        let batch_count = channels.len().div_ceil(batch_size);
        info!(
            "Aggregating {} from {}: {} channels in {} batches (clips {})",
            category,
            self.source.source_name(),
            channels.len(),
            batch_count,
            if allow_clips { "allowed" } else { "excluded" }
        );

        let seen = Mutex::new(HashSet::new());
        let mut items = Vec::new();
        let mut failed = 0usize;

        for (index, batch) in channels.chunks(batch_size).enumerate() {
            if index > 0 {
                tokio::time::sleep(self.config.batch_delay).await;
            }

            let results = join_all(
                batch
                    .iter()
                    .map(|channel| self.collect_channel(channel, allow_clips, &seen)),
            )
            .await;

            for (channel, result) in batch.iter().zip(results) {
                match result {
                    Ok(found) => {
                        debug!("Channel {} contributed {} items", channel, found.len());
                        items.extend(found);
                    }
                    Err(e) => {
                        failed += 1;
                        error!("Channel {} failed: {}", channel, e);
                    }
                }
            }
            info!("Batch {}/{} done, {} items so far", index + 1, batch_count, items.len());
        }

        sort_newest_first(&mut items);
        info!(
            "Aggregated {} items for {} ({} channels failed)",
            items.len(),
            category,
            failed
        );
        Ok(items)
    }

    /// List one channel and normalize its candidates in order. Clip
    /// resolutions inside a channel therefore never overlap.
    async fn collect_channel(
        &self,
        channel: &str,
        allow_clips: bool,
        seen: &Mutex<HashSet<String>>,
    ) -> Result<Vec<MediaItem>> {
        let posts = self.source.list_posts(channel, self.config.sort).await?;
        let total = posts.len();
        let mut kept = Vec::new();

        for post in posts.iter().filter(|p| is_candidate(p, allow_clips)) {
            if !is_gallery(post) {
                if let Some(url) = post.url.as_deref().map(unescape) {
                    if seen.lock().await.contains(&url) {
                        debug!("Skipping post {}: {} already emitted", post.id, url);
                        continue;
                    }
                }
            }

            for item in normalize(post, allow_clips, self.clips.as_ref()).await {
                if seen.lock().await.insert(item.content_url.clone()) {
                    kept.push(item);
                } else {
                    debug!("Dropping duplicate {}", item.content_url);
                }
            }
        }

        debug!("{}: {} of {} posts kept", channel, kept.len(), total);
        Ok(kept)
    }
}

/// Descending by source timestamp; items without one sink to the end.
/// The sort is stable so equal timestamps keep arrival order.
pub fn sort_newest_first(items: &mut [MediaItem]) {
    items.sort_by(|a, b| {
        let a = a.source_timestamp.unwrap_or(f64::NEG_INFINITY);
        let b = b.source_timestamp.unwrap_or(f64::NEG_INFINITY);
        b.total_cmp(&a)
    });
}
