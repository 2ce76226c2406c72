use crate::types::{ClipRecord, ListingSort, RawPost, Result};
use async_trait::async_trait;

/// Trait for listing raw posts from a channel (a subreddit, a user page, ...)
#[async_trait]
pub trait PostSource: Send + Sync {
    /// Human-readable name for this source
    fn source_name(&self) -> String;

    /// Fetch the newest page of posts for `channel`.
    /// Failures come back as `AggregatorError::Fetch`.
    async fn list_posts(&self, channel: &str, sort: ListingSort) -> Result<Vec<RawPost>>;
}

/// Trait for resolving a short-clip id to something playable
#[async_trait]
pub trait ClipResolver: Send + Sync {
    async fn resolve_clip(&self, clip_id: &str) -> Result<ClipRecord>;
}
