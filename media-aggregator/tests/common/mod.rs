#![allow(dead_code)]

use async_trait::async_trait;
use media_aggregator::types::{PostMedia, RedditVideo};
use media_aggregator::{AggregatorError, ClipRecord, ClipResolver, ListingSort, PostSource, RawPost, Result};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, Once};
use std::time::Duration;
use tokio::time::Instant;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn image_post(id: &str, url: &str, created_utc: f64) -> RawPost {
    RawPost {
        id: id.to_string(),
        title: format!("post {}", id),
        url: Some(url.to_string()),
        created_utc: Some(created_utc),
        is_reddit_media_domain: true,
        ..RawPost::default()
    }
}

pub fn video_post(id: &str, created_utc: f64) -> RawPost {
    RawPost {
        id: id.to_string(),
        title: format!("video {}", id),
        url: Some(format!("https://v.redd.it/{}", id)),
        created_utc: Some(created_utc),
        is_video: true,
        media: Some(PostMedia {
            reddit_video: Some(RedditVideo {
                fallback_url: Some(format!("https://v.redd.it/{}/DASH_720.mp4", id)),
                thumbnail: None,
                duration: Some(12.0),
            }),
        }),
        ..RawPost::default()
    }
}

pub fn clip_post(id: &str, clip_id: &str, created_utc: f64) -> RawPost {
    RawPost {
        id: id.to_string(),
        title: format!("clip {}", id),
        url: Some(format!("https://www.redgifs.com/watch/{}", clip_id)),
        created_utc: Some(created_utc),
        ..RawPost::default()
    }
}

/// In-memory post source. Channels without posts, or marked failing,
/// answer with a fetch error.
#[derive(Default)]
pub struct FakeSource {
    posts: Mutex<HashMap<String, Vec<RawPost>>>,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(self, channel: &str, posts: Vec<RawPost>) -> Self {
        self.set_posts(channel, posts);
        self
    }

    pub fn failing(self, channel: &str) -> Self {
        self.failing.lock().unwrap().insert(channel.to_string());
        self
    }

    pub fn set_posts(&self, channel: &str, posts: Vec<RawPost>) {
        self.posts.lock().unwrap().insert(channel.to_string(), posts);
    }

    pub fn calls(&self) -> Vec<(String, Instant)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl PostSource for FakeSource {
    fn source_name(&self) -> String {
        "fake".to_string()
    }

    async fn list_posts(&self, channel: &str, _sort: ListingSort) -> Result<Vec<RawPost>> {
        self.calls.lock().unwrap().push((channel.to_string(), Instant::now()));
        if self.failing.lock().unwrap().contains(channel) {
            return Err(AggregatorError::fetch(channel, "HTTP 500: Internal Server Error"));
        }
        self.posts
            .lock()
            .unwrap()
            .get(channel)
            .cloned()
            .ok_or_else(|| AggregatorError::fetch(channel, "There are no posts!"))
    }
}

/// Clip lookups that optionally take `latency`, recording the highest
/// number of lookups in flight at once.
#[derive(Default)]
pub struct FakeClips {
    records: HashMap<String, ClipRecord>,
    calls: AtomicUsize,
    latency: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeClips {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clip(mut self, clip_id: &str, playable: &str) -> Self {
        self.records.insert(
            clip_id.to_string(),
            ClipRecord {
                id: clip_id.to_string(),
                url: Some(playable.to_string()),
                thumbnail: Some(format!("https://thumbs.redgifs.com/{}.jpg", clip_id)),
                duration: Some(8.0),
            },
        );
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClipResolver for FakeClips {
    async fn resolve_clip(&self, clip_id: &str) -> Result<ClipRecord> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.records
            .get(clip_id)
            .cloned()
            .ok_or_else(|| AggregatorError::fetch(clip_id, "clip not found"))
    }
}
