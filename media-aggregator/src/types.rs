use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
// Use the interfaces crate for core types
pub use interfaces::defs::{MediaItem, MediaKind, Page};

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub follow_redirects: bool,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "media-aggregator/1.0.0".to_string(),
            timeout_seconds: 30,
            max_retries: 2,
            retry_delay_ms: 500,
            follow_redirects: true,
            max_redirects: 5,
        }
    }
}

/// Listing order requested from the post API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingSort {
    Hot,
    #[default]
    New,
    Top,
    Rising,
    Controversial,
}

impl ListingSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingSort::Hot => "hot",
            ListingSort::New => "new",
            ListingSort::Top => "top",
            ListingSort::Rising => "rising",
            ListingSort::Controversial => "controversial",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub sort: ListingSort,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            batch_size: 3,
            batch_delay: Duration::from_millis(1000),
            sort: ListingSort::New,
        }
    }
}

// --- Post API payloads ---

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Listing {
    #[serde(default)]
    pub data: Option<ListingData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingData {
    #[serde(default)]
    pub children: Option<Vec<ListingChild>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingChild {
    pub data: RawPost,
}

/// A post as returned by the listing API. Only the fields the normalizer
/// looks at are modelled; everything is optional upstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPost {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub created_utc: Option<f64>,
    #[serde(default)]
    pub is_video: bool,
    #[serde(default)]
    pub is_reddit_media_domain: bool,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub media: Option<PostMedia>,
    #[serde(default)]
    pub secure_media: Option<PostMedia>,
    #[serde(default)]
    pub preview: Option<Preview>,
    #[serde(default)]
    pub gallery_data: Option<GalleryData>,
    #[serde(default)]
    pub media_metadata: Option<HashMap<String, MediaMetadata>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostMedia {
    #[serde(default)]
    pub reddit_video: Option<RedditVideo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedditVideo {
    #[serde(default)]
    pub fallback_url: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Preview {
    #[serde(default)]
    pub images: Vec<PreviewImage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreviewImage {
    #[serde(default)]
    pub source: Option<PreviewSource>,
    #[serde(default)]
    pub resolutions: Vec<PreviewSource>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreviewSource {
    pub url: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GalleryData {
    #[serde(default)]
    pub items: Vec<GalleryItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GalleryItem {
    pub media_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaMetadata {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub o: Option<Vec<ImageVariant>>,
    #[serde(default)]
    pub p: Vec<ImageVariant>,
    #[serde(default)]
    pub s: Option<ImageVariant>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageVariant {
    #[serde(default)]
    pub x: u32,
    #[serde(default)]
    pub y: u32,
    #[serde(default)]
    pub u: Option<String>,
    #[serde(default)]
    pub gif: Option<String>,
}

impl ImageVariant {
    pub fn area(&self) -> u64 {
        self.x as u64 * self.y as u64
    }

    pub fn link(&self) -> Option<&str> {
        self.u.as_deref().or(self.gif.as_deref()).filter(|u| !u.is_empty())
    }
}

// --- Clip API payloads ---

#[derive(Debug, Clone, Deserialize)]
pub struct ClipAuth {
    pub token: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClipGifs {
    #[serde(default)]
    pub gifs: Vec<ClipGif>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipGif {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub urls: ClipUrls,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClipUrls {
    #[serde(default)]
    pub sd: Option<String>,
    #[serde(default)]
    pub hd: Option<String>,
    #[serde(default)]
    pub vthumbnail: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default)]
    pub gif: Option<String>,
}

/// A resolved short clip.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipRecord {
    pub id: String,
    pub url: Option<String>,
    pub thumbnail: Option<String>,
    pub duration: Option<f64>,
}

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream authorization failed: {0}")]
    UpstreamAuth(String),

    #[error("Fetch from {channel} failed: {cause}")]
    Fetch { channel: String, cause: String },

    #[error("Unknown category: {0}")]
    InvalidCategory(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("General error: {0}")]
    General(String),
}

impl AggregatorError {
    pub fn fetch(channel: impl Into<String>, cause: impl ToString) -> Self {
        AggregatorError::Fetch { channel: channel.into(), cause: cause.to_string() }
    }
}

pub type Result<T> = std::result::Result<T, AggregatorError>;
