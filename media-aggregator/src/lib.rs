pub mod types;
pub mod utils;
pub mod token_gate;
pub mod fetcher;
pub mod traits;
pub mod sources;
pub mod normalizer;
pub mod selector;
pub mod aggregator;
pub mod pagination;
pub mod cache;
pub mod service;
pub mod relay;
pub mod server;
pub mod config;

pub use types::*;
pub use token_gate::{AccessToken, TokenGate};
pub use fetcher::Fetcher;
pub use traits::{ClipResolver, PostSource};
pub use sources::{RedditCredentials, RedditSource, RedgifsClient};
pub use normalizer::normalize;
pub use selector::{CategoryConfig, ChannelEntry, ALL_CATEGORY};
pub use aggregator::MediaAggregator;
pub use pagination::page;
pub use cache::{CacheEntry, CacheStore, MemoryCacheStore, SqliteCacheStore};
pub use service::{MediaQuery, MediaService};
pub use server::{build_router, AppState};
pub use config::AppConfig;
