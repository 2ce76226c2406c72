use chrono::Utc;
use clap::{Parser, Subcommand};
use media_aggregator::{
    build_router, relay, AppConfig, AppState, CacheStore, CategoryConfig, Fetcher, MediaAggregator, MediaKind, MediaQuery,
    MediaService, MemoryCacheStore, RedditSource, RedgifsClient, SqliteCacheStore, TokenGate,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const STALE_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

#[derive(Parser)]
#[command(name = "media-aggregator")]
#[command(about = "Aggregates image and video posts into paged category feeds")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve,

    /// Aggregate one category and print a page as JSON
    Fetch {
        #[arg(short, long, default_value = "All")]
        category: String,

        #[arg(short, long, default_value_t = 24)]
        limit: usize,

        #[arg(short, long, default_value_t = 0)]
        offset: usize,

        /// image or video
        #[arg(short, long)]
        filter: Option<MediaKind>,
    },

    /// List configured categories
    Categories {
        /// Category file; defaults to CATEGORIES_PATH or data/categories.json
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("media_aggregator=info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve => serve().await,
        Command::Fetch {
            category,
            limit,
            offset,
            filter,
        } => fetch(category, limit, offset, filter).await,
        Command::Categories { path } => {
            dotenvy::dotenv().ok();
            let path = path.unwrap_or_else(|| {
                std::env::var("CATEGORIES_PATH")
                    .unwrap_or_else(|_| "data/categories.json".to_string())
                    .into()
            });
            for name in CategoryConfig::from_path(&path)?.category_names() {
                println!("{}", name);
            }
            Ok(())
        }
    }
}

/// A broken category file leaves the service up with no categories.
fn load_categories(path: &Path) -> CategoryConfig {
    match CategoryConfig::from_path(path) {
        Ok(categories) => {
            info!("Loaded {} categories from {}", categories.category_names().len() - 1, path.display());
            categories
        }
        Err(e) => {
            error!("Failed to load categories from {}: {}", path.display(), e);
            CategoryConfig::default()
        }
    }
}

async fn open_cache(config: &AppConfig) -> anyhow::Result<Arc<dyn CacheStore>> {
    Ok(match &config.database_url {
        Some(url) => {
            info!("Using sqlite cache at {}", url);
            Arc::new(SqliteCacheStore::connect(url).await?)
        }
        None => Arc::new(MemoryCacheStore::new()),
    })
}

fn build_aggregator(config: &AppConfig, fetcher: Arc<Fetcher>) -> MediaAggregator {
    let reddit = RedditSource::new(
        fetcher.clone(),
        config.reddit.clone(),
        Arc::new(TokenGate::new(config.token_interval)),
    )
    .with_page_size(config.page_size);
    let clips = RedgifsClient::new(fetcher, Arc::new(TokenGate::new(config.token_interval)));

    MediaAggregator::new(
        Arc::new(reddit),
        Arc::new(clips),
        Arc::new(load_categories(&config.categories_path)),
        config.aggregator.clone(),
    )
}

async fn serve() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    let fetcher = Arc::new(Fetcher::new(config.fetch.clone())?);
    let cache = open_cache(&config).await?;
    let service = Arc::new(MediaService::new(
        Arc::new(build_aggregator(&config, fetcher.clone())),
        cache.clone(),
    ));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(STALE_SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            match cache.evict_stale(Utc::now()).await {
                Ok(0) => {}
                Ok(n) => info!("Evicted {} stale cache entries", n),
                Err(e) => warn!("Stale cache sweep failed: {}", e),
            }
        }
    });

    let router = build_router(AppState {
        service,
        relay_client: relay::relay_client(&config.fetch)?,
    });
    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Listening on {}", address);
    axum::serve(listener, router).await?;
    Ok(())
}

async fn fetch(category: String, limit: usize, offset: usize, filter: Option<MediaKind>) -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    let fetcher = Arc::new(Fetcher::new(config.fetch.clone())?);
    let service = MediaService::new(
        Arc::new(build_aggregator(&config, fetcher)),
        Arc::new(MemoryCacheStore::new()),
    );

    let query = MediaQuery {
        limit,
        offset,
        filter,
        ..MediaQuery::new(category)
    };
    let page = service.media(&query).await;
    println!("{}", serde_json::to_string_pretty(&page)?);
    Ok(())
}
