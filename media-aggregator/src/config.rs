use crate::sources::reddit::MAX_PAGE_SIZE;
use crate::sources::RedditCredentials;
use crate::token_gate::TokenGate;
use crate::types::{AggregatorConfig, AggregatorError, FetchConfig, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Settings read from the environment (and `.env`, when present).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub reddit: RedditCredentials,
    pub categories_path: PathBuf,
    /// sqlite URL for the response cache; memory cache when unset.
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub token_interval: Duration,
    /// Posts requested per channel listing.
    pub page_size: usize,
    pub aggregator: AggregatorConfig,
    pub fetch: FetchConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = AggregatorConfig::default();
        let config = Self {
            reddit: RedditCredentials {
                client_id: required("REDDIT_ID")?,
                client_secret: required("REDDIT_SECRET")?,
                app_name: std::env::var("REDDIT_APP_NAME").unwrap_or_else(|_| "media-aggregator".to_string()),
            },
            categories_path: std::env::var("CATEGORIES_PATH")
                .unwrap_or_else(|_| "data/categories.json".to_string())
                .into(),
            database_url: std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parsed("PORT", 3000)?,
            token_interval: Duration::from_millis(parsed(
                "TOKEN_INTERVAL_MS",
                TokenGate::DEFAULT_INTERVAL.as_millis() as u64,
            )?),
            page_size: parsed("PAGE_SIZE", MAX_PAGE_SIZE)?,
            aggregator: AggregatorConfig {
                batch_size: parsed("BATCH_SIZE", defaults.batch_size)?,
                batch_delay: Duration::from_millis(parsed(
                    "BATCH_DELAY_MS",
                    defaults.batch_delay.as_millis() as u64,
                )?),
                ..defaults
            },
            fetch: FetchConfig::default(),
        };

        if config.aggregator.batch_size == 0 {
            return Err(AggregatorError::Config("BATCH_SIZE must be at least 1".to_string()));
        }

        if config.page_size == 0 || config.page_size > MAX_PAGE_SIZE {
            return Err(AggregatorError::Config(format!(
                "PAGE_SIZE must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        config.log_keys();
        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn log_keys(&self) {
        fn preview(val: &str) -> String {
            let head: String = val.chars().take(4).collect();
            format!("{}...({} chars)", head, val.len())
        }

        tracing::info!("Config loaded:");
        tracing::info!("  REDDIT_ID: {}", preview(&self.reddit.client_id));
        tracing::info!("  REDDIT_APP_NAME: {}", self.reddit.app_name);
        tracing::info!("  CATEGORIES_PATH: {}", self.categories_path.display());
        tracing::info!(
            "  DATABASE_URL: {}",
            self.database_url.as_deref().unwrap_or("<not set, using memory cache>")
        );
        tracing::info!(
            "  {} posts per listing, batches of {} every {:?}, token interval {:?}",
            self.page_size,
            self.aggregator.batch_size,
            self.aggregator.batch_delay,
            self.token_interval
        );
    }
}

fn required(key: &str) -> Result<String> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AggregatorError::Config(format!("{} is not set", key)))
}

fn parsed<T: FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| AggregatorError::Config(format!("{} has an invalid value: {}", key, raw))),
        _ => Ok(default),
    }
}
