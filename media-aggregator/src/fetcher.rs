use crate::types::{AggregatorError, FetchConfig, Result};
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Shared HTTP layer for the upstream clients.
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let redirect = if config.follow_redirects {
            reqwest::redirect::Policy::limited(config.max_redirects)
        } else {
            reqwest::redirect::Policy::none()
        };

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(redirect)
            .build()?;

        Ok(Self { client, config })
    }

    /// The underlying client, for callers that relay responses as-is.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Send the request produced by `build`, retrying transport errors,
    /// `429` and `5xx` with exponential backoff. Any other non-2xx status is
    /// returned as an error immediately.
    pub async fn send<F>(&self, label: &str, build: F) -> Result<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let start_time = Instant::now();
        let retry_delay = Duration::from_millis(self.config.retry_delay_ms);
        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: retry_delay,
            initial_interval: retry_delay,
            max_interval: retry_delay * 32,
            multiplier: 2.0,
            max_elapsed_time: Some(retry_delay * 60),
            ..Default::default()
        };

        let mut attempt = 0;
        loop {
            let last_error = match build(&self.client).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!("{} answered {} in {:?}", label, response.status(), start_time.elapsed());
                    return Ok(response);
                }
                Ok(response) => {
                    let status = response.status();
                    let err = AggregatorError::General(format!(
                        "HTTP {}: {}",
                        status.as_u16(),
                        status.canonical_reason().unwrap_or("Unknown")
                    ));
                    if !is_retryable(status) {
                        return Err(err);
                    }
                    err
                }
                Err(e) => AggregatorError::Http(e),
            };

            if attempt >= self.config.max_retries {
                error!("{} failed after {} attempts: {}", label, attempt + 1, last_error);
                return Err(last_error);
            }

            match backoff.next_backoff() {
                Some(delay) => {
                    warn!("Attempt {} failed for {}, retrying in {:?}", attempt + 1, label, delay);
                    tokio::time::sleep(delay).await;
                }
                None => return Err(last_error),
            }
            attempt += 1;
        }
    }

    pub async fn get_json<T, F>(&self, label: &str, build: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn(&Client) -> RequestBuilder,
    {
        let response = self.send(label, build).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}
