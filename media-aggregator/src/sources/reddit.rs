use crate::fetcher::Fetcher;
use crate::token_gate::{AccessToken, TokenGate};
use crate::traits::PostSource;
use crate::types::{AggregatorError, Listing, ListingSort, RawPost, Result};
use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

/// The listing API refuses pages larger than this.
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub app_name: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
}

/// Post-listing client for subreddits and user pages.
pub struct RedditSource {
    fetcher: Arc<Fetcher>,
    credentials: RedditCredentials,
    token_gate: Arc<TokenGate>,
    auth_base: String,
    api_base: String,
    page_size: usize,
}

impl RedditSource {
    pub fn new(fetcher: Arc<Fetcher>, credentials: RedditCredentials, token_gate: Arc<TokenGate>) -> Self {
        Self {
            fetcher,
            credentials,
            token_gate,
            auth_base: "https://www.reddit.com".to_string(),
            api_base: "https://oauth.reddit.com".to_string(),
            page_size: MAX_PAGE_SIZE,
        }
    }

    /// Point the client somewhere else (a mock server, a proxy).
    pub fn with_base_urls(mut self, auth_base: impl Into<String>, api_base: impl Into<String>) -> Self {
        self.auth_base = auth_base.into().trim_end_matches('/').to_string();
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Posts requested per listing, clamped to `1..=MAX_PAGE_SIZE`.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    /// Exchange the app credentials for a fresh token, paced by the gate.
    pub async fn access_token(&self) -> Result<AccessToken> {
        self.token_gate.acquire(|| self.request_token()).await
    }

    async fn request_token(&self) -> Result<AccessToken> {
        let url = format!("{}/api/v1/access_token", self.auth_base);
        let user_agent = format!("{}/1.0.0", self.credentials.app_name);

        let response: TokenResponse = self
            .fetcher
            .get_json("reddit token", |client| {
                client
                    .post(&url)
                    .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
                    .header(USER_AGENT, &user_agent)
                    .form(&[("grant_type", "client_credentials")])
            })
            .await
            .map_err(|e| AggregatorError::UpstreamAuth(format!("There was a problem while fetching the token: {}", e)))?;

        if response.access_token.is_empty() {
            return Err(AggregatorError::UpstreamAuth("There is no token!".to_string()));
        }

        debug!("Issued listing token");
        Ok(AccessToken::new(response.access_token))
    }
}

/// `user/<name>` channels are user pages; everything else is a subreddit.
pub fn listing_path(channel: &str, sort: ListingSort) -> String {
    if channel.starts_with("user/") {
        format!("{}/{}", channel, sort.as_str())
    } else {
        format!("r/{}/{}", channel, sort.as_str())
    }
}

#[async_trait]
impl PostSource for RedditSource {
    fn source_name(&self) -> String {
        "reddit".to_string()
    }

    async fn list_posts(&self, channel: &str, sort: ListingSort) -> Result<Vec<RawPost>> {
        let token = self.access_token().await?;
        let url = format!("{}/{}", self.api_base, listing_path(channel, sort));
        let limit = self.page_size.to_string();

        let listing: Listing = self
            .fetcher
            .get_json(channel, |client| {
                client
                    .get(&url)
                    .bearer_auth(token.as_str())
                    .query(&[("limit", limit.as_str())])
            })
            .await
            .map_err(|e| AggregatorError::fetch(channel, e))?;

        let posts: Vec<RawPost> = listing
            .data
            .and_then(|data| data.children)
            .ok_or_else(|| AggregatorError::fetch(channel, "There are no posts!"))?
            .into_iter()
            .map(|child| child.data)
            .collect();

        info!("Listed {} posts from {}", posts.len(), channel);
        Ok(posts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_channels_keep_their_prefix() {
        assert_eq!(listing_path("user/someone", ListingSort::New), "user/someone/new");
        assert_eq!(listing_path("EarthPorn", ListingSort::Top), "r/EarthPorn/top");
    }
}
