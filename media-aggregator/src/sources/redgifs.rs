use crate::fetcher::Fetcher;
use crate::token_gate::{AccessToken, TokenGate};
use crate::traits::ClipResolver;
use crate::types::{AggregatorError, ClipAuth, ClipGifs, ClipRecord, ClipUrls, Result};
use crate::utils::url::{has_extension, IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use url::Url;

const WATCH_HOSTS: &[&str] = &["www.redgifs.com", "redgifs.com"];

/// Clip id from a watch-page link such as `https://www.redgifs.com/watch/abc?x=1`.
pub fn extract_clip_id(link: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;
    if url.scheme() != "https" {
        return None;
    }
    let host = url.host_str()?.to_ascii_lowercase();
    if !WATCH_HOSTS.contains(&host.as_str()) {
        return None;
    }

    let mut segments = url.path_segments()?;
    if segments.next()? != "watch" {
        return None;
    }
    segments.next().filter(|id| !id.is_empty()).map(str::to_string)
}

/// Playable URL: standard definition first (bandwidth), then the mobile
/// rendition, then HD, then anything that looks like a video file.
pub fn best_playable(urls: &ClipUrls) -> Option<String> {
    urls.sd
        .clone()
        .or_else(|| urls.vthumbnail.clone())
        .or_else(|| urls.hd.clone())
        .or_else(|| all_links(urls).find(|u| has_extension(u, VIDEO_EXTENSIONS)))
        .filter(|u| !u.is_empty())
}

pub fn best_preview(urls: &ClipUrls) -> Option<String> {
    urls.thumbnail
        .clone()
        .or_else(|| urls.poster.clone())
        .or_else(|| all_links(urls).find(|u| has_extension(u, IMAGE_EXTENSIONS)))
        .filter(|u| !u.is_empty())
}

fn all_links(urls: &ClipUrls) -> impl Iterator<Item = String> + '_ {
    [&urls.sd, &urls.hd, &urls.vthumbnail, &urls.thumbnail, &urls.poster, &urls.gif]
        .into_iter()
        .flatten()
        .cloned()
}

/// Clip-resolution client. Every resolution asks for its own temporary token.
pub struct RedgifsClient {
    fetcher: Arc<Fetcher>,
    token_gate: Arc<TokenGate>,
    api_base: String,
}

impl RedgifsClient {
    pub fn new(fetcher: Arc<Fetcher>, token_gate: Arc<TokenGate>) -> Self {
        Self {
            fetcher,
            token_gate,
            api_base: "https://api.redgifs.com".to_string(),
        }
    }

    pub fn with_base_url(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    async fn temporary_token(&self) -> Result<AccessToken> {
        let url = format!("{}/v2/auth/temporary", self.api_base);
        self.token_gate
            .acquire(|| async {
                let auth: ClipAuth = self
                    .fetcher
                    .get_json("clip token", |client| client.get(&url))
                    .await
                    .map_err(|e| AggregatorError::UpstreamAuth(e.to_string()))?;
                if auth.token.is_empty() {
                    return Err(AggregatorError::UpstreamAuth("empty clip token".to_string()));
                }
                Ok(AccessToken::new(auth.token))
            })
            .await
    }
}

#[async_trait]
impl ClipResolver for RedgifsClient {
    async fn resolve_clip(&self, clip_id: &str) -> Result<ClipRecord> {
        let token = self
            .temporary_token()
            .await
            .map_err(|e| AggregatorError::fetch(clip_id, e))?;
        let url = format!("{}/v2/gifs", self.api_base);

        let response: ClipGifs = self
            .fetcher
            .get_json(clip_id, |client| {
                client
                    .get(&url)
                    .bearer_auth(token.as_str())
                    .query(&[("ids", clip_id)])
            })
            .await
            .map_err(|e| AggregatorError::fetch(clip_id, e))?;

        let gif = response
            .gifs
            .into_iter()
            .next()
            .ok_or_else(|| AggregatorError::fetch(clip_id, "clip not found"))?;

        debug!("Resolved clip {}", clip_id);
        Ok(ClipRecord {
            id: if gif.id.is_empty() { clip_id.to_string() } else { gif.id },
            url: best_playable(&gif.urls),
            thumbnail: best_preview(&gif.urls),
            duration: gif.duration,
        })
    }
}
