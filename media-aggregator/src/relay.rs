use crate::fetcher::Fetcher;
use crate::types::{FetchConfig, Result};
use crate::utils::url::host_matches;
use axum::{
    body::Body,
    http::{
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, REFERER, USER_AGENT},
        HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use reqwest::Client;
use tracing::{debug, error, warn};
use url::Url;

/// Hosts the relay will fetch from. Subdomains of each entry match too.
pub const ALLOWED_HOSTS: &[&str] = &[
    "i.redd.it",
    "v.redd.it",
    "redgifs.com",
    "i.redgifs.com",
    "preview.redd.it",
    "external-preview.redd.it",
    "thumbs.redgifs.com",
    "cdn.redgifs.com",
    "v3.redgifs.com",
];

const RELAY_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const RELAY_CACHE_CONTROL: &str = "public, max-age=3600";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayRejection {
    MissingUrl,
    InvalidUrl,
    HostNotAllowed(String),
}

impl RelayRejection {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayRejection::MissingUrl | RelayRejection::InvalidUrl => StatusCode::BAD_REQUEST,
            RelayRejection::HostNotAllowed(_) => StatusCode::FORBIDDEN,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            RelayRejection::MissingUrl => "URL parameter is required",
            RelayRejection::InvalidUrl => "Invalid URL",
            RelayRejection::HostNotAllowed(_) => "Domain not allowed",
        }
    }
}

impl IntoResponse for RelayRejection {
    fn into_response(self) -> Response {
        error_response(self.status(), self.message())
    }
}

/// HTTP client for the relay. Redirects are not followed, since only the
/// first hop is checked against the allowlist.
pub fn relay_client(fetch: &FetchConfig) -> Result<Client> {
    let fetcher = Fetcher::new(FetchConfig {
        follow_redirects: false,
        ..fetch.clone()
    })?;
    Ok(fetcher.client().clone())
}

pub fn is_allowed_host(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    ALLOWED_HOSTS.iter().any(|domain| host_matches(&host, domain))
}

/// Validate a relay request before anything goes over the network.
pub fn check_target(raw: Option<&str>) -> std::result::Result<Url, RelayRejection> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty()).ok_or(RelayRejection::MissingUrl)?;
    let url = Url::parse(raw).map_err(|_| RelayRejection::InvalidUrl)?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(RelayRejection::InvalidUrl);
    }
    let host = url.host_str().ok_or(RelayRejection::InvalidUrl)?;
    if !is_allowed_host(host) {
        return Err(RelayRejection::HostNotAllowed(host.to_string()));
    }
    Ok(url)
}

/// Fetch an allowlisted media URL and hand the body back unchanged.
pub async fn relay(client: &Client, raw: Option<&str>) -> Response {
    let target = match check_target(raw) {
        Ok(url) => url,
        Err(rejection) => {
            warn!("Relay rejected: {:?}", rejection);
            return rejection.into_response();
        }
    };

    let upstream = match client
        .get(target.as_str())
        .header(USER_AGENT, RELAY_USER_AGENT)
        .header(REFERER, target.as_str())
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            error!("Relay fetch of {} failed: {}", target, e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string());
        }
    };

    let status = upstream.status();
    if !status.is_success() {
        warn!("Relay upstream answered {} for {}", status, target);
        return error_response(status, &format!("Failed to fetch: {}", status.as_u16()));
    }

    let content_type = upstream
        .headers()
        .get(CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));

    let bytes = match upstream.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Relay body read for {} failed: {}", target, e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string());
        }
    };
    debug!("Relayed {} bytes from {}", bytes.len(), target);

    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, content_type),
            (CONTENT_LENGTH, HeaderValue::from(bytes.len())),
            (CACHE_CONTROL, HeaderValue::from_static(RELAY_CACHE_CONTROL)),
        ],
        Body::from(bytes),
    )
        .into_response()
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}
