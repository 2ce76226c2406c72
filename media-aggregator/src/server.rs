use crate::relay::relay;
use crate::selector::ALL_CATEGORY;
use crate::service::{MediaQuery, MediaService, DEFAULT_LIMIT};
use crate::types::{MediaItem, MediaKind};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, warn};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<MediaService>,
    pub relay_client: reqwest::Client,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/types", get(types_handler))
        .route("/api/media", get(media_handler))
        .route("/api/proxy", get(proxy_handler))
        .layer(cors)
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub struct MediaParams {
    #[serde(rename = "type")]
    pub category: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub filter: Option<String>,
    pub reset: Option<String>,
    pub refresh: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MediaResponse {
    success: bool,
    data: Vec<MediaItem>,
    has_more: bool,
    total_considered: usize,
    #[serde(rename = "type")]
    category: String,
    limit: usize,
    offset: usize,
}

#[derive(Debug, Deserialize)]
pub struct ProxyParams {
    pub url: Option<String>,
}

fn flag(value: Option<&str>) -> bool {
    matches!(value, Some("true") | Some("1"))
}

impl MediaParams {
    fn into_query(self) -> Result<MediaQuery, String> {
        let filter = match self.filter.as_deref().map(str::trim) {
            None | Some("") | Some("all") => None,
            Some(raw) => Some(raw.parse::<MediaKind>().map_err(|e| e.to_string())?),
        };

        Ok(MediaQuery {
            category: self.category.unwrap_or_else(|| ALL_CATEGORY.to_string()),
            limit: self.limit.unwrap_or(DEFAULT_LIMIT),
            offset: self.offset.unwrap_or(0),
            filter,
            reset: flag(self.reset.as_deref()),
            refresh: flag(self.refresh.as_deref()),
        })
    }
}

async fn types_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "success": true,
        "data": state.service.categories(),
    }))
}

async fn media_handler(State(state): State<AppState>, Query(params): Query<MediaParams>) -> Response {
    let query = match params.into_query() {
        Ok(query) => query,
        Err(message) => {
            warn!("Bad media request: {}", message);
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "success": false, "error": message })),
            )
                .into_response();
        }
    };
    debug!("Media request {:?}", query);

    let page = state.service.media(&query).await;
    Json(MediaResponse {
        success: true,
        data: page.data,
        has_more: page.has_more,
        total_considered: page.total_considered,
        category: query.category,
        limit: query.limit,
        offset: query.offset,
    })
    .into_response()
}

async fn proxy_handler(State(state): State<AppState>, Query(params): Query<ProxyParams>) -> Response {
    relay(&state.relay_client, params.url.as_deref()).await
}
