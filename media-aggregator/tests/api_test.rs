mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use common::{image_post, init_tracing, video_post, FakeClips, FakeSource};
use media_aggregator::{
    build_router, AggregatorConfig, AppState, CategoryConfig, MediaAggregator, MediaService, MemoryCacheStore,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const CATEGORIES: &str = r#"{
    "Nature": ["forest", "desert"],
    "_AllTypes": ["Nature"],
    "_NoRedGifs": []
}"#;

fn app(source: Arc<FakeSource>) -> Router {
    let aggregator = MediaAggregator::new(
        source,
        Arc::new(FakeClips::new()),
        Arc::new(CategoryConfig::from_json_str(CATEGORIES).unwrap()),
        AggregatorConfig {
            batch_delay: Duration::ZERO,
            ..AggregatorConfig::default()
        },
    );
    let service = MediaService::new(Arc::new(aggregator), Arc::new(MemoryCacheStore::new()));
    build_router(AppState {
        service: Arc::new(service),
        relay_client: reqwest::Client::new(),
    })
}

fn source() -> Arc<FakeSource> {
    Arc::new(
        FakeSource::new()
            .with_channel(
                "forest",
                vec![
                    image_post("f1", "https://i.redd.it/f1.jpg", 100.0),
                    video_post("f2", 400.0),
                    image_post("f3", "https://i.redd.it/f3.jpg", 300.0),
                ],
            )
            .with_channel(
                "desert",
                vec![video_post("d1", 200.0), image_post("d2", "https://i.redd.it/d2.jpg", 500.0)],
            ),
    )
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn urls(body: &Value) -> Vec<String> {
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["url"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn types_lists_meta_category_first() {
    init_tracing();

    let (status, body) = get(&app(source()), "/api/types").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"], serde_json::json!(["All", "Nature"]));
}

#[tokio::test]
async fn media_pages_are_sliced_from_one_cached_run() {
    init_tracing();

    let source = source();
    let app = app(source.clone());

    let (status, first) = get(&app, "/api/media?type=Nature&limit=2&offset=0").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["success"], true);
    assert_eq!(first["type"], "Nature");
    assert_eq!(first["limit"], 2);
    assert_eq!(first["hasMore"], true);
    assert_eq!(first["totalConsidered"], 5);
    assert_eq!(urls(&first), vec!["https://i.redd.it/d2.jpg", "https://v.redd.it/f2/DASH_720.mp4"]);

    let (_, second) = get(&app, "/api/media?type=Nature&limit=2&offset=4").await;
    assert_eq!(urls(&second), vec!["https://i.redd.it/f1.jpg"]);
    assert_eq!(second["hasMore"], false);

    // both pages came from the first aggregation
    assert_eq!(source.call_count(), 2);
}

#[tokio::test]
async fn filter_applies_to_the_whole_run() {
    init_tracing();

    let (_, body) = get(&app(source()), "/api/media?type=Nature&limit=10&filter=video").await;
    assert_eq!(body["totalConsidered"], 2);
    assert!(body["data"]
        .as_array()
        .unwrap()
        .iter()
        .all(|item| item["type"] == "video"));
    assert_eq!(body["hasMore"], false);
}

#[tokio::test]
async fn refresh_prepends_new_items_and_reset_starts_over() {
    init_tracing();

    let source = source();
    let app = app(source.clone());
    get(&app, "/api/media?type=Nature").await;

    source.set_posts("forest", vec![image_post("f9", "https://i.redd.it/f9.jpg", 50.0)]);
    let (_, refreshed) = get(&app, "/api/media?type=Nature&refresh=true").await;
    let refreshed = urls(&refreshed);
    assert_eq!(refreshed.len(), 6);
    assert_eq!(refreshed[0], "https://i.redd.it/f9.jpg");
    assert_eq!(refreshed[1], "https://i.redd.it/d2.jpg");
    assert_eq!(source.call_count(), 4);

    let (_, reset) = get(&app, "/api/media?type=Nature&reset=true").await;
    assert_eq!(urls(&reset).len(), 3);
    assert_eq!(source.call_count(), 6);
}

#[tokio::test]
async fn unknown_category_and_bad_filter() {
    init_tracing();

    let app = app(source());
    let (status, body) = get(&app, "/api/media?type=Nope").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], serde_json::json!([]));
    assert_eq!(body["hasMore"], false);

    let (status, body) = get(&app, "/api/media?type=Nature&filter=audio").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn proxy_rejects_before_fetching() {
    init_tracing();

    let app = app(source());
    let (status, body) = get(&app, "/api/proxy").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "URL parameter is required");

    let (status, _) = get(&app, "/api/proxy?url=not-a-url").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = get(&app, "/api/proxy?url=https%3A%2F%2Fexample.com%2Fa.jpg").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Domain not allowed");
}
