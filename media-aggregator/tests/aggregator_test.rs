mod common;

use common::{clip_post, image_post, init_tracing, video_post, FakeClips, FakeSource};
use media_aggregator::{AggregatorConfig, AggregatorError, CategoryConfig, MediaAggregator, MediaKind};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const CATEGORIES: &str = r#"{
    "Nature": ["forest", "desert", "ocean"],
    "Clips": ["shortclips", "forest"],
    "Wide": ["one", "two", "three", "four", "five"],
    "Reels": ["reels"],
    "Mixed": ["reels", "shorts"],
    "_AllTypes": ["Nature", "Clips"],
    "_NoRedGifs": ["Nature"]
}"#;

fn no_delay() -> AggregatorConfig {
    AggregatorConfig {
        batch_delay: Duration::ZERO,
        ..AggregatorConfig::default()
    }
}

fn aggregator(source: Arc<FakeSource>, clips: Arc<FakeClips>, config: AggregatorConfig) -> MediaAggregator {
    let categories = CategoryConfig::from_json_str(CATEGORIES).unwrap();
    MediaAggregator::new(source, clips, Arc::new(categories), config)
}

fn nature_source() -> FakeSource {
    FakeSource::new()
        .with_channel(
            "forest",
            vec![
                image_post("f1", "https://i.redd.it/shared.jpg", 100.0),
                image_post("f2", "https://i.redd.it/forest.jpg", 300.0),
            ],
        )
        .with_channel(
            "desert",
            vec![
                image_post("d1", "https://i.redd.it/shared.jpg", 200.0),
                video_post("d2", 250.0),
            ],
        )
        .with_channel("ocean", vec![image_post("o1", "https://i.redd.it/ocean.jpg", 150.0)])
}

#[tokio::test]
async fn output_is_deduplicated_and_newest_first() {
    init_tracing();

    let source = Arc::new(nature_source());
    let items = aggregator(source, Arc::new(FakeClips::new()), no_delay())
        .aggregate("Nature")
        .await;

    let urls: Vec<&str> = items.iter().map(|i| i.content_url.as_str()).collect();
    info!("aggregated {:?}", urls);

    let unique: HashSet<&str> = urls.iter().copied().collect();
    assert_eq!(unique.len(), urls.len());
    assert_eq!(items.len(), 4);
    assert!(items
        .windows(2)
        .all(|w| w[0].source_timestamp >= w[1].source_timestamp));
    assert_eq!(items[0].content_url, "https://i.redd.it/forest.jpg");
    assert_eq!(items[1].kind, MediaKind::Video);
    assert_eq!(items[1].content_url, "https://v.redd.it/d2/DASH_720.mp4");
}

#[tokio::test]
async fn failing_channels_contribute_nothing() {
    init_tracing();

    let source = Arc::new(nature_source().failing("desert"));
    let items = aggregator(source.clone(), Arc::new(FakeClips::new()), no_delay())
        .aggregate("Nature")
        .await;

    assert_eq!(source.call_count(), 3);
    let urls: HashSet<String> = items.into_iter().map(|i| i.content_url).collect();
    assert_eq!(
        urls,
        ["https://i.redd.it/shared.jpg", "https://i.redd.it/forest.jpg", "https://i.redd.it/ocean.jpg"]
            .into_iter()
            .map(String::from)
            .collect::<HashSet<String>>()
    );
}

#[tokio::test]
async fn clips_are_resolved_only_where_allowed() {
    init_tracing();

    let source = Arc::new(
        FakeSource::new()
            .with_channel(
                "forest",
                vec![
                    clip_post("c1", "happyfox", 500.0),
                    image_post("f1", "https://i.redd.it/forest.jpg", 100.0),
                ],
            )
            .with_channel("desert", vec![])
            .with_channel("ocean", vec![])
            .with_channel("shortclips", vec![clip_post("c2", "calmowl", 400.0)]),
    );
    let clips = Arc::new(
        FakeClips::new()
            .with_clip("happyfox", "https://media.redgifs.com/HappyFox-mobile.mp4")
            .with_clip("calmowl", "https://media.redgifs.com/CalmOwl-mobile.mp4"),
    );

    let nature = aggregator(source.clone(), clips.clone(), no_delay())
        .aggregate("Nature")
        .await;
    assert_eq!(nature.len(), 1);
    assert_eq!(clips.call_count(), 0);

    let clip_items = aggregator(source, clips.clone(), no_delay())
        .aggregate("Clips")
        .await;
    assert_eq!(clips.call_count(), 2);
    assert_eq!(clip_items.len(), 3);
    assert_eq!(clip_items[0].content_url, "https://media.redgifs.com/HappyFox-mobile.mp4");
    assert_eq!(clip_items[0].kind, MediaKind::Video);
    assert_eq!(clip_items[0].duration_seconds, Some(8.0));
}

fn reels_source() -> Arc<FakeSource> {
    Arc::new(
        FakeSource::new()
            .with_channel(
                "reels",
                vec![
                    clip_post("r1", "redfox", 300.0),
                    clip_post("r2", "bluejay", 200.0),
                    clip_post("r3", "greenowl", 100.0),
                ],
            )
            .with_channel(
                "shorts",
                vec![clip_post("s1", "greycat", 250.0), clip_post("s2", "pinkeel", 150.0)],
            ),
    )
}

fn slow_clips() -> Arc<FakeClips> {
    let mut clips = FakeClips::new();
    for id in ["redfox", "bluejay", "greenowl", "greycat", "pinkeel"] {
        clips = clips.with_clip(id, &format!("https://media.redgifs.com/{}-mobile.mp4", id));
    }
    Arc::new(clips.with_latency(Duration::from_millis(50)))
}

#[tokio::test(start_paused = true)]
async fn clip_lookups_run_one_at_a_time_within_a_channel() {
    init_tracing();

    let clips = slow_clips();
    let items = aggregator(reels_source(), clips.clone(), no_delay())
        .aggregate("Reels")
        .await;

    assert_eq!(items.len(), 3);
    assert_eq!(clips.call_count(), 3);
    assert_eq!(clips.max_in_flight(), 1);
}

#[tokio::test(start_paused = true)]
async fn clip_lookups_overlap_across_channels_in_a_batch() {
    init_tracing();

    let clips = slow_clips();
    let items = aggregator(reels_source(), clips.clone(), no_delay())
        .aggregate("Mixed")
        .await;

    assert_eq!(items.len(), 5);
    assert_eq!(clips.call_count(), 5);
    assert!(clips.max_in_flight() > 1, "max in flight was {}", clips.max_in_flight());
}

#[tokio::test]
async fn unknown_category_is_empty_not_an_error() {
    init_tracing();

    let source = Arc::new(nature_source());
    let aggregator = aggregator(source.clone(), Arc::new(FakeClips::new()), no_delay());

    assert!(aggregator.aggregate("Nope").await.is_empty());
    assert!(matches!(
        aggregator.try_aggregate("Nope").await,
        Err(AggregatorError::InvalidCategory(_))
    ));
    assert_eq!(source.call_count(), 0);
}

#[tokio::test]
async fn meta_category_lists_shared_channels_once() {
    init_tracing();

    let source = Arc::new(nature_source().with_channel("shortclips", vec![]));
    aggregator(source.clone(), Arc::new(FakeClips::new()), no_delay())
        .aggregate("All")
        .await;

    let mut per_channel: BTreeMap<String, usize> = BTreeMap::new();
    for (channel, _) in source.calls() {
        *per_channel.entry(channel).or_default() += 1;
    }
    assert_eq!(per_channel.len(), 4);
    assert!(per_channel.values().all(|n| *n == 1));
}

#[tokio::test(start_paused = true)]
async fn batches_run_sequentially_with_a_delay() {
    init_tracing();

    let mut source = FakeSource::new();
    for name in ["one", "two", "three", "four", "five"] {
        source = source.with_channel(name, vec![]);
    }
    let source = Arc::new(source);
    let config = AggregatorConfig {
        batch_size: 2,
        batch_delay: Duration::from_millis(1000),
        ..AggregatorConfig::default()
    };

    let started = tokio::time::Instant::now();
    aggregator(source.clone(), Arc::new(FakeClips::new()), config)
        .aggregate("Wide")
        .await;

    let mut batches: BTreeMap<u128, usize> = BTreeMap::new();
    for (_, at) in source.calls() {
        *batches.entry((at - started).as_millis()).or_default() += 1;
    }
    let sizes: Vec<usize> = batches.values().copied().collect();
    let offsets: Vec<u128> = batches.keys().copied().collect();

    assert_eq!(sizes, vec![2, 2, 1]);
    assert!(offsets[1] - offsets[0] >= 1000);
    assert!(offsets[2] - offsets[1] >= 1000);
}
