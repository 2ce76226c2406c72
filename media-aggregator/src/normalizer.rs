use crate::sources::redgifs::extract_clip_id;
use crate::traits::ClipResolver;
use crate::types::{MediaItem, MediaKind, MediaMetadata, RawPost, RedditVideo};
use crate::utils::url::{extract_host, has_suffix, host_matches, is_http_url, unescape};
use tracing::debug;
use uuid::Uuid;

const NATIVE_VIDEO_DOMAIN: &str = "v.redd.it";
const THUMBNAIL_PLACEHOLDERS: &[&str] = &["self", "default", "nsfw", "spoiler", "image"];

/// Stable id for a piece of content. Gallery expansions pass their position
/// so siblings sharing a source image still get distinct ids.
pub fn media_id(content_url: &str, index: Option<usize>) -> String {
    let name = match index {
        Some(i) => format!("{}#{}", content_url, i),
        None => content_url.to_string(),
    };
    Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes()).to_string()
}

pub fn is_gallery(post: &RawPost) -> bool {
    post.media_metadata.is_some()
        && post.gallery_data.as_ref().is_some_and(|g| !g.items.is_empty())
}

fn post_url(post: &RawPost) -> Option<String> {
    post.url.as_deref().filter(|u| !u.is_empty()).map(unescape)
}

fn embedded_video(post: &RawPost) -> Option<&RedditVideo> {
    post.media
        .as_ref()
        .and_then(|m| m.reddit_video.as_ref())
        .or_else(|| post.secure_media.as_ref().and_then(|m| m.reddit_video.as_ref()))
}

pub fn is_native_video(post: &RawPost) -> bool {
    if post.is_video {
        return true;
    }
    match post_url(post) {
        Some(url) => {
            extract_host(&url).is_some_and(|h| host_matches(&h, NATIVE_VIDEO_DOMAIN)) || has_suffix(&url, ".gifv")
        }
        None => false,
    }
}

pub fn is_animated_image(url: &str) -> bool {
    has_suffix(url, ".gif")
}

/// Cheap pre-check run before normalization: galleries always pass,
/// otherwise the post needs a URL, must not be a disallowed clip, and must
/// look like video or like first-party media.
pub fn is_candidate(post: &RawPost, allow_clips: bool) -> bool {
    if is_gallery(post) {
        return true;
    }
    let Some(url) = post_url(post) else {
        return false;
    };
    let is_clip = extract_clip_id(&url).is_some();
    if is_clip && !allow_clips {
        return false;
    }
    let video_like = is_clip || is_native_video(post);
    let native_media = post.is_reddit_media_domain || is_animated_image(&url);
    video_like || native_media
}

/// `.gifv` pages have a direct `.mp4` sibling.
fn rewrite_gifv(url: &str) -> String {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    let (path, rest) = url.split_at(end);
    if path.to_ascii_lowercase().ends_with(".gifv") {
        format!("{}.mp4{}", &path[..path.len() - 5], rest)
    } else {
        url.to_string()
    }
}

fn usable_thumbnail(candidate: Option<&str>) -> Option<String> {
    let candidate = candidate?.trim();
    if candidate.is_empty() || THUMBNAIL_PLACEHOLDERS.contains(&candidate) {
        return None;
    }
    let candidate = unescape(candidate);
    is_http_url(&candidate).then_some(candidate)
}

fn preview_source(post: &RawPost) -> Option<String> {
    post.preview
        .as_ref()?
        .images
        .first()?
        .source
        .as_ref()
        .map(|s| unescape(&s.url))
        .filter(|u| !u.is_empty())
}

fn description(post: &RawPost) -> Option<String> {
    Some(post.selftext.clone()).filter(|s| !s.trim().is_empty())
}

fn best_gallery_image(meta: &MediaMetadata) -> Option<(String, Option<String>)> {
    if meta.status.as_deref().is_some_and(|s| s != "valid") {
        return None;
    }
    let original = meta
        .o
        .as_ref()
        .and_then(|variants| variants.iter().filter(|v| v.link().is_some()).max_by_key(|v| v.area()))
        .and_then(|v| v.link());
    let full = original.or_else(|| meta.s.as_ref().and_then(|s| s.link()))?;
    let preview = meta
        .p
        .iter()
        .filter(|v| v.link().is_some())
        .max_by_key(|v| v.area())
        .and_then(|v| v.link())
        .map(unescape);
    Some((unescape(full), preview))
}

/// One image per usable gallery reference, in gallery order.
pub fn expand_gallery(post: &RawPost) -> Vec<MediaItem> {
    let (Some(gallery), Some(metadata)) = (post.gallery_data.as_ref(), post.media_metadata.as_ref()) else {
        return Vec::new();
    };

    let images: Vec<(String, Option<String>)> = gallery
        .items
        .iter()
        .filter_map(|item| metadata.get(&item.media_id).and_then(best_gallery_image))
        .collect();

    let total = images.len();
    images
        .into_iter()
        .enumerate()
        .map(|(i, (content_url, thumbnail_url))| MediaItem {
            id: media_id(&content_url, Some(i)),
            kind: MediaKind::Image,
            title: format!("{} ({}/{})", post.title, i + 1, total),
            description: description(post),
            content_url,
            thumbnail_url,
            duration_seconds: None,
            source_timestamp: post.created_utc,
        })
        .collect()
}

fn single(post: &RawPost, kind: MediaKind, content_url: String, thumbnail_url: Option<String>, duration_seconds: Option<f64>) -> Vec<MediaItem> {
    vec![MediaItem {
        id: media_id(&content_url, None),
        kind,
        title: post.title.clone(),
        description: description(post),
        content_url,
        thumbnail_url,
        duration_seconds: if kind == MediaKind::Video { duration_seconds } else { None },
        source_timestamp: post.created_utc,
    }]
}

/// Turn one raw post into zero or more canonical items.
///
/// An empty result is a normal outcome (the post is not media we serve),
/// never an error. Clip resolution failures also end up as an empty result.
pub async fn normalize(post: &RawPost, allow_clips: bool, clips: &dyn ClipResolver) -> Vec<MediaItem> {
    if is_gallery(post) {
        let expanded = expand_gallery(post);
        if !expanded.is_empty() {
            return expanded;
        }
        debug!("Gallery post {} had no usable images", post.id);
    }

    let Some(url) = post_url(post) else {
        return Vec::new();
    };

    if let Some(clip_id) = extract_clip_id(&url) {
        if !allow_clips {
            return Vec::new();
        }
        return match clips.resolve_clip(&clip_id).await {
            Ok(clip) => match clip.url.filter(|u| !u.is_empty()) {
                Some(playable) => single(post, MediaKind::Video, playable, clip.thumbnail, clip.duration),
                None => {
                    debug!("Clip {} has no playable URL", clip_id);
                    Vec::new()
                }
            },
            Err(e) => {
                debug!("Skipping post {}: {}", post.id, e);
                Vec::new()
            }
        };
    }

    if is_native_video(post) {
        let embedded = embedded_video(post);
        let content_url = embedded
            .and_then(|v| v.fallback_url.as_deref())
            .filter(|u| !u.is_empty())
            .map(unescape)
            .unwrap_or_else(|| rewrite_gifv(&url));
        let thumbnail = usable_thumbnail(embedded.and_then(|v| v.thumbnail.as_deref()))
            .or_else(|| usable_thumbnail(post.thumbnail.as_deref()))
            .or_else(|| preview_source(post));
        return single(post, MediaKind::Video, content_url, thumbnail, embedded.and_then(|v| v.duration));
    }

    if is_animated_image(&url) {
        let thumbnail = preview_source(post);
        return single(post, MediaKind::Image, url, thumbnail, None);
    }

    if post.is_reddit_media_domain {
        let thumbnail = preview_source(post).or_else(|| Some(url.clone()));
        return single(post, MediaKind::Image, url, thumbnail, None);
    }

    debug!("Skipping post {}: not first-party media", post.id);
    Vec::new()
}
