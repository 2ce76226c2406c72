//! Paging over an aggregated list, and filtered paging over a paginated
//! upstream.
//!
//! A type filter is always applied to the whole list before slicing.
//! Slicing first and filtering after would hand out short pages even
//! when more matching items exist.

use crate::types::{MediaItem, MediaKind, Page, Result};
use std::future::Future;
use tracing::debug;

/// One page of `items`, filtered to `filter` first when given.
pub fn page(items: &[MediaItem], offset: usize, limit: usize, filter: Option<MediaKind>) -> Page {
    let considered: Vec<&MediaItem> = match filter {
        Some(kind) => items.iter().filter(|item| item.kind == kind).collect(),
        None => items.iter().collect(),
    };

    let total = considered.len();
    let end = offset.saturating_add(limit);
    let data = considered
        .into_iter()
        .skip(offset)
        .take(limit)
        .cloned()
        .collect();

    Page {
        data,
        has_more: end < total,
        total_considered: total,
    }
}

/// How many items to request upstream per wanted item.
pub fn overfetch_factor(filtered: bool, cache_cold: bool) -> usize {
    match (filtered, cache_cold) {
        (false, _) => 1,
        (true, false) => 2,
        (true, true) => 3,
    }
}

pub fn overfetch_limit(limit: usize, filtered: bool, cache_cold: bool) -> usize {
    limit.saturating_mul(overfetch_factor(filtered, cache_cold)).max(1)
}

/// Build a filtered page from an upstream that only pages unfiltered.
///
/// `fetch(offset, limit)` is called at most `max_calls` times with
/// overfetched limits. The upstream counts as exhausted only once it
/// returns fewer items than were asked for; until then `has_more` stays
/// true even if the filtered page came up short.
pub async fn fill_filtered_page<F, Fut>(
    mut fetch: F,
    offset: usize,
    limit: usize,
    filter: MediaKind,
    cache_cold: bool,
    max_calls: usize,
) -> Result<Page>
where
    F: FnMut(usize, usize) -> Fut,
    Fut: Future<Output = Result<Vec<MediaItem>>>,
{
    let chunk = overfetch_limit(limit, true, cache_cold);
    let wanted = offset.saturating_add(limit);
    let mut collected: Vec<MediaItem> = Vec::new();
    let mut matching = 0usize;
    let mut upstream_offset = 0usize;
    let mut exhausted = false;

    for call in 0..max_calls.max(1) {
        let batch = fetch(upstream_offset, chunk).await?;
        let returned = batch.len();
        upstream_offset += returned;
        matching += batch.iter().filter(|item| item.kind == filter).count();
        collected.extend(batch);
        debug!(
            "Upstream call {}: {} returned, {} matching {}",
            call + 1,
            returned,
            matching,
            filter
        );

        if returned < chunk {
            exhausted = true;
            break;
        }
        // one extra match tells us whether a next page exists
        if matching > wanted {
            break;
        }
    }

    let mut result = page(&collected, offset, limit, Some(filter));
    if !exhausted {
        result.has_more = true;
    }
    Ok(result)
}
