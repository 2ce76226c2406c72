//! Category configuration and weighted channel selection.
//!
//! Weights follow an inverted convention that is easy to "fix" by accident:
//! an integer weight `w` makes a channel *rarer* (it survives a draw with
//! probability `1/w`), while a fractional weight `1/k` makes it *more
//! frequent* (it is replicated `k` times). Tests pin both directions.

use crate::types::{AggregatorError, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use tracing::warn;

pub const ALL_CATEGORY: &str = "All";
const ALL_TYPES_KEY: &str = "_AllTypes";
const NO_CLIPS_KEY: &str = "_NoRedGifs";
/// Upper bound on `1/w` for a fractional weight.
const MAX_REPLICAS: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelEntry {
    pub name: String,
    pub weight: Option<f64>,
}

impl ChannelEntry {
    pub fn new(name: impl Into<String>, weight: Option<f64>) -> Self {
        Self { name: name.into(), weight }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CategoryConfig {
    categories: Vec<(String, Vec<ChannelEntry>)>,
    meta_members: Vec<String>,
    clip_excluded: HashSet<String>,
}

impl CategoryConfig {
    pub fn new(categories: Vec<(String, Vec<ChannelEntry>)>, meta_members: Vec<String>, clip_excluded: HashSet<String>) -> Self {
        Self { categories, meta_members, clip_excluded }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Parse the category file: `{ "<category>": ["channel", weight?, ...],
    /// "_AllTypes": [...], "_NoRedGifs": [...] }`.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)?;
        let Value::Object(map) = value else {
            return Err(AggregatorError::Config("category file must be a JSON object".to_string()));
        };

        let mut config = CategoryConfig::default();
        for (key, value) in map {
            let Value::Array(list) = value else {
                return Err(AggregatorError::Config(format!("category {} must map to an array", key)));
            };
            match key.as_str() {
                ALL_TYPES_KEY => config.meta_members = string_entries(&list),
                NO_CLIPS_KEY => config.clip_excluded = string_entries(&list).into_iter().collect(),
                reserved if reserved.starts_with('_') => warn!("Ignoring unknown reserved key {}", reserved),
                _ => {
                    let entries = parse_entries(&key, &list)?;
                    config.categories.push((key.clone(), entries));
                }
            }
        }
        Ok(config)
    }

    /// Selectable names, meta-category first.
    pub fn category_names(&self) -> Vec<String> {
        std::iter::once(ALL_CATEGORY.to_string())
            .chain(self.categories.iter().map(|(name, _)| name.clone()))
            .collect()
    }

    pub fn entries(&self, category: &str) -> Option<&[ChannelEntry]> {
        self.categories
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, entries)| entries.as_slice())
    }

    pub fn contains(&self, category: &str) -> bool {
        category == ALL_CATEGORY || self.entries(category).is_some()
    }

    pub fn allows_clips(&self, category: &str) -> bool {
        !self.clip_excluded.contains(category)
    }

    /// Weighted, shuffled channel list for `category`. The meta-category
    /// concatenates an independent selection per member, in member order.
    /// Duplicates are left in; see [`dedup_channels`].
    pub fn select_channels<R: Rng + ?Sized>(&self, category: &str, rng: &mut R) -> Result<Vec<String>> {
        if category == ALL_CATEGORY {
            if self.meta_members.is_empty() {
                warn!("{} not found or empty, {} selects no channels", ALL_TYPES_KEY, ALL_CATEGORY);
            }
            let mut channels = Vec::new();
            for member in &self.meta_members {
                match self.entries(member) {
                    Some(entries) => channels.extend(expand_weighted(entries, rng)),
                    None => warn!("Meta-category member {} is not configured", member),
                }
            }
            return Ok(channels);
        }

        self.entries(category)
            .map(|entries| expand_weighted(entries, rng))
            .ok_or_else(|| AggregatorError::InvalidCategory(category.to_string()))
    }
}

fn string_entries(list: &[Value]) -> Vec<String> {
    list.iter().filter_map(|v| v.as_str().map(str::to_string)).collect()
}

/// A number directly after a channel name is that channel's weight.
/// Fractional weights below `1/MAX_REPLICAS` are a configuration error.
fn parse_entries(category: &str, list: &[Value]) -> Result<Vec<ChannelEntry>> {
    let mut entries: Vec<ChannelEntry> = Vec::new();
    let mut previous_was_name = false;

    for value in list {
        match value {
            Value::String(name) => {
                entries.push(ChannelEntry::new(name.clone(), None));
                previous_was_name = true;
            }
            Value::Number(n) if previous_was_name => {
                let weight = n.as_f64().filter(|w| w.is_finite() && *w > 0.0);
                match weight {
                    Some(w) if w < 1.0 && 1.0 / w > MAX_REPLICAS => {
                        return Err(AggregatorError::Config(format!(
                            "weight {} in category {} replicates a channel more than {} times",
                            n, category, MAX_REPLICAS
                        )));
                    }
                    None => warn!("Ignoring invalid weight {} in category {}", n, category),
                    _ => {}
                }
                if let Some(last) = entries.last_mut() {
                    last.weight = weight;
                }
                previous_was_name = false;
            }
            other => {
                warn!("Ignoring stray entry {} in category {}", other, category);
                previous_was_name = false;
            }
        }
    }
    Ok(entries)
}

/// Expand weights into a flat candidate list and shuffle it.
pub fn expand_weighted<R: Rng + ?Sized>(entries: &[ChannelEntry], rng: &mut R) -> Vec<String> {
    let mut candidates = Vec::new();

    for entry in entries {
        match entry.weight {
            // one live slot among `w`
            Some(w) if w >= 1.0 => {
                let slots = w.round().max(1.0) as u64;
                if rng.random_range(0..slots) == 0 {
                    candidates.push(entry.name.clone());
                }
            }
            // replicated `1/w` times
            Some(w) if w > 0.0 => {
                let copies = (1.0 / w).round().max(1.0) as usize;
                candidates.extend(std::iter::repeat(entry.name.clone()).take(copies));
            }
            _ => candidates.push(entry.name.clone()),
        }
    }

    candidates.shuffle(rng);
    candidates
}

/// Drop repeated channel names, keeping first-seen order.
pub fn dedup_channels(channels: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    channels.into_iter().filter(|c| seen.insert(c.clone())).collect()
}
