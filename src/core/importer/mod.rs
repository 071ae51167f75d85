use std::collections::HashMap;

use crate::core::feed::types::Feed;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("invalid feed list JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parses a feed-list export: a JSON array of `{name, url}` objects. A
/// malformed payload is rejected whole; there is no partial import.
pub fn parse_feed_list(input: &str) -> Result<Vec<Feed>, ImportError> {
    Ok(serde_json::from_str(input)?)
}

/// Serializes the current feed list verbatim, pretty-printed.
pub fn export_feed_list(feeds: &[Feed]) -> Result<String, ImportError> {
    Ok(serde_json::to_string_pretty(feeds)?)
}

/// Merges an imported list into the current one, keyed by url. An existing
/// url keeps its position but takes the imported value (last wins); entries
/// with a blank name or url are skipped.
pub fn merge_feed_lists(current: &[Feed], imported: Vec<Feed>) -> Vec<Feed> {
    let mut merged: Vec<Feed> = current.to_vec();
    let mut index_by_url: HashMap<String, usize> = merged
        .iter()
        .enumerate()
        .map(|(index, feed)| (feed.url.clone(), index))
        .collect();

    for feed in imported {
        if feed.name.is_empty() || feed.url.is_empty() {
            continue;
        }
        match index_by_url.get(&feed.url) {
            Some(&index) => merged[index] = feed,
            None => {
                index_by_url.insert(feed.url.clone(), merged.len());
                merged.push(feed);
            }
        }
    }

    merged
}
