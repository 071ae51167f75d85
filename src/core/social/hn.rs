use serde::Deserialize;

use crate::core::config::ManagerConfig;
use crate::core::feed::fetcher::{fetch_json, FetchError};
use crate::core::feed::types::{Comment, HnThread};

pub const NOT_FOUND: &str = "Not found on HN";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "objectID")]
    object_id: String,
    #[serde(default)]
    num_comments: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ItemResponse {
    #[serde(default)]
    children: Vec<RawItem>,
}

/// One node of the Algolia item tree. `text` is absent for deleted comments.
#[derive(Debug, Deserialize)]
struct RawItem {
    id: u64,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    children: Vec<RawItem>,
}

/// Looks up an article's HN discussion by title. Never returns `Err`: any
/// transport or decode failure becomes the thread's `error` field so the
/// sibling provider is unaffected.
pub async fn fetch_hn_thread(
    client: &reqwest::Client,
    config: &ManagerConfig,
    title: &str,
) -> HnThread {
    match lookup(client, config, title).await {
        Ok(thread) => thread,
        Err(error) => {
            tracing::warn!(%error, "hn lookup failed");
            HnThread {
                error: Some(error.to_string()),
                ..HnThread::default()
            }
        }
    }
}

async fn lookup(
    client: &reqwest::Client,
    config: &ManagerConfig,
    title: &str,
) -> Result<HnThread, FetchError> {
    let search_url = format!(
        "{}?query={}&tags=story",
        config.hn_search_api,
        urlencoding::encode(title)
    );
    let search: SearchResponse = fetch_json(client, config, &search_url).await?;

    let Some(story) = search.hits.first() else {
        return Ok(HnThread {
            error: Some(NOT_FOUND.to_string()),
            ..HnThread::default()
        });
    };

    let comment_count = story.num_comments.unwrap_or(0);
    let story_url = format!("https://news.ycombinator.com/item?id={}", story.object_id);
    if comment_count == 0 {
        return Ok(HnThread {
            id: Some(story.object_id.clone()),
            url: Some(story_url),
            ..HnThread::default()
        });
    }

    let item_url = format!("{}/{}", config.hn_item_api, story.object_id);
    let item: ItemResponse = fetch_json(client, config, &item_url).await?;

    Ok(HnThread {
        id: Some(story.object_id.clone()),
        url: Some(story_url),
        comments: build_comment_forest(&item.children, 0),
        comment_count,
        error: None,
    })
}

/// Normalizes the raw item tree into the canonical comment forest. Nodes
/// without text (deleted/dead) are dropped at every level, subtree included.
fn build_comment_forest(items: &[RawItem], depth: usize) -> Vec<Comment> {
    items
        .iter()
        .filter(|item| item.text.as_deref().is_some_and(|text| !text.is_empty()))
        .map(|item| Comment {
            id: format!("hn-{}", item.id),
            author: item
                .author
                .clone()
                .unwrap_or_else(|| "[deleted]".to_string()),
            body: item.text.clone().unwrap_or_default(),
            url: format!("https://news.ycombinator.com/item?id={}", item.id),
            depth,
            children: build_comment_forest(&item.children, depth + 1),
        })
        .collect()
}
