use serde::Deserialize;

use crate::core::config::ManagerConfig;
use crate::core::feed::fetcher::{fetch_json, FetchError};
use crate::core::feed::types::{Comment, RedditThread};

pub const NOT_FOUND: &str = "Not found on Reddit";

/// Cap on the comment listing fetch, matching the `.json?limit=` convention.
const COMMENT_FETCH_LIMIT: u32 = 100;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Option<ListingData<SearchChild>>,
}

#[derive(Debug, Deserialize)]
struct ListingData<T> {
    #[serde(default = "Vec::new")]
    children: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct SearchChild {
    data: PostData,
}

#[derive(Debug, Deserialize)]
struct PostData {
    permalink: String,
    #[serde(default)]
    num_comments: Option<u32>,
}

/// One element of the two-listing response returned for `<permalink>.json`:
/// index 0 is the submission, index 1 the comment forest.
#[derive(Debug, Deserialize)]
struct CommentListing {
    #[serde(default)]
    data: Option<ListingData<RawNode>>,
}

#[derive(Debug, Deserialize)]
struct RawNode {
    #[serde(default)]
    kind: String,
    data: RawComment,
}

#[derive(Debug, Deserialize)]
struct RawComment {
    #[serde(default)]
    id: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    body_html: Option<String>,
    #[serde(default)]
    permalink: Option<String>,
    #[serde(default)]
    replies: Replies,
}

/// Reddit encodes "no replies" as the empty string instead of a listing.
#[derive(Debug, Deserialize, Default)]
#[serde(untagged)]
enum Replies {
    Listing(Box<CommentListing>),
    // absorbs the "" sentinel; the payload itself is never read
    Text(#[allow(dead_code)] String),
    #[default]
    None,
}

impl Replies {
    fn children(&self) -> &[RawNode] {
        match self {
            Replies::Listing(listing) => listing
                .data
                .as_ref()
                .map(|data| data.children.as_slice())
                .unwrap_or_default(),
            _ => &[],
        }
    }
}

/// Looks up an article's Reddit discussion by exact title. Never returns
/// `Err`: failures land in the thread's `error` field, isolated from the
/// sibling provider.
pub async fn fetch_reddit_thread(
    client: &reqwest::Client,
    config: &ManagerConfig,
    title: &str,
) -> RedditThread {
    match lookup(client, config, title).await {
        Ok(thread) => thread,
        Err(error) => {
            tracing::warn!(%error, "reddit lookup failed");
            RedditThread {
                error: Some(error.to_string()),
                ..RedditThread::default()
            }
        }
    }
}

async fn lookup(
    client: &reqwest::Client,
    config: &ManagerConfig,
    title: &str,
) -> Result<RedditThread, FetchError> {
    let search_url = format!(
        "{}?q=title:%22{}%22",
        config.reddit_search_api,
        urlencoding::encode(title)
    );
    let search: SearchResponse = fetch_json(client, config, &search_url).await?;

    let post = search
        .data
        .as_ref()
        .and_then(|data| data.children.first())
        .map(|child| &child.data);
    let Some(post) = post else {
        return Ok(RedditThread {
            error: Some(NOT_FOUND.to_string()),
            ..RedditThread::default()
        });
    };

    let submission_url = format!("https://www.reddit.com{}", post.permalink);
    let comment_count = post.num_comments.unwrap_or(0);
    if comment_count == 0 {
        return Ok(RedditThread {
            url: Some(submission_url),
            ..RedditThread::default()
        });
    }

    let comments_url = format!("{submission_url}.json?limit={COMMENT_FETCH_LIMIT}");
    let listings: Vec<CommentListing> = fetch_json(client, config, &comments_url).await?;
    let top_level = listings
        .get(1)
        .and_then(|listing| listing.data.as_ref())
        .map(|data| data.children.as_slice())
        .unwrap_or_default();

    Ok(RedditThread {
        url: Some(submission_url),
        comments: build_comment_forest(top_level, 0),
        comment_count,
        error: None,
    })
}

/// Normalizes `t1` nodes into the canonical forest, decoding the HTML
/// entities Reddit double-escapes in `body_html`. Nodes of any other kind
/// ("more", the submission itself) and bodyless nodes are skipped.
fn build_comment_forest(nodes: &[RawNode], depth: usize) -> Vec<Comment> {
    nodes
        .iter()
        .filter(|node| {
            node.kind == "t1"
                && node
                    .data
                    .body
                    .as_deref()
                    .is_some_and(|body| !body.is_empty())
        })
        .map(|node| {
            let raw = &node.data;
            let body_html = raw
                .body_html
                .clone()
                .or_else(|| raw.body.clone())
                .unwrap_or_default();
            Comment {
                id: format!("reddit-{}", raw.id),
                author: raw.author.clone().unwrap_or_default(),
                body: html_escape::decode_html_entities(&body_html).into_owned(),
                url: format!(
                    "https://www.reddit.com{}",
                    raw.permalink.as_deref().unwrap_or_default()
                ),
                depth,
                children: build_comment_forest(raw.replies.children(), depth + 1),
            }
        })
        .collect()
}
