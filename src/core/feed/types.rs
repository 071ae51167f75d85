use serde::{Deserialize, Serialize};

/// A user-configured syndication source. Identity is the `url`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Feed {
    pub name: String,
    pub url: String,
}

/// One comment in a provider's discussion tree. `depth` is 0 for top-level
/// comments and increments per nesting level; `body` is raw HTML.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub body: String,
    pub url: String,
    pub depth: usize,
    #[serde(default)]
    pub children: Vec<Comment>,
}

/// Discussion data from the Hacker News side of an article's enrichment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct HnThread {
    pub id: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub comment_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Discussion data from the Reddit side of an article's enrichment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RedditThread {
    pub url: Option<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub comment_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Mutable enrichment state attached to an article. The two provider
/// sub-records are fetched and stored independently; one provider failing
/// never touches the other's data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SocialData {
    /// Per-article fetch mutex: no enrichment fetch starts while this is set.
    #[serde(default)]
    pub is_fetching: bool,
    /// Unix millis of the most recent completed enrichment attempt.
    #[serde(default)]
    pub last_social_check: Option<i64>,
    #[serde(default)]
    pub hn: HnThread,
    #[serde(default)]
    pub reddit: RedditThread,
}

impl SocialData {
    pub fn total_comment_count(&self) -> u32 {
        self.hn.comment_count + self.reddit.comment_count
    }
}

/// A canonical article extracted from a feed. Core fields are immutable once
/// parsed; only `social` changes afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub link: String,
    pub description: String,
    pub feed_name: String,
    pub feed_url: String,
    /// Raw date string as supplied by the feed (RFC 3339 or RFC 2822).
    pub pub_date: String,
    #[serde(default)]
    pub social: SocialData,
}

impl Article {
    /// Parses `pub_date` for recency sorting. Unparseable dates sort as the
    /// Unix epoch rather than failing.
    pub fn published_millis(&self) -> i64 {
        chrono::DateTime::parse_from_rfc3339(&self.pub_date)
            .or_else(|_| chrono::DateTime::parse_from_rfc2822(&self.pub_date))
            .map(|timestamp| timestamp.timestamp_millis())
            .unwrap_or(0)
    }
}
