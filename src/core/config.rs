use std::time::Duration;

use crate::core::feed::types::Feed;

/// Runtime knobs for the aggregation core. `Default` mirrors the production
/// endpoints and cache policy; tests point the endpoints at local servers and
/// drop the proxy.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// CORS-forwarding proxy prefix. The target URL is appended url-encoded.
    /// `None` fetches the target directly.
    pub proxy_base: Option<String>,
    pub hn_search_api: String,
    pub hn_item_api: String,
    pub reddit_search_api: String,
    /// Minimum interval between non-forced whole-collection refreshes.
    pub refresh_cache_window: Duration,
    /// Wake cadence of the background enrichment worker.
    pub social_check_interval: Duration,
    /// How long a comment-less article is left alone before a recheck.
    pub social_cache_window: Duration,
    /// Per-feed cap on items merged from one refresh.
    pub max_items_per_feed: usize,
    pub request_timeout: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            proxy_base: Some("https://corsproxy.io/?".to_string()),
            hn_search_api: "https://hn.algolia.com/api/v1/search".to_string(),
            hn_item_api: "https://hn.algolia.com/api/v1/items".to_string(),
            reddit_search_api: "https://www.reddit.com/search.json".to_string(),
            refresh_cache_window: Duration::from_secs(15 * 60),
            social_check_interval: Duration::from_secs(3),
            social_cache_window: Duration::from_secs(10 * 60),
            max_items_per_feed: 20,
            request_timeout: Duration::from_secs(20),
        }
    }
}

impl ManagerConfig {
    /// Applies the proxy-prefix convention to a target URL.
    pub fn proxied(&self, url: &str) -> String {
        match &self.proxy_base {
            Some(base) => format!("{base}{}", urlencoding::encode(url)),
            None => url.to_string(),
        }
    }
}

pub fn default_feeds() -> Vec<Feed> {
    vec![Feed {
        name: "Hacker News".to_string(),
        url: "https://news.ycombinator.com/rss".to_string(),
    }]
}
