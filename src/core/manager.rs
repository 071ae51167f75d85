use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinSet;

use crate::core::config::{default_feeds, ManagerConfig};
use crate::core::feed::fetcher::{self, fetch_text};
use crate::core::feed::parser::parse_feed;
use crate::core::feed::types::{Article, Feed};
use crate::core::importer;
use crate::core::llm::{self, LlmConfig, SummaryCache};
use crate::core::social::fetch_social_data;
use crate::core::storage::{
    StateStorage, StorageError, ARTICLES_KEY, FEEDS_KEY, LAST_UPDATED_KEY,
};
use crate::core::store::{social_fetch_eligible, ArticleStore};

#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    #[error("unknown article: {0}")]
    UnknownArticle(String),
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Import(#[from] importer::ImportError),
    #[error(transparent)]
    Llm(#[from] llm::LlmError),
    #[error("no summarization endpoint is configured")]
    LlmUnconfigured,
}

struct ManagerState {
    feeds: Vec<Feed>,
    store: ArticleStore,
    last_updated: Option<i64>,
    is_refreshing: bool,
}

/// The owned application state: configured feeds, the article store and the
/// enrichment state machine, with persistence on every mutation and a
/// watch-channel subscribe contract for consumers. Share it as
/// `Arc<FeedManager>`; all mutation is serialized through one async mutex.
pub struct FeedManager {
    config: ManagerConfig,
    storage: Arc<dyn StateStorage>,
    client: reqwest::Client,
    state: Mutex<ManagerState>,
    /// Bumped on every state change.
    revision: watch::Sender<u64>,
    /// Bumped only when the feed list itself changes.
    feeds_revision: watch::Sender<u64>,
    llm_config: Option<LlmConfig>,
    summary_cache: SummaryCache,
}

impl FeedManager {
    /// Loads persisted state from the injected backend. A key that fails to
    /// decode falls back to its default rather than blocking startup.
    pub fn new(
        config: ManagerConfig,
        storage: Arc<dyn StateStorage>,
    ) -> Result<Self, ManagerError> {
        let feeds = load_or_default(&*storage, FEEDS_KEY, default_feeds)?;
        let articles: Vec<Article> = load_or_default(&*storage, ARTICLES_KEY, Vec::new)?;
        let last_updated: Option<i64> = load_or_default(&*storage, LAST_UPDATED_KEY, || None)?;

        let client = fetcher::build_client(&config)?;
        let (revision, _) = watch::channel(0);
        let (feeds_revision, _) = watch::channel(0);

        Ok(Self {
            config,
            storage,
            client,
            state: Mutex::new(ManagerState {
                feeds,
                store: ArticleStore::from_articles(articles),
                last_updated,
                is_refreshing: false,
            }),
            revision,
            feeds_revision,
            llm_config: llm::config_from_env(),
            summary_cache: SummaryCache::default(),
        })
    }

    pub fn with_llm_config(mut self, llm_config: Option<LlmConfig>) -> Self {
        self.llm_config = llm_config;
        self
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Subscribe to state changes. The value is a revision counter; readers
    /// re-query the manager when it moves.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Subscribe to feed-list changes only (used to reset the refresh timer).
    pub fn subscribe_feed_list(&self) -> watch::Receiver<u64> {
        self.feeds_revision.subscribe()
    }

    pub async fn feeds(&self) -> Vec<Feed> {
        self.state.lock().await.feeds.clone()
    }

    pub async fn articles(&self) -> Vec<Article> {
        self.state.lock().await.store.articles().to_vec()
    }

    pub async fn article(&self, article_id: &str) -> Option<Article> {
        self.state.lock().await.store.get(article_id).cloned()
    }

    pub async fn last_updated(&self) -> Option<i64> {
        self.state.lock().await.last_updated
    }

    /// Adds a feed unless its url is already configured.
    pub async fn add_feed(&self, feed: Feed) -> Result<(), ManagerError> {
        let mut state = self.state.lock().await;
        if state.feeds.iter().any(|existing| existing.url == feed.url) {
            return Ok(());
        }
        state.feeds.push(feed);
        self.persist_feeds(&state.feeds)?;
        drop(state);
        self.notify_feed_list_changed();
        Ok(())
    }

    /// Removes a feed and cascade-deletes every article it produced.
    pub async fn remove_feed(&self, url: &str) -> Result<(), ManagerError> {
        let mut state = self.state.lock().await;
        state.feeds.retain(|feed| feed.url != url);
        state.store.remove_feed(url);
        self.persist_feeds(&state.feeds)?;
        self.persist_articles(&state.store)?;
        drop(state);
        self.notify_feed_list_changed();
        Ok(())
    }

    /// Merges an imported feed list (by url, last value wins).
    pub async fn import_feeds(&self, imported: Vec<Feed>) -> Result<(), ManagerError> {
        let mut state = self.state.lock().await;
        state.feeds = importer::merge_feed_lists(&state.feeds, imported);
        self.persist_feeds(&state.feeds)?;
        drop(state);
        self.notify_feed_list_changed();
        Ok(())
    }

    /// Parses and imports a feed-list JSON payload. A malformed payload is
    /// rejected whole; nothing is imported.
    pub async fn import_feeds_json(&self, payload: &str) -> Result<(), ManagerError> {
        let imported = importer::parse_feed_list(payload)?;
        self.import_feeds(imported).await
    }

    pub async fn export_feeds_json(&self) -> Result<String, ManagerError> {
        let state = self.state.lock().await;
        Ok(importer::export_feed_list(&state.feeds)?)
    }

    /// Fetches all configured feeds in parallel, parses them and merges the
    /// results into the store. Single-flight for the whole collection; a
    /// non-forced call inside the cache window is a no-op. One feed failing
    /// only costs that feed's articles. Returns whether a refresh ran.
    pub async fn refresh(&self, force: bool) -> Result<bool, ManagerError> {
        let feeds = {
            let mut state = self.state.lock().await;
            if state.is_refreshing {
                return Ok(false);
            }
            if !force {
                let now = Utc::now().timestamp_millis();
                let window = self.config.refresh_cache_window.as_millis() as i64;
                if let Some(last) = state.last_updated {
                    if now - last < window {
                        tracing::debug!("refresh skipped, inside cache window");
                        return Ok(false);
                    }
                }
            }
            state.is_refreshing = true;
            state.feeds.clone()
        };

        let batches = self.fetch_all_feeds(&feeds).await;

        let mut state = self.state.lock().await;
        state.is_refreshing = false;
        let inserted: usize = batches
            .into_iter()
            .map(|batch| state.store.merge(batch))
            .sum();
        state.last_updated = Some(Utc::now().timestamp_millis());
        tracing::info!(inserted, total = state.store.len(), "refresh merged");

        self.persist_articles(&state.store)?;
        self.persist_last_updated(state.last_updated)?;
        drop(state);
        self.notify_changed();
        Ok(true)
    }

    /// Fan-out across all feeds, joined wait-for-all. Each feed's failure
    /// degrades to an empty batch; batch order follows the feed list so the
    /// merge stays deterministic.
    async fn fetch_all_feeds(&self, feeds: &[Feed]) -> Vec<Vec<Article>> {
        let mut tasks = JoinSet::new();
        for (index, feed) in feeds.iter().cloned().enumerate() {
            let client = self.client.clone();
            let config = self.config.clone();
            let cap = self.config.max_items_per_feed;
            tasks.spawn(async move {
                let batch = match fetch_and_parse(&client, &config, &feed).await {
                    Ok(mut articles) => {
                        articles.truncate(cap);
                        articles
                    }
                    Err(error) => {
                        tracing::warn!(feed = %feed.name, %error, "feed refresh failed");
                        Vec::new()
                    }
                };
                (index, batch)
            });
        }

        let mut batches = vec![Vec::new(); feeds.len()];
        while let Some(joined) = tasks.join_next().await {
            if let Ok((index, batch)) = joined {
                batches[index] = batch;
            }
        }
        batches
    }

    /// Runs one enrichment fetch for an article if it is eligible: nothing
    /// already in flight, and either forced or comment-less and outside the
    /// no-comment recheck window. The `is_fetching` flag is set before the
    /// network calls and cleared on every exit path. Returns whether a fetch
    /// ran.
    pub async fn fetch_social(&self, article_id: &str, force: bool) -> Result<bool, ManagerError> {
        let window = self.config.social_cache_window.as_millis() as i64;
        let article = {
            let mut state = self.state.lock().await;
            let Some(article) = state.store.get(article_id) else {
                return Ok(false);
            };
            let now = Utc::now().timestamp_millis();
            if !social_fetch_eligible(article, force, now, window) {
                return Ok(false);
            }
            let article = article.clone();
            state.store.set_fetching(article_id, true);
            article
        };
        self.notify_changed();

        let social = fetch_social_data(&self.client, &self.config, &article).await;

        let mut state = self.state.lock().await;
        state.store.apply_social(article_id, social);
        let persisted = self.persist_articles(&state.store);
        drop(state);
        self.notify_changed();
        persisted?;
        Ok(true)
    }

    /// Articles the background worker should backfill right now.
    pub async fn social_backfill_ids(&self) -> Vec<String> {
        let window = self.config.social_cache_window.as_millis() as i64;
        let now = Utc::now().timestamp_millis();
        self.state.lock().await.store.social_backfill_ids(now, window)
    }

    /// Summarizes an article's combined discussion (both providers,
    /// flattened). Fails with a user-surfaceable error when no endpoint is
    /// configured or the model call fails; never touches article state.
    pub async fn summarize_discussion(&self, article_id: &str) -> Result<String, ManagerError> {
        let config = self
            .llm_config
            .as_ref()
            .ok_or(ManagerError::LlmUnconfigured)?;
        let article = self
            .article(article_id)
            .await
            .ok_or_else(|| ManagerError::UnknownArticle(article_id.to_string()))?;

        let mut comments = article.social.hn.comments.clone();
        comments.extend(article.social.reddit.comments.clone());

        Ok(llm::summarize_comments(config, &self.summary_cache, &article.title, &comments).await?)
    }

    fn persist_feeds(&self, feeds: &[Feed]) -> Result<(), StorageError> {
        self.storage.set(FEEDS_KEY, serde_json::to_value(feeds)?)
    }

    fn persist_articles(&self, store: &ArticleStore) -> Result<(), StorageError> {
        self.storage
            .set(ARTICLES_KEY, serde_json::to_value(store.articles())?)
    }

    fn persist_last_updated(&self, last_updated: Option<i64>) -> Result<(), StorageError> {
        self.storage
            .set(LAST_UPDATED_KEY, serde_json::to_value(last_updated)?)
    }

    fn notify_changed(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    fn notify_feed_list_changed(&self) {
        self.feeds_revision.send_modify(|revision| *revision += 1);
        self.notify_changed();
    }
}

async fn fetch_and_parse(
    client: &reqwest::Client,
    config: &ManagerConfig,
    feed: &Feed,
) -> Result<Vec<Article>, Box<dyn std::error::Error + Send + Sync>> {
    let body = fetch_text(client, config, &feed.url).await?;
    Ok(parse_feed(&body, feed)?)
}

fn load_or_default<T, F>(
    storage: &dyn StateStorage,
    key: &str,
    default: F,
) -> Result<T, StorageError>
where
    T: serde::de::DeserializeOwned,
    F: FnOnce() -> T,
{
    match storage.get(key)? {
        Some(value) => match serde_json::from_value(value) {
            Ok(decoded) => Ok(decoded),
            Err(error) => {
                tracing::warn!(key, %error, "persisted value failed to decode, using default");
                Ok(default())
            }
        },
        None => Ok(default()),
    }
}
