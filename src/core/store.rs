use std::collections::HashSet;

use crate::core::feed::types::{Article, SocialData};

/// The in-process, deduplicated article collection. Identity is the
/// content-derived `Article::id`; insertion order is preserved across merges.
#[derive(Debug, Clone, Default)]
pub struct ArticleStore {
    articles: Vec<Article>,
}

impl ArticleStore {
    /// Rebuilds the store from persisted articles. `is_fetching` is a
    /// runtime-only guard, so it is cleared here: a crash mid-fetch must not
    /// leave an article stuck in "fetching forever".
    pub fn from_articles(mut articles: Vec<Article>) -> Self {
        for article in &mut articles {
            article.social.is_fetching = false;
        }
        Self { articles }
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Article> {
        self.articles.iter().find(|article| article.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Article> {
        self.articles.iter_mut().find(|article| article.id == id)
    }

    /// Merges newly parsed articles. Unknown ids are appended in arrival
    /// order; an id collision keeps the stored article wholesale, so
    /// enrichment already attached to it is never clobbered by a re-parse.
    /// Returns how many articles were actually inserted.
    pub fn merge(&mut self, parsed: Vec<Article>) -> usize {
        let known: HashSet<String> = self
            .articles
            .iter()
            .map(|article| article.id.clone())
            .collect();
        let mut inserted = 0;
        let mut seen = known;
        for article in parsed {
            if seen.insert(article.id.clone()) {
                self.articles.push(article);
                inserted += 1;
            }
        }
        inserted
    }

    /// Cascade delete: removing a feed drops every article it produced.
    pub fn remove_feed(&mut self, feed_url: &str) {
        self.articles.retain(|article| article.feed_url != feed_url);
    }

    /// Ids of articles the background worker should backfill: nothing
    /// in flight, no comments found yet, and not rechecked within the
    /// no-comment cache window. Articles that already have comments are
    /// only refreshed by a forced manual fetch.
    pub fn social_backfill_ids(&self, now_millis: i64, cache_window_millis: i64) -> Vec<String> {
        self.articles
            .iter()
            .filter(|article| {
                social_fetch_eligible(article, false, now_millis, cache_window_millis)
            })
            .map(|article| article.id.clone())
            .collect()
    }

    pub fn set_fetching(&mut self, id: &str, is_fetching: bool) -> bool {
        match self.get_mut(id) {
            Some(article) => {
                article.social.is_fetching = is_fetching;
                true
            }
            None => false,
        }
    }

    /// Writes a completed enrichment result back. Only `social` changes;
    /// the article's core fields stay as parsed.
    pub fn apply_social(&mut self, id: &str, social: SocialData) -> bool {
        match self.get_mut(id) {
            Some(article) => {
                article.social = social;
                article.social.is_fetching = false;
                true
            }
            None => false,
        }
    }
}

/// The enrichment trigger predicate. A fetch may start when nothing is in
/// flight for the article and either the caller forces it, or the article
/// has no comments from either provider and was not checked recently.
pub fn social_fetch_eligible(
    article: &Article,
    force: bool,
    now_millis: i64,
    cache_window_millis: i64,
) -> bool {
    if article.social.is_fetching {
        return false;
    }
    if force {
        return true;
    }
    if article.social.total_comment_count() > 0 {
        return false;
    }
    match article.social.last_social_check {
        None => true,
        Some(checked) => now_millis - checked >= cache_window_millis,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::feed::parser::article_id;
    use crate::core::feed::types::HnThread;

    const WINDOW: i64 = 10 * 60 * 1000;

    fn make_article(link: &str, feed_url: &str) -> Article {
        Article {
            id: article_id(link),
            title: format!("Article at {link}"),
            link: link.to_string(),
            description: String::new(),
            feed_name: "Feed".to_string(),
            feed_url: feed_url.to_string(),
            pub_date: "2024-05-25T14:48:35-07:00".to_string(),
            social: SocialData::default(),
        }
    }

    fn enriched(mut article: Article, hn_count: u32) -> Article {
        article.social.hn = HnThread {
            comment_count: hn_count,
            ..HnThread::default()
        };
        article.social.last_social_check = Some(1_000);
        article
    }

    #[test]
    fn merge_inserts_unknown_and_keeps_existing_enrichment() {
        let existing = enriched(make_article("https://a.com/1", "https://a.com/feed"), 5);
        let mut store = ArticleStore::from_articles(vec![existing.clone()]);

        // same link re-parsed in a later cycle arrives with empty social
        let reparsed = make_article("https://a.com/1", "https://a.com/feed");
        let fresh = make_article("https://a.com/2", "https://a.com/feed");
        let inserted = store.merge(vec![reparsed, fresh]);

        assert_eq!(inserted, 1);
        assert_eq!(store.len(), 2);
        let kept = store.get(&existing.id).expect("existing must remain");
        assert_eq!(kept.social.hn.comment_count, 5);
        assert_eq!(kept.social.last_social_check, Some(1_000));
    }

    #[test]
    fn merge_of_only_known_ids_is_a_no_op() {
        let first = make_article("https://a.com/1", "https://a.com/feed");
        let second = make_article("https://a.com/2", "https://a.com/feed");
        let mut store = ArticleStore::from_articles(vec![first.clone(), second.clone()]);

        let inserted = store.merge(vec![second.clone(), first.clone()]);

        assert_eq!(inserted, 0);
        assert_eq!(
            store.articles().iter().map(|a| &a.id).collect::<Vec<_>>(),
            vec![&first.id, &second.id]
        );
    }

    #[test]
    fn merge_dedupes_within_one_batch() {
        let mut store = ArticleStore::default();
        let article = make_article("https://a.com/1", "https://a.com/feed");
        let inserted = store.merge(vec![article.clone(), article]);
        assert_eq!(inserted, 1);
    }

    #[test]
    fn remove_feed_cascades_to_articles() {
        let keep = make_article("https://a.com/1", "https://a.com/feed");
        let drop_one = make_article("https://b.com/1", "https://b.com/feed");
        let drop_two = make_article("https://b.com/2", "https://b.com/feed");
        let mut store = ArticleStore::from_articles(vec![keep.clone(), drop_one, drop_two]);

        store.remove_feed("https://b.com/feed");

        assert_eq!(store.len(), 1);
        assert_eq!(store.articles()[0].id, keep.id);
    }

    #[test]
    fn eligibility_follows_the_state_machine() {
        let now = 100 * 60 * 1000;
        let fresh = make_article("https://a.com/1", "https://a.com/feed");
        assert!(social_fetch_eligible(&fresh, false, now, WINDOW));

        let mut fetching = fresh.clone();
        fetching.social.is_fetching = true;
        assert!(!social_fetch_eligible(&fetching, false, now, WINDOW));
        assert!(!social_fetch_eligible(&fetching, true, now, WINDOW));

        // recently checked, still comment-less: throttled
        let mut checked = fresh.clone();
        checked.social.last_social_check = Some(now - WINDOW / 2);
        assert!(!social_fetch_eligible(&checked, false, now, WINDOW));
        assert!(social_fetch_eligible(&checked, true, now, WINDOW));

        // checked long ago: recheck allowed
        checked.social.last_social_check = Some(now - WINDOW * 2);
        assert!(social_fetch_eligible(&checked, false, now, WINDOW));

        // has comments: background skips it, force still works
        let with_comments = enriched(fresh, 3);
        assert!(!social_fetch_eligible(&with_comments, false, now, WINDOW));
        assert!(social_fetch_eligible(&with_comments, true, now, WINDOW));
    }

    #[test]
    fn backfill_queue_lists_only_eligible_articles() {
        let now = 100 * 60 * 1000;
        let fresh = make_article("https://a.com/1", "https://a.com/feed");
        let with_comments = enriched(make_article("https://a.com/2", "https://a.com/feed"), 2);
        let mut throttled = make_article("https://a.com/3", "https://a.com/feed");
        throttled.social.last_social_check = Some(now - WINDOW / 4);
        let store =
            ArticleStore::from_articles(vec![fresh.clone(), with_comments, throttled]);

        let queue = store.social_backfill_ids(now, WINDOW);
        assert_eq!(queue, vec![fresh.id]);
    }

    #[test]
    fn loading_resets_stuck_fetching_flags() {
        let mut article = make_article("https://a.com/1", "https://a.com/feed");
        article.social.is_fetching = true;
        let store = ArticleStore::from_articles(vec![article]);
        assert!(!store.articles()[0].social.is_fetching);
    }
}
