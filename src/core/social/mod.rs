pub mod hn;
pub mod reddit;

use chrono::Utc;

use crate::core::config::ManagerConfig;
use crate::core::feed::types::{Article, SocialData};

/// Runs both provider lookups concurrently and joins them into one
/// enrichment record. Each branch catches its own failures, so one provider
/// going down never costs the other's data; the whole call never fails.
pub async fn fetch_social_data(
    client: &reqwest::Client,
    config: &ManagerConfig,
    article: &Article,
) -> SocialData {
    let (hn, reddit) = tokio::join!(
        hn::fetch_hn_thread(client, config, &article.title),
        reddit::fetch_reddit_thread(client, config, &article.title),
    );

    SocialData {
        is_fetching: false,
        last_social_check: Some(Utc::now().timestamp_millis()),
        hn,
        reddit,
    }
}
