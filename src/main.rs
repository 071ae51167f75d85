use std::sync::Arc;

use backchannel::{
    interleave_by_recency, FeedManager, JsonFileStorage, ManagerConfig, RefreshScheduler,
    SocialScheduler, StateStorage,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let state_path = std::env::var("BACKCHANNEL_STATE_FILE")
        .unwrap_or_else(|_| "backchannel-state.json".to_string());
    let storage: Arc<dyn StateStorage> = Arc::new(JsonFileStorage::open(&state_path)?);
    let manager = Arc::new(FeedManager::new(ManagerConfig::default(), storage)?);

    let refresh = RefreshScheduler::spawn(manager.clone());
    let social = SocialScheduler::spawn(manager.clone());
    tracing::info!(%state_path, "backchannel running, ctrl-c to stop");

    let mut changes = manager.subscribe();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let articles = manager.articles().await;
                let enriched = articles
                    .iter()
                    .filter(|article| article.social.total_comment_count() > 0)
                    .count();
                tracing::info!(total = articles.len(), enriched, "collection updated");
                if let Some(front) = interleave_by_recency(&articles, true).first() {
                    tracing::info!(title = %front.title, feed = %front.feed_name, "top of feed");
                }
            }
        }
    }

    refresh.shutdown().await;
    social.shutdown().await;
    Ok(())
}
