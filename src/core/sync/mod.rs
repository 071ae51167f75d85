use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::core::manager::FeedManager;

/// Periodic whole-collection refresh: once at startup, then on a fixed
/// interval. The timer resets whenever the feed list changes, and the task
/// stops cleanly on `shutdown`.
pub struct RefreshScheduler {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl RefreshScheduler {
    pub fn spawn(manager: Arc<FeedManager>) -> Self {
        let (stop, mut stopped) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut feed_list_changes = manager.subscribe_feed_list();
            run_refresh(&manager).await;
            loop {
                let interval = manager.config().refresh_cache_window;
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        run_refresh(&manager).await;
                    }
                    changed = feed_list_changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        // feed list changed: refresh now, interval restarts
                        run_refresh(&manager).await;
                    }
                    _ = stopped.changed() => break,
                }
            }
        });
        Self { stop, handle }
    }

    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        let _ = self.handle.await;
    }
}

async fn run_refresh(manager: &FeedManager) {
    if let Err(error) = manager.refresh(false).await {
        tracing::warn!(%error, "scheduled refresh failed");
    }
}

/// Background enrichment worker: wakes on a short fixed cadence, rebuilds
/// its queue whenever the store has changed, and runs at most one enrichment
/// fetch per wake. Single-concurrency by construction, which keeps outbound
/// request volume to the discussion APIs at one every few seconds no matter
/// how large the backlog is.
pub struct SocialScheduler {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl SocialScheduler {
    pub fn spawn(manager: Arc<FeedManager>) -> Self {
        let (stop, mut stopped) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut store_changes = manager.subscribe();
            let mut queue: VecDeque<String> = manager.social_backfill_ids().await.into();
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(manager.config().social_check_interval) => {
                        if store_changes.has_changed().unwrap_or(false) {
                            store_changes.mark_unchanged();
                            queue = manager.social_backfill_ids().await.into();
                        }
                        let Some(article_id) = queue.pop_front() else {
                            continue;
                        };
                        // eligibility is re-checked inside; a stale id is a no-op
                        if let Err(error) = manager.fetch_social(&article_id, false).await {
                            tracing::warn!(%error, %article_id, "background enrichment failed");
                        }
                    }
                    _ = stopped.changed() => break,
                }
            }
        });
        Self { stop, handle }
    }

    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        let _ = self.handle.await;
    }
}
