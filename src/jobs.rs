//! Background jobs: the persistence queue and the hourly cleanup tick.
//!
//! At-least-once, fire-and-forget. Saves retry three times with backoff,
//! cleanup retries once; after that the job is logged and dropped. There is
//! no dead-letter handling and no overlap protection on the cleanup timer.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use metrics::counter;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::store::FeedStore;
use crate::transform::CategoryBundle;

const SAVE_ATTEMPTS: u32 = 3;
const CLEANUP_ATTEMPTS: u32 = 2;

enum Job {
    SaveCategory {
        category: String,
        bundle: Box<CategoryBundle>,
    },
}

/// Handle for enqueueing persistence work.
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::UnboundedSender<Job>,
}

impl JobQueue {
    /// Spawn the worker and return the enqueue handle.
    pub fn start(store: Arc<dyn FeedStore>, freshness: Duration) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();

        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                match job {
                    Job::SaveCategory { category, bundle } => {
                        save_with_retries(store.as_ref(), &category, &bundle, freshness).await;
                    }
                }
            }
        });

        Self { tx }
    }

    pub fn enqueue_save(&self, category: &str, bundle: CategoryBundle) {
        let job = Job::SaveCategory {
            category: category.to_string(),
            bundle: Box::new(bundle),
        };
        if self.tx.send(job).is_err() {
            tracing::error!(category = %category, "persistence worker is gone; dropping save");
        }
    }
}

async fn save_with_retries(
    store: &dyn FeedStore,
    category: &str,
    bundle: &CategoryBundle,
    freshness: Duration,
) {
    for attempt in 0..SAVE_ATTEMPTS {
        if attempt > 0 {
            tokio::time::sleep(Duration::from_secs(2u64 << (attempt - 1))).await;
        }
        match store.save_bundle(category, bundle, freshness).await {
            Ok(()) => {
                counter!("jobs_saved_total").increment(1);
                return;
            }
            Err(e) => {
                tracing::warn!(error = ?e, category = %category, attempt, "save job failed");
            }
        }
    }
    counter!("jobs_dropped_total").increment(1);
    tracing::error!(category = %category, "save job dropped after retries");
}

/// Hourly cleanup: delete rows older than the retention window.
pub fn spawn_cleanup_scheduler(
    store: Arc<dyn FeedStore>,
    interval: Duration,
    retention: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; skip it so startup stays quiet.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            run_cleanup_once(store.as_ref(), retention).await;
        }
    })
}

/// One cleanup pass with the bounded retry policy. Public so tests and the
/// scheduler share the exact same path.
pub async fn run_cleanup_once(store: &dyn FeedStore, retention: Duration) {
    let cutoff = Utc::now().timestamp() as f64 - retention.as_secs_f64();
    for attempt in 0..CLEANUP_ATTEMPTS {
        match store.cleanup_older_than(cutoff).await {
            Ok(report) => {
                counter!("cleanup_runs_total").increment(1);
                counter!("cleanup_deleted_total")
                    .increment((report.signals + report.feeds + report.payments) as u64);
                return;
            }
            Err(e) => {
                tracing::error!(error = ?e, attempt, "cleanup failed");
            }
        }
    }
    tracing::error!("cleanup dropped after retries");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use crate::providers::types::RawNewsItem;
    use crate::store::MemoryStore;
    use crate::transform::transform_items;

    fn bundle() -> CategoryBundle {
        let items = vec![RawNewsItem {
            news_url: "https://example.com/a".to_string(),
            title: "A headline long enough".to_string(),
            date: "2025-03-01T00:00:00Z".to_string(),
            ..RawNewsItem::default()
        }];
        transform_items(&items, &[], Category::Btc, "m")
    }

    #[tokio::test]
    async fn enqueued_save_lands_in_store() {
        let store = Arc::new(MemoryStore::new());
        let queue = JobQueue::start(store.clone(), Duration::from_secs(3600));
        queue.enqueue_save("btc", bundle());

        // The worker is async; poll briefly for the row to appear.
        for _ in 0..50 {
            if store.signal_count() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(store.signal_count(), 1);
        assert!(store.latest_feed("btc").await.is_some());
    }

    #[tokio::test]
    async fn cleanup_removes_expired_rows() {
        let store = MemoryStore::new();
        store
            .save_bundle("btc", &bundle(), Duration::from_secs(3600))
            .await
            .unwrap();
        // Zero retention: everything saved before "now" is past the cutoff.
        run_cleanup_once(&store, Duration::from_secs(0)).await;
        assert_eq!(store.signal_count(), 0);
    }
}
