//! Persistence seam: category feed snapshots, individual signals, and
//! payment records.
//!
//! The trait is the adapter boundary for a relational store. The in-memory
//! implementation backs tests and single-node deployments; upsert semantics
//! (feed freshness window, signal `upstream_key`) live here so any backend
//! behaves identically.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::transform::{CategoryBundle, Signal};

/// Persisted snapshot of one category's bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryFeed {
    pub category: String,
    pub cryptonews_items: Vec<Signal>,
    pub twitter_items: Vec<Signal>,
    pub total_news: usize,
    pub total_tweets: usize,
    pub total_items: usize,
    pub last_updated: f64,
    pub created_at: f64,
}

/// Settled-payment log row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub payment_hash: String,
    pub endpoint: String,
    pub category: String,
    pub amount: f64,
    pub verified: bool,
    pub settled: bool,
    pub created_at: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub signals: usize,
    pub feeds: usize,
    pub payments: usize,
}

#[async_trait]
pub trait FeedStore: Send + Sync {
    /// Persist one bundle: the freshest feed for the category is updated in
    /// place when it is younger than `freshness`, otherwise a new snapshot
    /// supersedes it. Signals upsert by `upstream_key`.
    async fn save_bundle(
        &self,
        category: &str,
        bundle: &CategoryBundle,
        freshness: Duration,
    ) -> Result<()>;

    /// Freshest persisted snapshot for a category, if any.
    async fn latest_feed(&self, category: &str) -> Option<CategoryFeed>;

    async fn record_payment(&self, record: PaymentRecord) -> Result<()>;

    /// Drop signals, feeds, and payments older than `cutoff` (epoch seconds).
    async fn cleanup_older_than(&self, cutoff: f64) -> Result<CleanupReport>;
}

/// In-memory store guarded for the multi-threaded runtime.
pub struct MemoryStore {
    feeds: RwLock<Vec<CategoryFeed>>,
    signals: RwLock<HashMap<String, Signal>>,
    payments: RwLock<Vec<PaymentRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            feeds: RwLock::new(Vec::new()),
            signals: RwLock::new(HashMap::new()),
            payments: RwLock::new(Vec::new()),
        }
    }

    pub fn signal_count(&self) -> usize {
        self.signals.read().map(|g| g.len()).unwrap_or(0)
    }

    pub fn payment_count(&self) -> usize {
        self.payments.read().map(|g| g.len()).unwrap_or(0)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedStore for MemoryStore {
    async fn save_bundle(
        &self,
        category: &str,
        bundle: &CategoryBundle,
        freshness: Duration,
    ) -> Result<()> {
        let now = Utc::now().timestamp() as f64;

        {
            let mut feeds = self
                .feeds
                .write()
                .map_err(|_| anyhow::anyhow!("feed lock poisoned"))?;

            let fresh_idx = feeds
                .iter()
                .enumerate()
                .filter(|(_, f)| f.category == category)
                .max_by(|(_, a), (_, b)| {
                    a.last_updated
                        .partial_cmp(&b.last_updated)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .map(|(i, _)| i)
                .filter(|&i| now - feeds[i].last_updated < freshness.as_secs_f64());

            if let Some(i) = fresh_idx {
                let feed = &mut feeds[i];
                feed.cryptonews_items = bundle.cryptonews.clone();
                feed.twitter_items = bundle.twitter.clone();
                feed.total_news = bundle.cryptonews.len();
                feed.total_tweets = bundle.twitter.len();
                feed.total_items = bundle.cryptonews.len() + bundle.twitter.len();
                feed.last_updated = now;
                tracing::info!(category = %category, "updated category feed");
            } else {
                feeds.push(CategoryFeed {
                    category: category.to_string(),
                    cryptonews_items: bundle.cryptonews.clone(),
                    twitter_items: bundle.twitter.clone(),
                    total_news: bundle.cryptonews.len(),
                    total_tweets: bundle.twitter.len(),
                    total_items: bundle.cryptonews.len() + bundle.twitter.len(),
                    last_updated: now,
                    created_at: now,
                });
                tracing::info!(category = %category, "created category feed");
            }
        }

        let mut saved = 0usize;
        {
            let mut signals = self
                .signals
                .write()
                .map_err(|_| anyhow::anyhow!("signal lock poisoned"))?;
            for signal in bundle.cryptonews.iter().chain(bundle.twitter.iter()) {
                if !signals.contains_key(&signal.upstream_key) {
                    signals.insert(signal.upstream_key.clone(), signal.clone());
                    saved += 1;
                }
            }
        }
        tracing::info!(category = %category, saved, "saved new signal items");
        Ok(())
    }

    async fn latest_feed(&self, category: &str) -> Option<CategoryFeed> {
        let feeds = self.feeds.read().ok()?;
        feeds
            .iter()
            .filter(|f| f.category == category)
            .max_by(|a, b| {
                a.last_updated
                    .partial_cmp(&b.last_updated)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .cloned()
    }

    async fn record_payment(&self, record: PaymentRecord) -> Result<()> {
        let mut payments = self
            .payments
            .write()
            .map_err(|_| anyhow::anyhow!("payment lock poisoned"))?;
        payments.push(record);
        Ok(())
    }

    async fn cleanup_older_than(&self, cutoff: f64) -> Result<CleanupReport> {
        let mut report = CleanupReport::default();

        {
            let mut signals = self
                .signals
                .write()
                .map_err(|_| anyhow::anyhow!("signal lock poisoned"))?;
            let before = signals.len();
            signals.retain(|_, s| s.timestamp >= cutoff);
            report.signals = before - signals.len();
        }
        {
            let mut feeds = self
                .feeds
                .write()
                .map_err(|_| anyhow::anyhow!("feed lock poisoned"))?;
            let before = feeds.len();
            feeds.retain(|f| f.last_updated >= cutoff);
            report.feeds = before - feeds.len();
        }
        {
            let mut payments = self
                .payments
                .write()
                .map_err(|_| anyhow::anyhow!("payment lock poisoned"))?;
            let before = payments.len();
            payments.retain(|p| p.created_at >= cutoff);
            report.payments = before - payments.len();
        }

        if report.signals > 0 || report.feeds > 0 || report.payments > 0 {
            tracing::info!(
                signals = report.signals,
                feeds = report.feeds,
                payments = report.payments,
                "cleaned up expired rows"
            );
        }
        Ok(report)
    }
}
