//! Request orchestration: cache → persisted feed → fetch → filter →
//! transform → cache → enqueue persistence → return.
//!
//! One bad item or one unavailable provider never fails a category request;
//! the result degrades toward fewer items instead.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use metrics::counter;
use serde_json::json;

use crate::ai::DynAiClient;
use crate::cache::ResponseCache;
use crate::category::{self, Category};
use crate::cleaner;
use crate::config::Settings;
use crate::jobs::JobQueue;
use crate::providers::types::{NewsProvider, RawNewsItem, RawTweet, TweetProvider};
use crate::store::{CategoryFeed, FeedStore};
use crate::tickers::TickerGenerator;
use crate::transform::{self, BundleMetadata, CategoryBundle};

const FETCH_LIMIT: usize = 50;
const PREVIEW_ITEMS: usize = 3;

pub struct NewsController {
    news: Arc<dyn NewsProvider>,
    tweets: Arc<dyn TweetProvider>,
    cache: Arc<dyn ResponseCache>,
    store: Arc<dyn FeedStore>,
    tickers: TickerGenerator,
    ai: DynAiClient,
    jobs: JobQueue,
    settings: Arc<Settings>,
}

impl NewsController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        news: Arc<dyn NewsProvider>,
        tweets: Arc<dyn TweetProvider>,
        cache: Arc<dyn ResponseCache>,
        store: Arc<dyn FeedStore>,
        tickers: TickerGenerator,
        ai: DynAiClient,
        jobs: JobQueue,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            news,
            tweets,
            cache,
            store,
            tickers,
            ai,
            jobs,
            settings,
        }
    }

    /// Fetch, filter, and transform one category. Total: provider failures
    /// degrade to empty channels rather than erroring.
    pub async fn get_news_by_category(&self, category: Category) -> CategoryBundle {
        let cache_key = format!("news:{category}");

        if let Some(cached) = self.cache.get(&cache_key).await {
            if let Ok(bundle) = serde_json::from_value::<CategoryBundle>(cached) {
                counter!("response_cache_hits_total").increment(1);
                tracing::info!(category = %category, "returning cached bundle");
                return bundle;
            }
        }

        if let Some(feed) = self.store.latest_feed(category.as_str()).await {
            let age = Utc::now().timestamp() as f64 - feed.last_updated;
            if age < self.settings.freshness_secs as f64 {
                counter!("feed_store_hits_total").increment(1);
                tracing::info!(category = %category, age, "hydrating cache from feed store");
                let bundle = bundle_from_feed(category, feed, self.settings.cache_ttl_secs);
                self.cache_bundle(&cache_key, &bundle).await;
                return bundle;
            }
        }

        let keywords = category.filter_keywords();
        let tickers = self.tickers.tickers_for(category, keywords).await;
        tracing::info!(category = %category, tickers = %tickers, "fetching category");

        let (news, tweets) = self.fetch_channels(category, &tickers, keywords).await;
        tracing::info!(
            category = %category,
            news = news.len(),
            tweets = tweets.len(),
            "raw fetch results"
        );

        let filtered_news = filter_with_fallback(news, |item| {
            matches_news(item, category, keywords)
        });
        let filtered_tweets = filter_with_fallback(tweets, |item| {
            matches_tweet(item, category, keywords)
        });

        let mut bundle = transform::transform_items(
            &filtered_news,
            &filtered_tweets,
            category,
            &self.settings.merchant_id,
        );
        bundle.metadata.cache_ttl = Some(self.settings.cache_ttl_secs);
        bundle.metadata.tickers_used = Some(tickers);
        bundle.metadata.keywords_used =
            Some(keywords.iter().map(|k| k.to_string()).collect());

        if self.settings.ai_enabled {
            self.enhance_generated_titles(&mut bundle, category).await;
        }

        self.cache_bundle(&cache_key, &bundle).await;
        self.jobs.enqueue_save(category.as_str(), bundle.clone());

        tracing::info!(
            category = %category,
            news = bundle.metadata.total_news,
            tweets = bundle.metadata.total_tweets,
            "category bundle ready"
        );
        bundle
    }

    /// Unpaid sample: the same bundle truncated to a few items per channel.
    pub async fn preview_news_by_category(&self, category: Category) -> CategoryBundle {
        let mut bundle = self.get_news_by_category(category).await;
        bundle.cryptonews.truncate(PREVIEW_ITEMS);
        bundle.twitter.truncate(PREVIEW_ITEMS);
        bundle.metadata.total_news = bundle.cryptonews.len();
        bundle.metadata.total_tweets = bundle.twitter.len();
        bundle.metadata.total_items = bundle.metadata.total_news + bundle.metadata.total_tweets;
        bundle
    }

    async fn fetch_channels(
        &self,
        category: Category,
        tickers: &str,
        keywords: &[&str],
    ) -> (Vec<RawNewsItem>, Vec<RawTweet>) {
        let news = if category == Category::Trends {
            self.news.fetch_trending(FETCH_LIMIT).await
        } else {
            self.news.fetch_by_tickers(tickers, FETCH_LIMIT).await
        };
        let news = news.unwrap_or_else(|e| {
            tracing::warn!(error = ?e, provider = self.news.name(), "news fetch failed");
            counter!("channel_fetch_failures_total", "channel" => "news").increment(1);
            Vec::new()
        });

        let tweets = if category == Category::Trends || keywords.is_empty() {
            self.tweets.fetch_latest(FETCH_LIMIT).await
        } else {
            let owned: Vec<String> = keywords.iter().map(|k| k.to_string()).collect();
            self.tweets.search_keywords(&owned, FETCH_LIMIT).await
        };
        let tweets = tweets.unwrap_or_else(|e| {
            tracing::warn!(error = ?e, provider = self.tweets.name(), "tweet fetch failed");
            counter!("channel_fetch_failures_total", "channel" => "tweets").increment(1);
            Vec::new()
        });

        (news, tweets)
    }

    async fn enhance_generated_titles(&self, bundle: &mut CategoryBundle, category: Category) {
        for signal in bundle
            .cryptonews
            .iter_mut()
            .chain(bundle.twitter.iter_mut())
        {
            if signal.title_generated {
                let source = signal.source.as_str();
                signal.title =
                    cleaner::generate_title(self.ai.as_ref(), &signal.text, source, category)
                        .await;
            }
        }
    }

    async fn cache_bundle(&self, key: &str, bundle: &CategoryBundle) {
        match serde_json::to_value(bundle) {
            Ok(value) => {
                self.cache
                    .set(key, value, Duration::from_secs(self.settings.cache_ttl_secs))
                    .await;
            }
            Err(e) => tracing::warn!(error = ?e, "bundle not cacheable"),
        }
    }

    /// Category listing with pricing, for the unpaid index endpoint.
    pub fn list_available_categories(price: &str, network: &str) -> serde_json::Value {
        let categories: Vec<serde_json::Value> = category::ALL
            .iter()
            .map(|c| {
                let tickers = match c {
                    Category::MacroEvents => "N/A".to_string(),
                    Category::Trends => "All".to_string(),
                    Category::Other => "Dynamic".to_string(),
                    other => other.static_tickers().unwrap_or("").to_string(),
                };
                json!({
                    "name": c.as_str(),
                    "aliases": c.aliases(),
                    "description": c.description(),
                    "tickers": tickers,
                })
            })
            .collect();

        json!({
            "categories": categories,
            "features": {
                "dynamic_tickers": true,
                "ai_powered": true,
                "custom_categories": "Supported - unknown names resolve to 'other' with generated tickers",
            },
            "pricing": {
                "amount": price,
                "currency": "USDC",
                "network": network,
            },
        })
    }
}

/// Keep matching items; if the filter would empty a channel that had data,
/// serve the unfiltered channel instead. Availability beats precision here:
/// the upstream fetch was already ticker- or keyword-scoped.
fn filter_with_fallback<T: Clone>(items: Vec<T>, keep: impl Fn(&T) -> bool) -> Vec<T> {
    let filtered: Vec<T> = items.iter().filter(|i| keep(i)).cloned().collect();
    if filtered.is_empty() && !items.is_empty() {
        tracing::warn!(
            total = items.len(),
            "category filter matched nothing; falling back to unfiltered items"
        );
        return items;
    }
    filtered
}

fn matches_news(item: &RawNewsItem, category: Category, keywords: &[&str]) -> bool {
    if matches!(category, Category::Trends | Category::Other) {
        return true;
    }
    // Items the provider already tagged with tickers came from a scoped query.
    if !item.tickers.is_empty() {
        return true;
    }
    if keywords.is_empty() {
        return true;
    }
    let text = format!("{} {}", item.title, item.text).to_lowercase();
    keywords.iter().any(|kw| text.contains(&kw.to_lowercase()))
}

fn matches_tweet(item: &RawTweet, category: Category, keywords: &[&str]) -> bool {
    if matches!(category, Category::Trends | Category::Other) {
        return true;
    }
    if keywords.is_empty() {
        return true;
    }
    let text = item.text.to_lowercase();
    keywords.iter().any(|kw| text.contains(&kw.to_lowercase()))
}

fn bundle_from_feed(category: Category, feed: CategoryFeed, ttl: u64) -> CategoryBundle {
    let processed_at = chrono::DateTime::from_timestamp(feed.last_updated as i64, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default();
    let metadata = BundleMetadata {
        category,
        total_news: feed.total_news,
        total_tweets: feed.total_tweets,
        total_items: feed.total_items,
        processed_at,
        timestamp: feed.last_updated,
        cache_ttl: Some(ttl),
        tickers_used: None,
        keywords_used: None,
    };
    CategoryBundle {
        cryptonews: feed.cryptonews_items,
        twitter: feed.twitter_items,
        metadata,
    }
}
