// tests/common/mod.rs
//
// Shared fixtures: stub providers and a fully wired AppState backed by
// in-memory cache/store, so router-level tests run without any network.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use chainfeed::ai::DisabledClient;
use chainfeed::api::AppState;
use chainfeed::cache::MemoryCache;
use chainfeed::config::Settings;
use chainfeed::controller::NewsController;
use chainfeed::facilitator::FacilitatorClient;
use chainfeed::jobs::JobQueue;
use chainfeed::providers::types::{NewsProvider, RawNewsItem, RawTweet, TweetProvider};
use chainfeed::store::{FeedStore, MemoryStore};
use chainfeed::tickers::TickerGenerator;
use chainfeed::x402::PaymentGate;

pub struct StubNews {
    items: Vec<RawNewsItem>,
    pub fetches: Arc<AtomicUsize>,
}

impl StubNews {
    pub fn new(items: Vec<RawNewsItem>) -> Self {
        Self {
            items,
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl NewsProvider for StubNews {
    async fn fetch_trending(&self, limit: usize) -> Result<Vec<RawNewsItem>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.items.iter().take(limit).cloned().collect())
    }
    async fn fetch_by_tickers(&self, _tickers: &str, limit: usize) -> Result<Vec<RawNewsItem>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.items.iter().take(limit).cloned().collect())
    }
    fn name(&self) -> &'static str {
        "stub-news"
    }
}

pub struct StubTweets {
    tweets: Vec<RawTweet>,
}

impl StubTweets {
    pub fn new(tweets: Vec<RawTweet>) -> Self {
        Self { tweets }
    }
}

#[async_trait]
impl TweetProvider for StubTweets {
    async fn fetch_latest(&self, max_results: usize) -> Result<Vec<RawTweet>> {
        Ok(self.tweets.iter().take(max_results).cloned().collect())
    }
    async fn search_keywords(
        &self,
        _keywords: &[String],
        max_results: usize,
    ) -> Result<Vec<RawTweet>> {
        Ok(self.tweets.iter().take(max_results).cloned().collect())
    }
    fn name(&self) -> &'static str {
        "stub-tweets"
    }
}

pub fn news_item(title: &str, url: &str, tickers: &[&str]) -> RawNewsItem {
    RawNewsItem {
        news_url: url.to_string(),
        title: title.to_string(),
        text: format!("{title}. Longer body text for the article follows here."),
        source_name: "Example Wire".to_string(),
        date: "2025-03-01T12:00:00Z".to_string(),
        tickers: tickers.iter().map(|s| s.to_string()).collect(),
        kind: "Article".to_string(),
        ..RawNewsItem::default()
    }
}

pub fn tweet(id: &str, username: &str, text: &str) -> RawTweet {
    RawTweet {
        id: id.to_string(),
        text: text.to_string(),
        username: username.to_string(),
        created_at: "2025-03-01T13:00:00Z".to_string(),
        like_count: 3,
        ..RawTweet::default()
    }
}

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub news_fetches: Arc<AtomicUsize>,
}

/// Wire the real controller/gate/router against stubbed providers.
pub fn build_app(
    settings: Settings,
    news_items: Vec<RawNewsItem>,
    tweets: Vec<RawTweet>,
) -> TestApp {
    let settings = Arc::new(settings);
    let news = Arc::new(StubNews::new(news_items));
    let news_fetches = news.fetches.clone();
    let tweets_provider = Arc::new(StubTweets::new(tweets));

    let memory_store = Arc::new(MemoryStore::new());
    let store: Arc<dyn FeedStore> = memory_store.clone();
    let cache = Arc::new(MemoryCache::new());
    let ai = Arc::new(DisabledClient);
    let jobs = JobQueue::start(store.clone(), Duration::from_secs(settings.freshness_secs));

    let controller = Arc::new(NewsController::new(
        news,
        tweets_provider,
        cache,
        store.clone(),
        TickerGenerator::new(ai.clone()),
        ai,
        jobs,
        settings.clone(),
    ));

    let gate = Arc::new(PaymentGate::new(
        FacilitatorClient::new(&settings.facilitator_url),
        settings.clone(),
    ));

    let state = AppState {
        controller,
        gate,
        store,
        settings,
    };

    TestApp {
        state,
        store: memory_store,
        news_fetches,
    }
}

pub fn default_fixtures() -> (Vec<RawNewsItem>, Vec<RawTweet>) {
    let news = vec![
        news_item("Bitcoin ETF Approved", "https://example.com/etf", &["BTC"]),
        news_item(
            "Tokenized treasuries cross $2B",
            "https://example.com/rwa",
            &["ONDO"],
        ),
    ];
    let tweets = vec![
        tweet(
            "1001",
            "builder",
            "Real world asset tokenization keeps growing across major chains.",
        ),
        tweet(
            "1002",
            "spammer",
            "\u{1F6A8} DM me for guaranteed 100x profit, click here!!!",
        ),
    ];
    (news, tweets)
}
