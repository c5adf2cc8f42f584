// src/providers/types.rs
use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::category::Categorize;

/// Provider-native news article, normalized to one field set regardless of
/// which upstream produced it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawNewsItem {
    pub news_url: String,
    pub title: String,
    pub text: String,
    pub source_name: String,
    /// Provider-native timestamp string; normalized later.
    pub date: String,
    pub image_url: Option<String>,
    /// Upstream sentiment label when the provider supplies one
    /// ("Positive" | "Negative" | "Neutral").
    pub sentiment: Option<String>,
    pub tickers: Vec<String>,
    pub topics: Vec<String>,
    /// "Article" or "Video".
    pub kind: String,
}

/// Provider-native tweet.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawTweet {
    pub id: String,
    pub text: String,
    pub username: String,
    pub author_id: String,
    pub created_at: String,
    pub url: Option<String>,
    pub retweet_count: u64,
    pub like_count: u64,
    pub reply_count: u64,
    pub quote_count: u64,
    pub entities: Option<serde_json::Value>,
}

impl Categorize for RawNewsItem {
    fn searchable_text(&self) -> String {
        let mut text = String::with_capacity(self.title.len() + self.text.len() + 2);
        text.push_str(&self.title.to_lowercase());
        text.push(' ');
        text.push_str(&self.text.to_lowercase());
        text
    }
    fn ticker_symbols(&self) -> &[String] {
        &self.tickers
    }
}

impl Categorize for RawTweet {
    fn searchable_text(&self) -> String {
        self.text.to_lowercase()
    }
    fn ticker_symbols(&self) -> &[String] {
        &[]
    }
}

/// Article channel. Implementations normalize their upstream schema into
/// `RawNewsItem` and degrade to empty result sets on provider-side problems.
#[async_trait::async_trait]
pub trait NewsProvider: Send + Sync {
    async fn fetch_trending(&self, limit: usize) -> Result<Vec<RawNewsItem>>;
    async fn fetch_by_tickers(&self, tickers: &str, limit: usize) -> Result<Vec<RawNewsItem>>;
    fn name(&self) -> &'static str;
}

/// Tweet channel.
#[async_trait::async_trait]
pub trait TweetProvider: Send + Sync {
    async fn fetch_latest(&self, max_results: usize) -> Result<Vec<RawTweet>>;
    async fn search_keywords(&self, keywords: &[String], max_results: usize)
        -> Result<Vec<RawTweet>>;
    fn name(&self) -> &'static str;
}
