//! Tweet provider: pulls user timelines for a monitored account list.
//!
//! Keyword "search" is local filtering over recent timelines, because the
//! upstream exposes no search endpoint. Each account's timeline sits behind a
//! short-TTL cache so one burst of category requests does not re-fetch the
//! same accounts.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use metrics::counter;
use serde::Deserialize;

use crate::providers::types::{RawTweet, TweetProvider};

const TIMELINE_CACHE_TTL: Duration = Duration::from_secs(900);
const TIMELINE_FETCH_SIZE: usize = 20;

/// Per-account timeline cache. Explicit object with explicit invalidation;
/// owned by the provider, guarded for the multi-threaded runtime.
pub struct TweetCache {
    ttl: Duration,
    inner: RwLock<HashMap<String, (Instant, Vec<RawTweet>)>>,
}

impl TweetCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, username: &str) -> Option<Vec<RawTweet>> {
        let guard = self.inner.read().ok()?;
        let (stored_at, tweets) = guard.get(&username.to_lowercase())?;
        if stored_at.elapsed() > self.ttl {
            return None;
        }
        Some(tweets.clone())
    }

    pub fn set(&self, username: &str, tweets: Vec<RawTweet>) {
        if let Ok(mut guard) = self.inner.write() {
            guard.insert(username.to_lowercase(), (Instant::now(), tweets));
        }
    }

    pub fn invalidate(&self, username: &str) {
        if let Ok(mut guard) = self.inner.write() {
            guard.remove(&username.to_lowercase());
        }
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.inner.write() {
            guard.clear();
        }
    }
}

pub struct TimelineClient {
    accounts: Vec<String>,
    base_url: String,
    api_key: String,
    access_token: String,
    http: reqwest::Client,
    cache: TweetCache,
}

#[derive(Debug, Deserialize)]
struct TimelineEnvelope {
    #[serde(default)]
    data: Vec<TimelineTweet>,
}

#[derive(Debug, Deserialize)]
struct TimelineTweet {
    #[serde(default)]
    id: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    author_id: String,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    retweet_count: u64,
    #[serde(default)]
    like_count: u64,
    #[serde(default)]
    reply_count: u64,
    #[serde(default)]
    quote_count: u64,
    #[serde(default)]
    entities: Option<serde_json::Value>,
}

impl TimelineClient {
    pub fn new(
        base_url: &str,
        api_key: String,
        access_token: String,
        accounts: Vec<String>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client");
        Self {
            accounts,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            access_token,
            http,
            cache: TweetCache::new(TIMELINE_CACHE_TTL),
        }
    }

    pub fn cache(&self) -> &TweetCache {
        &self.cache
    }

    async fn fetch_user(&self, username: &str, max_results: usize) -> Vec<RawTweet> {
        if let Some(cached) = self.cache.get(username) {
            counter!("tweet_cache_hits_total").increment(1);
            return cached.into_iter().take(max_results).collect();
        }

        let url = format!("{}/v1/users/{}/tweets", self.base_url, username);
        let resp = match self
            .http
            .get(&url)
            .query(&[("max_results", TIMELINE_FETCH_SIZE.to_string())])
            .bearer_auth(&self.access_token)
            .header("X-API-Key", &self.api_key)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = ?e, account = %username, "timeline fetch failed");
                counter!("provider_errors_total", "provider" => "twitter").increment(1);
                return Vec::new();
            }
        };

        if !resp.status().is_success() {
            tracing::warn!(status = %resp.status(), account = %username, "timeline fetch non-success");
            counter!("provider_errors_total", "provider" => "twitter").increment(1);
            return Vec::new();
        }

        let envelope: TimelineEnvelope = match resp.json().await {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(error = ?e, account = %username, "timeline decode failed");
                counter!("provider_errors_total", "provider" => "twitter").increment(1);
                return Vec::new();
            }
        };

        let tweets: Vec<RawTweet> = envelope
            .data
            .into_iter()
            .map(|t| normalize_tweet(username, t))
            .collect();
        self.cache.set(username, tweets.clone());
        tweets.into_iter().take(max_results).collect()
    }
}

fn normalize_tweet(username: &str, t: TimelineTweet) -> RawTweet {
    RawTweet {
        id: t.id,
        text: t.text,
        username: username.to_string(),
        author_id: t.author_id,
        created_at: t.created_at,
        url: t.url.filter(|u| !u.is_empty()),
        retweet_count: t.retweet_count,
        like_count: t.like_count,
        reply_count: t.reply_count,
        quote_count: t.quote_count,
        entities: t.entities,
    }
}

#[async_trait]
impl TweetProvider for TimelineClient {
    async fn fetch_latest(&self, max_results: usize) -> Result<Vec<RawTweet>> {
        if self.accounts.is_empty() {
            return Ok(Vec::new());
        }
        let per_account = (max_results / self.accounts.len()).max(1);
        let mut all = Vec::new();
        for account in &self.accounts {
            let mut tweets = self.fetch_user(account, per_account).await;
            all.append(&mut tweets);
        }
        all.truncate(max_results);
        Ok(all)
    }

    async fn search_keywords(
        &self,
        keywords: &[String],
        max_results: usize,
    ) -> Result<Vec<RawTweet>> {
        // Fetch more than needed: local filtering discards most of it.
        let mut matching = Vec::new();
        for account in &self.accounts {
            let tweets = self.fetch_user(account, TIMELINE_FETCH_SIZE).await;
            for tweet in tweets {
                let text = tweet.text.to_lowercase();
                if keywords.iter().any(|kw| text.contains(&kw.to_lowercase())) {
                    matching.push(tweet);
                    if matching.len() >= max_results {
                        return Ok(matching);
                    }
                }
            }
        }
        Ok(matching)
    }

    fn name(&self) -> &'static str {
        "twitter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tweet(id: &str, text: &str) -> RawTweet {
        RawTweet {
            id: id.to_string(),
            text: text.to_string(),
            username: "whale".to_string(),
            ..RawTweet::default()
        }
    }

    #[test]
    fn cache_round_trip_and_invalidate() {
        let cache = TweetCache::new(Duration::from_secs(60));
        assert!(cache.get("Whale").is_none());
        cache.set("Whale", vec![tweet("1", "btc moved")]);
        // Lookup is case-insensitive on the account name.
        let hit = cache.get("whale").unwrap();
        assert_eq!(hit.len(), 1);
        cache.invalidate("WHALE");
        assert!(cache.get("whale").is_none());
    }

    #[test]
    fn cache_expires_entries() {
        let cache = TweetCache::new(Duration::from_secs(0));
        cache.set("whale", vec![tweet("1", "btc moved")]);
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("whale").is_none());
    }
}
