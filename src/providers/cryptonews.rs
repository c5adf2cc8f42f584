//! CryptoNews-style article provider.
//!
//! Thin adapter over the upstream keyword/ticker query interface. API-key
//! problems are detected lazily and flip a permanent-invalid flag so a dead
//! key degrades every request to an empty result instead of hammering the
//! upstream.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use serde::Deserialize;

use crate::providers::types::{NewsProvider, RawNewsItem};

const DEFAULT_BASE_URL: &str = "https://cryptonews-api.com/api/v1";
const FETCH_ATTEMPTS: u32 = 3;

pub struct CryptoNewsClient {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
    key_invalid: AtomicBool,
    key_warned: AtomicBool,
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    #[serde(default)]
    data: Vec<ApiItem>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ApiItem {
    #[serde(default)]
    news_url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    date: String,
    #[serde(default)]
    source_name: String,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    sentiment: Option<String>,
    #[serde(default)]
    tickers: Vec<String>,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

impl CryptoNewsClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: String, base_url: &str) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client");
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            key_invalid: AtomicBool::new(false),
            key_warned: AtomicBool::new(false),
        }
    }

    /// Lazy key validation: obviously-broken keys disable the provider
    /// without any network round trip.
    fn key_usable(&self) -> bool {
        if self.key_invalid.load(Ordering::Relaxed) {
            return false;
        }
        if self.api_key.len() < 10 {
            if !self.key_warned.swap(true, Ordering::Relaxed) {
                tracing::error!("news API key missing or too short; news channel disabled");
            }
            self.key_invalid.store(true, Ordering::Relaxed);
            return false;
        }
        true
    }

    async fn fetch(&self, path: &str, query: &[(&str, &str)]) -> Result<Vec<RawNewsItem>> {
        if !self.key_usable() {
            return Ok(Vec::new());
        }

        let url = format!("{}{}", self.base_url, path);
        let mut last_err: Option<anyhow::Error> = None;

        for attempt in 0..FETCH_ATTEMPTS {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_secs(2u64 << (attempt - 1))).await;
            }

            let resp = match self.http.get(&url).query(query).send().await {
                Ok(r) => r,
                Err(e) => {
                    counter!("provider_errors_total", "provider" => "cryptonews").increment(1);
                    last_err = Some(anyhow::Error::new(e).context("news provider request"));
                    continue;
                }
            };

            let status = resp.status();
            if status.as_u16() == 401 {
                tracing::error!("news API key rejected (401); news channel disabled");
                self.key_invalid.store(true, Ordering::Relaxed);
                return Ok(Vec::new());
            }
            if !status.is_success() {
                counter!("provider_errors_total", "provider" => "cryptonews").increment(1);
                last_err = Some(anyhow::anyhow!("news provider HTTP {status}"));
                continue;
            }

            let envelope: ApiEnvelope =
                resp.json().await.context("decoding news provider body")?;
            if let Some(err) = envelope.error {
                tracing::error!(error = %err, "news provider returned an error body");
                return Ok(Vec::new());
            }
            return Ok(envelope.data.into_iter().map(normalize_item).collect());
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("news provider fetch failed")))
    }
}

fn normalize_item(item: ApiItem) -> RawNewsItem {
    RawNewsItem {
        news_url: item.news_url,
        title: item.title,
        text: item.text,
        source_name: item.source_name,
        date: item.date,
        image_url: item.image_url.filter(|u| !u.is_empty()),
        sentiment: item.sentiment.filter(|s| !s.is_empty()),
        tickers: item.tickers,
        topics: item.topics,
        kind: item.kind.unwrap_or_else(|| "Article".to_string()),
    }
}

#[async_trait]
impl NewsProvider for CryptoNewsClient {
    async fn fetch_trending(&self, limit: usize) -> Result<Vec<RawNewsItem>> {
        let items = limit.to_string();
        self.fetch(
            "/category",
            &[
                ("token", self.api_key.as_str()),
                ("section", "general"),
                ("items", items.as_str()),
            ],
        )
        .await
    }

    async fn fetch_by_tickers(&self, tickers: &str, limit: usize) -> Result<Vec<RawNewsItem>> {
        let items = limit.to_string();
        self.fetch(
            "",
            &[
                ("token", self.api_key.as_str()),
                ("tickers", tickers),
                ("items", items.as_str()),
            ],
        )
        .await
    }

    fn name(&self) -> &'static str {
        "cryptonews"
    }
}
