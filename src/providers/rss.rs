//! RSS article provider: aggregates a fixed table of crypto news feeds into
//! the same normalized record the HTTP news provider produces.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use once_cell::sync::Lazy;
use quick_xml::de::from_str;
use regex::Regex;
use serde::Deserialize;

use crate::providers::types::{NewsProvider, RawNewsItem};
use crate::transform::known_symbols_in;

/// Major crypto news feeds. Ten newest entries are taken per feed.
const FEEDS: &[(&str, &str)] = &[
    ("Cointelegraph", "https://cointelegraph.com/rss"),
    ("Coindesk", "https://www.coindesk.com/arc/outboundfeeds/rss/"),
    ("Decrypt", "https://decrypt.co/feed"),
    ("Theblock", "https://www.theblock.co/rss.xml"),
    ("Bitcoinmagazine", "https://bitcoinmagazine.com/.rss/full/"),
    ("Cryptoslate", "https://cryptoslate.com/feed/"),
];

const ITEMS_PER_FEED: usize = 10;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    enclosure: Option<Enclosure>,
}
#[derive(Debug, Deserialize)]
struct Enclosure {
    #[serde(rename = "@url")]
    url: Option<String>,
}

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("ws regex"));

/// Decode entities, strip tags, collapse whitespace.
fn strip_html(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s).to_string();
    let no_tags = RE_TAGS.replace_all(&decoded, "");
    RE_WS.replace_all(&no_tags, " ").trim().to_string()
}

pub struct RssNewsProvider {
    feeds: Vec<(String, String)>,
    http: reqwest::Client,
}

impl Default for RssNewsProvider {
    fn default() -> Self {
        Self::new(
            FEEDS
                .iter()
                .map(|(n, u)| (n.to_string(), u.to_string()))
                .collect(),
        )
    }
}

impl RssNewsProvider {
    pub fn new(feeds: Vec<(String, String)>) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .build()
            .expect("reqwest client");
        Self { feeds, http }
    }

    /// Parse one feed body. Public within the crate for fixture tests.
    pub(crate) fn parse_feed(source_name: &str, xml: &str) -> Result<Vec<RawNewsItem>> {
        let t0 = std::time::Instant::now();
        let rss: Rss = from_str(xml).context("parsing rss xml")?;

        let mut out = Vec::new();
        for item in rss.channel.item.into_iter().take(ITEMS_PER_FEED) {
            let title = strip_html(item.title.as_deref().unwrap_or_default());
            let summary = strip_html(item.description.as_deref().unwrap_or_default());
            if title.is_empty() && summary.is_empty() {
                continue;
            }

            let tickers = known_symbols_in(&format!("{title} {summary}"));
            out.push(RawNewsItem {
                news_url: item.link.clone().unwrap_or_default(),
                title,
                text: summary,
                source_name: source_name.to_string(),
                date: item.pub_date.unwrap_or_default(),
                image_url: item.enclosure.and_then(|e| e.url).filter(|u| !u.is_empty()),
                sentiment: Some("Neutral".to_string()),
                tickers,
                topics: Vec::new(),
                kind: "Article".to_string(),
            });
        }

        histogram!("rss_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(out)
    }

    async fn fetch_all(&self, limit: usize) -> Vec<RawNewsItem> {
        let mut all = Vec::new();
        for (name, url) in &self.feeds {
            let body = match self.http.get(url).send().await {
                Ok(resp) => match resp.text().await {
                    Ok(b) => b,
                    Err(e) => {
                        tracing::warn!(error = ?e, feed = %name, "rss body read failed");
                        counter!("provider_errors_total", "provider" => "rss").increment(1);
                        continue;
                    }
                },
                Err(e) => {
                    tracing::warn!(error = ?e, feed = %name, "rss fetch failed");
                    counter!("provider_errors_total", "provider" => "rss").increment(1);
                    continue;
                }
            };
            match Self::parse_feed(name, &body) {
                Ok(mut items) => all.append(&mut items),
                Err(e) => {
                    tracing::warn!(error = ?e, feed = %name, "rss parse failed");
                    counter!("provider_errors_total", "provider" => "rss").increment(1);
                }
            }
        }
        all.truncate(limit);
        all
    }
}

#[async_trait]
impl NewsProvider for RssNewsProvider {
    async fn fetch_trending(&self, limit: usize) -> Result<Vec<RawNewsItem>> {
        Ok(self.fetch_all(limit).await)
    }

    /// RSS has no server-side ticker query; fetch everything and keep items
    /// mentioning any requested symbol.
    async fn fetch_by_tickers(&self, tickers: &str, limit: usize) -> Result<Vec<RawNewsItem>> {
        let wanted: Vec<String> = tickers
            .split(',')
            .map(|t| t.trim().to_ascii_uppercase())
            .filter(|t| !t.is_empty())
            .collect();

        let all = self.fetch_all(limit * 2).await;
        let mut matched: Vec<RawNewsItem> = all
            .into_iter()
            .filter(|item| item.tickers.iter().any(|t| wanted.contains(t)))
            .collect();
        matched.truncate(limit);
        Ok(matched)
    }

    fn name(&self) -> &'static str {
        "rss"
    }
}
