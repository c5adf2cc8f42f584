//! Signal transformer: maps raw news items and tweets, plus their assigned
//! category, into the unified `Signal` record.

use std::collections::BTreeSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::category::Category;
use crate::cleaner;
use crate::dates::normalize_date;
use crate::providers::types::{RawNewsItem, RawTweet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    #[serde(rename = "cryptonews")]
    News,
    #[serde(rename = "twitter")]
    Twitter,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::News => "cryptonews",
            SourceKind::Twitter => "twitter",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Bullish,
    Bearish,
    Neutral,
}

impl SentimentLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            SentimentLabel::Bullish => "bullish",
            SentimentLabel::Bearish => "bearish",
            SentimentLabel::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    pub retweets: u64,
    pub likes: u64,
    pub replies: u64,
    pub quotes: u64,
}

/// The unified output record. Immutable once produced; re-fetches overwrite
/// whole records rather than mutating fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub signal_id: String,
    /// Provider-stable key (sha256 of source kind + upstream id/url) used for
    /// persistence upserts. The display id above is only unique per batch.
    pub upstream_key: String,
    pub category: Category,
    pub source: SourceKind,
    pub sources: Vec<String>,
    pub title: String,
    pub text: String,
    pub sentiment: SentimentLabel,
    pub sentiment_value: f64,
    pub feed_categories: Vec<String>,
    pub timestamp: f64,
    pub normalized_date: String,
    pub tokens: Vec<String>,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_sentiment: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tickers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tweet_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tweet_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engagement: Option<Engagement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities: Option<serde_json::Value>,
    /// True when the title came from local generation rather than the
    /// provider; lets the controller offer the AI rewrite a target.
    #[serde(skip, default)]
    pub title_generated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleMetadata {
    pub category: Category,
    pub total_news: usize,
    pub total_tweets: usize,
    pub total_items: usize,
    pub processed_at: String,
    pub timestamp: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_ttl: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tickers_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords_used: Option<Vec<String>>,
}

/// Everything one category request returns: both channels kept separate,
/// plus metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryBundle {
    pub cryptonews: Vec<Signal>,
    pub twitter: Vec<Signal>,
    pub metadata: BundleMetadata,
}

/// Token symbols worth scanning free text for.
pub const COMMON_TOKENS: &[&str] = &[
    "BTC", "ETH", "SOL", "USDT", "USDC", "BNB", "XRP", "ADA", "DOGE", "MATIC",
    "DOT", "AVAX", "LINK", "UNI", "ATOM",
];

/// Well-known symbols present in `text` as whole words, `$`-prefixed or not,
/// case-insensitively. Returns plain symbols ("BTC").
pub fn known_symbols_in(text: &str) -> Vec<String> {
    let upper = text.to_ascii_uppercase();
    let mut found = BTreeSet::new();
    for word in upper.split(|c: char| !c.is_ascii_alphanumeric() && c != '$') {
        let bare = word.strip_prefix('$').unwrap_or(word);
        if COMMON_TOKENS.contains(&bare) {
            found.insert(bare.to_string());
        }
    }
    found.into_iter().collect()
}

/// Union of explicit provider tickers and well-known symbols found in the
/// text, as sorted, deduplicated `$SYMBOL` strings.
pub fn extract_tokens(text: &str, tickers: &[String]) -> Vec<String> {
    let mut tokens: BTreeSet<String> = tickers
        .iter()
        .filter(|t| !t.trim().is_empty())
        .map(|t| format!("${}", t.trim().to_ascii_uppercase()))
        .collect();
    for symbol in known_symbols_in(text) {
        tokens.insert(format!("${symbol}"));
    }
    tokens.into_iter().collect()
}

const BULLISH_KEYWORDS: &[&str] = &[
    "surge", "rally", "gain", "up", "rise", "bull", "pump", "ath", "high",
    "bullish", "moon", "breakout",
];
const BEARISH_KEYWORDS: &[&str] = &[
    "drop", "fall", "down", "bear", "crash", "dump", "low", "bearish",
    "decline", "sell", "liquidation",
];

/// Sentiment from an upstream label when one exists, otherwise from a
/// bullish/bearish keyword-count comparison. Total over all inputs.
pub fn determine_sentiment(text: &str, existing: Option<&str>) -> (SentimentLabel, f64) {
    if let Some(label) = existing {
        return match label {
            "Positive" => (SentimentLabel::Bullish, 0.7),
            "Negative" => (SentimentLabel::Bearish, 0.3),
            _ => (SentimentLabel::Neutral, 0.5),
        };
    }

    let lower = text.to_lowercase();
    let bullish = BULLISH_KEYWORDS.iter().filter(|kw| lower.contains(*kw)).count();
    let bearish = BEARISH_KEYWORDS.iter().filter(|kw| lower.contains(*kw)).count();

    if bullish > bearish {
        (SentimentLabel::Bullish, (0.6 + bullish as f64 * 0.1).min(0.95))
    } else if bearish > bullish {
        (SentimentLabel::Bearish, (0.4 - bearish as f64 * 0.1).max(0.05))
    } else {
        (SentimentLabel::Neutral, 0.5)
    }
}

/// Batch-scoped display id. Only unique within one category fetch.
pub fn signal_id(merchant_id: &str, index: usize) -> String {
    format!("{merchant_id}_{index}")
}

/// Provider-stable key for upserts: survives re-fetches and new batches.
pub fn upstream_key(source: SourceKind, upstream_ref: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_str().as_bytes());
    hasher.update(b":");
    hasher.update(upstream_ref.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Provider titles too short or too generic to keep verbatim.
fn title_is_usable(title: &str) -> bool {
    if title.chars().count() < 10 {
        return false;
    }
    !matches!(
        title.trim().to_lowercase().as_str(),
        "crypto update" | "crypto news update" | "news update" | "untitled" | "no title"
    )
}

/// Transform one news article into a signal.
pub fn transform_news_item(
    item: &RawNewsItem,
    category: Category,
    index: usize,
    merchant_id: &str,
) -> Signal {
    let date = normalize_date(Some(item.date.as_str()));

    let provided = item.title.trim();
    let (title, title_generated) = if title_is_usable(provided) {
        (provided.to_string(), false)
    } else {
        (cleaner::heuristic_title(&item.text), true)
    };

    let (sentiment, sentiment_value) =
        determine_sentiment(&item.text, item.sentiment.as_deref());

    let tokens = extract_tokens(&format!("{} {}", title, item.text), &item.tickers);

    let mut feed_categories = vec![category.as_str().to_string()];
    feed_categories.extend(item.topics.iter().cloned());

    let upstream_ref = if item.news_url.is_empty() {
        &item.title
    } else {
        &item.news_url
    };

    Signal {
        signal_id: signal_id(merchant_id, index),
        upstream_key: upstream_key(SourceKind::News, upstream_ref),
        category,
        source: SourceKind::News,
        sources: if item.news_url.is_empty() {
            Vec::new()
        } else {
            vec![item.news_url.clone()]
        },
        title,
        text: item.text.clone(),
        sentiment,
        sentiment_value,
        feed_categories,
        timestamp: date.timestamp() as f64,
        normalized_date: date.to_rfc3339(),
        tokens,
        author: if item.source_name.is_empty() {
            "Unknown".to_string()
        } else {
            item.source_name.clone()
        },
        image_url: item.image_url.clone(),
        kind: Some(if item.kind.is_empty() {
            "Article".to_string()
        } else {
            item.kind.clone()
        }),
        original_sentiment: item.sentiment.clone(),
        tickers: item.tickers.clone(),
        username: None,
        tweet_id: None,
        tweet_url: None,
        engagement: None,
        entities: None,
        title_generated,
    }
}

/// Transform one tweet into a signal. Spam tweets are dropped (`None`).
pub fn transform_tweet(
    item: &RawTweet,
    category: Category,
    index: usize,
    merchant_id: &str,
) -> Option<Signal> {
    if cleaner::is_spam_content(&item.text) {
        return None;
    }

    let date = normalize_date(Some(item.created_at.as_str()));
    let title = cleaner::heuristic_title(&item.text);
    let (sentiment, sentiment_value) = determine_sentiment(&item.text, None);
    let tokens = extract_tokens(&item.text, &[]);

    let tweet_url = item.url.clone().or_else(|| {
        if item.username.is_empty() || item.id.is_empty() {
            None
        } else {
            Some(format!("https://x.com/{}/status/{}", item.username, item.id))
        }
    });

    let upstream_ref = if item.id.is_empty() {
        &item.text
    } else {
        &item.id
    };

    Some(Signal {
        signal_id: signal_id(merchant_id, index),
        upstream_key: upstream_key(SourceKind::Twitter, upstream_ref),
        category,
        source: SourceKind::Twitter,
        sources: tweet_url.iter().cloned().collect(),
        title,
        text: item.text.clone(),
        sentiment,
        sentiment_value,
        feed_categories: vec![category.as_str().to_string(), "twitter".to_string()],
        timestamp: date.timestamp() as f64,
        normalized_date: date.to_rfc3339(),
        tokens,
        author: if item.username.is_empty() {
            "Unknown".to_string()
        } else {
            format!("@{}", item.username)
        },
        image_url: None,
        kind: None,
        original_sentiment: None,
        tickers: Vec::new(),
        username: Some(item.username.clone()),
        tweet_id: Some(item.id.clone()),
        tweet_url,
        engagement: Some(Engagement {
            retweets: item.retweet_count,
            likes: item.like_count,
            replies: item.reply_count,
            quotes: item.quote_count,
        }),
        entities: item.entities.clone(),
        title_generated: true,
    })
}

/// Transform both channels for one category: per-item failures (spam tweets)
/// skip the item, each channel sorts newest-first, metadata is attached.
pub fn transform_items(
    news_items: &[RawNewsItem],
    tweet_items: &[RawTweet],
    category: Category,
    merchant_id: &str,
) -> CategoryBundle {
    let mut news: Vec<Signal> = news_items
        .iter()
        .enumerate()
        .map(|(i, item)| transform_news_item(item, category, i + 1, merchant_id))
        .collect();

    let mut tweets: Vec<Signal> = tweet_items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| transform_tweet(item, category, i + 1, merchant_id))
        .collect();

    news.sort_by(|a, b| {
        b.timestamp
            .partial_cmp(&a.timestamp)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    tweets.sort_by(|a, b| {
        b.timestamp
            .partial_cmp(&a.timestamp)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let now = Utc::now();
    let metadata = BundleMetadata {
        category,
        total_news: news.len(),
        total_tweets: tweets.len(),
        total_items: news.len() + tweets.len(),
        processed_at: now.to_rfc3339(),
        timestamp: now.timestamp() as f64,
        cache_ttl: None,
        tickers_used: None,
        keywords_used: None,
    };

    CategoryBundle {
        cryptonews: news,
        twitter: tweets,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentiment_mapping_is_total() {
        assert_eq!(
            determine_sentiment("", Some("Positive")),
            (SentimentLabel::Bullish, 0.7)
        );
        assert_eq!(
            determine_sentiment("", Some("Negative")),
            (SentimentLabel::Bearish, 0.3)
        );
        assert_eq!(
            determine_sentiment("", Some("Neutral")),
            (SentimentLabel::Neutral, 0.5)
        );
        assert_eq!(
            determine_sentiment("", Some("Something Odd")),
            (SentimentLabel::Neutral, 0.5)
        );
        // No label, no keywords: neutral midpoint.
        assert_eq!(
            determine_sentiment("quiet market report", None),
            (SentimentLabel::Neutral, 0.5)
        );
    }

    #[test]
    fn sentiment_keyword_formula_caps_and_floors() {
        let (label, value) = determine_sentiment(
            "surge rally gain rise bull pump ath moon breakout bullish",
            None,
        );
        assert_eq!(label, SentimentLabel::Bullish);
        assert_eq!(value, 0.95);

        let (label, value) =
            determine_sentiment("drop fall crash dump decline sell bearish", None);
        assert_eq!(label, SentimentLabel::Bearish);
        assert_eq!(value, 0.05);
    }

    #[test]
    fn extract_tokens_dedups_and_sorts() {
        assert_eq!(
            extract_tokens("BTC eth btc", &[]),
            vec!["$BTC".to_string(), "$ETH".to_string()]
        );
        // Explicit tickers union with text hits; `$`-prefixed counts too.
        assert_eq!(
            extract_tokens("nothing here but $sol", &["ada".to_string()]),
            vec!["$ADA".to_string(), "$SOL".to_string()]
        );
    }

    #[test]
    fn tokens_match_whole_words_only() {
        // "Ethan" must not produce $ETH.
        assert!(extract_tokens("Ethan updates the docs", &[]).is_empty());
    }

    #[test]
    fn news_transform_keeps_original_title_and_scans_sentiment() {
        let item = RawNewsItem {
            title: "Bitcoin ETF Approved".to_string(),
            tickers: vec!["BTC".to_string()],
            ..RawNewsItem::default()
        };
        let signal = transform_news_item(&item, Category::Btc, 1, "meta_merchant");
        assert_eq!(signal.category, Category::Btc);
        assert_eq!(signal.title, "Bitcoin ETF Approved");
        assert!(!signal.title_generated);
        // No explicit sentiment, empty text: keyword scan lands neutral.
        assert_eq!(signal.sentiment, SentimentLabel::Neutral);
        assert_eq!(signal.sentiment_value, 0.5);
        assert_eq!(signal.tokens, vec!["$BTC".to_string()]);
        assert_eq!(signal.signal_id, "meta_merchant_1");
    }

    #[test]
    fn news_transform_generates_title_for_placeholders() {
        let item = RawNewsItem {
            title: "Untitled".to_string(),
            text: "Solana validators shipped a patch overnight and throughput recovered quickly."
                .to_string(),
            ..RawNewsItem::default()
        };
        let signal = transform_news_item(&item, Category::Sol, 1, "m");
        assert_ne!(signal.title, "Untitled");
        assert!(signal.title_generated);
        assert!(!signal.title.is_empty());
    }

    #[test]
    fn spam_tweet_is_dropped() {
        let tweet = RawTweet {
            id: "1".to_string(),
            text: "\u{1F6A8} DM me for guaranteed 100x profit, click here!!!".to_string(),
            username: "spammer".to_string(),
            ..RawTweet::default()
        };
        assert!(transform_tweet(&tweet, Category::Other, 1, "m").is_none());
    }

    #[test]
    fn tweet_url_is_synthesized_when_missing() {
        let tweet = RawTweet {
            id: "12345".to_string(),
            text: "Ethereum rollups keep getting cheaper for everyday users this quarter."
                .to_string(),
            username: "builder".to_string(),
            like_count: 7,
            ..RawTweet::default()
        };
        let signal = transform_tweet(&tweet, Category::Eth, 2, "m").unwrap();
        assert_eq!(
            signal.tweet_url.as_deref(),
            Some("https://x.com/builder/status/12345")
        );
        assert_eq!(signal.sources, vec!["https://x.com/builder/status/12345"]);
        assert_eq!(signal.author, "@builder");
        assert_eq!(signal.engagement.as_ref().unwrap().likes, 7);
        assert_eq!(
            signal.feed_categories,
            vec!["eth".to_string(), "twitter".to_string()]
        );
    }

    #[test]
    fn upstream_key_is_stable_across_batches() {
        let item = RawNewsItem {
            news_url: "https://example.com/story".to_string(),
            title: "A story".to_string(),
            ..RawNewsItem::default()
        };
        let a = transform_news_item(&item, Category::Btc, 1, "m");
        let b = transform_news_item(&item, Category::Btc, 9, "m");
        assert_ne!(a.signal_id, b.signal_id);
        assert_eq!(a.upstream_key, b.upstream_key);
    }

    #[test]
    fn transform_items_sorts_newest_first_and_counts() {
        let news = vec![
            RawNewsItem {
                title: "Older bitcoin story headline".to_string(),
                news_url: "https://example.com/old".to_string(),
                date: "2025-03-01T00:00:00Z".to_string(),
                ..RawNewsItem::default()
            },
            RawNewsItem {
                title: "Newer bitcoin story headline".to_string(),
                news_url: "https://example.com/new".to_string(),
                date: "2025-03-02T00:00:00Z".to_string(),
                ..RawNewsItem::default()
            },
        ];
        let bundle = transform_items(&news, &[], Category::Btc, "m");
        assert_eq!(bundle.metadata.total_news, 2);
        assert_eq!(bundle.metadata.total_tweets, 0);
        assert_eq!(bundle.metadata.total_items, 2);
        assert!(bundle.cryptonews[0].timestamp > bundle.cryptonews[1].timestamp);
    }
}
