//! Ticker resolution for a category: static table first, then the in-memory
//! cache, then AI generation, then fixed fallbacks. Every path returns a
//! comma-separated ticker string; failures never leave this module.

use std::collections::HashMap;
use std::sync::RwLock;

use metrics::counter;

use crate::ai::DynAiClient;
use crate::category::Category;

/// Major-coin default when nothing better is known.
const DEFAULT_TICKERS: &str = "BTC,ETH,SOL,USDT,BNB,XRP,ADA,DOGE,MATIC,DOT";

/// Owned by one controller instance; cache is explicit and invalidatable
/// rather than a process-global.
pub struct TickerGenerator {
    ai: DynAiClient,
    cache: RwLock<HashMap<String, String>>,
}

impl TickerGenerator {
    pub fn new(ai: DynAiClient) -> Self {
        Self {
            ai,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve tickers for a category.
    pub async fn tickers_for(&self, category: Category, keywords: &[&str]) -> String {
        if let Some(static_list) = category.static_tickers() {
            return static_list.to_string();
        }

        let cache_key = category.as_str().to_string();
        if let Some(cached) = self.cached_tickers(&cache_key) {
            tracing::debug!(category = %category, tickers = %cached, "ticker cache hit");
            return cached;
        }

        if let Some(generated) = self.generate(category, keywords).await {
            if let Ok(mut guard) = self.cache.write() {
                guard.insert(cache_key, generated.clone());
            }
            counter!("ticker_ai_generated_total").increment(1);
            tracing::info!(category = %category, tickers = %generated, "AI generated tickers");
            return generated;
        }

        tracing::info!(category = %category, "using fallback tickers");
        fallback_tickers(category).to_string()
    }

    pub fn cached_tickers(&self, category: &str) -> Option<String> {
        self.cache
            .read()
            .ok()
            .and_then(|g| g.get(&category.to_lowercase()).cloned())
    }

    /// Drop one category's cached tickers, or all of them.
    pub fn clear_cache(&self, category: Option<&str>) {
        if let Ok(mut guard) = self.cache.write() {
            match category {
                Some(cat) => {
                    guard.remove(&cat.to_lowercase());
                }
                None => guard.clear(),
            }
        }
    }

    async fn generate(&self, category: Category, keywords: &[&str]) -> Option<String> {
        let keyword_list = if keywords.is_empty() {
            "None".to_string()
        } else {
            keywords.join(", ")
        };
        let prompt = format!(
            "You are a crypto market expert. Given a category and keywords, \
             identify the most relevant cryptocurrency tickers.\n\n\
             Category: {category}\nKeywords: {keyword_list}\n\n\
             Return ONLY a comma-separated list of 3-8 relevant crypto tickers \
             (e.g., \"BTC,ETH,SOL\"). Use official ticker symbols. No \
             explanations, just the tickers."
        );

        let raw = self.ai.complete(&prompt).await?;
        parse_ai_tickers(&raw)
    }
}

/// Validate an AI response: first line, comma-separated alphabetic tokens up
/// to 10 chars each, uppercased. Anything else is rejected.
fn parse_ai_tickers(raw: &str) -> Option<String> {
    let first_line = raw.replace(['"', '\''], "");
    let first_line = first_line.lines().next()?.trim();

    let tickers: Vec<String> = first_line
        .split(',')
        .map(|t| t.trim().to_ascii_uppercase())
        .filter(|t| !t.is_empty() && t.len() <= 10 && t.chars().all(|c| c.is_ascii_alphabetic()))
        .collect();

    if tickers.is_empty() {
        None
    } else {
        Some(tickers.join(","))
    }
}

fn fallback_tickers(category: Category) -> &'static str {
    category.static_tickers().unwrap_or(DEFAULT_TICKERS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{DisabledClient, MockClient};
    use std::sync::Arc;

    #[tokio::test]
    async fn static_table_wins_without_ai() {
        let gen = TickerGenerator::new(Arc::new(DisabledClient));
        assert_eq!(gen.tickers_for(Category::Btc, &[]).await, "BTC");
        assert_eq!(
            gen.tickers_for(Category::Defi, &[]).await,
            "UNI,AAVE,MKR,CRV,SNX,COMP"
        );
    }

    #[tokio::test]
    async fn ai_result_is_validated_and_cached() {
        let gen = TickerGenerator::new(Arc::new(MockClient::new("virtual, game ,ai\nextra")));
        let got = gen.tickers_for(Category::Other, &["anything"]).await;
        assert_eq!(got, "VIRTUAL,GAME,AI");
        assert_eq!(gen.cached_tickers("other").as_deref(), Some("VIRTUAL,GAME,AI"));

        gen.clear_cache(Some("other"));
        assert!(gen.cached_tickers("other").is_none());
    }

    #[tokio::test]
    async fn invalid_ai_output_falls_back_to_defaults() {
        let gen = TickerGenerator::new(Arc::new(MockClient::new(
            "I think you should look at BTC2000000 and such!!!",
        )));
        let got = gen.tickers_for(Category::Other, &[]).await;
        assert_eq!(got, DEFAULT_TICKERS);
    }

    #[tokio::test]
    async fn disabled_ai_falls_back_to_defaults() {
        let gen = TickerGenerator::new(Arc::new(DisabledClient));
        assert_eq!(gen.tickers_for(Category::Trends, &[]).await, DEFAULT_TICKERS);
    }

    #[test]
    fn parse_rejects_non_alphabetic_and_long_tokens() {
        assert_eq!(parse_ai_tickers("BTC,ETH"), Some("BTC,ETH".to_string()));
        assert_eq!(parse_ai_tickers("\"SOL\""), Some("SOL".to_string()));
        assert_eq!(parse_ai_tickers("BTC2,VERYLONGTICKER,??"), None);
        assert_eq!(parse_ai_tickers(""), None);
    }
}
