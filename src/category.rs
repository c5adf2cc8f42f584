//! Category model: the fixed topical buckets, their keyword tables, and the
//! keyword-scoring classifier that assigns one category to a raw item.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Fixed set of topical buckets. Categories are configuration, not data:
/// they are never created or destroyed at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Btc,
    Eth,
    Sol,
    Base,
    Defi,
    AiAgents,
    Rwa,
    Liquidity,
    MacroEvents,
    ProofOfWork,
    Memecoins,
    Stablecoins,
    Nfts,
    Gaming,
    Launchpad,
    Virtuals,
    Trends,
    Other,
}

/// All categories, in declaration order. `Other` is last and never scored.
pub const ALL: &[Category] = &[
    Category::Btc,
    Category::Eth,
    Category::Sol,
    Category::Base,
    Category::Defi,
    Category::AiAgents,
    Category::Rwa,
    Category::Liquidity,
    Category::MacroEvents,
    Category::ProofOfWork,
    Category::Memecoins,
    Category::Stablecoins,
    Category::Nfts,
    Category::Gaming,
    Category::Launchpad,
    Category::Virtuals,
    Category::Trends,
    Category::Other,
];

/// Tie-break priority when several categories score the same.
const TIE_PRIORITY: &[Category] = &[
    Category::Btc,
    Category::Eth,
    Category::Sol,
    Category::Defi,
    Category::AiAgents,
    Category::Rwa,
];

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Btc => "btc",
            Category::Eth => "eth",
            Category::Sol => "sol",
            Category::Base => "base",
            Category::Defi => "defi",
            Category::AiAgents => "ai_agents",
            Category::Rwa => "rwa",
            Category::Liquidity => "liquidity",
            Category::MacroEvents => "macro_events",
            Category::ProofOfWork => "proof_of_work",
            Category::Memecoins => "memecoins",
            Category::Stablecoins => "stablecoins",
            Category::Nfts => "nfts",
            Category::Gaming => "gaming",
            Category::Launchpad => "launchpad",
            Category::Virtuals => "virtuals",
            Category::Trends => "trends",
            Category::Other => "other",
        }
    }

    /// Parse a canonical category name (no aliases).
    pub fn from_name(name: &str) -> Option<Category> {
        ALL.iter().copied().find(|c| c.as_str() == name)
    }

    /// Normalize any inbound name: lowercase, resolve aliases, and map
    /// unknown names to `Other`.
    pub fn normalize(name: &str) -> Category {
        let lower = name.trim().to_ascii_lowercase();
        let canonical = alias_target(&lower).unwrap_or(lower.as_str());
        Category::from_name(canonical).unwrap_or(Category::Other)
    }

    /// Accepted aliases for this category, for the listing endpoint.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Category::Btc => &["bitcoin"],
            Category::Eth => &["ethereum"],
            Category::Sol => &["solana"],
            Category::AiAgents => &["ai", "agents"],
            Category::MacroEvents => &["macro"],
            Category::ProofOfWork => &["pow", "mining"],
            Category::Memecoins => &["meme"],
            Category::Stablecoins => &["stable"],
            Category::Nfts => &["nft"],
            _ => &[],
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Category::Btc => "Bitcoin news and updates",
            Category::Eth => "Ethereum ecosystem",
            Category::Sol => "Solana ecosystem",
            Category::Base => "Base chain news",
            Category::Defi => "DeFi protocols and updates",
            Category::AiAgents => "AI agents and automation",
            Category::Rwa => "Real World Assets tokenization",
            Category::Liquidity => "DEX liquidity and trading",
            Category::MacroEvents => "Regulation and institutional news",
            Category::ProofOfWork => "Mining and PoW chains",
            Category::Memecoins => "Meme tokens",
            Category::Stablecoins => "Stablecoin news",
            Category::Nfts => "NFT marketplace and collections",
            Category::Gaming => "Crypto gaming",
            Category::Launchpad => "Token launches",
            Category::Virtuals => "Virtuals Protocol",
            Category::Trends => "Trending topics",
            Category::Other => "Anything that matches no fixed bucket",
        }
    }

    /// Keyword table used by the classifier (substring containment, not
    /// word-boundary matching).
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Category::Btc => &[
                "bitcoin", "btc", "satoshi", "lightning", "ordinals", "btc etf",
                "bitcoin mining", "bitcoin halving", "sats",
            ],
            Category::Eth => &[
                "ethereum", "eth", "vitalik", "eip", "gas", "gwei", "eth2",
                "ethereum 2.0", "beacon chain", "merge", "layer 2", "rollup",
                "optimism", "arbitrum",
            ],
            Category::Sol => &[
                "solana", "sol", "phantom", "raydium", "serum", "solana pay",
                "magic eden", "tensor", "jupiter",
            ],
            Category::Base => &["base", "base chain", "coinbase", "cbeth", "base network"],
            Category::Defi => &[
                "defi", "dex", "amm", "yield", "lending", "borrowing",
                "liquidity pool", "swap", "uniswap", "aave", "compound", "curve",
                "balancer", "sushiswap", "pancakeswap", "staking", "farming",
            ],
            Category::AiAgents => &[
                "ai", "agent", "bot", "llm", "autonomous", "virtual", "virtuals",
                "game", "chatbot", "ai trading", "machine learning", "neural",
            ],
            Category::Rwa => &[
                "rwa", "real world asset", "tokenization", "securities", "property",
                "real estate", "tokenized", "backed", "compliant",
            ],
            Category::Liquidity => &[
                "liquidity", "volume", "tvl", "total value locked", "trading volume",
                "market depth", "orderbook", "liquidity pool", "lp", "liquidation",
            ],
            Category::MacroEvents => &[
                "regulation", "sec", "fed", "federal reserve", "etf", "government",
                "policy", "institutional", "blackrock", "fidelity", "grayscale",
                "cftc", "compliance", "legal", "lawsuit", "approval", "election",
            ],
            Category::ProofOfWork => &[
                "mining", "hashrate", "pow", "proof of work", "miner", "asic",
                "difficulty", "bitcoin mining", "ethereum mining", "pool", "hash",
            ],
            Category::Memecoins => &[
                "meme", "memecoin", "doge", "dogecoin", "shib", "shiba", "pepe",
                "bonk", "wif", "floki", "community token", "viral",
            ],
            Category::Stablecoins => &[
                "stable", "stablecoin", "usdt", "usdc", "dai", "tether", "circle",
                "busd", "usdd", "frax", "algorithmic stable", "backed",
            ],
            Category::Nfts => &[
                "nft", "non-fungible", "opensea", "blur", "ordinals", "pfp",
                "collectible", "marketplace", "mint", "drop", "floor price",
            ],
            Category::Gaming => &[
                "gaming", "game", "play to earn", "p2e", "metaverse",
                "virtual world", "in-game", "axie", "sandbox", "decentraland",
                "gala",
            ],
            Category::Launchpad => &[
                "launch", "ido", "ico", "ieo", "token sale", "presale",
                "fair launch", "listing", "new token", "token generation",
            ],
            Category::Virtuals => &[
                "virtuals", "virtual protocol", "game by virtuals", "virtual agents",
            ],
            Category::Trends => &[
                "trending", "viral", "rally", "pump", "surge", "momentum",
                "bullish", "bearish", "sentiment", "fomo",
            ],
            Category::Other => &[],
        }
    }

    /// Smaller keyword list used by the controller's local relevance filter
    /// and by upstream tweet search.
    pub fn filter_keywords(self) -> &'static [&'static str] {
        match self {
            Category::Btc => &["bitcoin", "btc", "satoshi", "lightning"],
            Category::Eth => &["ethereum", "eth", "vitalik", "eip", "gas"],
            Category::Sol => &["solana", "sol", "phantom", "raydium"],
            Category::Base => &["base", "coinbase", "cbeth"],
            Category::Defi => &["defi", "dex", "amm", "yield", "lending", "borrowing"],
            Category::AiAgents => &["ai", "agent", "bot", "llm", "autonomous", "virtual", "virtuals"],
            Category::Rwa => &["rwa", "real world asset", "tokenization", "securities"],
            Category::Liquidity => &["liquidity", "volume", "tvl", "pool", "swap", "trading"],
            Category::MacroEvents => &["regulation", "sec", "fed", "etf", "government", "policy"],
            Category::ProofOfWork => &["mining", "hashrate", "pow", "miner", "asic", "difficulty"],
            Category::Memecoins => &["meme", "doge", "shib", "pepe", "bonk", "wif"],
            Category::Stablecoins => &["usdt", "usdc", "dai", "stable", "tether"],
            Category::Nfts => &["nft", "opensea", "blur", "ordinals"],
            Category::Gaming => &["gaming", "play to earn", "p2e", "metaverse"],
            Category::Launchpad => &["launch", "ido", "ico", "token sale"],
            Category::Virtuals => &["virtuals", "virtual protocol", "game"],
            Category::Trends => &["trending", "viral", "rally", "pump"],
            Category::Other => &[],
        }
    }

    /// Predefined ticker list, where one exists. `Trends` and `Other` have
    /// no static list: trends queries everything and unknown categories get
    /// generated tickers.
    pub fn static_tickers(self) -> Option<&'static str> {
        match self {
            Category::Btc => Some("BTC"),
            Category::Eth => Some("ETH"),
            Category::Sol => Some("SOL"),
            Category::Base => Some("ETH,OP,ARB"),
            Category::Defi => Some("UNI,AAVE,MKR,CRV,SNX,COMP"),
            Category::AiAgents => Some("FET,AGIX,OCEAN,TAO,RNDR"),
            Category::Rwa => Some("ONDO,TRU,RIO,POLYX,MPL"),
            Category::Liquidity => Some("UNI,CAKE,SUSHI,DYDX,BAL"),
            Category::ProofOfWork => Some("BTC,LTC,BCH,ETC,DASH"),
            Category::Memecoins => Some("DOGE,SHIB,PEPE,FLOKI,BONK"),
            Category::Stablecoins => Some("USDT,USDC,DAI,BUSD,FRAX"),
            Category::Nfts => Some("BLUR,LOOKS,APE,DEGEN"),
            Category::Gaming => Some("AXS,SAND,MANA,ENJ,GALA,IMX"),
            Category::Launchpad => Some("MANTA,SUI,SEI,APT,INJ"),
            Category::Virtuals => Some("VIRTUAL,GAME,AI,PRIME"),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn alias_target(lower: &str) -> Option<&'static str> {
    let target = match lower {
        "bitcoin" => "btc",
        "ethereum" => "eth",
        "solana" => "sol",
        "ai" | "agents" => "ai_agents",
        "macro" => "macro_events",
        "pow" | "mining" => "proof_of_work",
        "meme" => "memecoins",
        "stable" => "stablecoins",
        "nft" => "nfts",
        _ => return None,
    };
    Some(target)
}

/// Anything the classifier can look at: title/content/text plus any ticker
/// symbols the provider attached.
pub trait Categorize {
    /// Lowercase concatenation of the item's textual fields.
    fn searchable_text(&self) -> String;
    fn ticker_symbols(&self) -> &[String];
}

/// Assign the best-matching category to one item.
///
/// Ticker symbols for the major chains short-circuit the keyword scan.
/// Otherwise the category with the highest nonzero keyword-containment score
/// wins; ties go to the fixed priority list, then to lexical order of the
/// category name. Items matching nothing land in `Other`.
pub fn categorize_item<T: Categorize>(item: &T) -> Category {
    let tickers = item.ticker_symbols();
    if !tickers.is_empty() {
        let joined = tickers.join(" ").to_ascii_uppercase();
        if joined.contains("BTC") || joined.contains("BITCOIN") {
            return Category::Btc;
        }
        if joined.contains("ETH") || joined.contains("ETHEREUM") {
            return Category::Eth;
        }
        if joined.contains("SOL") || joined.contains("SOLANA") {
            return Category::Sol;
        }
    }

    let text = item.searchable_text();

    let mut best_score = 0usize;
    let mut tied: Vec<Category> = Vec::new();
    for &cat in ALL {
        let score = cat
            .keywords()
            .iter()
            .filter(|kw| text.contains(*kw))
            .count();
        if score > best_score {
            best_score = score;
            tied.clear();
            tied.push(cat);
        } else if score == best_score && score > 0 {
            tied.push(cat);
        }
    }

    if best_score == 0 {
        return Category::Other;
    }
    for &p in TIE_PRIORITY {
        if tied.contains(&p) {
            return p;
        }
    }
    // Deterministic fallback: lexical order of the category name.
    tied.into_iter()
        .min_by_key(|c| c.as_str())
        .unwrap_or(Category::Other)
}

/// Bucket a batch of items by their assigned category.
pub fn categorize_batch<T: Categorize>(items: &[T]) -> BTreeMap<Category, Vec<&T>> {
    let mut out: BTreeMap<Category, Vec<&T>> = BTreeMap::new();
    for item in items {
        out.entry(categorize_item(item)).or_default().push(item);
    }
    out
}

static RE_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w+\b").expect("word regex"));

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of",
    "with", "by", "from", "is", "are", "was", "were", "be", "been", "being",
    "have", "has", "had", "do", "does", "did", "will", "would", "should",
    "could", "may", "might", "can",
];

const CRYPTO_STEMS: &[&str] = &[
    "crypto", "token", "coin", "blockchain", "defi", "bitcoin", "ethereum",
    "solana", "nft", "dao",
];

/// Extract search keywords from free text: drop stop words and short tokens,
/// surface crypto-looking terms first, dedup preserving order.
pub fn extract_keywords(text: &str, limit: usize) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut crypto_terms = Vec::new();
    let mut other_terms = Vec::new();

    for m in RE_WORD.find_iter(&lower) {
        let word = m.as_str();
        if word.len() <= 3 || STOP_WORDS.contains(&word) {
            continue;
        }
        if CRYPTO_STEMS.iter().any(|stem| word.contains(stem)) {
            crypto_terms.push(word.to_string());
        } else {
            other_terms.push(word.to_string());
        }
    }

    let mut seen = std::collections::HashSet::new();
    crypto_terms
        .into_iter()
        .chain(other_terms)
        .filter(|w| seen.insert(w.clone()))
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Item {
        text: String,
        tickers: Vec<String>,
    }

    impl Categorize for Item {
        fn searchable_text(&self) -> String {
            self.text.to_lowercase()
        }
        fn ticker_symbols(&self) -> &[String] {
            &self.tickers
        }
    }

    fn item(text: &str, tickers: &[&str]) -> Item {
        Item {
            text: text.to_string(),
            tickers: tickers.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn ticker_shortcut_wins_over_text() {
        // Text screams DeFi, but the BTC ticker decides.
        let it = item("uniswap aave lending yield farming", &["BTC"]);
        assert_eq!(categorize_item(&it), Category::Btc);
        let it = item("anything at all", &["BITCOIN"]);
        assert_eq!(categorize_item(&it), Category::Btc);
        let it = item("anything at all", &["ETHEREUM"]);
        assert_eq!(categorize_item(&it), Category::Eth);
        let it = item("anything at all", &["SOLANA"]);
        assert_eq!(categorize_item(&it), Category::Sol);
    }

    #[test]
    fn keyword_score_picks_best_category() {
        let it = item("Uniswap and Aave see record lending and yield growth", &[]);
        assert_eq!(categorize_item(&it), Category::Defi);
    }

    #[test]
    fn priority_list_breaks_ties() {
        // "vitalik" scores 1 for eth; "phantom" scores 1 for sol. Tie goes to
        // eth because it precedes sol in the priority order.
        let it = item("vitalik met the phantom team", &[]);
        assert_eq!(categorize_item(&it), Category::Eth);
    }

    #[test]
    fn lexical_order_breaks_ties_outside_priority_list() {
        // "gala" (gaming) vs "blur" (nfts), one hit each, neither in the
        // priority list: gaming < nfts lexically.
        let it = item("gala partners with blur", &[]);
        assert_eq!(categorize_item(&it), Category::Gaming);
    }

    #[test]
    fn no_match_defaults_to_other() {
        let it = item("completely unrelated gardening newsletter", &[]);
        assert_eq!(categorize_item(&it), Category::Other);
    }

    #[test]
    fn normalize_resolves_aliases_and_unknowns() {
        assert_eq!(Category::normalize("bitcoin"), Category::Btc);
        assert_eq!(Category::normalize("Macro"), Category::MacroEvents);
        assert_eq!(Category::normalize("NFT"), Category::Nfts);
        assert_eq!(Category::normalize("defi"), Category::Defi);
        assert_eq!(Category::normalize("quantum-gardening"), Category::Other);
    }

    #[test]
    fn extract_keywords_prefers_crypto_terms_and_dedups() {
        let kws = extract_keywords(
            "The bitcoin whale moved tokens while the market watched the whale",
            5,
        );
        assert_eq!(kws[0], "bitcoin");
        assert_eq!(kws[1], "tokens");
        let whale_count = kws.iter().filter(|w| *w == "whale").count();
        assert_eq!(whale_count, 1);
    }

    #[test]
    fn categorize_batch_buckets_items() {
        let items = vec![
            item("bitcoin hits new high", &[]),
            item("opensea mint drop floor price", &[]),
        ];
        let buckets = categorize_batch(&items);
        assert_eq!(buckets[&Category::Btc].len(), 1);
        assert_eq!(buckets[&Category::Nfts].len(), 1);
    }
}
