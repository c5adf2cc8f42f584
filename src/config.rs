//! Runtime configuration, read once from the environment at startup.
//!
//! Validation errors here are fatal: a missing API key or a malformed wallet
//! address aborts boot rather than surfacing as request-time failures. The
//! monitored X-account list can come from a TOML file next to the binary.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};

use crate::category::Category;

const ENV_X_ACCOUNTS_PATH: &str = "X_ACCOUNTS_PATH";
const DEFAULT_X_ACCOUNTS_PATH: &str = "config/x_accounts.toml";

/// Flat fee added on top of the per-request price, in USDC wei.
const FACILITATOR_FEE_WEI: u64 = 10_000;

/// Categories served without payment.
pub const FREE_CATEGORIES: &[Category] =
    &[Category::Rwa, Category::MacroEvents, Category::Virtuals];

#[derive(Debug, Clone)]
pub struct Settings {
    pub app_name: String,
    pub base_url: String,
    pub facilitator_url: String,

    pub crypto_news_api_key: String,
    /// "cryptonews" (HTTP provider) or "rss" (feed aggregator).
    pub news_provider: String,

    pub tweet_api_base_url: String,
    pub tweet_api_key: String,
    pub tweet_access_token: String,
    pub x_accounts: Vec<String>,

    pub payment_network: String,
    pub merchant_payout_wallet: String,
    pub treasury_wallet: String,
    pub merchant_id: String,
    /// Price per request in USDC wei (6 decimals).
    pub price_per_request: u64,

    pub cache_ttl_secs: u64,
    pub freshness_secs: u64,
    pub retention_secs: u64,
    pub cleanup_interval_secs: u64,

    pub api_port: u16,
    pub ai_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "chainfeed".to_string(),
            base_url: "http://localhost:8080".to_string(),
            facilitator_url: "http://localhost:9000".to_string(),
            crypto_news_api_key: String::new(),
            news_provider: "cryptonews".to_string(),
            tweet_api_base_url: "https://api.game.virtuals.io".to_string(),
            tweet_api_key: String::new(),
            tweet_access_token: String::new(),
            x_accounts: default_x_accounts(),
            payment_network: "base-sepolia".to_string(),
            merchant_payout_wallet: "0x000000000000000000000000000000000000dEaD".to_string(),
            treasury_wallet: "0x000000000000000000000000000000000000dEaD".to_string(),
            merchant_id: "chainfeed_merchant".to_string(),
            price_per_request: 10_000,
            cache_ttl_secs: 3_600,
            freshness_secs: 3_600,
            retention_secs: 24 * 3_600,
            cleanup_interval_secs: 3_600,
            api_port: 8080,
            ai_enabled: false,
        }
    }
}

impl Settings {
    /// Load settings from the environment. Missing keys and malformed wallet
    /// addresses are fatal.
    pub fn from_env() -> Result<Self> {
        let defaults = Settings::default();

        let crypto_news_api_key = std::env::var("CRYPTO_NEWS_API_KEY")
            .context("CRYPTO_NEWS_API_KEY is required")?;
        if crypto_news_api_key.trim().is_empty() {
            bail!("CRYPTO_NEWS_API_KEY is empty");
        }

        let facilitator_url =
            std::env::var("FACILITATOR_URL").context("FACILITATOR_URL is required")?;

        let merchant_payout_wallet = std::env::var("MERCHANT_PAYOUT_WALLET")
            .context("MERCHANT_PAYOUT_WALLET is required")?;
        let treasury_wallet =
            std::env::var("TREASURY_WALLET").unwrap_or_else(|_| merchant_payout_wallet.clone());

        let settings = Settings {
            app_name: env_or("APP_NAME", &defaults.app_name),
            base_url: env_or("BASE_URL", &defaults.base_url),
            facilitator_url,
            crypto_news_api_key,
            news_provider: env_or("NEWS_PROVIDER", &defaults.news_provider),
            tweet_api_base_url: env_or("TWEET_API_BASE_URL", &defaults.tweet_api_base_url),
            tweet_api_key: env_or("TWEET_API_KEY", ""),
            tweet_access_token: env_or("TWEET_ACCESS_TOKEN", ""),
            x_accounts: load_x_accounts()?,
            payment_network: env_or("PAYMENT_NETWORK", &defaults.payment_network),
            merchant_payout_wallet,
            treasury_wallet,
            merchant_id: env_or("MERCHANT_ID", &defaults.merchant_id),
            price_per_request: env_parse("PRICE_PER_REQUEST", defaults.price_per_request)?,
            cache_ttl_secs: env_parse("CACHE_TTL_SECS", defaults.cache_ttl_secs)?,
            freshness_secs: env_parse("FEED_FRESHNESS_SECS", defaults.freshness_secs)?,
            retention_secs: env_parse("RETENTION_SECS", defaults.retention_secs)?,
            cleanup_interval_secs: env_parse(
                "CLEANUP_INTERVAL_SECS",
                defaults.cleanup_interval_secs,
            )?,
            api_port: env_parse("API_PORT", defaults.api_port)?,
            ai_enabled: env_or("AI_ENABLED", "0") == "1",
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Startup validation: wallet addresses and the network tables.
    pub fn validate(&self) -> Result<()> {
        for (name, addr) in [
            ("MERCHANT_PAYOUT_WALLET", &self.merchant_payout_wallet),
            ("TREASURY_WALLET", &self.treasury_wallet),
        ] {
            if !is_eth_address(addr) {
                bail!("invalid Ethereum address for {name}: {addr}");
            }
        }
        // Forces the lookup so an unsupported network fails at boot.
        self.try_usdc_address()?;
        Ok(())
    }

    pub fn usdc_address(&self) -> &'static str {
        // validate() ran at startup, so the network is known here.
        self.try_usdc_address().unwrap_or("0x0")
    }

    fn try_usdc_address(&self) -> Result<&'static str> {
        match self.payment_network.as_str() {
            "base" => Ok("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"),
            "base-sepolia" => Ok("0x036CbD53842c5426634e7929541eC2318f3dCF7e"),
            other => Err(anyhow!("unsupported PAYMENT_NETWORK: {other}")),
        }
    }

    pub fn chain_id(&self) -> &'static str {
        match self.payment_network.as_str() {
            "base" => "0x2105",
            _ => "0x14a34",
        }
    }

    pub fn rpc_url(&self) -> &'static str {
        match self.payment_network.as_str() {
            "base" => "https://mainnet.base.org",
            _ => "https://sepolia.base.org",
        }
    }

    pub fn block_explorer(&self) -> &'static str {
        match self.payment_network.as_str() {
            "base" => "https://basescan.org",
            _ => "https://sepolia.basescan.org",
        }
    }

    pub fn price_usdc(&self) -> f64 {
        self.price_per_request as f64 / 1_000_000.0
    }

    pub fn total_price_wei(&self) -> u64 {
        self.price_per_request + FACILITATOR_FEE_WEI
    }

    pub fn total_price_usdc(&self) -> f64 {
        self.total_price_wei() as f64 / 1_000_000.0
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("parsing {key}={raw}")),
        Err(_) => Ok(default),
    }
}

/// 0x-prefixed, 40 hex digits.
fn is_eth_address(s: &str) -> bool {
    s.len() == 42
        && s.starts_with("0x")
        && s[2..].chars().all(|c| c.is_ascii_hexdigit())
}

fn default_x_accounts() -> Vec<String> {
    [
        "lookonchain",
        "pumpdotfun",
        "virtuals_io",
        "useBackroom",
        "CreatorBid",
        "HyperliquidX",
        "solana",
        "base",
        "Cointelegraph",
        "TheBlock__",
        "WatcherGuru",
        "cryptodotnews",
        "blockchainrptr",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Monitored accounts: $X_ACCOUNTS_PATH, then config/x_accounts.toml, then
/// the built-in list.
fn load_x_accounts() -> Result<Vec<String>> {
    if let Ok(path) = std::env::var(ENV_X_ACCOUNTS_PATH) {
        let pb = PathBuf::from(&path);
        if !pb.exists() {
            bail!("X_ACCOUNTS_PATH points to non-existent path: {path}");
        }
        return load_x_accounts_from(&pb);
    }
    let default_path = Path::new(DEFAULT_X_ACCOUNTS_PATH);
    if default_path.exists() {
        return load_x_accounts_from(default_path);
    }
    Ok(default_x_accounts())
}

fn load_x_accounts_from(path: &Path) -> Result<Vec<String>> {
    #[derive(serde::Deserialize)]
    struct AccountsFile {
        accounts: Vec<String>,
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading x accounts from {}", path.display()))?;
    let parsed: AccountsFile = toml::from_str(&content)
        .with_context(|| format!("parsing x accounts from {}", path.display()))?;
    let accounts: Vec<String> = parsed
        .accounts
        .into_iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect();
    if accounts.is_empty() {
        bail!("x accounts file {} lists no accounts", path.display());
    }
    Ok(accounts)
}
