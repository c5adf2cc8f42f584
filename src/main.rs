//! Chainfeed — Binary Entrypoint
//! Boots the Axum HTTP server: settings, providers, background jobs, routes.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use chainfeed::ai;
use chainfeed::api::{self, AppState};
use chainfeed::cache::MemoryCache;
use chainfeed::config::Settings;
use chainfeed::controller::NewsController;
use chainfeed::facilitator::FacilitatorClient;
use chainfeed::jobs::{spawn_cleanup_scheduler, JobQueue};
use chainfeed::metrics::Metrics;
use chainfeed::providers::cryptonews::CryptoNewsClient;
use chainfeed::providers::rss::RssNewsProvider;
use chainfeed::providers::twitter::TimelineClient;
use chainfeed::providers::types::{NewsProvider, TweetProvider};
use chainfeed::store::{FeedStore, MemoryStore};
use chainfeed::tickers::TickerGenerator;
use chainfeed::x402::PaymentGate;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chainfeed=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let settings = Arc::new(Settings::from_env().context("loading settings")?);
    let metrics = Metrics::init(settings.cache_ttl_secs);

    tracing::info!(
        app = %settings.app_name,
        network = %settings.payment_network,
        merchant = %settings.merchant_payout_wallet,
        "starting crypto news aggregator"
    );

    let ai_client = ai::build_client(settings.ai_enabled);

    let news: Arc<dyn NewsProvider> = match settings.news_provider.as_str() {
        "rss" => Arc::new(RssNewsProvider::default()),
        _ => Arc::new(CryptoNewsClient::new(settings.crypto_news_api_key.clone())),
    };
    let tweets: Arc<dyn TweetProvider> = Arc::new(TimelineClient::new(
        &settings.tweet_api_base_url,
        settings.tweet_api_key.clone(),
        settings.tweet_access_token.clone(),
        settings.x_accounts.clone(),
    ));

    let cache = Arc::new(MemoryCache::new());
    let store: Arc<dyn FeedStore> = Arc::new(MemoryStore::new());

    let freshness = Duration::from_secs(settings.freshness_secs);
    let jobs = JobQueue::start(store.clone(), freshness);
    spawn_cleanup_scheduler(
        store.clone(),
        Duration::from_secs(settings.cleanup_interval_secs),
        Duration::from_secs(settings.retention_secs),
    );

    let gate = Arc::new(PaymentGate::new(
        FacilitatorClient::new(&settings.facilitator_url),
        settings.clone(),
    ));

    let controller = Arc::new(NewsController::new(
        news,
        tweets,
        cache,
        store.clone(),
        TickerGenerator::new(ai_client.clone()),
        ai_client,
        jobs,
        settings.clone(),
    ));

    let state = AppState {
        controller,
        gate,
        store,
        settings: settings.clone(),
    };

    let router = api::create_router(state).merge(metrics.router());

    let addr = format!("0.0.0.0:{}", settings.api_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(addr = %addr, "listening");

    axum::serve(listener, router).await.context("server exited")?;
    Ok(())
}
