// tests/controller_flow.rs
//
// Orchestration tests for the news controller against stubbed providers.
//
// Covered:
// - repeated requests for one category are served from the response cache
// - a fresh persisted feed snapshot hydrates the response without a fetch
// - spam tweets are dropped before they reach the response
// - category filtering falls back to unfiltered channel data rather than
//   returning an empty channel
// - bundle metadata carries the tickers and keywords used for the fetch

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use chainfeed::category::Category;
use chainfeed::config::Settings;
use chainfeed::store::FeedStore;
use chainfeed::transform::transform_items;
use common::{build_app, default_fixtures, news_item, tweet};

#[tokio::test]
async fn second_request_is_served_from_cache() {
    let (news, tweets) = default_fixtures();
    let app = build_app(Settings::default(), news, tweets);

    let first = app.state.controller.get_news_by_category(Category::Rwa).await;
    assert_eq!(app.news_fetches.load(Ordering::SeqCst), 1);

    let second = app.state.controller.get_news_by_category(Category::Rwa).await;
    assert_eq!(app.news_fetches.load(Ordering::SeqCst), 1, "cache hit must not re-fetch");
    assert_eq!(second.metadata.total_items, first.metadata.total_items);
}

#[tokio::test]
async fn fresh_feed_snapshot_skips_the_fetch() {
    let (news, tweets) = default_fixtures();
    let app = build_app(Settings::default(), news, tweets);

    // A snapshot persisted moments ago is inside the freshness window.
    let saved = transform_items(
        &[news_item(
            "Tokenized bonds settle on-chain",
            "https://example.com/bonds",
            &["ONDO"],
        )],
        &[],
        Category::Rwa,
        "m",
    );
    app.store
        .save_bundle("rwa", &saved, Duration::from_secs(3600))
        .await
        .expect("seed feed store");

    let bundle = app.state.controller.get_news_by_category(Category::Rwa).await;
    assert_eq!(app.news_fetches.load(Ordering::SeqCst), 0, "store hit must not fetch");
    assert_eq!(bundle.metadata.total_news, 1);
    assert_eq!(bundle.cryptonews[0].title, "Tokenized bonds settle on-chain");
}

#[tokio::test]
async fn spam_tweets_never_reach_the_response() {
    let tweets = vec![
        tweet(
            "2001",
            "builder",
            "Interesting governance vote on a lending protocol wrapped up today.",
        ),
        tweet(
            "2002",
            "spammer",
            "\u{1F6A8} DM me for guaranteed 100x profit, click here!!!",
        ),
    ];
    let app = build_app(Settings::default(), Vec::new(), tweets);

    // `other` accepts every tweet at the filter stage, so the spam check is
    // the only thing standing between the stub and the response.
    let bundle = app
        .state
        .controller
        .get_news_by_category(Category::Other)
        .await;
    assert_eq!(bundle.metadata.total_tweets, 1);
    assert_eq!(bundle.twitter[0].tweet_id.as_deref(), Some("2001"));
}

#[tokio::test]
async fn empty_filter_result_falls_back_to_unfiltered_channel() {
    // Off-topic for btc: no tickers, no keyword hits.
    let news = vec![news_item(
        "Quarterly results from a household appliance maker",
        "https://example.com/offtopic",
        &[],
    )];
    let app = build_app(Settings::default(), news, Vec::new());

    let bundle = app.state.controller.get_news_by_category(Category::Btc).await;
    assert_eq!(bundle.metadata.total_news, 1, "fallback must serve the unfiltered channel");
    assert_eq!(
        bundle.cryptonews[0].title,
        "Quarterly results from a household appliance maker"
    );
}

#[tokio::test]
async fn bundle_metadata_names_tickers_and_keywords_used() {
    let (news, tweets) = default_fixtures();
    let app = build_app(Settings::default(), news, tweets);

    let bundle = app.state.controller.get_news_by_category(Category::Btc).await;
    assert_eq!(bundle.metadata.category, Category::Btc);
    assert_eq!(bundle.metadata.tickers_used.as_deref(), Some("BTC"));
    assert!(bundle
        .metadata
        .keywords_used
        .as_ref()
        .unwrap()
        .contains(&"bitcoin".to_string()));
    assert_eq!(bundle.metadata.cache_ttl, Some(3600));
}
