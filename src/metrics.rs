use axum::{routing::get, Router};
use metrics::{describe_counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and describe the series this service
    /// emits so they render on /metrics from the first scrape.
    pub fn init(cache_ttl_secs: u64) -> Self {
        let builder = PrometheusBuilder::new();
        let handle = builder
            .install_recorder()
            .expect("prometheus: install recorder");

        describe_counter!("news_requests_total", "Category requests served.");
        describe_counter!(
            "response_cache_hits_total",
            "Bundle served from the response cache."
        );
        describe_counter!(
            "feed_store_hits_total",
            "Bundle hydrated from the persisted feed store."
        );
        describe_counter!(
            "channel_fetch_failures_total",
            "Provider fetches that degraded to empty."
        );
        describe_counter!("provider_errors_total", "Upstream provider errors.");
        describe_counter!(
            "tweet_cache_hits_total",
            "Timeline served from the per-account cache."
        );
        describe_counter!(
            "ticker_ai_generated_total",
            "Ticker lists produced by the AI path."
        );
        describe_counter!("payments_settled_total", "Payments verified and settled.");
        describe_counter!("payments_rejected_total", "Requests refused with 402.");
        describe_counter!("jobs_saved_total", "Background save jobs that completed.");
        describe_counter!(
            "jobs_dropped_total",
            "Background save jobs dropped after retries."
        );
        describe_counter!("cleanup_runs_total", "Cleanup passes completed.");
        describe_counter!("cleanup_deleted_total", "Rows removed by cleanup.");

        gauge!("response_cache_ttl_secs").set(cache_ttl_secs as f64);

        Self { handle }
    }

    /// Router exposing `/metrics` in the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
