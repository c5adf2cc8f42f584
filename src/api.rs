//! HTTP surface: router, handlers, and shared state.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use metrics::counter;
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::category::Category;
use crate::config::{Settings, FREE_CATEGORIES};
use crate::controller::NewsController;
use crate::store::{FeedStore, PaymentRecord};
use crate::x402::PaymentGate;

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<NewsController>,
    pub gate: Arc<PaymentGate>,
    pub store: Arc<dyn FeedStore>,
    pub settings: Arc<Settings>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api", get(api_info))
        .route("/api/config", get(api_config))
        .route("/news/", get(list_categories))
        .route("/news/{category}", get(get_news_by_category))
        .route("/news/preview/{category}", get(preview_news_by_category))
        .route("/news/free/{category}", get(get_free_news_by_category))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn root(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "service": state.settings.app_name,
        "description": "Real-time crypto news aggregation API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "OK",
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().timestamp(),
    }))
}

async fn api_info(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "name": state.settings.app_name,
        "version": env!("CARGO_PKG_VERSION"),
        "status": "online",
        "endpoints": {
            "home": "/",
            "news": "/news/{category}",
            "categories": "/news/",
            "preview": "/news/preview/{category}",
            "free": "/news/free/{category}",
            "metrics": "/metrics",
        },
        "pricing": {
            "per_request": format!("{} USDC", state.settings.price_usdc()),
            "network": state.settings.payment_network,
            "protocol": "X402",
        },
        "categories": crate::category::ALL.iter().map(|c| c.as_str()).collect::<Vec<_>>(),
    }))
}

async fn api_config(State(state): State<AppState>) -> Json<serde_json::Value> {
    let s = &state.settings;
    Json(json!({
        "facilitator_base_url": s.facilitator_url,
        "price_usdc_wei": s.price_per_request.to_string(),
        "price_usdc": s.price_usdc(),
        "total_price_usdc_wei": s.total_price_wei().to_string(),
        "total_price_usdc": s.total_price_usdc(),
        "chain_id": s.chain_id(),
        "network": s.payment_network,
        "rpc_url": s.rpc_url(),
        "block_explorer": s.block_explorer(),
        "usdc_address": s.usdc_address(),
        "treasury_wallet": s.treasury_wallet,
        "recipient_wallet": s.merchant_payout_wallet,
        "app_name": s.app_name,
    }))
}

async fn list_categories(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(NewsController::list_available_categories(
        &state.settings.price_per_request.to_string(),
        &state.settings.payment_network,
    ))
}

/// Paid endpoint: x402 verify + settle, then serve the category bundle.
async fn get_news_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
    headers: HeaderMap,
) -> Response {
    let normalized = Category::normalize(&category);
    tracing::info!(requested = %category, category = %normalized, "checking payment");

    let x_payment = headers.get("X-Payment").and_then(|h| h.to_str().ok());
    let x_payment_hash = headers.get("X-Payment-Hash").and_then(|h| h.to_str().ok());

    match state
        .gate
        .verify_and_settle(normalized.as_str(), x_payment, x_payment_hash)
        .await
    {
        Ok(settled) => {
            let record = PaymentRecord {
                payment_hash: settled.payment_hash.clone(),
                endpoint: format!("/news/{normalized}"),
                category: normalized.as_str().to_string(),
                amount: state.settings.price_usdc(),
                verified: true,
                settled: true,
                created_at: Utc::now().timestamp() as f64,
                transaction_hash: settled.transaction_hash.clone(),
            };
            if let Err(e) = state.store.record_payment(record).await {
                tracing::error!(error = ?e, "payment record not stored");
            }

            counter!("news_requests_total", "access" => "paid").increment(1);
            let data = state.controller.get_news_by_category(normalized).await;
            Json(data).into_response()
        }
        Err(rejection) => {
            tracing::warn!(category = %normalized, error = %rejection.error, "payment required");
            (StatusCode::PAYMENT_REQUIRED, Json(rejection.body())).into_response()
        }
    }
}

/// Unpaid 3-item sample.
async fn preview_news_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Response {
    let normalized = Category::normalize(&category);
    counter!("news_requests_total", "access" => "preview").increment(1);
    let data = state.controller.preview_news_by_category(normalized).await;
    Json(data).into_response()
}

/// Unpaid access for the allow-listed categories.
async fn get_free_news_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Response {
    let normalized = Category::normalize(&category);

    if !FREE_CATEGORIES.contains(&normalized) {
        let body = json!({
            "error": "Category not available for free access",
            "free_categories": ["rwa", "macro", "virtuals"],
            "message": format!("Category '{category}' requires payment"),
            "paid_endpoint": format!("{}/news/{category}", state.settings.base_url),
            "price": format!("{} USDC", state.settings.price_usdc()),
        });
        return (StatusCode::FORBIDDEN, Json(body)).into_response();
    }

    tracing::info!(category = %normalized, "free access");
    counter!("news_requests_total", "access" => "free").increment(1);
    let data = state.controller.get_news_by_category(normalized).await;
    Json(data).into_response()
}
