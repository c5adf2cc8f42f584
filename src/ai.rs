//! AI client: provider abstraction behind a small trait so callers can fall
//! back to local heuristics whenever the remote side is disabled or fails.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Capability trait used by ticker and title generation. `None` means "use
/// the local fallback" and is the answer for every failure mode.
#[async_trait]
pub trait AiClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Option<String>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynAiClient = Arc<dyn AiClient>;

/// Factory: build a client according to configuration and environment.
///
/// * `AI_TEST_MODE=mock` returns a deterministic mock client.
/// * Disabled config (or a missing API key) returns the disabled client.
/// * Otherwise the remote Anthropic provider is used.
pub fn build_client(enabled: bool) -> DynAiClient {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Arc::new(MockClient::new("BTC,ETH,SOL"));
    }

    if !enabled {
        return Arc::new(DisabledClient);
    }

    let api_key = std::env::var("ANTHROPIC_API_KEY").unwrap_or_default();
    if api_key.is_empty() {
        tracing::warn!("AI enabled but ANTHROPIC_API_KEY is empty; AI calls disabled");
        return Arc::new(DisabledClient);
    }
    Arc::new(AnthropicProvider::new(api_key, None))
}

/// Returns `None` always; used when AI is switched off.
pub struct DisabledClient;

#[async_trait]
impl AiClient for DisabledClient {
    async fn complete(&self, _prompt: &str) -> Option<String> {
        None
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Fixed-output client for tests and local runs.
#[derive(Clone)]
pub struct MockClient {
    fixed: String,
}

impl MockClient {
    pub fn new(fixed: &str) -> Self {
        Self {
            fixed: fixed.to_string(),
        }
    }
}

#[async_trait]
impl AiClient for MockClient {
    async fn complete(&self, _prompt: &str) -> Option<String> {
        Some(self.fixed.clone())
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Anthropic Messages API provider.
pub struct AnthropicProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

impl AnthropicProvider {
    pub fn new(api_key: String, model_override: Option<&str>) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key,
            model: model_override.unwrap_or("claude-sonnet-4-20250514").to_string(),
            base_url: "https://api.anthropic.com".to_string(),
        }
    }

    /// Point the provider at a different endpoint (tests).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl AiClient for AnthropicProvider {
    async fn complete(&self, prompt: &str) -> Option<String> {
        let req = MessagesRequest {
            model: &self.model,
            max_tokens: 1000,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let resp = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&req)
            .send()
            .await
            .ok()?;

        if !resp.status().is_success() {
            tracing::warn!(status = %resp.status(), "AI provider returned non-success");
            return None;
        }

        let body: MessagesResponse = resp.json().await.ok()?;
        let text = body.content.first().map(|b| b.text.trim().to_string())?;
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    fn provider_name(&self) -> &'static str {
        "anthropic"
    }
}
