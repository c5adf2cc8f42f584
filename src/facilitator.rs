//! Facilitator client: payment verification and settlement over HTTP.
//!
//! All cryptographic and ledger logic lives in the facilitator service; this
//! client only forwards envelopes and interprets the responses. Every failure
//! mode (network, non-200, malformed body) folds into an unsuccessful
//! outcome, never an error the HTTP layer would turn into a 500.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct FacilitatorClient {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    payment_payload: &'a Value,
    pay_to: &'a str,
    amount: &'a str,
    token: &'a str,
    chain: &'a str,
}

#[derive(Debug, Serialize)]
struct SettleRequest<'a> {
    payment_payload: &'a Value,
    pay_to: &'a str,
    amount: &'a str,
    chain: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyOutcome {
    #[serde(default)]
    pub success: bool,
    #[serde(default, rename = "isValid")]
    pub is_valid: bool,
    #[serde(default)]
    pub verification_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettleOutcome {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub settlement_success: bool,
    #[serde(default)]
    pub transaction_hash: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl FacilitatorClient {
    pub fn new(base_url: &str) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client");
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    pub async fn verify(
        &self,
        payment_payload: &Value,
        pay_to: &str,
        amount: &str,
        token: &str,
        chain: &str,
    ) -> VerifyOutcome {
        let req = VerifyRequest {
            payment_payload,
            pay_to,
            amount,
            token,
            chain,
        };
        tracing::info!("calling facilitator /v1/verify");

        let resp = match self
            .http
            .post(format!("{}/v1/verify", self.base_url))
            .json(&req)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(error = ?e, "facilitator verify network error");
                return VerifyOutcome {
                    error: Some(e.to_string()),
                    ..VerifyOutcome::default()
                };
            }
        };

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "facilitator verify failed");
            return VerifyOutcome {
                error: Some(format!("HTTP {status}: {body}")),
                ..VerifyOutcome::default()
            };
        }

        match resp.json::<VerifyOutcome>().await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = ?e, "facilitator verify body decode failed");
                VerifyOutcome {
                    error: Some(e.to_string()),
                    ..VerifyOutcome::default()
                }
            }
        }
    }

    pub async fn settle(
        &self,
        payment_payload: &Value,
        pay_to: &str,
        amount: &str,
        chain: &str,
    ) -> SettleOutcome {
        let req = SettleRequest {
            payment_payload,
            pay_to,
            amount,
            chain,
        };
        tracing::info!("calling facilitator /v1/settle");

        let resp = match self
            .http
            .post(format!("{}/v1/settle", self.base_url))
            .json(&req)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(error = ?e, "facilitator settle network error");
                return SettleOutcome {
                    error: Some(e.to_string()),
                    ..SettleOutcome::default()
                };
            }
        };

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "facilitator settle failed");
            return SettleOutcome {
                error: Some(format!("HTTP {status}: {body}")),
                ..SettleOutcome::default()
            };
        }

        match resp.json::<SettleOutcome>().await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = ?e, "facilitator settle body decode failed");
                SettleOutcome {
                    error: Some(e.to_string()),
                    ..SettleOutcome::default()
                }
            }
        }
    }
}
