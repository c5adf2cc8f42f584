//! x402 payment gate: decode the `X-Payment` envelope, verify with the
//! facilitator, settle, and either admit the request or answer 402 with a
//! machine-readable `accepts` body.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::config::Settings;
use crate::facilitator::FacilitatorClient;

pub const X402_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentExtra {
    pub name: String,
    pub version: String,
}

/// Requirements advertised in every 402 response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    pub scheme: String,
    pub network: String,
    pub max_amount_required: String,
    pub resource: String,
    pub description: String,
    pub pay_to: String,
    pub max_timeout_seconds: u32,
    pub asset: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<PaymentExtra>,
}

/// A request was refused; carries everything the 402 body needs.
#[derive(Debug, Clone)]
pub struct PaymentRejection {
    pub error: String,
    pub requirements: PaymentRequirements,
}

impl PaymentRejection {
    pub fn body(&self) -> Value {
        serde_json::json!({
            "x402Version": X402_VERSION,
            "error": self.error,
            "accepts": [self.requirements],
        })
    }
}

/// A verified and settled payment.
#[derive(Debug, Clone)]
pub struct SettledPayment {
    pub payment_hash: String,
    pub transaction_hash: Option<String>,
}

pub struct PaymentGate {
    facilitator: FacilitatorClient,
    settings: std::sync::Arc<Settings>,
}

impl PaymentGate {
    pub fn new(facilitator: FacilitatorClient, settings: std::sync::Arc<Settings>) -> Self {
        Self {
            facilitator,
            settings,
        }
    }

    pub fn requirements_for(&self, category: &str) -> PaymentRequirements {
        PaymentRequirements {
            scheme: "exact".to_string(),
            network: self.settings.payment_network.clone(),
            max_amount_required: self.settings.price_per_request.to_string(),
            resource: format!("{}/news/{category}", self.settings.base_url),
            description: format!("Access to {category} crypto news and social updates"),
            pay_to: self.settings.merchant_payout_wallet.clone(),
            max_timeout_seconds: 60,
            asset: self.settings.usdc_address().to_string(),
            extra: Some(PaymentExtra {
                name: "USDC".to_string(),
                version: "2".to_string(),
            }),
        }
    }

    /// Full gate: header presence, envelope decode, facilitator verify, then
    /// settle. Any refusal comes back as a `PaymentRejection` (rendered as
    /// 402 by the HTTP layer), never as an internal error.
    pub async fn verify_and_settle(
        &self,
        category: &str,
        x_payment: Option<&str>,
        x_payment_hash: Option<&str>,
    ) -> Result<SettledPayment, Box<PaymentRejection>> {
        let requirements = self.requirements_for(category);

        let reject = |error: String| {
            counter!("payments_rejected_total").increment(1);
            Box::new(PaymentRejection {
                error,
                requirements: requirements.clone(),
            })
        };

        if x_payment.is_none() && x_payment_hash.is_none() {
            return Err(reject("X-Payment header is required.".to_string()));
        }

        let payload = match x_payment {
            Some(header) => match decode_payment_header(header) {
                Ok(v) => v,
                Err(e) => return Err(reject(format!("Invalid X-Payment payload: {e}"))),
            },
            None => return Err(reject("Payment payload not found".to_string())),
        };

        tracing::info!(
            network = %payload.get("network").and_then(serde_json::Value::as_str).unwrap_or(""),
            scheme = %payload.get("scheme").and_then(serde_json::Value::as_str).unwrap_or(""),
            "decoded payment envelope"
        );

        let verify = self
            .facilitator
            .verify(
                &payload,
                &requirements.pay_to,
                &requirements.max_amount_required,
                &requirements.asset,
                &requirements.network,
            )
            .await;
        if !verify.success || !verify.is_valid {
            let error = verify.error.unwrap_or_else(|| "verification failed".to_string());
            return Err(reject(format!("Payment verification failed: {error}")));
        }
        if verify.verification_id.is_none() {
            tracing::warn!("facilitator returned no verification_id");
        }

        let settle = self
            .facilitator
            .settle(
                &payload,
                &requirements.pay_to,
                &requirements.max_amount_required,
                &requirements.network,
            )
            .await;
        if !settle.success || !settle.settlement_success {
            let error = settle.error.unwrap_or_else(|| "settlement failed".to_string());
            return Err(reject(format!("Payment settlement failed: {error}")));
        }

        counter!("payments_settled_total").increment(1);
        tracing::info!(
            transaction_hash = %settle.transaction_hash.as_deref().unwrap_or(""),
            "payment verified and settled"
        );

        Ok(SettledPayment {
            payment_hash: x_payment_hash
                .map(str::to_string)
                .unwrap_or_else(|| payload_hash(&payload)),
            transaction_hash: settle.transaction_hash,
        })
    }
}

fn decode_payment_header(header: &str) -> anyhow::Result<Value> {
    let decoded = BASE64.decode(header.trim())?;
    let value: Value = serde_json::from_slice(&decoded)?;
    Ok(value)
}

/// Stable hash for payment logs when the caller sent no X-Payment-Hash.
fn payload_hash(payload: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.to_string().as_bytes());
    format!("0x{:x}", hasher.finalize())
}
