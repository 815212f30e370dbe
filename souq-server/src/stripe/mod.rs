//! Stripe integration via REST API (no SDK dependency)
//!
//! [`PaymentGateway`] is the seam the payment service talks to; the
//! production implementation is [`StripeGateway`].

use std::collections::HashMap;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use shared::models::OrderKind;

/// Replay window for signed webhook deliveries
pub const WEBHOOK_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("payment provider unreachable: {0}")]
    Http(#[from] reqwest::Error),
    #[error("payment provider rejected request: {0}")]
    Api(String),
}

/// The subset of a Stripe PaymentIntent the storefront relies on
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl PaymentIntent {
    /// Can this intent still be handed to the client instead of creating a new one?
    pub fn is_reusable(&self) -> bool {
        matches!(
            self.status.as_str(),
            "requires_payment_method" | "requires_confirmation"
        )
    }

    pub fn succeeded(&self) -> bool {
        self.status == "succeeded"
    }

    /// Order this intent was created for, read from its metadata
    pub fn order_ref(&self) -> Option<(OrderKind, i64)> {
        let order_id = self.metadata.get("orderId")?.parse().ok()?;
        let kind = match self.metadata.get("isGuestOrder").map(String::as_str) {
            Some("true") => OrderKind::Guest,
            _ => OrderKind::User,
        };
        Some((kind, order_id))
    }
}

/// Parameters for a new payment intent
#[derive(Debug, Clone)]
pub struct CreateIntentRequest {
    /// Amount in minor units
    pub amount: i64,
    pub currency: String,
    pub description: String,
    pub receipt_email: Option<String>,
    pub metadata: Vec<(String, String)>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(&self, req: &CreateIntentRequest) -> Result<PaymentIntent, GatewayError>;
    async fn retrieve_intent(&self, id: &str) -> Result<PaymentIntent, GatewayError>;
}

/// Stripe REST client
#[derive(Debug, Clone)]
pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: String,
    api_base: String,
}

impl StripeGateway {
    pub fn new(secret_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret_key: secret_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    async fn decode(resp: reqwest::Response) -> Result<PaymentIntent, GatewayError> {
        let status = resp.status();
        let body: serde_json::Value = resp.json().await?;
        if !status.is_success() {
            let message = body["error"]["message"]
                .as_str()
                .unwrap_or("unknown error")
                .to_string();
            return Err(GatewayError::Api(format!("{status}: {message}")));
        }
        serde_json::from_value(body)
            .map_err(|e| GatewayError::Api(format!("unexpected payment intent shape: {e}")))
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_intent(&self, req: &CreateIntentRequest) -> Result<PaymentIntent, GatewayError> {
        let mut form: Vec<(String, String)> = vec![
            ("amount".into(), req.amount.to_string()),
            ("currency".into(), req.currency.clone()),
            ("description".into(), req.description.clone()),
            ("automatic_payment_methods[enabled]".into(), "true".into()),
        ];
        if let Some(email) = &req.receipt_email {
            form.push(("receipt_email".into(), email.clone()));
        }
        for (key, value) in &req.metadata {
            form.push((format!("metadata[{key}]"), value.clone()));
        }

        let resp = self
            .client
            .post(format!("{}/v1/payment_intents", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&form)
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn retrieve_intent(&self, id: &str) -> Result<PaymentIntent, GatewayError> {
        let resp = self
            .client
            .get(format!("{}/v1/payment_intents/{id}", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await?;
        Self::decode(resp).await
    }
}

/// Signed webhook envelope
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    pub object: serde_json::Value,
}

impl WebhookEvent {
    /// The payment intent carried by `payment_intent.*` events
    pub fn payment_intent(&self) -> Option<PaymentIntent> {
        serde_json::from_value(self.data.object.clone()).ok()
    }
}

/// Verify a `Stripe-Signature` header against the raw request body.
pub fn verify_webhook_signature(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
) -> Result<(), &'static str> {
    verify_webhook_signature_at(payload, sig_header, secret, chrono::Utc::now().timestamp())
}

pub fn verify_webhook_signature_at(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
    now: i64,
) -> Result<(), &'static str> {
    let mut timestamp = "";
    let mut signatures = Vec::new();
    for part in sig_header.split(',') {
        let part = part.trim();
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = t;
        } else if let Some(v) = part.strip_prefix("v1=") {
            signatures.push(v);
        }
    }

    if timestamp.is_empty() || signatures.is_empty() {
        return Err("Invalid Stripe-Signature header");
    }

    let ts: i64 = timestamp.parse().map_err(|_| "Invalid timestamp")?;
    if (now - ts).abs() > WEBHOOK_TOLERANCE_SECS {
        return Err("Webhook timestamp outside tolerance");
    }

    // Any v1 entry may match (Stripe sends several during secret rotation)
    for signature in signatures {
        let Ok(sig_bytes) = hex::decode(signature) else {
            continue;
        };
        let mut mac =
            Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| "HMAC key error")?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        if mac.verify_slice(&sig_bytes).is_ok() {
            return Ok(());
        }
    }

    Err("Webhook signature mismatch")
}

/// Build a `Stripe-Signature` header value for `payload`.
pub fn sign_webhook_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return format!("t={timestamp}"),
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    let signature = hex::encode(mac.finalize().into_bytes());
    format!("t={timestamp},v1={signature}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const BODY: &[u8] = br#"{"id":"evt_1","type":"payment_intent.succeeded"}"#;

    #[test]
    fn test_valid_signature_accepted() {
        let header = sign_webhook_payload(BODY, SECRET, 1_700_000_000);
        assert!(verify_webhook_signature_at(BODY, &header, SECRET, 1_700_000_010).is_ok());
    }

    #[test]
    fn test_tampered_body_rejected() {
        let header = sign_webhook_payload(BODY, SECRET, 1_700_000_000);
        let tampered = br#"{"id":"evt_2","type":"payment_intent.succeeded"}"#;
        assert_eq!(
            verify_webhook_signature_at(tampered, &header, SECRET, 1_700_000_000),
            Err("Webhook signature mismatch")
        );
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let header = sign_webhook_payload(BODY, "whsec_other", 1_700_000_000);
        assert!(verify_webhook_signature_at(BODY, &header, SECRET, 1_700_000_000).is_err());
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let header = sign_webhook_payload(BODY, SECRET, 1_700_000_000);
        assert_eq!(
            verify_webhook_signature_at(BODY, &header, SECRET, 1_700_000_000 + 301),
            Err("Webhook timestamp outside tolerance")
        );
    }

    #[test]
    fn test_malformed_header_rejected() {
        assert!(verify_webhook_signature_at(BODY, "", SECRET, 0).is_err());
        assert!(verify_webhook_signature_at(BODY, "t=1", SECRET, 1).is_err());
        assert!(verify_webhook_signature_at(BODY, "v1=abcd", SECRET, 1).is_err());
    }

    #[test]
    fn test_any_matching_v1_entry_accepted() {
        let good = sign_webhook_payload(BODY, SECRET, 1_700_000_000);
        let good_sig = good.split("v1=").nth(1).unwrap();
        let header = format!("t=1700000000,v1=deadbeef,v1={good_sig}");
        assert!(verify_webhook_signature_at(BODY, &header, SECRET, 1_700_000_000).is_ok());
    }

    #[test]
    fn test_order_ref_from_metadata() {
        let intent: PaymentIntent = serde_json::from_value(serde_json::json!({
            "id": "pi_1",
            "status": "succeeded",
            "amount": 10500,
            "currency": "aed",
            "metadata": { "orderId": "42", "isGuestOrder": "true" }
        }))
        .unwrap();
        assert_eq!(intent.order_ref(), Some((OrderKind::Guest, 42)));
        assert!(intent.succeeded());
        assert!(!intent.is_reusable());
    }

    #[test]
    fn test_order_ref_requires_numeric_id() {
        let intent: PaymentIntent = serde_json::from_value(serde_json::json!({
            "id": "pi_1",
            "status": "requires_payment_method",
            "amount": 100,
            "currency": "aed",
            "metadata": { "orderId": "abc" }
        }))
        .unwrap();
        assert_eq!(intent.order_ref(), None);
        assert!(intent.is_reusable());
    }
}
