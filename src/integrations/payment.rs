//! Hosted checkout payments (Stripe).
//!
//! The REST API is called directly with form-encoded bodies; webhook payloads
//! are authenticated with the `Stripe-Signature` HMAC scheme before they are
//! parsed.

use std::collections::HashMap;

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use uuid::Uuid;

use crate::config::StripeConfig;

type HmacSha256 = Hmac<Sha256>;

const API_BASE: &str = "https://api.stripe.com/v1";

pub const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment processor not configured: {0}")]
    NotConfigured(&'static str),

    #[error("invalid webhook signature: {0}")]
    Signature(String),

    #[error("payment processor returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid payment payload: {0}")]
    InvalidPayload(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// What is being bought, by whom
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub user_id: Uuid,
    pub customer_email: String,
    pub template_id: Uuid,
    pub template_name: String,
    pub template_description: Option<String>,
    /// Price in minor currency units
    pub unit_amount: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
    #[serde(default)]
    pub payment_status: String,
    pub amount_total: Option<i64>,
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub customer_email: Option<String>,
}

impl CheckoutSession {
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }

    /// Buyer and template ids stamped on the session at checkout
    pub fn purchase_ids(&self) -> Result<(Uuid, Uuid), PaymentError> {
        let read = |key: &str| -> Result<Uuid, PaymentError> {
            self.metadata
                .get(key)
                .ok_or_else(|| PaymentError::InvalidPayload(format!("session {} missing metadata {}", self.id, key)))?
                .parse()
                .map_err(|_| PaymentError::InvalidPayload(format!("session {} has malformed {}", self.id, key)))
        };
        Ok((read("userId")?, read("templateId")?))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Refund {
    pub id: String,
    pub status: Option<String>,
    pub amount: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    pub object: serde_json::Value,
}

impl WebhookEvent {
    pub fn session(&self) -> Result<CheckoutSession, PaymentError> {
        serde_json::from_value(self.data.object.clone()).map_err(|e| PaymentError::InvalidPayload(e.to_string()))
    }

    /// Payment intent referenced by a charge event
    pub fn payment_intent(&self) -> Option<&str> {
        self.data.object.get("payment_intent").and_then(|v| v.as_str())
    }
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

pub struct PaymentClient {
    http: reqwest::Client,
    config: StripeConfig,
}

impl PaymentClient {
    pub fn new(http: reqwest::Client, config: StripeConfig) -> Self {
        Self { http, config }
    }

    fn secret_key(&self) -> Result<&str, PaymentError> {
        if self.config.secret_key.is_empty() {
            return Err(PaymentError::NotConfigured("STRIPE_API_KEY"));
        }
        Ok(&self.config.secret_key)
    }

    async fn read<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, PaymentError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or_else(|| status.to_string());
            return Err(PaymentError::Api { status: status.as_u16(), message });
        }
        Ok(response.json::<T>().await?)
    }

    pub async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession, PaymentError> {
        let key = self.secret_key()?;
        let response = self
            .http
            .post(format!("{}/checkout/sessions", API_BASE))
            .basic_auth(key, None::<&str>)
            .form(&checkout_form(&self.config, request))
            .send()
            .await?;

        let session: CheckoutSession = Self::read(response).await?;
        tracing::info!(
            "Created checkout session {} for template {} (user {})",
            session.id,
            request.template_id,
            request.user_id
        );
        Ok(session)
    }

    pub async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, PaymentError> {
        let key = self.secret_key()?;
        let response = self
            .http
            .get(format!("{}/checkout/sessions/{}", API_BASE, session_id))
            .basic_auth(key, None::<&str>)
            .send()
            .await?;
        Self::read(response).await
    }

    pub async fn create_refund(&self, payment_intent: &str) -> Result<Refund, PaymentError> {
        let key = self.secret_key()?;
        let response = self
            .http
            .post(format!("{}/refunds", API_BASE))
            .basic_auth(key, None::<&str>)
            .form(&[("payment_intent", payment_intent)])
            .send()
            .await?;

        let refund: Refund = Self::read(response).await?;
        tracing::info!("Created refund {} for payment intent {}", refund.id, payment_intent);
        Ok(refund)
    }

    /// Authenticate and parse a webhook delivery
    pub fn construct_event(&self, payload: &[u8], signature: &str) -> Result<WebhookEvent, PaymentError> {
        if self.config.webhook_secret.is_empty() {
            return Err(PaymentError::NotConfigured("STRIPE_WEBHOOK_SECRET"));
        }
        verify_signature(
            payload,
            signature,
            &self.config.webhook_secret,
            self.config.webhook_tolerance_secs,
            chrono::Utc::now().timestamp(),
        )?;
        serde_json::from_slice(payload).map_err(|e| PaymentError::InvalidPayload(e.to_string()))
    }
}

fn checkout_form(config: &StripeConfig, request: &CheckoutRequest) -> Vec<(String, String)> {
    let separator = if config.success_url.contains('?') { '&' } else { '?' };
    let success_url = format!("{}{}session_id={{CHECKOUT_SESSION_ID}}", config.success_url, separator);

    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("payment_method_types[0]".to_string(), "card".to_string()),
        ("success_url".to_string(), success_url),
        ("cancel_url".to_string(), config.cancel_url.clone()),
        ("customer_email".to_string(), request.customer_email.clone()),
        ("line_items[0][quantity]".to_string(), "1".to_string()),
        ("line_items[0][price_data][currency]".to_string(), config.currency.clone()),
        ("line_items[0][price_data][unit_amount]".to_string(), request.unit_amount.to_string()),
        ("line_items[0][price_data][product_data][name]".to_string(), request.template_name.clone()),
        ("metadata[userId]".to_string(), request.user_id.to_string()),
        ("metadata[templateId]".to_string(), request.template_id.to_string()),
    ];

    if let Some(description) = request.template_description.as_ref().filter(|d| !d.is_empty()) {
        form.push((
            "line_items[0][price_data][product_data][description]".to_string(),
            description.clone(),
        ));
    }

    form
}

fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, PaymentError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| PaymentError::Signature("unusable webhook secret".to_string()))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(format!("{:x}", mac.finalize().into_bytes()))
}

/// Build a `Stripe-Signature` header value for a payload
pub fn signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, PaymentError> {
    Ok(format!("t={},v1={}", timestamp, compute_signature(secret, timestamp, payload)?))
}

/// Check a `t=<ts>,v1=<hex>[,v1=...]` header against the payload
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), PaymentError> {
    let mut timestamp = None;
    let mut candidates = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| PaymentError::Signature("missing timestamp".to_string()))?;
    if candidates.is_empty() {
        return Err(PaymentError::Signature("no v1 signature".to_string()));
    }

    let expected = compute_signature(secret, timestamp, payload)?;
    let matched = candidates
        .iter()
        .any(|candidate| bool::from(expected.as_bytes().ct_eq(candidate.as_bytes())));
    if !matched {
        return Err(PaymentError::Signature("signature mismatch".to_string()));
    }

    if (now - timestamp).abs() > tolerance_secs {
        return Err(PaymentError::Signature("timestamp outside tolerance".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const NOW: i64 = 1_700_000_000;

    fn stripe_config() -> StripeConfig {
        StripeConfig {
            secret_key: "sk_test".to_string(),
            webhook_secret: SECRET.to_string(),
            success_url: "http://localhost:3000/success".to_string(),
            cancel_url: "http://localhost:3000/cancel".to_string(),
            currency: "usd".to_string(),
            webhook_tolerance_secs: 300,
        }
    }

    #[test]
    fn accepts_valid_signature() {
        let payload = br#"{"id":"evt_1","type":"checkout.session.completed"}"#;
        let header = signature_header(SECRET, NOW, payload).unwrap();
        assert!(verify_signature(payload, &header, SECRET, 300, NOW + 10).is_ok());
    }

    #[test]
    fn accepts_any_matching_v1_entry() {
        let payload = b"{}";
        let good = compute_signature(SECRET, NOW, payload).unwrap();
        let header = format!("t={},v1=deadbeef,v0=ignored,v1={}", NOW, good);
        assert!(verify_signature(payload, &header, SECRET, 300, NOW).is_ok());
    }

    #[test]
    fn rejects_tampered_payload() {
        let header = signature_header(SECRET, NOW, b"{\"amount\":100}").unwrap();
        let err = verify_signature(b"{\"amount\":1}", &header, SECRET, 300, NOW).unwrap_err();
        assert!(matches!(err, PaymentError::Signature(_)));
    }

    #[test]
    fn rejects_wrong_secret() {
        let header = signature_header("whsec_other", NOW, b"{}").unwrap();
        assert!(verify_signature(b"{}", &header, SECRET, 300, NOW).is_err());
    }

    #[test]
    fn rejects_stale_timestamp() {
        let header = signature_header(SECRET, NOW, b"{}").unwrap();
        assert!(verify_signature(b"{}", &header, SECRET, 300, NOW + 301).is_err());
        assert!(verify_signature(b"{}", &header, SECRET, 300, NOW + 300).is_ok());
    }

    #[test]
    fn rejects_malformed_headers() {
        assert!(verify_signature(b"{}", "", SECRET, 300, NOW).is_err());
        assert!(verify_signature(b"{}", &format!("t={}", NOW), SECRET, 300, NOW).is_err());
        assert!(verify_signature(b"{}", "v1=abc", SECRET, 300, NOW).is_err());
    }

    #[test]
    fn checkout_form_carries_amount_and_metadata() {
        let user_id = Uuid::new_v4();
        let template_id = Uuid::new_v4();
        let form = checkout_form(
            &stripe_config(),
            &CheckoutRequest {
                user_id,
                customer_email: "buyer@example.com".to_string(),
                template_id,
                template_name: "Invoice".to_string(),
                template_description: None,
                unit_amount: 1999,
            },
        );
        let get = |key: &str| form.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str());

        assert_eq!(get("mode"), Some("payment"));
        assert_eq!(get("line_items[0][price_data][unit_amount]"), Some("1999"));
        assert_eq!(get("line_items[0][quantity]"), Some("1"));
        assert_eq!(get("metadata[userId]"), Some(user_id.to_string().as_str()));
        assert_eq!(get("metadata[templateId]"), Some(template_id.to_string().as_str()));
        assert_eq!(
            get("success_url"),
            Some("http://localhost:3000/success?session_id={CHECKOUT_SESSION_ID}")
        );
        assert!(get("line_items[0][price_data][product_data][description]").is_none());
    }

    #[test]
    fn success_url_with_query_gets_ampersand() {
        let mut config = stripe_config();
        config.success_url = "http://localhost:3000/done?src=store".to_string();
        let form = checkout_form(
            &config,
            &CheckoutRequest {
                user_id: Uuid::new_v4(),
                customer_email: "b@example.com".to_string(),
                template_id: Uuid::new_v4(),
                template_name: "T".to_string(),
                template_description: Some("desc".to_string()),
                unit_amount: 500,
            },
        );
        assert!(form
            .iter()
            .any(|(k, v)| k == "success_url" && v.ends_with("?src=store&session_id={CHECKOUT_SESSION_ID}")));
    }

    #[test]
    fn session_metadata_yields_purchase_ids() {
        let user_id = Uuid::new_v4();
        let template_id = Uuid::new_v4();
        let event: WebhookEvent = serde_json::from_value(serde_json::json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": { "object": {
                "id": "cs_test_1",
                "payment_status": "paid",
                "amount_total": 1999,
                "payment_intent": "pi_1",
                "metadata": { "userId": user_id.to_string(), "templateId": template_id.to_string() }
            }}
        }))
        .unwrap();

        let session = event.session().unwrap();
        assert!(session.is_paid());
        assert_eq!(session.purchase_ids().unwrap(), (user_id, template_id));
    }

    #[test]
    fn missing_metadata_is_invalid_payload() {
        let session: CheckoutSession =
            serde_json::from_value(serde_json::json!({ "id": "cs_1", "metadata": { "userId": "nope" } })).unwrap();
        assert!(matches!(session.purchase_ids(), Err(PaymentError::InvalidPayload(_))));
        assert!(!session.is_paid());
    }

    #[test]
    fn construct_event_requires_secret() {
        let mut config = stripe_config();
        config.webhook_secret.clear();
        let client = PaymentClient::new(reqwest::Client::new(), config);
        assert!(matches!(
            client.construct_event(b"{}", "t=1,v1=00"),
            Err(PaymentError::NotConfigured(_))
        ));
    }
}
