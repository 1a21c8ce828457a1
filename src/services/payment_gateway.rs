use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, instrument};

use crate::config::PaymentProviderConfig;
use crate::errors::ServiceError;

/// Metadata attached to a checkout session at creation time and read back
/// during reconciliation.
///
/// Key names are part of the provider wire contract shared with the web
/// client; they stay camelCase regardless of our own JSON conventions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetadata {
    #[serde(rename = "gigId", skip_serializing_if = "Option::is_none")]
    pub gig_id: Option<String>,
    #[serde(rename = "buyerId", skip_serializing_if = "Option::is_none")]
    pub buyer_id: Option<String>,
    #[serde(rename = "sellerId", skip_serializing_if = "Option::is_none")]
    pub seller_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
}

/// The subset of the provider's checkout session object this service reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    pub payment_status: String,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub metadata: SessionMetadata,
}

impl CheckoutSession {
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }
}

/// Everything needed to open a hosted checkout page for one gig purchase.
#[derive(Debug, Clone)]
pub struct CreateSessionRequest {
    pub product_name: String,
    pub product_description: Option<String>,
    pub amount_cents: i64,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: SessionMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundOutcome {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Payment provider operations used by checkout, reconciliation and refunds.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<CheckoutSession, ServiceError>;

    async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, ServiceError>;

    async fn refund_payment_intent(&self, payment_intent_id: &str)
        -> Result<RefundOutcome, ServiceError>;
}

/// Stripe-backed implementation speaking the form-encoded REST API.
pub struct StripeGateway {
    client: reqwest::Client,
    api_base: String,
    secret_key: Option<String>,
}

impl StripeGateway {
    pub fn from_config(config: &PaymentProviderConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                ServiceError::InternalError(format!("Failed to build payment HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        })
    }

    /// Deployments without a configured key can still serve free gigs; any
    /// paid-path call surfaces a visible configuration error instead.
    fn bearer(&self) -> Result<&str, ServiceError> {
        self.secret_key.as_deref().ok_or_else(|| {
            ServiceError::ExternalServiceError(
                "Payment provider credentials are not configured".to_string(),
            )
        })
    }

    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
        context: &str,
    ) -> Result<T, ServiceError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, body = %body, "Payment provider returned an error for {}", context);
            return Err(ServiceError::ExternalServiceError(format!(
                "Payment provider rejected {} ({})",
                context, status
            )));
        }

        response.json::<T>().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!("Malformed {} response: {}", context, e))
        })
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(skip(self, request), fields(amount_cents = request.amount_cents))]
    async fn create_checkout_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<CheckoutSession, ServiceError> {
        let secret = self.bearer()?;

        let mut form: Vec<(String, String)> = vec![
            ("mode".to_string(), "payment".to_string()),
            ("payment_method_types[0]".to_string(), "card".to_string()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            (
                "line_items[0][price_data][currency]".to_string(),
                request.currency.clone(),
            ),
            (
                "line_items[0][price_data][unit_amount]".to_string(),
                request.amount_cents.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]".to_string(),
                request.product_name.clone(),
            ),
            ("success_url".to_string(), request.success_url.clone()),
            ("cancel_url".to_string(), request.cancel_url.clone()),
        ];

        if let Some(description) = &request.product_description {
            form.push((
                "line_items[0][price_data][product_data][description]".to_string(),
                description.clone(),
            ));
        }

        let metadata_pairs = [
            ("gigId", &request.metadata.gig_id),
            ("buyerId", &request.metadata.buyer_id),
            ("sellerId", &request.metadata.seller_id),
            ("amount", &request.metadata.amount),
        ];
        for (key, value) in metadata_pairs {
            if let Some(value) = value {
                form.push((format!("metadata[{}]", key), value.clone()));
            }
        }

        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(secret)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                ServiceError::ExternalServiceError(format!(
                    "Payment provider request failed: {}",
                    e
                ))
            })?;

        Self::parse_response(response, "checkout session creation").await
    }

    #[instrument(skip(self))]
    async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, ServiceError> {
        let secret = self.bearer()?;

        let response = self
            .client
            .get(format!(
                "{}/v1/checkout/sessions/{}",
                self.api_base, session_id
            ))
            .bearer_auth(secret)
            .send()
            .await
            .map_err(|e| {
                ServiceError::ExternalServiceError(format!(
                    "Payment provider request failed: {}",
                    e
                ))
            })?;

        Self::parse_response(response, "checkout session lookup").await
    }

    #[instrument(skip(self))]
    async fn refund_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<RefundOutcome, ServiceError> {
        let secret = self.bearer()?;

        let response = self
            .client
            .post(format!("{}/v1/refunds", self.api_base))
            .bearer_auth(secret)
            .form(&[("payment_intent", payment_intent_id)])
            .send()
            .await
            .map_err(|e| {
                ServiceError::ExternalServiceError(format!(
                    "Payment provider request failed: {}",
                    e
                ))
            })?;

        Self::parse_response(response, "refund creation").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_uses_provider_key_names() {
        let metadata = SessionMetadata {
            gig_id: Some("11111111-1111-1111-1111-111111111111".to_string()),
            buyer_id: Some("22222222-2222-2222-2222-222222222222".to_string()),
            seller_id: Some("33333333-3333-3333-3333-333333333333".to_string()),
            amount: Some("49.99".to_string()),
        };

        let json = serde_json::to_string(&metadata).unwrap();
        assert!(json.contains("gigId"));
        assert!(json.contains("buyerId"));
        assert!(json.contains("sellerId"));
        assert!(!json.contains("gig_id"));
    }

    #[test]
    fn session_deserializes_with_sparse_fields() {
        let session: CheckoutSession =
            serde_json::from_str(r#"{"id":"cs_test_123","payment_status":"unpaid"}"#).unwrap();

        assert_eq!(session.id, "cs_test_123");
        assert!(!session.is_paid());
        assert!(session.url.is_none());
        assert!(session.payment_intent.is_none());
        assert!(session.amount_total.is_none());
        assert_eq!(session.metadata, SessionMetadata::default());
    }

    #[test]
    fn paid_session_reports_settled() {
        let session: CheckoutSession = serde_json::from_str(
            r#"{
                "id": "cs_test_456",
                "url": null,
                "payment_status": "paid",
                "payment_intent": "pi_test_789",
                "amount_total": 4999,
                "metadata": {
                    "gigId": "11111111-1111-1111-1111-111111111111",
                    "buyerId": "22222222-2222-2222-2222-222222222222"
                }
            }"#,
        )
        .unwrap();

        assert!(session.is_paid());
        assert_eq!(session.payment_intent.as_deref(), Some("pi_test_789"));
        assert_eq!(session.amount_total, Some(4999));
        assert_eq!(
            session.metadata.gig_id.as_deref(),
            Some("11111111-1111-1111-1111-111111111111")
        );
        assert!(session.metadata.seller_id.is_none());
    }
}
