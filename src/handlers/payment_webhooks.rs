use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use tracing::{info, instrument, warn};

use crate::{errors::ServiceError, services::payment_gateway::CheckoutSession, AppState};

type HmacSha256 = Hmac<Sha256>;

/// Verifies `Stripe-Signature: t=<unix>,v1=<hex>` where the signature is
/// HMAC-SHA256 over `"{t}.{raw body}"` with the shared webhook secret.
///
/// The timestamp must fall inside the tolerance window, so a captured
/// payload cannot be replayed later.
fn verify_signature(headers: &HeaderMap, body: &[u8], secret: &str, tolerance_secs: i64) -> bool {
    let Some(header) = headers
        .get("Stripe-Signature")
        .and_then(|value| value.to_str().ok())
    else {
        return false;
    };

    let mut timestamp: Option<i64> = None;
    let mut signature: Option<&str> = None;
    for part in header.split(',') {
        let mut kv = part.trim().splitn(2, '=');
        match (kv.next(), kv.next()) {
            (Some("t"), Some(value)) => timestamp = value.parse().ok(),
            (Some("v1"), Some(value)) => signature = Some(value),
            _ => {}
        }
    }

    let (Some(timestamp), Some(signature)) = (timestamp, signature) else {
        return false;
    };

    if (Utc::now().timestamp() - timestamp).abs() > tolerance_secs {
        return false;
    }

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(format!("{}.", timestamp).as_bytes());
    mac.update(body);
    let expected = hex::encode(mac.finalize().into_bytes());

    constant_time_eq(expected.as_bytes(), signature.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Payment provider webhook receiver
///
/// The body stays unparsed until the signature over the exact bytes has been
/// verified. Providers treat any 2xx as acknowledged, so duplicates and
/// unhandled event types are answered with 200.
#[utoipa::path(
    post,
    path = "/api/v1/orders/webhook",
    request_body = String,
    summary = "Payment provider webhook",
    description = "Signed provider events; `checkout.session.completed` materializes the order exactly once",
    responses(
        (status = 200, description = "Event acknowledged"),
        (status = 400, description = "Signature or payload rejected", body = crate::errors::ErrorResponse),
        (status = 500, description = "Webhook secret not configured", body = crate::errors::ErrorResponse),
    )
)]
#[instrument(skip(state, headers, body))]
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ServiceError> {
    let payment = state.config.payment();
    let secret = payment.webhook_secret.as_deref().ok_or_else(|| {
        ServiceError::InternalError("payment.webhook_secret is not configured".to_string())
    })?;

    if !verify_signature(&headers, &body, secret, payment.webhook_tolerance_secs as i64) {
        warn!("Rejected webhook with a bad or missing signature");
        return Err(ServiceError::InvalidSignature(
            "Invalid webhook signature".to_string(),
        ));
    }

    let event: Value = serde_json::from_slice(&body)
        .map_err(|e| ServiceError::ValidationError(format!("Invalid webhook payload: {}", e)))?;

    let event_type = event
        .get("type")
        .and_then(|value| value.as_str())
        .unwrap_or("");

    match event_type {
        "checkout.session.completed" => {
            let object = event.pointer("/data/object").ok_or_else(|| {
                ServiceError::ValidationError("Event carries no session object".to_string())
            })?;
            let session: CheckoutSession = serde_json::from_value(object.clone()).map_err(|e| {
                ServiceError::ValidationError(format!("Malformed session object: {}", e))
            })?;

            let outcome = state
                .services
                .reconciliation
                .record_completed_session(&session)
                .await?;

            if !outcome.created {
                info!(order_id = %outcome.order.id, "Duplicate webhook delivery ignored");
                return Ok((StatusCode::OK, "Duplicate ignored").into_response());
            }

            info!(order_id = %outcome.order.id, "Webhook materialized order");
        }
        other => {
            info!(event_type = %other, "Unhandled payment webhook type");
        }
    }

    Ok(Json(json!({ "received": true })).into_response())
}
