use crate::{
    db::DbPool,
    entities::{
        gig,
        order::{self, OrderStatus},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::payment_gateway::{CreateSessionRequest, PaymentGateway, SessionMetadata},
};
use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Where the client should send the buyer next.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckoutRedirect {
    pub url: String,
}

/// Decides between the free path (order created immediately) and the paid
/// path (hosted session, order deferred to reconciliation).
#[derive(Clone)]
pub struct CheckoutService {
    db_pool: Arc<DbPool>,
    gateway: Arc<dyn PaymentGateway>,
    client_base_url: String,
    currency: String,
    event_sender: Option<Arc<EventSender>>,
}

impl CheckoutService {
    pub fn new(
        db_pool: Arc<DbPool>,
        gateway: Arc<dyn PaymentGateway>,
        client_base_url: String,
        currency: String,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            db_pool,
            gateway,
            client_base_url,
            currency,
            event_sender,
        }
    }

    #[instrument(skip(self), fields(gig_id = %gig_id, buyer_id = %buyer_id))]
    pub async fn begin_checkout(
        &self,
        gig_id: Uuid,
        buyer_id: Uuid,
    ) -> Result<CheckoutRedirect, ServiceError> {
        let db = &*self.db_pool;

        let gig = gig::Entity::find_by_id(gig_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch gig for checkout");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound("Gig not found".to_string()))?;

        let price = gig.price.unwrap_or(Decimal::ZERO);
        if price <= Decimal::ZERO {
            return self.materialize_free_order(&gig, buyer_id).await;
        }

        let amount_cents = (price * Decimal::from(100))
            .round()
            .to_i64()
            .ok_or_else(|| {
                ServiceError::ValidationError(
                    "Gig price cannot be expressed in minor units".to_string(),
                )
            })?;

        let request = CreateSessionRequest {
            product_name: gig.title.clone(),
            product_description: gig.description.clone(),
            amount_cents,
            currency: self.currency.clone(),
            success_url: format!(
                "{}/orders?success=true&session_id={{CHECKOUT_SESSION_ID}}",
                self.client_base_url
            ),
            cancel_url: format!("{}/gigs/{}", self.client_base_url, gig.id),
            metadata: SessionMetadata {
                gig_id: Some(gig.id.to_string()),
                buyer_id: Some(buyer_id.to_string()),
                seller_id: Some(gig.seller_id.to_string()),
                amount: Some(price.to_string()),
            },
        };

        let session = self.gateway.create_checkout_session(request).await?;

        let url = session.url.ok_or_else(|| {
            ServiceError::ExternalServiceError("Provider returned no redirect URL".to_string())
        })?;

        info!(session_id = %session.id, "Created hosted checkout session");
        Ok(CheckoutRedirect { url })
    }

    /// Free gigs skip the provider entirely; the order exists as soon as the
    /// buyer asks for it.
    async fn materialize_free_order(
        &self,
        gig: &gig::Model,
        buyer_id: Uuid,
    ) -> Result<CheckoutRedirect, ServiceError> {
        let db = &*self.db_pool;

        let order_id = Uuid::new_v4();
        let now = Utc::now();

        let new_order = order::ActiveModel {
            id: Set(order_id),
            buyer_id: Set(buyer_id),
            seller_id: Set(gig.seller_id),
            gig_id: Set(gig.id),
            price: Set(Decimal::ZERO),
            status: Set(OrderStatus::Active.to_string()),
            payment_intent_id: Set(None),
            checkout_session_id: Set(None),
            started: Set(false),
            started_at: Set(None),
            progress: Set(0),
            completed_at: Set(None),
            cancelled_at: Set(None),
            refunded: Set(false),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };

        new_order.insert(db).await.map_err(|e| {
            error!(error = %e, "Failed to create free order");
            ServiceError::DatabaseError(e)
        })?;

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::OrderCreated(order_id)).await {
                warn!(error = %e, "Failed to send order created event");
            }
        }

        info!(order_id = %order_id, "Created free order without payment linkage");

        Ok(CheckoutRedirect {
            url: format!(
                "{}/orders?success=true&free=true&order={}",
                self.client_base_url, order_id
            ),
        })
    }
}
