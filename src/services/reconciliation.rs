use crate::{
    db::DbPool,
    entities::order::{self, OrderStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::payment_gateway::{CheckoutSession, PaymentGateway},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, SqlErr};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Outcome of pushing a settled session through materialization.
#[derive(Debug, Clone)]
pub struct MaterializedOrder {
    pub order: order::Model,
    /// False when the session had already been materialized earlier.
    pub created: bool,
}

/// Converges the webhook push path and the confirm-session pull path onto a
/// single materialization procedure keyed on the checkout session id.
#[derive(Clone)]
pub struct ReconciliationService {
    db_pool: Arc<DbPool>,
    gateway: Arc<dyn PaymentGateway>,
    event_sender: Option<Arc<EventSender>>,
}

impl ReconciliationService {
    pub fn new(
        db_pool: Arc<DbPool>,
        gateway: Arc<dyn PaymentGateway>,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            db_pool,
            gateway,
            event_sender,
        }
    }

    /// Materializes the order backing a settled checkout session.
    ///
    /// Safe to call any number of times for the same session: the first call
    /// inserts, every later call returns the existing order. A concurrent
    /// duplicate that loses the insert race is resolved through the unique
    /// index on `checkout_session_id`.
    #[instrument(skip(self, session), fields(session_id = %session.id))]
    pub async fn record_completed_session(
        &self,
        session: &CheckoutSession,
    ) -> Result<MaterializedOrder, ServiceError> {
        let db = &*self.db_pool;

        if let Some(existing) = self.find_by_session(&session.id).await? {
            info!(order_id = %existing.id, "Session already materialized");
            return Ok(MaterializedOrder {
                order: existing,
                created: false,
            });
        }

        let gig_id = parse_metadata_uuid(session.metadata.gig_id.as_deref(), "gigId")?;
        let buyer_id = parse_metadata_uuid(session.metadata.buyer_id.as_deref(), "buyerId")?;
        let seller_id = parse_metadata_uuid(session.metadata.seller_id.as_deref(), "sellerId")?;
        let price = settled_price(session)?;

        let order_id = Uuid::new_v4();
        let now = Utc::now();

        let new_order = order::ActiveModel {
            id: Set(order_id),
            buyer_id: Set(buyer_id),
            seller_id: Set(seller_id),
            gig_id: Set(gig_id),
            price: Set(price),
            status: Set(OrderStatus::Active.to_string()),
            payment_intent_id: Set(session.payment_intent.clone()),
            checkout_session_id: Set(Some(session.id.clone())),
            started: Set(false),
            started_at: Set(None),
            progress: Set(0),
            completed_at: Set(None),
            cancelled_at: Set(None),
            refunded: Set(false),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };

        let order = match new_order.insert(db).await {
            Ok(model) => model,
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                // Lost the race against another delivery of the same session.
                let existing = self.find_by_session(&session.id).await?.ok_or_else(|| {
                    ServiceError::InternalError(
                        "Conflicting order not found after unique violation".to_string(),
                    )
                })?;
                info!(order_id = %existing.id, "Concurrent delivery materialized this session first");
                return Ok(MaterializedOrder {
                    order: existing,
                    created: false,
                });
            }
            Err(e) => {
                error!(error = %e, "Failed to insert order for settled session");
                return Err(ServiceError::DatabaseError(e));
            }
        };

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::OrderCreated(order.id)).await {
                warn!(error = %e, "Failed to send order created event");
            }
        }

        info!(order_id = %order.id, "Materialized order from settled session");
        Ok(MaterializedOrder {
            order,
            created: true,
        })
    }

    /// Pull-path fallback for clients that returned from the hosted page
    /// before the webhook landed.
    #[instrument(skip(self))]
    pub async fn confirm_session(
        &self,
        session_id: &str,
        caller_id: Uuid,
    ) -> Result<MaterializedOrder, ServiceError> {
        let session = self.gateway.retrieve_session(session_id).await?;

        if !session.is_paid() {
            return Err(ServiceError::PaymentNotCompleted(
                "Payment has not completed for this session".to_string(),
            ));
        }

        // The session already proves payment; a caller/buyer mismatch is
        // suspicious but not blocking.
        if let Some(buyer) = session.metadata.buyer_id.as_deref() {
            if buyer != caller_id.to_string() {
                warn!(
                    session_buyer = %buyer,
                    caller_id = %caller_id,
                    "Confirm-session caller differs from the session buyer"
                );
            }
        }

        self.record_completed_session(&session).await
    }

    async fn find_by_session(&self, session_id: &str) -> Result<Option<order::Model>, ServiceError> {
        let db = &*self.db_pool;

        order::Entity::find()
            .filter(order::Column::CheckoutSessionId.eq(session_id))
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to look up order by checkout session");
                ServiceError::DatabaseError(e)
            })
    }
}

fn parse_metadata_uuid(value: Option<&str>, key: &str) -> Result<Uuid, ServiceError> {
    value
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .ok_or_else(|| {
            ServiceError::MissingMetadata(format!("Session metadata is missing a valid {}", key))
        })
}

/// Prefers the provider-settled total; metadata `amount` is the fallback for
/// events that omit it.
fn settled_price(session: &CheckoutSession) -> Result<Decimal, ServiceError> {
    if let Some(cents) = session.amount_total {
        return Ok(Decimal::new(cents, 2));
    }

    session
        .metadata
        .amount
        .as_deref()
        .and_then(|amount| amount.parse::<Decimal>().ok())
        .ok_or_else(|| {
            ServiceError::MissingMetadata("Session carries no settled amount".to_string())
        })
}
