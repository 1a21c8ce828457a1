use crate::{
    db::DbPool,
    entities::order::{self, OrderStatus},
    errors::ServiceError,
    events::{
        broadcaster::{NotificationBroadcaster, ProgressNotice},
        Event, EventSender,
    },
    services::payment_gateway::PaymentGateway,
};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Authorization-gated lifecycle transitions and the party-scoped queries.
///
/// Terminal transitions and start-work run as conditional updates so that a
/// concurrent transition cannot be overwritten; the losing request observes
/// zero affected rows and fails with `InvalidState`.
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    gateway: Arc<dyn PaymentGateway>,
    broadcaster: Arc<dyn NotificationBroadcaster>,
    event_sender: Option<Arc<EventSender>>,
}

impl OrderService {
    pub fn new(
        db_pool: Arc<DbPool>,
        gateway: Arc<dyn PaymentGateway>,
        broadcaster: Arc<dyn NotificationBroadcaster>,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            db_pool,
            gateway,
            broadcaster,
            event_sender,
        }
    }

    /// All orders where the caller is buyer or seller, newest first.
    #[instrument(skip(self), fields(party_id = %party_id))]
    pub async fn list_for_party(&self, party_id: Uuid) -> Result<Vec<order::Model>, ServiceError> {
        let db = &*self.db_pool;

        order::Entity::find()
            .filter(
                Condition::any()
                    .add(order::Column::BuyerId.eq(party_id))
                    .add(order::Column::SellerId.eq(party_id)),
            )
            .order_by_desc(order::Column::CreatedAt)
            .all(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to list orders");
                ServiceError::DatabaseError(e)
            })
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_for_party(
        &self,
        order_id: Uuid,
        party_id: Uuid,
    ) -> Result<order::Model, ServiceError> {
        let order = self.fetch_order(order_id).await?;

        if order.buyer_id != party_id && order.seller_id != party_id {
            return Err(ServiceError::Forbidden(
                "Only the buyer or seller may view this order".to_string(),
            ));
        }

        Ok(order)
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn start_work(
        &self,
        order_id: Uuid,
        seller_id: Uuid,
    ) -> Result<order::Model, ServiceError> {
        let db = &*self.db_pool;

        let order = self.fetch_order(order_id).await?;
        self.ensure_seller(&order, seller_id)?;

        if order.status != OrderStatus::Active.to_string() {
            return Err(ServiceError::InvalidState(
                "Work can only start on an active order".to_string(),
            ));
        }
        if order.started {
            return Err(ServiceError::InvalidState(
                "Work has already started on this order".to_string(),
            ));
        }

        let now = Utc::now();
        let update = order::Entity::update_many()
            .col_expr(order::Column::Started, Expr::value(true))
            .col_expr(order::Column::StartedAt, Expr::value(Some(now)))
            .col_expr(order::Column::UpdatedAt, Expr::value(Some(now)))
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::Status.eq(OrderStatus::Active.to_string()))
            .filter(order::Column::Started.eq(false))
            .exec(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to mark work started");
                ServiceError::DatabaseError(e)
            })?;

        if update.rows_affected == 0 {
            return Err(ServiceError::InvalidState(
                "Work can only start once on an active order".to_string(),
            ));
        }

        let updated = self.fetch_order(order_id).await?;

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::WorkStarted(order_id)).await {
                warn!(error = %e, "Failed to send work started event");
            }
        }

        info!(order_id = %order_id, "Work started");
        Ok(updated)
    }

    #[instrument(skip(self), fields(order_id = %order_id, progress))]
    pub async fn update_progress(
        &self,
        order_id: Uuid,
        seller_id: Uuid,
        progress: i32,
    ) -> Result<order::Model, ServiceError> {
        let db = &*self.db_pool;

        if !(0..=100).contains(&progress) {
            return Err(ServiceError::ValidationError(
                "Progress must be a number between 0 and 100".to_string(),
            ));
        }

        let order = self.fetch_order(order_id).await?;
        self.ensure_seller(&order, seller_id)?;

        if !order.started {
            return Err(ServiceError::InvalidState(
                "Work has not started on this order".to_string(),
            ));
        }

        let now = Utc::now();
        let update = order::Entity::update_many()
            .col_expr(order::Column::Progress, Expr::value(progress))
            .col_expr(order::Column::UpdatedAt, Expr::value(Some(now)))
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::Started.eq(true))
            .exec(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to update progress");
                ServiceError::DatabaseError(e)
            })?;

        if update.rows_affected == 0 {
            return Err(ServiceError::InvalidState(
                "Work has not started on this order".to_string(),
            ));
        }

        let updated = self.fetch_order(order_id).await?;

        self.broadcaster
            .publish(ProgressNotice {
                order_id: updated.id,
                buyer_id: updated.buyer_id,
                seller_id: updated.seller_id,
                progress,
            })
            .await;

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::ProgressUpdated { order_id, progress })
                .await
            {
                warn!(error = %e, "Failed to send progress updated event");
            }
        }

        Ok(updated)
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn complete_by_id(
        &self,
        order_id: Uuid,
        seller_id: Uuid,
    ) -> Result<order::Model, ServiceError> {
        let order = self.fetch_order(order_id).await?;
        self.ensure_seller(&order, seller_id)?;
        self.complete_active(order).await
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn cancel_by_id(
        &self,
        order_id: Uuid,
        seller_id: Uuid,
    ) -> Result<order::Model, ServiceError> {
        let order = self.fetch_order(order_id).await?;
        self.ensure_seller(&order, seller_id)?;
        self.cancel_active(order).await
    }

    /// Legacy entry point: completes the seller's most recently created
    /// active order for the gig.
    #[instrument(skip(self), fields(gig_id = %gig_id))]
    pub async fn complete_for_gig(
        &self,
        gig_id: Uuid,
        seller_id: Uuid,
    ) -> Result<order::Model, ServiceError> {
        let order = self.latest_active_for_gig(gig_id, seller_id).await?;
        self.complete_active(order).await
    }

    /// Legacy entry point: cancels the seller's most recently created active
    /// order for the gig.
    #[instrument(skip(self), fields(gig_id = %gig_id))]
    pub async fn cancel_for_gig(
        &self,
        gig_id: Uuid,
        seller_id: Uuid,
    ) -> Result<order::Model, ServiceError> {
        let order = self.latest_active_for_gig(gig_id, seller_id).await?;
        self.cancel_active(order).await
    }

    async fn complete_active(&self, order: order::Model) -> Result<order::Model, ServiceError> {
        let db = &*self.db_pool;

        let now = Utc::now();
        let update = order::Entity::update_many()
            .col_expr(
                order::Column::Status,
                Expr::value(OrderStatus::Completed.to_string()),
            )
            .col_expr(order::Column::CompletedAt, Expr::value(Some(now)))
            .col_expr(order::Column::UpdatedAt, Expr::value(Some(now)))
            .filter(order::Column::Id.eq(order.id))
            .filter(order::Column::Status.eq(OrderStatus::Active.to_string()))
            .exec(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to complete order");
                ServiceError::DatabaseError(e)
            })?;

        if update.rows_affected == 0 {
            return Err(ServiceError::InvalidState(
                "Only an active order can be completed".to_string(),
            ));
        }

        let updated = self.fetch_order(order.id).await?;

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::OrderCompleted(order.id)).await {
                warn!(error = %e, "Failed to send order completed event");
            }
        }

        info!(order_id = %order.id, "Order completed");
        Ok(updated)
    }

    /// Refund-before-transition: a paid order is only marked cancelled after
    /// the provider accepted the refund, so a refund failure leaves it active
    /// and retryable.
    async fn cancel_active(&self, order: order::Model) -> Result<order::Model, ServiceError> {
        let db = &*self.db_pool;

        let is_free =
            order.checkout_session_id.is_none() && order.payment_intent_id.is_none();

        let refunded = if is_free {
            false
        } else {
            self.refund_order_payment(&order).await?;
            true
        };

        let now = Utc::now();
        let update = order::Entity::update_many()
            .col_expr(
                order::Column::Status,
                Expr::value(OrderStatus::Cancelled.to_string()),
            )
            .col_expr(order::Column::CancelledAt, Expr::value(Some(now)))
            .col_expr(order::Column::Refunded, Expr::value(refunded))
            .col_expr(order::Column::UpdatedAt, Expr::value(Some(now)))
            .filter(order::Column::Id.eq(order.id))
            .filter(order::Column::Status.eq(OrderStatus::Active.to_string()))
            .exec(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to cancel order");
                ServiceError::DatabaseError(e)
            })?;

        if update.rows_affected == 0 {
            return Err(ServiceError::InvalidState(
                "Only an active order can be cancelled".to_string(),
            ));
        }

        let updated = self.fetch_order(order.id).await?;

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::OrderCancelled {
                    order_id: order.id,
                    refunded,
                })
                .await
            {
                warn!(error = %e, "Failed to send order cancelled event");
            }
        }

        info!(order_id = %order.id, refunded, "Order cancelled");
        Ok(updated)
    }

    async fn refund_order_payment(&self, order: &order::Model) -> Result<(), ServiceError> {
        let payment_intent_id = match &order.payment_intent_id {
            Some(id) => id.clone(),
            None => {
                let session_id = order.checkout_session_id.as_deref().ok_or_else(|| {
                    ServiceError::InternalError("Paid order has no payment linkage".to_string())
                })?;
                let session = self.gateway.retrieve_session(session_id).await?;
                session.payment_intent.ok_or_else(|| {
                    ServiceError::ExternalServiceError(
                        "Session carries no payment intent to refund".to_string(),
                    )
                })?
            }
        };

        let refund = self.gateway.refund_payment_intent(&payment_intent_id).await?;
        info!(refund_id = %refund.id, "Refund issued ahead of cancellation");
        Ok(())
    }

    async fn latest_active_for_gig(
        &self,
        gig_id: Uuid,
        seller_id: Uuid,
    ) -> Result<order::Model, ServiceError> {
        let db = &*self.db_pool;

        order::Entity::find()
            .filter(order::Column::GigId.eq(gig_id))
            .filter(order::Column::SellerId.eq(seller_id))
            .filter(order::Column::Status.eq(OrderStatus::Active.to_string()))
            .order_by_desc(order::Column::CreatedAt)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to find active order for gig");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound("Active order not found".to_string()))
    }

    async fn fetch_order(&self, order_id: Uuid) -> Result<order::Model, ServiceError> {
        let db = &*self.db_pool;

        order::Entity::find_by_id(order_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch order");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))
    }

    fn ensure_seller(&self, order: &order::Model, caller_id: Uuid) -> Result<(), ServiceError> {
        if order.seller_id != caller_id {
            return Err(ServiceError::Forbidden(
                "Only the seller may modify this order".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::broadcaster::{ChannelBroadcaster, NoopBroadcaster};
    use crate::services::payment_gateway::{
        CheckoutSession, MockPaymentGateway, RefundOutcome, SessionMetadata,
    };
    use assert_matches::assert_matches;
    use chrono::Duration;
    use mockall::predicate::eq;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use sea_orm::{ActiveModelTrait, ConnectOptions, Database};

    async fn setup_test_db() -> Arc<DbPool> {
        let mut options = ConnectOptions::new("sqlite::memory:".to_string());
        options.max_connections(1);
        let db = Database::connect(options).await.unwrap();
        crate::db::run_migrations(&db).await.unwrap();
        Arc::new(db)
    }

    fn active_order(seller_id: Uuid, buyer_id: Uuid) -> order::ActiveModel {
        let now = Utc::now();
        order::ActiveModel {
            id: Set(Uuid::new_v4()),
            buyer_id: Set(buyer_id),
            seller_id: Set(seller_id),
            gig_id: Set(Uuid::new_v4()),
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
        }
    }

    fn service(db: Arc<DbPool>, gateway: MockPaymentGateway) -> OrderService {
        OrderService::new(db, Arc::new(gateway), Arc::new(NoopBroadcaster), None)
    }

    #[tokio::test]
    async fn start_work_stamps_started_at() {
        let db = setup_test_db().await;
        let seller_id = Uuid::new_v4();
        let order = active_order(seller_id, Uuid::new_v4())
            .insert(&*db)
            .await
            .unwrap();

        let updated = service(db, MockPaymentGateway::new())
            .start_work(order.id, seller_id)
            .await
            .unwrap();

        assert!(updated.started);
        assert!(updated.started_at.is_some());
        assert_eq!(updated.status, "active");
    }

    #[tokio::test]
    async fn start_work_twice_is_invalid_state() {
        let db = setup_test_db().await;
        let seller_id = Uuid::new_v4();
        let order = active_order(seller_id, Uuid::new_v4())
            .insert(&*db)
            .await
            .unwrap();

        let service = service(db, MockPaymentGateway::new());
        service.start_work(order.id, seller_id).await.unwrap();

        let second = service.start_work(order.id, seller_id).await;
        assert_matches!(second, Err(ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn start_work_by_buyer_is_forbidden() {
        let db = setup_test_db().await;
        let buyer_id = Uuid::new_v4();
        let order = active_order(Uuid::new_v4(), buyer_id)
            .insert(&*db)
            .await
            .unwrap();

        let result = service(db, MockPaymentGateway::new())
            .start_work(order.id, buyer_id)
            .await;

        assert_matches!(result, Err(ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn progress_outside_range_is_rejected() {
        let db = setup_test_db().await;
        let service = service(db, MockPaymentGateway::new());

        for out_of_range in [-1, 101] {
            let result = service
                .update_progress(Uuid::new_v4(), Uuid::new_v4(), out_of_range)
                .await;
            assert_matches!(result, Err(ServiceError::ValidationError(_)));
        }
    }

    #[tokio::test]
    async fn progress_requires_started_work() {
        let db = setup_test_db().await;
        let seller_id = Uuid::new_v4();
        let order = active_order(seller_id, Uuid::new_v4())
            .insert(&*db)
            .await
            .unwrap();

        let result = service(db, MockPaymentGateway::new())
            .update_progress(order.id, seller_id, 50)
            .await;

        assert_matches!(result, Err(ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn progress_update_is_broadcast_to_subscribers() {
        let db = setup_test_db().await;
        let seller_id = Uuid::new_v4();
        let buyer_id = Uuid::new_v4();
        let mut model = active_order(seller_id, buyer_id);
        model.started = Set(true);
        model.started_at = Set(Some(Utc::now()));
        let order = model.insert(&*db).await.unwrap();

        let broadcaster = Arc::new(ChannelBroadcaster::new(8));
        let mut subscriber = broadcaster.subscribe();
        let service = OrderService::new(
            db,
            Arc::new(MockPaymentGateway::new()),
            broadcaster,
            None,
        );

        let updated = service.update_progress(order.id, seller_id, 60).await.unwrap();
        assert_eq!(updated.progress, 60);

        let notice = subscriber.try_recv().unwrap();
        assert_eq!(
            notice,
            ProgressNotice {
                order_id: order.id,
                buyer_id,
                seller_id,
                progress: 60,
            }
        );
    }

    #[tokio::test]
    async fn complete_stamps_completed_at() {
        let db = setup_test_db().await;
        let seller_id = Uuid::new_v4();
        let order = active_order(seller_id, Uuid::new_v4())
            .insert(&*db)
            .await
            .unwrap();

        let updated = service(db, MockPaymentGateway::new())
            .complete_by_id(order.id, seller_id)
            .await
            .unwrap();

        assert_eq!(updated.status, "completed");
        assert!(updated.completed_at.is_some());
        assert!(updated.cancelled_at.is_none());
    }

    #[tokio::test]
    async fn completed_order_cannot_be_completed_again() {
        let db = setup_test_db().await;
        let seller_id = Uuid::new_v4();
        let order = active_order(seller_id, Uuid::new_v4())
            .insert(&*db)
            .await
            .unwrap();

        let service = service(db, MockPaymentGateway::new());
        service.complete_by_id(order.id, seller_id).await.unwrap();

        let second = service.complete_by_id(order.id, seller_id).await;
        assert_matches!(second, Err(ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn cancel_free_order_skips_the_provider() {
        let db = setup_test_db().await;
        let seller_id = Uuid::new_v4();
        let order = active_order(seller_id, Uuid::new_v4())
            .insert(&*db)
            .await
            .unwrap();

        // No expectations: any provider call would panic.
        let updated = service(db, MockPaymentGateway::new())
            .cancel_by_id(order.id, seller_id)
            .await
            .unwrap();

        assert_eq!(updated.status, "cancelled");
        assert!(!updated.refunded);
        assert!(updated.cancelled_at.is_some());
    }

    #[tokio::test]
    async fn cancel_paid_order_refunds_first() {
        let db = setup_test_db().await;
        let seller_id = Uuid::new_v4();
        let mut model = active_order(seller_id, Uuid::new_v4());
        model.price = Set(dec!(25));
        model.payment_intent_id = Set(Some("pi_123".to_string()));
        model.checkout_session_id = Set(Some("cs_123".to_string()));
        let order = model.insert(&*db).await.unwrap();

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_refund_payment_intent()
            .with(eq("pi_123"))
            .times(1)
            .returning(|_| {
                Ok(RefundOutcome {
                    id: "re_1".to_string(),
                    status: Some("succeeded".to_string()),
                })
            });

        let updated = service(db, gateway)
            .cancel_by_id(order.id, seller_id)
            .await
            .unwrap();

        assert_eq!(updated.status, "cancelled");
        assert!(updated.refunded);
    }

    #[tokio::test]
    async fn failed_refund_leaves_the_order_active() {
        let db = setup_test_db().await;
        let seller_id = Uuid::new_v4();
        let mut model = active_order(seller_id, Uuid::new_v4());
        model.payment_intent_id = Set(Some("pi_456".to_string()));
        model.checkout_session_id = Set(Some("cs_456".to_string()));
        let order = model.insert(&*db).await.unwrap();

        let mut gateway = MockPaymentGateway::new();
        gateway.expect_refund_payment_intent().returning(|_| {
            Err(ServiceError::ExternalServiceError(
                "Payment provider rejected refund creation (500 Internal Server Error)".to_string(),
            ))
        });

        let service = service(db.clone(), gateway);
        let result = service.cancel_by_id(order.id, seller_id).await;
        assert_matches!(result, Err(ServiceError::ExternalServiceError(_)));

        let reloaded = order::Entity::find_by_id(order.id)
            .one(&*db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.status, "active");
        assert!(!reloaded.refunded);
        assert!(reloaded.cancelled_at.is_none());
    }

    #[tokio::test]
    async fn cancel_resolves_the_intent_through_the_session() {
        let db = setup_test_db().await;
        let seller_id = Uuid::new_v4();
        let mut model = active_order(seller_id, Uuid::new_v4());
        model.checkout_session_id = Set(Some("cs_789".to_string()));
        let order = model.insert(&*db).await.unwrap();

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_retrieve_session()
            .with(eq("cs_789"))
            .times(1)
            .returning(|_| {
                Ok(CheckoutSession {
                    id: "cs_789".to_string(),
                    url: None,
                    payment_status: "paid".to_string(),
                    payment_intent: Some("pi_789".to_string()),
                    amount_total: Some(1000),
                    metadata: SessionMetadata::default(),
                })
            });
        gateway
            .expect_refund_payment_intent()
            .with(eq("pi_789"))
            .times(1)
            .returning(|_| {
                Ok(RefundOutcome {
                    id: "re_2".to_string(),
                    status: None,
                })
            });

        let updated = service(db, gateway)
            .cancel_by_id(order.id, seller_id)
            .await
            .unwrap();

        assert!(updated.refunded);
    }

    #[tokio::test]
    async fn by_gig_completion_picks_the_most_recent_active_order() {
        let db = setup_test_db().await;
        let seller_id = Uuid::new_v4();
        let gig_id = Uuid::new_v4();

        let mut older = active_order(seller_id, Uuid::new_v4());
        older.gig_id = Set(gig_id);
        older.created_at = Set(Utc::now() - Duration::minutes(10));
        let older = older.insert(&*db).await.unwrap();

        let mut newer = active_order(seller_id, Uuid::new_v4());
        newer.gig_id = Set(gig_id);
        let newer = newer.insert(&*db).await.unwrap();

        let completed = service(db.clone(), MockPaymentGateway::new())
            .complete_for_gig(gig_id, seller_id)
            .await
            .unwrap();
        assert_eq!(completed.id, newer.id);

        let untouched = order::Entity::find_by_id(older.id)
            .one(&*db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(untouched.status, "active");
    }

    #[tokio::test]
    async fn by_gig_entry_points_require_an_active_order() {
        let db = setup_test_db().await;
        let seller_id = Uuid::new_v4();
        let mut model = active_order(seller_id, Uuid::new_v4());
        model.status = Set(OrderStatus::Completed.to_string());
        let order = model.insert(&*db).await.unwrap();

        let result = service(db, MockPaymentGateway::new())
            .cancel_for_gig(order.gig_id, seller_id)
            .await;

        assert_matches!(result, Err(ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn order_reads_are_scoped_to_the_parties() {
        let db = setup_test_db().await;
        let seller_id = Uuid::new_v4();
        let buyer_id = Uuid::new_v4();
        let order = active_order(seller_id, buyer_id)
            .insert(&*db)
            .await
            .unwrap();

        let service = service(db, MockPaymentGateway::new());

        let seen = service.get_for_party(order.id, buyer_id).await.unwrap();
        assert_eq!(seen.id, order.id);

        let stranger = service.get_for_party(order.id, Uuid::new_v4()).await;
        assert_matches!(stranger, Err(ServiceError::Forbidden(_)));

        let missing = service.get_for_party(Uuid::new_v4(), buyer_id).await;
        assert_matches!(missing, Err(ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn listing_covers_both_sides_newest_first() {
        let db = setup_test_db().await;
        let party = Uuid::new_v4();

        let mut as_buyer = active_order(Uuid::new_v4(), party);
        as_buyer.created_at = Set(Utc::now() - Duration::minutes(5));
        let as_buyer = as_buyer.insert(&*db).await.unwrap();

        let as_seller = active_order(party, Uuid::new_v4())
            .insert(&*db)
            .await
            .unwrap();

        // An order the party has no side of.
        active_order(Uuid::new_v4(), Uuid::new_v4())
            .insert(&*db)
            .await
            .unwrap();

        let orders = service(db, MockPaymentGateway::new())
            .list_for_party(party)
            .await
            .unwrap();

        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].id, as_seller.id);
        assert_eq!(orders[1].id, as_buyer.id);
    }
}
