pub mod checkout;
pub mod orders;
pub mod payment_webhooks;

use crate::db::DbPool;
use crate::events::{broadcaster::NotificationBroadcaster, EventSender};
use crate::services::{
    checkout::CheckoutService, orders::OrderService, payment_gateway::PaymentGateway,
    reconciliation::ReconciliationService,
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderService>,
    pub checkout: Arc<CheckoutService>,
    pub reconciliation: Arc<ReconciliationService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        gateway: Arc<dyn PaymentGateway>,
        broadcaster: Arc<dyn NotificationBroadcaster>,
        event_sender: Option<Arc<EventSender>>,
        client_base_url: String,
        currency: String,
    ) -> Self {
        let orders = Arc::new(OrderService::new(
            db_pool.clone(),
            gateway.clone(),
            broadcaster,
            event_sender.clone(),
        ));
        let checkout = Arc::new(CheckoutService::new(
            db_pool.clone(),
            gateway.clone(),
            client_base_url,
            currency,
            event_sender.clone(),
        ));
        let reconciliation = Arc::new(ReconciliationService::new(db_pool, gateway, event_sender));

        Self {
            orders,
            checkout,
            reconciliation,
        }
    }
}
