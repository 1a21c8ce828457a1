use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle states for a marketplace order.
///
/// `Delivered` is modeled but no transition currently produces it; it is
/// reserved for a future delivery/acceptance flow.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Active,
    Delivered,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// True once the order has reached a state no transition leaves.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

/// The `orders` table.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    /// Primary key: unique identifier for the order.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Buyer party, fixed at materialization.
    pub buyer_id: Uuid,

    /// Seller party, fixed at materialization.
    pub seller_id: Uuid,

    /// The gig this order was placed against.
    pub gig_id: Uuid,

    /// Price captured when checkout began, never re-read from the gig.
    pub price: Decimal,

    /// Current lifecycle status, stored in its lowercase string form.
    pub status: String,

    /// Provider payment intent backing this order, if paid.
    pub payment_intent_id: Option<String>,

    /// Provider checkout session that materialized this order, if paid.
    /// Unique when present; the reconciliation idempotency key.
    pub checkout_session_id: Option<String>,

    /// Whether the seller has started work.
    pub started: bool,

    pub started_at: Option<DateTime<Utc>>,

    /// Seller-reported progress, 0-100. Meaningful only once `started`.
    pub progress: i32,

    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,

    /// Set when a cancellation refunded the captured payment.
    pub refunded: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::gig::Entity",
        from = "Column::GigId",
        to = "super::gig::Column::Id"
    )]
    Gig,
}

impl Related<super::gig::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Gig.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
