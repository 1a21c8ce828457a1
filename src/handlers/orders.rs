use axum::{
    extract::{Path, State},
    response::Json,
    Extension,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::AuthUser, entities::order, errors::ServiceError, ApiResponse, ApiResult, AppState,
};

/// API shape of an order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub gig_id: Uuid,
    pub price: Decimal,
    pub status: String,
    pub payment_intent_id: Option<String>,
    pub checkout_session_id: Option<String>,
    pub started: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub progress: i32,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub refunded: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<order::Model> for OrderResponse {
    fn from(model: order::Model) -> Self {
        Self {
            id: model.id,
            buyer_id: model.buyer_id,
            seller_id: model.seller_id,
            gig_id: model.gig_id,
            price: model.price,
            status: model.status,
            payment_intent_id: model.payment_intent_id,
            checkout_session_id: model.checkout_session_id,
            started: model.started,
            started_at: model.started_at,
            progress: model.progress,
            completed_at: model.completed_at,
            cancelled_at: model.cancelled_at,
            refunded: model.refunded,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProgressRequest {
    /// Accepted as any JSON value so out-of-range and non-numeric input
    /// share one rejection path.
    #[schema(value_type = i32, example = 50)]
    pub progress: Value,
}

fn parse_progress(raw: &Value) -> Result<i32, ServiceError> {
    raw.as_i64()
        .and_then(|value| i32::try_from(value).ok())
        .filter(|value| (0..=100).contains(value))
        .ok_or_else(|| {
            ServiceError::ValidationError("Progress must be a number between 0 and 100".to_string())
        })
}

/// List the caller's orders
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    summary = "List orders",
    description = "All orders where the caller is the buyer or the seller, newest first",
    responses(
        (status = 200, description = "Orders retrieved", body = ApiResponse<Vec<OrderResponse>>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Vec<OrderResponse>> {
    let party_id = auth_user.party_id()?;
    let orders = state.services.orders.list_for_party(party_id).await?;

    Ok(Json(ApiResponse::success(
        orders.into_iter().map(OrderResponse::from).collect(),
    )))
}

/// Get a single order
#[utoipa::path(
    get,
    path = "/api/v1/orders/{order_id}",
    summary = "Get order",
    description = "Fetch one order; only its buyer or seller may read it",
    params(("order_id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order retrieved", body = ApiResponse<OrderResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Caller is not a party to the order", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn get_order(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<OrderResponse> {
    let party_id = auth_user.party_id()?;
    let order = state
        .services
        .orders
        .get_for_party(order_id, party_id)
        .await?;

    Ok(Json(ApiResponse::success(order.into())))
}

/// Mark work started
#[utoipa::path(
    patch,
    path = "/api/v1/orders/start-work/{order_id}",
    summary = "Start work",
    description = "Seller marks work started on an active order",
    params(("order_id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Work started", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Order is not in a startable state", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Caller is not the seller", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn start_work(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<OrderResponse> {
    let seller_id = auth_user.party_id()?;
    let order = state.services.orders.start_work(order_id, seller_id).await?;

    Ok(Json(ApiResponse::success(order.into())))
}

/// Update work progress
#[utoipa::path(
    patch,
    path = "/api/v1/orders/update-progress/{order_id}",
    summary = "Update progress",
    description = "Seller reports progress (0-100) once work has started",
    params(("order_id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateProgressRequest,
    responses(
        (status = 200, description = "Progress updated", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Invalid progress value or work not started", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Caller is not the seller", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn update_progress(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(order_id): Path<Uuid>,
    Json(request): Json<UpdateProgressRequest>,
) -> ApiResult<OrderResponse> {
    let seller_id = auth_user.party_id()?;
    let progress = parse_progress(&request.progress)?;
    let order = state
        .services
        .orders
        .update_progress(order_id, seller_id, progress)
        .await?;

    Ok(Json(ApiResponse::success(order.into())))
}

/// Complete an order
#[utoipa::path(
    patch,
    path = "/api/v1/orders/complete-by-id/{order_id}",
    summary = "Complete order",
    description = "Seller completes an active order",
    params(("order_id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order completed", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Order is not active", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Caller is not the seller", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn complete_order(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<OrderResponse> {
    let seller_id = auth_user.party_id()?;
    let order = state
        .services
        .orders
        .complete_by_id(order_id, seller_id)
        .await?;

    Ok(Json(ApiResponse::success(order.into())))
}

/// Cancel an order, refunding if paid
#[utoipa::path(
    patch,
    path = "/api/v1/orders/cancel-by-id/{order_id}",
    summary = "Cancel order",
    description = "Seller cancels an active order; paid orders are refunded before the transition",
    params(("order_id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order cancelled", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Order is not active", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Caller is not the seller", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 502, description = "Refund failed; order left active", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<OrderResponse> {
    let seller_id = auth_user.party_id()?;
    let order = state
        .services
        .orders
        .cancel_by_id(order_id, seller_id)
        .await?;

    Ok(Json(ApiResponse::success(order.into())))
}

/// Complete the latest active order for a gig
#[utoipa::path(
    patch,
    path = "/api/v1/orders/complete/{gig_id}",
    summary = "Complete order by gig",
    description = "Legacy entry point: completes the seller's most recently created active order for the gig",
    params(("gig_id" = Uuid, Path, description = "Gig ID")),
    responses(
        (status = 200, description = "Order completed", body = ApiResponse<OrderResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "No active order for this gig", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn complete_order_for_gig(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(gig_id): Path<Uuid>,
) -> ApiResult<OrderResponse> {
    let seller_id = auth_user.party_id()?;
    let order = state
        .services
        .orders
        .complete_for_gig(gig_id, seller_id)
        .await?;

    Ok(Json(ApiResponse::success(order.into())))
}

/// Cancel the latest active order for a gig
#[utoipa::path(
    patch,
    path = "/api/v1/orders/cancel/{gig_id}",
    summary = "Cancel order by gig",
    description = "Legacy entry point: cancels the seller's most recently created active order for the gig",
    params(("gig_id" = Uuid, Path, description = "Gig ID")),
    responses(
        (status = 200, description = "Order cancelled", body = ApiResponse<OrderResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "No active order for this gig", body = crate::errors::ErrorResponse),
        (status = 502, description = "Refund failed; order left active", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn cancel_order_for_gig(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(gig_id): Path<Uuid>,
) -> ApiResult<OrderResponse> {
    let seller_id = auth_user.party_id()?;
    let order = state
        .services
        .orders
        .cancel_for_gig(gig_id, seller_id)
        .await?;

    Ok(Json(ApiResponse::success(order.into())))
}
