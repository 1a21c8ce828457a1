use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::AuthUser, errors::ServiceError, handlers::orders::OrderResponse,
    services::checkout::CheckoutRedirect, AppState,
};

#[derive(Debug, Deserialize)]
pub struct ConfirmSessionQuery {
    pub session_id: String,
}

/// Pull-path confirmation result.
#[derive(Debug, Serialize, ToSchema)]
pub struct ConfirmSessionResponse {
    pub ok: bool,
    /// False when the session had already been materialized (e.g. the
    /// webhook won the race).
    pub created: bool,
    pub order: OrderResponse,
}

/// Begin checkout for a gig
#[utoipa::path(
    post,
    path = "/api/v1/orders/checkout/{gig_id}",
    summary = "Begin checkout",
    description = "Free gigs create an order immediately; paid gigs return the hosted payment page URL",
    params(("gig_id" = Uuid, Path, description = "Gig to purchase")),
    responses(
        (status = 200, description = "Redirect target", body = CheckoutRedirect,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Gig not found", body = crate::errors::ErrorResponse),
        (status = 502, description = "Payment provider failure", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn begin_checkout(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(gig_id): Path<Uuid>,
) -> Result<Json<CheckoutRedirect>, ServiceError> {
    let buyer_id = auth_user.party_id()?;
    let redirect = state
        .services
        .checkout
        .begin_checkout(gig_id, buyer_id)
        .await?;

    Ok(Json(redirect))
}

/// Confirm a checkout session
#[utoipa::path(
    get,
    path = "/api/v1/orders/confirm-session",
    summary = "Confirm checkout session",
    description = "Fallback for clients returning from the hosted page before the webhook lands; materializes the order if the provider reports the session paid",
    params(("session_id" = String, Query, description = "Checkout session id from the success redirect")),
    responses(
        (status = 200, description = "Session confirmed", body = ConfirmSessionResponse),
        (status = 400, description = "Payment not completed or metadata missing", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 502, description = "Payment provider failure", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn confirm_session(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<ConfirmSessionQuery>,
) -> Result<Json<ConfirmSessionResponse>, ServiceError> {
    let caller_id = auth_user.party_id()?;
    let outcome = state
        .services
        .reconciliation
        .confirm_session(&query.session_id, caller_id)
        .await?;

    Ok(Json(ConfirmSessionResponse {
        ok: true,
        created: outcome.created,
        order: outcome.order.into(),
    }))
}
