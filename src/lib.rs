//! GigMarket API Library
//!
//! This crate provides the order lifecycle and payment reconciliation
//! service for the GigMarket marketplace
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod middleware_helpers;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{
    extract::State,
    middleware,
    response::Json,
    routing::{get, patch, post},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

pub use handlers::AppServices;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: AppServices,
    pub auth_service: Arc<auth::AuthService>,
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// All `/api/v1` routes.
///
/// Bearer auth is applied as a route layer on everything except the webhook,
/// which authenticates by its HMAC signature over the raw body.
pub fn api_v1_routes(state: AppState) -> Router<AppState> {
    let authenticated = Router::new()
        .route("/orders", get(handlers::orders::list_orders))
        .route("/orders/:order_id", get(handlers::orders::get_order))
        .route(
            "/orders/checkout/:gig_id",
            post(handlers::checkout::begin_checkout),
        )
        .route(
            "/orders/confirm-session",
            get(handlers::checkout::confirm_session),
        )
        .route(
            "/orders/start-work/:order_id",
            patch(handlers::orders::start_work),
        )
        .route(
            "/orders/update-progress/:order_id",
            patch(handlers::orders::update_progress),
        )
        .route(
            "/orders/complete-by-id/:order_id",
            patch(handlers::orders::complete_order),
        )
        .route(
            "/orders/cancel-by-id/:order_id",
            patch(handlers::orders::cancel_order),
        )
        .route(
            "/orders/complete/:gig_id",
            patch(handlers::orders::complete_order_for_gig),
        )
        .route(
            "/orders/cancel/:gig_id",
            patch(handlers::orders::cancel_order_for_gig),
        )
        .route_layer(middleware::from_fn_with_state(state, auth::require_auth));

    Router::new()
        .route("/status", get(api_status))
        .route(
            "/orders/webhook",
            post(handlers::payment_webhooks::payment_webhook),
        )
        .merge(authenticated)
}

async fn api_status() -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let version = env!("CARGO_PKG_VERSION");
    let git = option_env!("GIT_HASH").unwrap_or("unknown");
    let build_time = option_env!("BUILD_TIME").unwrap_or("unknown");
    let status_data = json!({
        "status": "ok",
        "version": version,
        "git": git,
        "build_time": build_time,
        "service": "gigmarket-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    // Check database connectivity
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}
