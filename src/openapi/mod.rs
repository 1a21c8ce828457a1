use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "GigMarket API",
        version = "1.0.0",
        description = r#"
# GigMarket Order & Payment API

The order lifecycle and payment-reconciliation service of the GigMarket
marketplace: checkout initiation, payment confirmation, work tracking,
completion, and cancellation with refunds.

## Checkout flow

1. `POST /orders/checkout/{gig_id}` returns a redirect URL. Free gigs create
   the order immediately; paid gigs return the provider's hosted page.
2. After payment the provider delivers a signed webhook to `/orders/webhook`,
   which creates the order exactly once.
3. Clients returning from the hosted page before the webhook lands can call
   `GET /orders/confirm-session?session_id=...` as a fallback; both paths
   converge on the same order.

## Authentication

All endpoints except the webhook require a JWT issued by the identity
service:

```
Authorization: Bearer <your-jwt-token>
```

The webhook is authenticated by its HMAC signature instead.

## Error Handling

Errors use a consistent envelope with appropriate HTTP status codes:

```json
{
  "error": "Bad Request",
  "message": "Progress must be a number between 0 and 100",
  "request_id": "3f2a...",
  "timestamp": "2025-01-01T00:00:00Z"
}
```
        "#,
        contact(
            name = "GigMarket Support",
            email = "support@gigmarket.dev"
        ),
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Orders", description = "Order lifecycle endpoints"),
        (name = "Checkout", description = "Checkout and payment confirmation"),
        (name = "Webhooks", description = "Payment provider callbacks")
    ),
    paths(
        // Checkout
        crate::handlers::checkout::begin_checkout,
        crate::handlers::checkout::confirm_session,

        // Orders
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::start_work,
        crate::handlers::orders::update_progress,
        crate::handlers::orders::complete_order,
        crate::handlers::orders::cancel_order,
        crate::handlers::orders::complete_order_for_gig,
        crate::handlers::orders::cancel_order_for_gig,

        // Webhooks
        crate::handlers::payment_webhooks::payment_webhook,

        // Health and status intentionally omitted from OpenAPI paths
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,

            // Order types
            crate::handlers::orders::OrderResponse,
            crate::handlers::orders::UpdateProgressRequest,

            // Checkout types
            crate::services::checkout::CheckoutRedirect,
            crate::handlers::checkout::ConfirmSessionResponse,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
