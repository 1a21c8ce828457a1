use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request},
    middleware,
    routing::get,
    Router,
};
use chrono::Utc;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::{json, Value};
use sha2::Sha256;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use gigmarket_api::{
    auth::AuthService,
    config::AppConfig,
    db,
    entities::gig,
    errors::ServiceError,
    events::{self, broadcaster::NoopBroadcaster, EventSender},
    handlers::AppServices,
    services::payment_gateway::{
        CheckoutSession, CreateSessionRequest, PaymentGateway, RefundOutcome,
    },
    AppState,
};

type HmacSha256 = Hmac<Sha256>;

pub const WEBHOOK_SECRET: &str = "whsec_integration_test_secret";

/// In-process payment provider double.
///
/// Checkout sessions are held in memory as the provider would hold them;
/// tests settle a session by hand before replaying the webhook or the
/// confirm-session pull path against it.
pub struct FakeGateway {
    sessions: Mutex<HashMap<String, CheckoutSession>>,
    next_id: AtomicUsize,
    pub refund_calls: AtomicUsize,
    pub session_creates: AtomicUsize,
    pub fail_refunds: AtomicBool,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            next_id: AtomicUsize::new(1),
            refund_calls: AtomicUsize::new(0),
            session_creates: AtomicUsize::new(0),
            fail_refunds: AtomicBool::new(false),
        }
    }

    /// Marks a session paid, as the hosted page would after the buyer pays.
    pub fn settle_session(&self, session_id: &str) -> CheckoutSession {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions
            .get_mut(session_id)
            .expect("settling an unknown session");
        session.payment_status = "paid".to_string();
        session.clone()
    }

    pub fn session(&self, session_id: &str) -> Option<CheckoutSession> {
        self.sessions.lock().unwrap().get(session_id).cloned()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_checkout_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<CheckoutSession, ServiceError> {
        self.session_creates.fetch_add(1, Ordering::SeqCst);
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let id = format!("cs_test_{}", n);
        let session = CheckoutSession {
            id: id.clone(),
            url: Some(format!("https://pay.example/s/{}", id)),
            payment_status: "unpaid".to_string(),
            payment_intent: Some(format!("pi_test_{}", n)),
            amount_total: Some(request.amount_cents),
            metadata: request.metadata,
        };
        self.sessions
            .lock()
            .unwrap()
            .insert(id, session.clone());
        Ok(session)
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, ServiceError> {
        self.session(session_id).ok_or_else(|| {
            ServiceError::ExternalServiceError(format!(
                "Payment provider rejected checkout session lookup (404 Not Found): {}",
                session_id
            ))
        })
    }

    async fn refund_payment_intent(
        &self,
        _payment_intent_id: &str,
    ) -> Result<RefundOutcome, ServiceError> {
        if self.fail_refunds.load(Ordering::SeqCst) {
            return Err(ServiceError::ExternalServiceError(
                "Payment provider rejected refund creation (402 Payment Required)".to_string(),
            ));
        }
        let n = self.refund_calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(RefundOutcome {
            id: format!("re_test_{}", n),
            status: Some("succeeded".to_string()),
        })
    }
}

/// Harness spinning up the real router over a throwaway SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub gateway: Arc<FakeGateway>,
    auth_service: Arc<AuthService>,
    _event_task: tokio::task::JoinHandle<()>,
    _db_file: tempfile::NamedTempFile,
}

impl TestApp {
    pub async fn new() -> Self {
        let db_file = tempfile::NamedTempFile::new().expect("create temp database file");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_file.path().display()),
            "integration_test_jwt_secret_with_enough_length_and_d1vers1ty_qz8x4m7k2p".to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.auto_migrate = true;
        cfg.payment.webhook_secret = Some(WEBHOOK_SECRET.to_string());

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx));

        let auth_service = Arc::new(AuthService::new(cfg.jwt_secret.clone(), cfg.jwt_expiration));

        let gateway = Arc::new(FakeGateway::new());
        let services = AppServices::new(
            db_arc.clone(),
            gateway.clone(),
            Arc::new(NoopBroadcaster),
            Some(event_sender),
            cfg.client_base_url().to_string(),
            cfg.payment.currency.clone(),
        );

        let state = AppState {
            db: db_arc,
            config: cfg,
            services,
            auth_service: auth_service.clone(),
        };

        let router = Router::new()
            .route("/health", get(gigmarket_api::health_check))
            .nest("/api/v1", gigmarket_api::api_v1_routes(state.clone()))
            .layer(middleware::from_fn(
                gigmarket_api::middleware_helpers::request_id::request_id_middleware,
            ))
            .with_state(state.clone());

        Self {
            router,
            state,
            gateway,
            auth_service,
            _event_task: event_task,
            _db_file: db_file,
        }
    }

    /// Bearer token for the given party, signed with the app's secret.
    pub fn token_for(&self, user_id: Uuid) -> String {
        self.auth_service
            .generate_token(user_id, &["user".to_string()])
            .expect("issue test token")
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Convenience helper for requests authenticated as the given party.
    pub async fn request_as(
        &self,
        user_id: Uuid,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        let token = self.token_for(user_id);
        self.request(method, uri, body, Some(&token)).await
    }

    /// Deliver a provider event to the webhook route, signed with the shared
    /// secret unless another one is given.
    pub async fn deliver_webhook(
        &self,
        payload: &Value,
        secret_override: Option<&str>,
    ) -> axum::response::Response {
        let body = serde_json::to_vec(payload).expect("serialize webhook payload");
        let timestamp = Utc::now().timestamp();
        let secret = secret_override.unwrap_or(WEBHOOK_SECRET);
        let signature = sign_webhook(secret, timestamp, &body);

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/orders/webhook")
            .header("content-type", "application/json")
            .header("Stripe-Signature", format!("t={},v1={}", timestamp, signature))
            .body(Body::from(body))
            .expect("failed to build webhook request");

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during webhook delivery")
    }

    pub async fn seed_gig(&self, seller_id: Uuid, price: Option<Decimal>) -> gig::Model {
        let now = Utc::now();
        gig::ActiveModel {
            id: Set(Uuid::new_v4()),
            seller_id: Set(seller_id),
            title: Set("Logo design sprint".to_string()),
            description: Set(Some("Seeded for integration tests".to_string())),
            price: Set(price),
            category: Set(Some("design".to_string())),
            delivery_days: Set(Some(2)),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed gig")
    }

    /// A clone of the router for concurrency tests that need to fire many
    /// requests at once.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub fn sign_webhook(secret: &str, timestamp: i64, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC key");
    mac.update(format!("{}.", timestamp).as_bytes());
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Provider event payload for a settled checkout session.
pub fn completed_session_event(session: &CheckoutSession) -> Value {
    json!({
        "id": format!("evt_{}", Uuid::new_v4().simple()),
        "type": "checkout.session.completed",
        "data": { "object": session }
    })
}

pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("response body should be JSON")
}
