use std::collections::VecDeque;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};
use tower::ServiceExt;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use checkout_api::{
    auth::AuthService,
    config::AppConfig,
    db,
    entities::{coupon, item},
    events::{self, EventSender},
    gateway::{GatewayCharge, GatewayError, PaymentGateway},
    handlers::AppServices,
    AppState,
};

/// One charge attempt as the gateway double saw it.
#[derive(Debug, Clone)]
pub struct RecordedCharge {
    pub amount_minor_units: i64,
    pub currency: String,
    pub source_token: String,
}

/// Payment gateway double. Succeeds with a generated charge id unless a
/// failure has been scripted, and records every call it receives.
#[derive(Default)]
pub struct RecordingGateway {
    scripted: Mutex<VecDeque<Result<GatewayCharge, GatewayError>>>,
    calls: Mutex<Vec<RecordedCharge>>,
}

impl RecordingGateway {
    /// Script the outcome of the next charge call.
    #[allow(dead_code)]
    pub async fn script(&self, outcome: Result<GatewayCharge, GatewayError>) {
        self.scripted.lock().await.push_back(outcome);
    }

    /// Every charge attempt seen so far, oldest first.
    #[allow(dead_code)]
    pub async fn calls(&self) -> Vec<RecordedCharge> {
        self.calls.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl PaymentGateway for RecordingGateway {
    async fn charge(
        &self,
        amount_minor_units: i64,
        currency: &str,
        source_token: &str,
    ) -> Result<GatewayCharge, GatewayError> {
        self.calls.lock().await.push(RecordedCharge {
            amount_minor_units,
            currency: currency.to_string(),
            source_token: source_token.to_string(),
        });

        match self.scripted.lock().await.pop_front() {
            Some(outcome) => outcome,
            None => Ok(GatewayCharge {
                charge_id: format!("ch_test_{}", Uuid::new_v4().simple()),
            }),
        }
    }
}

/// Helper harness for spinning up an application backed by a throwaway
/// SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub gateway: Arc<RecordingGateway>,
    auth_service: Arc<AuthService>,
    _event_task: tokio::task::JoinHandle<()>,
    _db_dir: tempfile::TempDir,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let db_dir = tempfile::tempdir().expect("create temp dir for test database");
        let db_path = db_dir.path().join("checkout_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ-_".to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.auto_migrate = true;
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

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

        let gateway = Arc::new(RecordingGateway::default());
        let auth_service = Arc::new(AuthService::new(&cfg));

        let services = AppServices::new(
            db_arc.clone(),
            event_sender.clone(),
            gateway.clone(),
            cfg.currency.clone(),
        );

        let state = AppState {
            db: db_arc,
            config: cfg.clone(),
            event_sender,
            services,
            auth: auth_service.clone(),
        };

        let router = checkout_api::create_app(state.clone(), CorsLayer::permissive());

        Self {
            router,
            state,
            gateway,
            auth_service,
            _event_task: event_task,
            _db_dir: db_dir,
        }
    }

    /// Mint a bearer token for the given user id.
    pub fn token_for(&self, user_id: Uuid) -> String {
        self.auth_service
            .generate_token(user_id)
            .expect("mint test token")
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

    /// Insert a catalog item directly; the list/detail endpoints and cart
    /// operations resolve it by slug.
    pub async fn seed_item(
        &self,
        slug: &str,
        title: &str,
        price: Decimal,
        discount_price: Option<Decimal>,
    ) -> item::Model {
        let row = item::ActiveModel {
            id: Set(Uuid::new_v4()),
            slug: Set(slug.to_string()),
            title: Set(title.to_string()),
            description: Set(format!("{} seeded for integration tests", title)),
            price: Set(price),
            discount_price: Set(discount_price),
            category: Set("Apparel".to_string()),
            label: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };
        row.insert(&*self.state.db)
            .await
            .expect("seed catalog item for tests")
    }

    /// Insert a fixed-amount coupon.
    #[allow(dead_code)]
    pub async fn seed_coupon(&self, code: &str, amount: Decimal) -> coupon::Model {
        let row = coupon::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code.to_string()),
            amount: Set(amount),
            created_at: Set(Utc::now()),
        };
        row.insert(&*self.state.db)
            .await
            .expect("seed coupon for tests")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}
