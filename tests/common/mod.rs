//! Helper harness for spinning up an application backed by a throwaway
//! SQLite database, plus seeding helpers for identity and catalog rows.
#![allow(dead_code)]

use axum::{body::Body, http::Request, response::Response, Router};
use chrono::Utc;
use duka_api::{
    auth::{issue_token, Claims, Role},
    config::AppConfig,
    db::{self, DbConfig, DbPool},
    entities::{product, stock_threshold, store, supplier, user},
    events::{process_events, EventSender},
    handlers::AppServices,
    AppState,
};
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower::ServiceExt;

const TEST_JWT_SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";

pub struct TestApp {
    pub db: Arc<DbPool>,
    pub config: AppConfig,
    pub state: AppState,
    pub router: Router,
    db_file: std::path::PathBuf,
}

impl TestApp {
    /// Creates a fresh database file, runs migrations and wires the full
    /// router the way `main` does.
    pub async fn spawn() -> Self {
        let db_file =
            std::env::temp_dir().join(format!("duka_test_{}.db", uuid::Uuid::new_v4().simple()));
        let _ = std::fs::remove_file(&db_file);

        let mut config = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_file.display()),
            TEST_JWT_SECRET.to_string(),
            3600,
            "127.0.0.1".to_string(),
            0,
            "test".to_string(),
        );
        config.db_max_connections = 1;
        config.db_min_connections = 1;

        let db_config = DbConfig {
            url: config.database_url.clone(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let pool = db::establish_connection_with_config(&db_config)
            .await
            .expect("failed to connect to test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations");
        let db = Arc::new(pool);

        let (tx, rx) = mpsc::channel(256);
        let event_sender = EventSender::new(tx);
        tokio::spawn(process_events(rx));

        let services = AppServices::new(db.clone(), &config, event_sender.clone());
        let state = AppState {
            db: db.clone(),
            config: config.clone(),
            event_sender,
            services,
        };
        let router = duka_api::app_router(state.clone());

        Self {
            db,
            config,
            state,
            router,
            db_file,
        }
    }

    /// Mints a bearer token for a previously seeded user.
    pub fn token_for(&self, user: &user::Model) -> String {
        let role = Role::from_str(&user.role).expect("seeded user has a valid role");
        let merchant_id = match role {
            Role::Superuser => Some(user.id),
            _ => None,
        };
        let claims = Claims::new(user.id, role, user.store_id, merchant_id, 3600);
        issue_token(&claims, &self.config.jwt_secret).expect("failed to issue test token")
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(json.to_string()))
                .expect("failed to build request"),
            None => builder.body(Body::empty()).expect("failed to build request"),
        };
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("request failed")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_file);
    }
}

/// Reads a response body as JSON.
pub async fn body_json(response: Response) -> Value {
    let bytes = http_body_util::BodyExt::collect(response.into_body())
        .await
        .expect("failed to read response body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("response body is not valid JSON")
}

fn unique_email(prefix: &str) -> String {
    format!("{}_{}@example.com", prefix, uuid::Uuid::new_v4().simple())
}

pub async fn seed_user(
    db: &DbPool,
    name: &str,
    role: &str,
    store_id: Option<i64>,
    is_active: bool,
) -> user::Model {
    let now = Utc::now();
    user::ActiveModel {
        name: Set(name.to_string()),
        email: Set(unique_email(role)),
        password_hash: Set("not-a-real-hash".to_string()),
        role: Set(role.to_string()),
        store_id: Set(store_id),
        is_active: Set(is_active),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("failed to seed user")
}

pub async fn seed_store(db: &DbPool, name: &str, merchant_id: i64) -> store::Model {
    let now = Utc::now();
    store::ActiveModel {
        name: Set(name.to_string()),
        location: Set(Some("Nairobi".to_string())),
        merchant_id: Set(merchant_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("failed to seed store")
}

/// Seeds a product, with an optional product-wide threshold row.
pub async fn seed_product(
    db: &DbPool,
    name: &str,
    default_threshold: Option<i32>,
) -> product::Model {
    let now = Utc::now();
    let product = product::ActiveModel {
        name: Set(name.to_string()),
        sku: Set(format!("SKU-{}", uuid::Uuid::new_v4().simple())),
        category: Set(Some("groceries".to_string())),
        unit: Set(Some("piece".to_string())),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("failed to seed product");

    if let Some(minimum) = default_threshold {
        stock_threshold::ActiveModel {
            product_id: Set(product.id),
            store_id: Set(None),
            minimum_quantity: Set(minimum),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("failed to seed product threshold");
    }
    product
}

pub async fn seed_supplier(db: &DbPool, name: &str) -> supplier::Model {
    let now = Utc::now();
    supplier::ActiveModel {
        name: Set(name.to_string()),
        contact_email: Set(Some(unique_email("supplier"))),
        phone: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("failed to seed supplier")
}

/// The usual cast: a merchant, their store, an admin and a clerk in it,
/// and one product with no product-level threshold.
pub struct Scenario {
    pub merchant: user::Model,
    pub store: store::Model,
    pub admin: user::Model,
    pub clerk: user::Model,
    pub product: product::Model,
}

pub async fn seed_scenario(db: &DbPool) -> Scenario {
    let merchant = seed_user(db, "Wanjiku", "superuser", None, true).await;
    let store = seed_store(db, "Duka Moja", merchant.id).await;
    let admin = seed_user(db, "Atieno", "admin", Some(store.id), true).await;
    let clerk = seed_user(db, "Kamau", "clerk", Some(store.id), true).await;
    let product = seed_product(db, "Maize Flour 2kg", None).await;
    Scenario {
        merchant,
        store,
        admin,
        clerk,
        product,
    }
}
