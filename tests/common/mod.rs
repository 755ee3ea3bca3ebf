#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use storefront_api::{
    api::app_router,
    auth::{hash_password, AuthConfig, AuthService},
    config::AppConfig,
    db::{create_schema, establish_connection},
    entities::user::{self, UserRole},
    events::{process_events, EventSender},
    services::catalog::{CreateProductInput, CreateVariantInput},
    AppState,
};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Full application backed by an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: Arc<AppState>,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "test_secret_key_for_testing_purposes_only_32chars".to_string(),
            3600,
            "127.0.0.1".to_string(),
            0,
            "test".to_string(),
        );
        // A single connection keeps every query on the same in-memory database.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let db = Arc::new(
            establish_connection(&cfg)
                .await
                .expect("failed to open test database"),
        );
        create_schema(&db).await.expect("failed to create schema");

        let (tx, rx) = mpsc::channel(64);
        let event_sender = EventSender::new(tx);
        tokio::spawn(process_events(rx));

        let auth = Arc::new(AuthService::new(AuthConfig::new(
            cfg.jwt_secret.clone(),
            cfg.auth_issuer.clone(),
            cfg.auth_audience.clone(),
            Duration::from_secs(cfg.jwt_expiration),
        )));

        let state = Arc::new(AppState::new(db, cfg, event_sender, auth));
        let router = app_router(state.clone());
        Self { router, state }
    }

    /// Insert a user directly and mint a token for it.
    pub async fn create_user(&self, email: &str, role: UserRole) -> (user::Model, String) {
        let now = Utc::now();
        let model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.to_string()),
            password_hash: Set(hash_password(TEST_PASSWORD).expect("hash password")),
            full_name: Set("Test User".to_string()),
            phone: Set(None),
            role: Set(role),
            profile_image: Set(None),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.state.db)
        .await
        .expect("insert user");

        let token = self.state.auth.issue_token(&model).expect("issue token");
        (model, token)
    }

    /// Create a category, brand, and a single-variant product via the
    /// service layer. Returns (product_id, variant_id).
    pub async fn seed_product(
        &self,
        created_by: Uuid,
        sku: &str,
        price: Decimal,
        stock_quantity: i32,
    ) -> (Uuid, Uuid) {
        let catalog = &self.state.services.catalog;
        let category = catalog
            .create_category(storefront_api::services::catalog::CreateCategoryInput {
                name: format!("Category {}", sku),
                slug: format!("category-{}", sku.to_lowercase()),
                description: None,
            })
            .await
            .expect("create category");
        let brand = catalog
            .create_brand(storefront_api::services::catalog::CreateBrandInput {
                name: format!("Brand {}", sku),
                slug: format!("brand-{}", sku.to_lowercase()),
                logo_path: None,
            })
            .await
            .expect("create brand");

        let detail = catalog
            .create_product(
                created_by,
                CreateProductInput {
                    category_id: category.id,
                    brand_id: brand.id,
                    name: format!("Product {}", sku),
                    slug: format!("product-{}", sku.to_lowercase()),
                    description: None,
                    variants: vec![CreateVariantInput {
                        sku: sku.to_string(),
                        price,
                        stock_quantity,
                        attributes: serde_json::json!({}),
                        position: None,
                    }],
                },
            )
            .await
            .expect("create product");

        let variant_id = detail.variants[0].id;
        (detail.product.id, variant_id)
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router response");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(
        &self,
        uri: &str,
        token: Option<&str>,
        body: Value,
    ) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    /// POST a multipart/form-data body. Each part is (field name, optional
    /// file name, bytes); parts without a file name are sent as text fields.
    pub async fn post_multipart(
        &self,
        uri: &str,
        token: Option<&str>,
        parts: &[(&str, Option<&str>, &[u8])],
    ) -> (StatusCode, Value) {
        const BOUNDARY: &str = "test-boundary-7MA4YWxkTrZu0gW";

        let mut body = Vec::new();
        for (name, file_name, data) in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match file_name {
                Some(file_name) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                ),
            }
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            );
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = builder.body(Body::from(body)).expect("build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router response");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }
}

/// Decimals serialize as JSON strings; numbers sometimes arrive as raw JSON
/// numbers. Normalize both for assertions.
pub fn as_f64(value: &Value) -> f64 {
    match value {
        Value::String(s) => s.parse().expect("numeric string"),
        Value::Number(n) => n.as_f64().expect("finite number"),
        other => panic!("expected a number, got {other:?}"),
    }
}
