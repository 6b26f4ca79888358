//! Test helpers for shop-accounting-service HTTP tests.
//!
//! Drives the real router over an in-memory store and token cache.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use jsonwebtoken::Algorithm;
use rust_decimal::Decimal;
use secrecy::Secret;
use serde_json::{json, Value};
use shop_accounting_service::{
    build_router,
    config::JwtConfig,
    services::{InMemoryStore, JwtService, MockTokenStore},
    AppState,
};
use std::sync::{Arc, Once};
use tower::ServiceExt;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,shop_accounting_service=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub const TEST_PASSWORD: &str = "password123";

pub fn test_jwt_config() -> JwtConfig {
    JwtConfig {
        secret_key: Secret::new("shop-accounting-test-secret".to_string()),
        algorithm: Algorithm::HS256,
        access_token_expire_minutes: 30,
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: InMemoryStore,
    pub tokens: Arc<MockTokenStore>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub fn spawn() -> Self {
        init_tracing();

        let store = InMemoryStore::new();
        let tokens = Arc::new(MockTokenStore::new());
        let state = AppState::new(
            Arc::new(store.clone()),
            tokens.clone(),
            JwtService::new(&test_jwt_config()),
        );

        Self {
            router: build_router(state, &["http://localhost:3000".to_string()]),
            store,
            tokens,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: &str) -> TestResponse {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> TestResponse {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    pub async fn register(&self, username: &str) -> TestResponse {
        self.request(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({
                "username": username,
                "email": format!("{}@example.com", username),
                "password": TEST_PASSWORD,
            })),
        )
        .await
    }

    pub async fn login(&self, username: &str, password: &str) -> TestResponse {
        self.request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "username": username, "password": password })),
        )
        .await
    }

    /// Register a fresh user and return a bearer token for it.
    pub async fn authenticated(&self, username: &str) -> String {
        assert_eq!(self.register(username).await.status, StatusCode::CREATED);
        let response = self.login(username, TEST_PASSWORD).await;
        assert_eq!(response.status, StatusCode::OK);
        response.body["access_token"].as_str().unwrap().to_string()
    }

    pub async fn create_shop(&self, token: &str, name: &str, period_type: &str) -> Value {
        let response = self
            .post(
                "/shops",
                token,
                json!({ "name": name, "period_type": period_type }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body
    }

    pub async fn create_title(
        &self,
        token: &str,
        shop_id: i64,
        title_type: &str,
        sub_type: &str,
        name: &str,
        order: i32,
    ) -> Value {
        let response = self
            .post(
                &format!("/shop/{}/account_title", shop_id),
                token,
                json!({
                    "type": title_type,
                    "sub_type": sub_type,
                    "name": name,
                    "order": order,
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body
    }
}

pub fn id_of(value: &Value) -> i64 {
    value["id"].as_i64().unwrap()
}

/// Amounts serialize as decimal strings; accept numbers too.
pub fn amount_of(cell: &Value) -> Option<Decimal> {
    match &cell["amount"] {
        Value::Null => None,
        Value::String(s) => Some(s.parse().unwrap()),
        other => Some(other.to_string().parse().unwrap()),
    }
}
