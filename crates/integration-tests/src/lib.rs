//! Integration tests for Bazaar.
//!
//! Tests drive the full router (middleware, extractors, error rendering)
//! in-process with `tower::ServiceExt::oneshot`, backed by the in-memory
//! store, so they need neither a database nor a listening socket.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bazaar-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `catalog` - Product insert, lookup, filters
//! - `accounts` - Signup, signin, profile, auth gate
//! - `shopping` - Cart, favorites, checkout, cancellation

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

use bazaar_api::config::{ApiConfig, LogFormat, StoreBackend};
use bazaar_api::db::{MemoryStore, RetryPolicy};
use bazaar_api::state::AppState;

/// Signing secret used by every test app.
pub const TEST_JWT_SECRET: &str = "t9#Lq2!vX7@mR4$wK8^pZ1&nB6*cF3dH";

/// Configuration for an in-memory test app.
#[must_use]
pub fn test_config() -> ApiConfig {
    ApiConfig {
        store: StoreBackend::Memory,
        host: std::net::IpAddr::from([127, 0, 0, 1]),
        port: 0,
        jwt_secret: SecretString::from(TEST_JWT_SECRET.to_owned()),
        token_ttl: chrono::Duration::hours(1),
        store_timeout: Duration::from_secs(5),
        retry: RetryPolicy::none(),
        max_body_bytes: 1024 * 1024,
        cors_origins: None,
        log_format: LogFormat::Pretty,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// Response captured by [`TestApp::send`].
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Parsed JSON body, `Value::String` for non-JSON bodies and
    /// `Value::Null` for empty ones.
    pub body: Value,
}

/// The application router over a fresh in-memory store.
///
/// Clones share the router and the store.
#[derive(Clone)]
pub struct TestApp {
    router: Router,
    pub store: Arc<MemoryStore>,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(test_config(), store.clone());
        Self {
            router: bazaar_api::app(state),
            store,
        }
    }

    /// Send one request through the router, with a JSON body when given.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        match body {
            Some(json) => {
                self.send_raw(method, uri, token, Some("application/json"), json.to_string())
                    .await
            }
            None => self.send_raw(method, uri, token, None, String::new()).await,
        }
    }

    /// Send a request with an arbitrary body and content type.
    pub async fn send_raw(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        content_type: Option<&str>,
        body: String,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        let request = builder.body(Body::from(body)).unwrap();

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

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.send(Method::PATCH, uri, token, Some(body)).await
    }

    /// Insert products through the API and return them in input order.
    pub async fn add_products(&self, products: Value) -> Vec<Value> {
        let response = self.post("/api/products/add", None, products).await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body["createdProducts"].as_array().unwrap().clone()
    }

    /// Sign up and return the bearer token and user id.
    pub async fn signup(&self, name: &str, email: &str) -> (String, String) {
        let response = self
            .post(
                "/api/user/signup",
                None,
                serde_json::json!({ "name": name, "email": email, "password": "password123" }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        (
            response.body["token"].as_str().unwrap().to_owned(),
            response.body["user"]["id"].as_str().unwrap().to_owned(),
        )
    }
}

/// A product payload for `POST /api/products/add`.
#[must_use]
pub fn product(title: &str, category: &str, price: u32, sizes: &[&str]) -> Value {
    serde_json::json!({
        "title": title,
        "description": format!("{title} description"),
        "price": { "org": price, "mrp": price, "off": 0 },
        "sizes": sizes,
        "category": category,
        "stock": 5,
    })
}

/// Id of a product or order JSON object.
#[must_use]
pub fn id_of(value: &Value) -> String {
    value["id"].as_str().unwrap().to_owned()
}
