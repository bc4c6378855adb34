//! Common test utilities for nutri-billing integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use axum_test::{TestRequest, TestServer};
use tempfile::TempDir;

use nutri_billing_core::{PlanCatalog, PriceProfile};
use nutri_billing_service::{create_router, AppState, ServiceConfig};
use nutri_billing_store::RocksStore;

/// Service API key configured for every harness.
pub const SERVICE_API_KEY: &str = "test-service-key";

/// Admin API key configured for every harness.
pub const ADMIN_API_KEY: &str = "test-admin-key";

/// Stripe secret used by signed-webhook harnesses.
pub const STRIPE_SECRET: &str = "whsec_test_secret";

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Temporary directory for the database (kept alive for test duration).
    pub _temp_dir: TempDir,
}

impl TestHarness {
    /// Create a new test harness with a fresh database and production prices.
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Create a harness after adjusting the default test configuration.
    pub fn with_config(adjust: impl FnOnce(&mut ServiceConfig)) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = RocksStore::open(temp_dir.path()).expect("Failed to open store");

        let mut config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir: temp_dir.path().to_string_lossy().to_string(),
            service_api_key: Some(SERVICE_API_KEY.into()),
            admin_api_key: Some(ADMIN_API_KEY.into()),
            ..ServiceConfig::default()
        };
        adjust(&mut config);

        let catalog = PlanCatalog::builtin(PriceProfile::Production);
        let state = AppState::new(Arc::new(store), catalog, config);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            _temp_dir: temp_dir,
        }
    }
}

impl TestHarness {
    /// GET as the bot.
    pub fn bot_get(&self, path: &str) -> TestRequest {
        let (name, value) = service_key();
        self.server.get(path).add_header(name, value)
    }

    /// POST as the bot.
    pub fn bot_post(&self, path: &str) -> TestRequest {
        let (name, value) = service_key();
        self.server.post(path).add_header(name, value)
    }

    /// POST as an operator.
    pub fn admin_post(&self, path: &str) -> TestRequest {
        let (name, value) = admin_key();
        self.server.post(path).add_header(name, value)
    }

    /// PUT as an operator.
    pub fn admin_put(&self, path: &str) -> TestRequest {
        let (name, value) = admin_key();
        self.server.put(path).add_header(name, value)
    }

    /// Register `user_id` through the API.
    pub async fn register(&self, user_id: &str) -> serde_json::Value {
        let response = self
            .bot_post("/v1/accounts")
            .json(&serde_json::json!({ "user_id": user_id }))
            .await;
        response.assert_status_ok();
        response.json()
    }

    /// Fetch an account through the API.
    pub async fn account(&self, user_id: &str) -> serde_json::Value {
        let response = self.bot_get(&format!("/v1/accounts/{user_id}")).await;
        response.assert_status_ok();
        response.json()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// `x-api-key` header for the bot.
pub fn service_key() -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-api-key"),
        HeaderValue::from_static(SERVICE_API_KEY),
    )
}

/// `x-admin-key` header for operators.
pub fn admin_key() -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-admin-key"),
        HeaderValue::from_static(ADMIN_API_KEY),
    )
}

/// Arbitrary header.
pub fn header(name: &'static str, value: &str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static(name),
        HeaderValue::from_str(value).expect("valid header value"),
    )
}
