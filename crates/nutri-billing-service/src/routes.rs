//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post, put};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{accounts, health, payments, plans, webhooks};
use crate::state::AppState;

/// Maximum concurrent requests for API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `GET /v1/plans` - Plan catalog
///
/// ## Bot (Service API Key auth)
/// - `POST /v1/accounts` - Get or create account
/// - `GET /v1/accounts/:user_id` - Get account
/// - `POST /v1/accounts/:user_id/debit` - Spend one credit
/// - `GET /v1/accounts/:user_id/payments` - Payment history
/// - `POST /v1/payments` - Settle a normalized payment event
/// - `POST /v1/payments/telegram` - Settle a Telegram payment
/// - `POST /v1/payments/telegram/pre-checkout` - Validate a Telegram checkout
///
/// ## Admin (Admin API Key auth)
/// - `POST /v1/accounts/:user_id/grant` - Grant free credits
/// - `PUT /v1/accounts/:user_id/credits` - Overwrite balance
///
/// ## Webhooks
/// - `POST /webhooks/stripe` - Stripe webhooks (signature verification)
/// - `POST /webhooks/yookassa` - YooKassa notifications
pub fn create_router(state: AppState) -> Router {
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let api_routes = Router::new()
        // Plans
        .route("/plans", get(plans::list_plans))
        // Accounts
        .route("/accounts", post(accounts::create_account))
        .route("/accounts/:user_id", get(accounts::get_account))
        .route("/accounts/:user_id/debit", post(accounts::debit))
        .route("/accounts/:user_id/payments", get(accounts::list_payments))
        .route("/accounts/:user_id/grant", post(accounts::grant))
        .route("/accounts/:user_id/credits", put(accounts::set_credits))
        // Payments
        .route("/payments", post(payments::settle_payment))
        .route("/payments/telegram", post(payments::telegram_payment))
        .route(
            "/payments/telegram/pre-checkout",
            post(payments::telegram_pre_checkout),
        )
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        // API v1 routes (rate limited)
        .nest("/v1", api_routes)
        // Webhooks (no rate limit - controlled by external services)
        .route("/webhooks/stripe", post(webhooks::stripe_webhook))
        .route("/webhooks/yookassa", post(webhooks::yookassa_webhook))
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
