//! Nutri-Billing HTTP API Service.
//!
//! This crate provides the HTTP API in front of the credit ledger:
//!
//! - Account get-or-create, balance reads and per-analysis debits
//! - Payment settlement for Telegram Payments and internal producers
//! - Stripe and YooKassa webhooks
//! - Operator grants and balance corrections
//!
//! # Authentication
//!
//! 1. **Service API key** (`x-api-key`) - the Telegram bot and internal jobs
//! 2. **Admin API key** (`x-admin-key`) - operator endpoints
//!
//! Webhooks authenticate by signature (Stripe) or by re-fetching the payment
//! from the gateway (YooKassa).

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers must be async for axum

pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod stripe;
pub mod telegram;
pub mod yookassa;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
pub use stripe::StripeError;
pub use telegram::TelegramError;
pub use yookassa::{YookassaClient, YookassaError};
