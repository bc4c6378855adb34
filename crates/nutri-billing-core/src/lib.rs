//! Core types for nutri-billing.
//!
//! This crate provides the foundational types shared by the ledger, the
//! storage backends and the HTTP service:
//!
//! - **Identifiers**: `UserId`, `PlanId`, `EventId`
//! - **Accounts**: `Account` and its balance rules
//! - **Plans**: `Plan`, `PlanCatalog`, `PriceProfile`
//! - **Payments**: `PaymentEvent`, `SettlementRecord`, `SettlementResult`
//! - **Errors**: `LedgerError`
//!
//! # Units
//!
//! Credits are whole analyses (one photo analysis costs one credit). Money is
//! always an `i64` in minor currency units (kopecks for RUB, cents for USD).

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod error;
pub mod ids;
pub mod payment;
pub mod plan;

pub use account::{Account, BalanceError, STARTING_CREDITS};
pub use error::{LedgerError, Result};
pub use ids::{EventId, IdError, PlanId, UserId, MAX_ID_LEN};
pub use payment::{
    Gateway, PaymentEvent, PaymentStatus, SettlementRecord, SettlementResult, UnknownGateway,
};
pub use plan::{
    BillingInterval, Plan, PlanCatalog, PlanError, PriceProfile, BASIC_PLAN_CREDITS,
    DEFAULT_CURRENCY, PRO_PLAN_CREDITS,
};
