//! Storage layer for nutri-billing.
//!
//! This crate provides durable storage for accounts and the settlement log.
//! Two backends implement the [`Store`] trait:
//!
//! - [`PgStore`]: PostgreSQL via `sqlx`. Every balance change is a single
//!   conditional `UPDATE ... RETURNING`, so the row lock serializes writers.
//! - [`RocksStore`] (feature `rocksdb-backend`): `RocksDB` `TransactionDB`
//!   with pessimistic per-key locks taken through `get_for_update`.
//!
//! # Architecture
//!
//! `RocksDB` uses the following column families:
//!
//! - `accounts`: Primary account records, keyed by `user_id`
//! - `settlements`: Applied payments, keyed by `event_id`
//! - `settlements_by_user`: Index for listing settlements by user
//!
//! # Example
//!
//! ```no_run
//! use nutri_billing_store::{RocksStore, Store};
//! use nutri_billing_core::UserId;
//!
//! # async fn run() -> nutri_billing_store::Result<()> {
//! let store = RocksStore::open("/tmp/nutri-billing-db")?;
//!
//! let user_id = UserId::new("123456789").unwrap();
//! let (_account, created) = store.get_or_create_account(&user_id, 3).await?;
//! assert!(created);
//! let account = store.debit_credits(&user_id, 1).await?;
//! assert_eq!(account.credits_remaining, 2);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod postgres;
mod queries;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use postgres::PgStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;

use async_trait::async_trait;
use nutri_billing_core::{Account, EventId, SettlementRecord, UserId};

/// Result of recording a settlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettleOutcome {
    /// The settlement was new and the top-up was applied.
    Applied(Account),
    /// A settlement with the same `event_id` already exists.
    Duplicate,
}

/// The storage trait defining all database operations.
///
/// Every method is atomic at single-account granularity: it either takes
/// full effect or none.
#[async_trait]
pub trait Store: Send + Sync {
    // =========================================================================
    // Account Operations
    // =========================================================================

    /// Get an account by user ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_account(&self, user_id: &UserId) -> Result<Option<Account>>;

    /// Insert a new account.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` if the user already has an account.
    async fn create_account(&self, user_id: &UserId, initial_credits: i64) -> Result<Account>;

    /// Replace the credit balance.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the account doesn't exist.
    /// - `StoreError::InvalidValue` if `new_value` is negative.
    async fn update_credits(&self, user_id: &UserId, new_value: i64) -> Result<Account>;

    /// Add to the lifetime paid total.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the account doesn't exist.
    /// - `StoreError::InvalidValue` if `delta` is negative.
    async fn add_paid(&self, user_id: &UserId, delta: i64) -> Result<Account>;

    // =========================================================================
    // Compound Operations
    // =========================================================================

    /// Return the account, creating it with `initial_credits` if absent.
    ///
    /// The flag is `true` for exactly one caller per user, however many race.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_or_create_account(
        &self,
        user_id: &UserId,
        initial_credits: i64,
    ) -> Result<(Account, bool)>;

    /// Subtract `amount` credits if the balance covers it.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the account doesn't exist.
    /// - `StoreError::InsufficientCredits` if the balance is too low.
    async fn debit_credits(&self, user_id: &UserId, amount: i64) -> Result<Account>;

    /// Add credits and paid amount in one step.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the account doesn't exist.
    /// - `StoreError::InvalidValue` for negative inputs.
    async fn top_up(&self, user_id: &UserId, credits: i64, paid: i64) -> Result<Account>;

    /// Record a settlement and apply its top-up atomically.
    ///
    /// Creates the account with `initial_credits` first if it does not exist.
    /// Returns `SettleOutcome::Duplicate` without touching the account if the
    /// `event_id` was recorded before, whichever gateway reported it.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn settle_payment(
        &self,
        record: &SettlementRecord,
        initial_credits: i64,
    ) -> Result<SettleOutcome>;

    // =========================================================================
    // Settlement Log
    // =========================================================================

    /// Get a settlement by event ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_settlement(&self, event_id: &EventId) -> Result<Option<SettlementRecord>>;

    /// List settlements for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_settlements_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<SettlementRecord>>;

    /// Check that the backend is reachable.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    async fn ping(&self) -> Result<()>;
}
