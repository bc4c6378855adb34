//! Common test utilities for ledger integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use tempfile::TempDir;

use nutri_billing_core::{
    EventId, Gateway, PaymentEvent, PaymentStatus, PlanCatalog, PlanId, PriceProfile, UserId,
};
use nutri_billing_ledger::{Ledger, Settlement};
use nutri_billing_store::RocksStore;

/// Ledger and settlement over a fresh `RocksDB` database.
pub struct TestLedger {
    /// The ledger engine.
    pub ledger: Ledger,
    /// The settlement adapter sharing the ledger's store.
    pub settlement: Settlement,
    /// Temporary directory for the database (kept alive for test duration).
    pub _temp_dir: TempDir,
}

impl TestLedger {
    /// Create a ledger with the production-priced built-in catalog.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = RocksStore::open(temp_dir.path()).expect("Failed to open store");

        let ledger = Ledger::new(Arc::new(store));
        let catalog = Arc::new(PlanCatalog::builtin(PriceProfile::Production));
        let settlement = Settlement::new(ledger.clone(), catalog);

        Self {
            ledger,
            settlement,
            _temp_dir: temp_dir,
        }
    }
}

/// Parse a user id.
pub fn user(id: &str) -> UserId {
    UserId::new(id).expect("valid user id")
}

/// A payment event for tests.
pub fn payment(
    event_id: &str,
    user_id: &str,
    plan_id: &str,
    amount: i64,
    status: PaymentStatus,
) -> PaymentEvent {
    PaymentEvent {
        event_id: EventId::new(event_id).expect("valid event id"),
        user_id: user(user_id),
        plan_id: PlanId::new(plan_id).expect("valid plan id"),
        amount,
        gateway: Gateway::Stripe,
        status,
    }
}
