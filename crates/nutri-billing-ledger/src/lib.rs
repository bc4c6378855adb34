//! Ledger engine and payment settlement for nutri-billing.
//!
//! - [`Ledger`]: get-or-create, debit, top-up, grant and balance correction.
//!   The only code that changes a balance.
//! - [`Settlement`]: applies gateway payment events through
//!   [`Ledger::settle_topup`], at most once per `event_id`.
//!
//! Both are thin over [`nutri_billing_store::Store`]: correctness under
//! concurrency comes from the store's atomic operations, not from locks held
//! here.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod ledger;
pub mod settlement;

pub use ledger::Ledger;
pub use settlement::Settlement;
