//! Nutri-Billing Client SDK.
//!
//! This crate provides a client library for the Telegram bot and internal jobs
//! to talk to the nutri-billing API.
//!
//! # Example
//!
//! ```no_run
//! use nutri_billing_client::{ClientError, NutriBillingClient};
//!
//! # async fn example() -> Result<(), ClientError> {
//! let client = NutriBillingClient::new("http://nutri-billing:8080", "your-service-api-key")?;
//!
//! let registered = client.get_or_create_account("123456789").await?;
//! println!("{} credits left", registered.account.credits_remaining);
//!
//! match client.debit_one("123456789").await {
//!     Ok(account) => println!("Analysis allowed, {} left", account.credits_remaining),
//!     Err(ClientError::InsufficientCredits { .. }) => println!("Offer a plan"),
//!     Err(e) => return Err(e),
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod error;
mod types;

pub use client::{ClientOptions, NutriBillingClient};
pub use error::ClientError;
pub use types::*;
