//! Key encoding utilities for `RocksDB`.
//!
//! Identifiers never contain control characters, so `0x00` is a safe
//! separator between a user id and the rest of an index key.

use chrono::{DateTime, Utc};
use nutri_billing_core::{EventId, UserId};

const SEPARATOR: u8 = 0x00;

/// Create an account key from a user ID.
#[must_use]
pub fn account_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Create a settlement key from an event ID.
///
/// An event ID is applied at most once whichever gateway reports it.
#[must_use]
pub fn settlement_key(event_id: &EventId) -> Vec<u8> {
    event_id.as_bytes().to_vec()
}

/// Create a user-settlement index key.
///
/// Format: `user_id || 0x00 || processed_at millis (8 bytes BE) || settlement key`
///
/// Keys for one user sort by processing time.
#[must_use]
pub fn user_settlement_key(
    user_id: &UserId,
    processed_at: DateTime<Utc>,
    event_id: &EventId,
) -> Vec<u8> {
    let millis = u64::try_from(processed_at.timestamp_millis()).unwrap_or(0);
    let mut key = user_settlements_prefix(user_id);
    key.extend_from_slice(&millis.to_be_bytes());
    key.extend_from_slice(&settlement_key(event_id));
    key
}

/// Create a prefix for iterating all settlements for a user.
#[must_use]
pub fn user_settlements_prefix(user_id: &UserId) -> Vec<u8> {
    let mut key = Vec::with_capacity(user_id.as_bytes().len() + 1);
    key.extend_from_slice(user_id.as_bytes());
    key.push(SEPARATOR);
    key
}

/// First key past every settlement index entry of a user.
#[must_use]
pub fn user_settlements_upper_bound(user_id: &UserId) -> Vec<u8> {
    let mut key = Vec::with_capacity(user_id.as_bytes().len() + 1);
    key.extend_from_slice(user_id.as_bytes());
    key.push(SEPARATOR + 1);
    key
}
