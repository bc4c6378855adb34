//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage. The
//! PostgreSQL schema lives in `migrations/`.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Primary account records, keyed by `user_id`.
    pub const ACCOUNTS: &str = "accounts";

    /// Settlement log, keyed by `event_id`.
    pub const SETTLEMENTS: &str = "settlements";

    /// Index: settlements by user, keyed by `user_id || 0x00 || processed_at || settlement key`.
    /// Value is the settlement key.
    pub const SETTLEMENTS_BY_USER: &str = "settlements_by_user";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![cf::ACCOUNTS, cf::SETTLEMENTS, cf::SETTLEMENTS_BY_USER]
}
