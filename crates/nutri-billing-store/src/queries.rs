//! SQL queries for the PostgreSQL backend.

/// Find an account by user id.
pub const GET_ACCOUNT: &str = r"
SELECT user_id, credits_remaining, total_paid, created_at, updated_at
FROM accounts
WHERE user_id = $1
";

/// Insert an account; fails on an existing `user_id`.
pub const INSERT_ACCOUNT: &str = r"
INSERT INTO accounts (user_id, credits_remaining, total_paid, created_at, updated_at)
VALUES ($1, $2, 0, NOW(), NOW())
RETURNING user_id, credits_remaining, total_paid, created_at, updated_at
";

/// Insert an account unless one exists. Returns a row only when inserted.
pub const INSERT_ACCOUNT_IF_ABSENT: &str = r"
INSERT INTO accounts (user_id, credits_remaining, total_paid, created_at, updated_at)
VALUES ($1, $2, 0, NOW(), NOW())
ON CONFLICT (user_id) DO NOTHING
RETURNING user_id, credits_remaining, total_paid, created_at, updated_at
";

/// Replace the balance.
pub const SET_CREDITS: &str = r"
UPDATE accounts
SET credits_remaining = $2, updated_at = NOW()
WHERE user_id = $1
RETURNING user_id, credits_remaining, total_paid, created_at, updated_at
";

/// Add to the lifetime paid total.
pub const ADD_PAID: &str = r"
UPDATE accounts
SET total_paid = total_paid + $2, updated_at = NOW()
WHERE user_id = $1
RETURNING user_id, credits_remaining, total_paid, created_at, updated_at
";

/// Conditional decrement. No row when the account is missing or too poor.
pub const DEBIT_CREDITS: &str = r"
UPDATE accounts
SET credits_remaining = credits_remaining - $2, updated_at = NOW()
WHERE user_id = $1 AND credits_remaining >= $2
RETURNING user_id, credits_remaining, total_paid, created_at, updated_at
";

/// Add credits and paid amount together.
pub const TOP_UP: &str = r"
UPDATE accounts
SET credits_remaining = credits_remaining + $2,
    total_paid = total_paid + $3,
    updated_at = NOW()
WHERE user_id = $1
RETURNING user_id, credits_remaining, total_paid, created_at, updated_at
";

/// Record a settlement. Returns a row only when the `event_id` is new.
pub const INSERT_SETTLEMENT: &str = r"
INSERT INTO settlements (gateway, event_id, user_id, plan_id, amount, credits_granted, processed_at)
VALUES ($1, $2, $3, $4, $5, $6, $7)
ON CONFLICT (event_id) DO NOTHING
RETURNING event_id
";

/// Find a settlement.
pub const GET_SETTLEMENT: &str = r"
SELECT gateway, event_id, user_id, plan_id, amount, credits_granted, processed_at
FROM settlements
WHERE event_id = $1
";

/// Page through a user's settlements, newest first.
pub const LIST_SETTLEMENTS_BY_USER: &str = r"
SELECT gateway, event_id, user_id, plan_id, amount, credits_granted, processed_at
FROM settlements
WHERE user_id = $1
ORDER BY processed_at DESC, event_id DESC
LIMIT $2 OFFSET $3
";

/// Connectivity check.
pub const PING: &str = "SELECT 1";
