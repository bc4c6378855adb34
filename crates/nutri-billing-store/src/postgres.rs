//! PostgreSQL storage implementation.
//!
//! Balance changes are single conditional statements (`UPDATE ... WHERE ...
//! RETURNING`), so concurrent writers to one account are serialized by the
//! row lock and never observe a stale balance. The `CHECK (credits_remaining
//! >= 0)` constraint backs the same invariant at the schema level.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, info};

use nutri_billing_core::{Account, EventId, Gateway, PlanId, SettlementRecord, UserId};

use crate::error::{Result, StoreError};
use crate::queries;
use crate::{SettleOutcome, Store};

/// PostgreSQL-backed storage implementation.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        info!("Database migrations applied");
        Ok(())
    }

    /// The underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_account(&self, query: &str, user_id: &UserId) -> Result<Option<Account>> {
        sqlx::query_as::<_, AccountRow>(query)
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(Account::try_from)
            .transpose()
    }

    async fn update_account(
        &self,
        query: &str,
        user_id: &UserId,
        value: i64,
    ) -> Result<Account> {
        sqlx::query_as::<_, AccountRow>(query)
            .bind(user_id.as_str())
            .bind(value)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?
            .try_into()
    }
}

fn reject_negative(what: &str, value: i64) -> Result<()> {
    if value < 0 {
        return Err(StoreError::InvalidValue(format!("negative {what}: {value}")));
    }
    Ok(())
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[derive(sqlx::FromRow)]
struct AccountRow {
    user_id: String,
    credits_remaining: i64,
    total_paid: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = StoreError;

    fn try_from(row: AccountRow) -> Result<Self> {
        Ok(Self {
            user_id: UserId::new(row.user_id)
                .map_err(|e| StoreError::Serialization(e.to_string()))?,
            credits_remaining: row.credits_remaining,
            total_paid: row.total_paid,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SettlementRow {
    gateway: String,
    event_id: String,
    user_id: String,
    plan_id: String,
    amount: i64,
    credits_granted: i64,
    processed_at: DateTime<Utc>,
}

impl TryFrom<SettlementRow> for SettlementRecord {
    type Error = StoreError;

    fn try_from(row: SettlementRow) -> Result<Self> {
        let invalid = |e: &dyn std::fmt::Display| StoreError::Serialization(e.to_string());
        Ok(Self {
            gateway: row.gateway.parse::<Gateway>().map_err(|e| invalid(&e))?,
            event_id: EventId::new(row.event_id).map_err(|e| invalid(&e))?,
            user_id: UserId::new(row.user_id).map_err(|e| invalid(&e))?,
            plan_id: PlanId::new(row.plan_id).map_err(|e| invalid(&e))?,
            amount: row.amount,
            credits_granted: row.credits_granted,
            processed_at: row.processed_at,
        })
    }
}

#[async_trait]
impl Store for PgStore {
    // =========================================================================
    // Account Operations
    // =========================================================================

    async fn get_account(&self, user_id: &UserId) -> Result<Option<Account>> {
        self.fetch_account(queries::GET_ACCOUNT, user_id).await
    }

    async fn create_account(&self, user_id: &UserId, initial_credits: i64) -> Result<Account> {
        reject_negative("initial credits", initial_credits)?;
        let row = sqlx::query_as::<_, AccountRow>(queries::INSERT_ACCOUNT)
            .bind(user_id.as_str())
            .bind(initial_credits)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::AlreadyExists,
                other => other.into(),
            })?;
        row.try_into()
    }

    async fn update_credits(&self, user_id: &UserId, new_value: i64) -> Result<Account> {
        reject_negative("credits", new_value)?;
        self.update_account(queries::SET_CREDITS, user_id, new_value)
            .await
    }

    async fn add_paid(&self, user_id: &UserId, delta: i64) -> Result<Account> {
        reject_negative("paid delta", delta)?;
        self.update_account(queries::ADD_PAID, user_id, delta).await
    }

    // =========================================================================
    // Compound Operations
    // =========================================================================

    async fn get_or_create_account(
        &self,
        user_id: &UserId,
        initial_credits: i64,
    ) -> Result<(Account, bool)> {
        reject_negative("initial credits", initial_credits)?;
        let inserted = sqlx::query_as::<_, AccountRow>(queries::INSERT_ACCOUNT_IF_ABSENT)
            .bind(user_id.as_str())
            .bind(initial_credits)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = inserted {
            debug!(user_id = %user_id, initial_credits, "Account created");
            return Ok((row.try_into()?, true));
        }

        // Lost the race or the row already existed: it is committed now.
        let account = self
            .fetch_account(queries::GET_ACCOUNT, user_id)
            .await?
            .ok_or(StoreError::NotFound)?;
        Ok((account, false))
    }

    async fn debit_credits(&self, user_id: &UserId, amount: i64) -> Result<Account> {
        reject_negative("debit", amount)?;
        let debited = sqlx::query_as::<_, AccountRow>(queries::DEBIT_CREDITS)
            .bind(user_id.as_str())
            .bind(amount)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = debited {
            return row.try_into();
        }

        match self.fetch_account(queries::GET_ACCOUNT, user_id).await? {
            Some(account) => Err(StoreError::InsufficientCredits {
                balance: account.credits_remaining,
                required: amount,
            }),
            None => Err(StoreError::NotFound),
        }
    }

    async fn top_up(&self, user_id: &UserId, credits: i64, paid: i64) -> Result<Account> {
        reject_negative("credits", credits)?;
        reject_negative("paid", paid)?;
        sqlx::query_as::<_, AccountRow>(queries::TOP_UP)
            .bind(user_id.as_str())
            .bind(credits)
            .bind(paid)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?
            .try_into()
    }

    async fn settle_payment(
        &self,
        record: &SettlementRecord,
        initial_credits: i64,
    ) -> Result<SettleOutcome> {
        reject_negative("amount", record.amount)?;
        reject_negative("credits", record.credits_granted)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(queries::INSERT_ACCOUNT_IF_ABSENT)
            .bind(record.user_id.as_str())
            .bind(initial_credits)
            .execute(&mut *tx)
            .await?;

        let inserted: Option<(String,)> = sqlx::query_as(queries::INSERT_SETTLEMENT)
            .bind(record.gateway.as_str())
            .bind(record.event_id.as_str())
            .bind(record.user_id.as_str())
            .bind(record.plan_id.as_str())
            .bind(record.amount)
            .bind(record.credits_granted)
            .bind(record.processed_at)
            .fetch_optional(&mut *tx)
            .await?;

        if inserted.is_none() {
            tx.rollback().await?;
            return Ok(SettleOutcome::Duplicate);
        }

        let row = sqlx::query_as::<_, AccountRow>(queries::TOP_UP)
            .bind(record.user_id.as_str())
            .bind(record.credits_granted)
            .bind(record.amount)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(SettleOutcome::Applied(row.try_into()?))
    }

    // =========================================================================
    // Settlement Log
    // =========================================================================

    async fn get_settlement(&self, event_id: &EventId) -> Result<Option<SettlementRecord>> {
        sqlx::query_as::<_, SettlementRow>(queries::GET_SETTLEMENT)
            .bind(event_id.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(SettlementRecord::try_from)
            .transpose()
    }

    async fn list_settlements_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<SettlementRecord>> {
        sqlx::query_as::<_, SettlementRow>(queries::LIST_SETTLEMENTS_BY_USER)
            .bind(user_id.as_str())
            .bind(to_i64(limit))
            .bind(to_i64(offset))
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(SettlementRecord::try_from)
            .collect()
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query(queries::PING).execute(&self.pool).await?;
        Ok(())
    }
}
