//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.
//! Writes run inside pessimistic `TransactionDB` transactions: every key that
//! is read before being written is locked with `get_for_update`, so two
//! writers on one account are serialized by `RocksDB` itself. Settlement
//! locks the settlement key before the account key.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, Direction, IteratorMode, MultiThreaded, Options,
    Transaction, TransactionDB, TransactionDBOptions,
};
use tracing::debug;

use nutri_billing_core::{Account, EventId, SettlementRecord, UserId};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::{SettleOutcome, Store};

/// How long a transaction waits for a contended key lock, in milliseconds.
const LOCK_TIMEOUT_MS: i64 = 10_000;

type Db = TransactionDB<MultiThreaded>;
type Txn<'a> = Transaction<'a, Db>;

/// RocksDB-backed storage implementation.
#[derive(Clone)]
pub struct RocksStore {
    db: Arc<Db>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let mut txn_opts = TransactionDBOptions::default();
        txn_opts.set_txn_lock_timeout(LOCK_TIMEOUT_MS);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = Db::open_cf_descriptors(&opts, &txn_opts, path, cf_descriptors)
            .map_err(db_err)?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Run a blocking closure on the tokio blocking pool.
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&RocksStore) -> Result<T> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| StoreError::Database(format!("blocking task failed: {e}")))?
    }

    /// Read and lock an account inside a transaction.
    fn account_for_update(
        txn: &Txn<'_>,
        accounts: &Arc<BoundColumnFamily<'_>>,
        key: &[u8],
    ) -> Result<Option<Account>> {
        txn.get_for_update_cf(accounts, key, true)
            .map_err(db_err)?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn put_account(
        txn: &Txn<'_>,
        accounts: &Arc<BoundColumnFamily<'_>>,
        account: &Account,
    ) -> Result<()> {
        let key = keys::account_key(&account.user_id);
        txn.put_cf(accounts, key, Self::serialize(account)?)
            .map_err(db_err)
    }

    // =========================================================================
    // Blocking operations
    // =========================================================================

    fn read_account(&self, user_id: &UserId) -> Result<Option<Account>> {
        let cf = self.cf(cf::ACCOUNTS)?;
        self.db
            .get_cf(&cf, keys::account_key(user_id))
            .map_err(db_err)?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn insert_account(&self, user_id: &UserId, initial_credits: i64) -> Result<Account> {
        let (account, created) = self.upsert_account(user_id, initial_credits)?;
        if created {
            Ok(account)
        } else {
            Err(StoreError::AlreadyExists)
        }
    }

    fn upsert_account(&self, user_id: &UserId, initial_credits: i64) -> Result<(Account, bool)> {
        if initial_credits < 0 {
            return Err(StoreError::InvalidValue(format!(
                "negative initial credits: {initial_credits}"
            )));
        }
        let accounts = self.cf(cf::ACCOUNTS)?;
        let key = keys::account_key(user_id);

        let txn = self.db.transaction();
        if let Some(existing) = Self::account_for_update(&txn, &accounts, &key)? {
            return Ok((existing, false));
        }

        let account = Account::new(user_id.clone(), initial_credits);
        Self::put_account(&txn, &accounts, &account)?;
        txn.commit().map_err(db_err)?;

        debug!(user_id = %user_id, initial_credits, "Account created");
        Ok((account, true))
    }

    /// Lock an existing account, apply `f`, and write it back.
    fn mutate_account<F>(&self, user_id: &UserId, f: F) -> Result<Account>
    where
        F: FnOnce(&mut Account) -> Result<()>,
    {
        let accounts = self.cf(cf::ACCOUNTS)?;
        let key = keys::account_key(user_id);

        let txn = self.db.transaction();
        let mut account =
            Self::account_for_update(&txn, &accounts, &key)?.ok_or(StoreError::NotFound)?;
        f(&mut account)?;
        Self::put_account(&txn, &accounts, &account)?;
        txn.commit().map_err(db_err)?;

        Ok(account)
    }

    fn apply_settlement(
        &self,
        record: &SettlementRecord,
        initial_credits: i64,
    ) -> Result<SettleOutcome> {
        let accounts = self.cf(cf::ACCOUNTS)?;
        let settlements = self.cf(cf::SETTLEMENTS)?;
        let by_user = self.cf(cf::SETTLEMENTS_BY_USER)?;

        let settlement_key = keys::settlement_key(&record.event_id);
        let account_key = keys::account_key(&record.user_id);

        let txn = self.db.transaction();

        let seen = txn
            .get_for_update_cf(&settlements, &settlement_key, true)
            .map_err(db_err)?;
        if seen.is_some() {
            return Ok(SettleOutcome::Duplicate);
        }

        let mut account = Self::account_for_update(&txn, &accounts, &account_key)?
            .unwrap_or_else(|| Account::new(record.user_id.clone(), initial_credits));
        account.top_up(record.credits_granted, record.amount)?;

        let index_key = keys::user_settlement_key(
            &record.user_id,
            record.processed_at,
            &record.event_id,
        );

        txn.put_cf(&settlements, &settlement_key, Self::serialize(record)?)
            .map_err(db_err)?;
        txn.put_cf(&by_user, &index_key, &settlement_key)
            .map_err(db_err)?;
        Self::put_account(&txn, &accounts, &account)?;
        txn.commit().map_err(db_err)?;

        Ok(SettleOutcome::Applied(account))
    }

    fn read_settlement(&self, key: &[u8]) -> Result<Option<SettlementRecord>> {
        let cf = self.cf(cf::SETTLEMENTS)?;
        self.db
            .get_cf(&cf, key)
            .map_err(db_err)?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn read_settlements_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<SettlementRecord>> {
        let by_user = self.cf(cf::SETTLEMENTS_BY_USER)?;
        let prefix = keys::user_settlements_prefix(user_id);
        let upper = keys::user_settlements_upper_bound(user_id);

        // Walk backwards from the end of the user's range: newest first.
        let iter = self
            .db
            .iterator_cf(&by_user, IteratorMode::From(&upper, Direction::Reverse));

        let mut settlements = Vec::new();
        for item in iter {
            let (key, settlement_key) = item.map_err(db_err)?;
            if !key.starts_with(&prefix) {
                break;
            }
            if settlements.len() >= offset.saturating_add(limit) {
                break;
            }
            if let Some(record) = self.read_settlement(&settlement_key)? {
                settlements.push(record);
            }
        }

        Ok(settlements.into_iter().skip(offset).collect())
    }
}

fn db_err(e: rocksdb::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

#[async_trait]
impl Store for RocksStore {
    // =========================================================================
    // Account Operations
    // =========================================================================

    async fn get_account(&self, user_id: &UserId) -> Result<Option<Account>> {
        let user_id = user_id.clone();
        self.blocking(move |store| store.read_account(&user_id))
            .await
    }

    async fn create_account(&self, user_id: &UserId, initial_credits: i64) -> Result<Account> {
        let user_id = user_id.clone();
        self.blocking(move |store| store.insert_account(&user_id, initial_credits))
            .await
    }

    async fn update_credits(&self, user_id: &UserId, new_value: i64) -> Result<Account> {
        let user_id = user_id.clone();
        self.blocking(move |store| {
            store.mutate_account(&user_id, |account| Ok(account.set_credits(new_value)?))
        })
        .await
    }

    async fn add_paid(&self, user_id: &UserId, delta: i64) -> Result<Account> {
        let user_id = user_id.clone();
        self.blocking(move |store| {
            store.mutate_account(&user_id, |account| Ok(account.top_up(0, delta)?))
        })
        .await
    }

    // =========================================================================
    // Compound Operations
    // =========================================================================

    async fn get_or_create_account(
        &self,
        user_id: &UserId,
        initial_credits: i64,
    ) -> Result<(Account, bool)> {
        let user_id = user_id.clone();
        self.blocking(move |store| store.upsert_account(&user_id, initial_credits))
            .await
    }

    async fn debit_credits(&self, user_id: &UserId, amount: i64) -> Result<Account> {
        let user_id = user_id.clone();
        self.blocking(move |store| {
            store.mutate_account(&user_id, |account| Ok(account.debit(amount)?))
        })
        .await
    }

    async fn top_up(&self, user_id: &UserId, credits: i64, paid: i64) -> Result<Account> {
        let user_id = user_id.clone();
        self.blocking(move |store| {
            store.mutate_account(&user_id, |account| Ok(account.top_up(credits, paid)?))
        })
        .await
    }

    async fn settle_payment(
        &self,
        record: &SettlementRecord,
        initial_credits: i64,
    ) -> Result<SettleOutcome> {
        let record = record.clone();
        self.blocking(move |store| store.apply_settlement(&record, initial_credits))
            .await
    }

    // =========================================================================
    // Settlement Log
    // =========================================================================

    async fn get_settlement(&self, event_id: &EventId) -> Result<Option<SettlementRecord>> {
        let key = keys::settlement_key(event_id);
        self.blocking(move |store| store.read_settlement(&key)).await
    }

    async fn list_settlements_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<SettlementRecord>> {
        let user_id = user_id.clone();
        self.blocking(move |store| store.read_settlements_by_user(&user_id, limit, offset))
            .await
    }

    async fn ping(&self) -> Result<()> {
        self.blocking(|store| store.cf(cf::ACCOUNTS).map(|_| ())).await
    }
}
