//! Persistence Collaborator Interfaces
//!
//! The ledger, account records, and fee settings are owned by the portal's
//! persistent store; this service only reads and appends through the traits
//! below and never assumes in-process shared memory with other requests.
//! Each trait can be substituted with a test double.
//!
//! The [`InMemoryStore`] implementation backs tests and single-node dev
//! deployments. Its single mutex doubles as the per-reference serialization
//! point the ledger uniqueness invariant requires; a database-backed
//! implementation must provide the same guarantee with a unique constraint
//! on `(reference)` over successful rows.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::payment::types::{
    Account, LedgerEntry, LedgerOutcome, ManualPaymentClaim, PaymentStatus, Subscription,
};

/// Raw key/value settings row as stored by the portal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingRow {
    /// Setting key, e.g. `fee_jamb`
    pub key: String,
    /// Unparsed value
    pub value: String,
}

/// Store-layer failures
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing store could not be reached or the operation failed
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A successful ledger row with this reference already exists
    ///
    /// Raised by the storage layer itself, so two requests racing on one
    /// reference cannot both append a successful entry.
    #[error("duplicate ledger reference")]
    DuplicateReference,
}

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Append-only payment ledger.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Replay guard: does a successful entry with this reference exist?
    async fn has_successful_record(&self, reference: &str) -> StoreResult<bool>;

    /// Append one immutable entry.
    ///
    /// Must return [`StoreError::DuplicateReference`] when the entry is
    /// successful and a successful row with the same reference already
    /// exists. Rejected entries are exempt from the uniqueness invariant.
    async fn append(&self, entry: LedgerEntry) -> StoreResult<()>;
}

/// Account records owned by the portal.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Load an account by id.
    async fn load(&self, account_id: &str) -> StoreResult<Option<Account>>;

    /// Set the program-fee payment status, returning the previous value.
    async fn set_payment_status(
        &self,
        account_id: &str,
        status: PaymentStatus,
    ) -> StoreResult<PaymentStatus>;

    /// Replace the active subscription, returning the superseded one.
    ///
    /// Passing `None` clears the slot; the rollback path uses this to
    /// restore whatever was active before a failed commit.
    async fn set_subscription(
        &self,
        account_id: &str,
        subscription: Option<Subscription>,
    ) -> StoreResult<Option<Subscription>>;
}

/// Read-only view of the portal's settings rows.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Fetch the current fee-related settings rows.
    async fn fee_settings(&self) -> StoreResult<Vec<SettingRow>>;
}

/// Administrative review queue for offline bank-transfer claims.
///
/// External collaborator: the `pending_manual` state it feeds is resolved by
/// an admin action outside this service's automatic state machine.
#[async_trait]
pub trait ReviewQueue: Send + Sync {
    /// Submit a claim for manual review.
    async fn submit(&self, claim: ManualPaymentClaim) -> anyhow::Result<()>;
}

// =============================================================================
// In-memory implementation
// =============================================================================

#[derive(Default)]
struct StoreInner {
    accounts: HashMap<String, Account>,
    ledger: Vec<LedgerEntry>,
    settings: Vec<SettingRow>,
    review_queue: Vec<ManualPaymentClaim>,
}

/// In-memory store for tests and single-node dev deployments.
///
/// All operations run under one mutex, which is exactly the single-writer
/// serialization guarantee the ledger invariant needs.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an account record.
    pub fn put_account(&self, account: Account) {
        self.inner
            .lock()
            .accounts
            .insert(account.id.clone(), account);
    }

    /// Replace the settings rows.
    pub fn put_settings(&self, rows: Vec<SettingRow>) {
        self.inner.lock().settings = rows;
    }

    /// Snapshot the ledger (test inspection).
    pub fn ledger_entries(&self) -> Vec<LedgerEntry> {
        self.inner.lock().ledger.clone()
    }

    /// Count successful ledger rows for a reference (test inspection).
    pub fn successful_count(&self, reference: &str) -> usize {
        self.inner
            .lock()
            .ledger
            .iter()
            .filter(|e| e.reference == reference && e.outcome == LedgerOutcome::Successful)
            .count()
    }

    /// Snapshot the submitted manual claims (test inspection).
    pub fn review_claims(&self) -> Vec<ManualPaymentClaim> {
        self.inner.lock().review_queue.clone()
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn has_successful_record(&self, reference: &str) -> StoreResult<bool> {
        let inner = self.inner.lock();
        Ok(inner
            .ledger
            .iter()
            .any(|e| e.reference == reference && e.outcome == LedgerOutcome::Successful))
    }

    async fn append(&self, entry: LedgerEntry) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        if entry.outcome == LedgerOutcome::Successful
            && inner
                .ledger
                .iter()
                .any(|e| e.reference == entry.reference && e.outcome == LedgerOutcome::Successful)
        {
            return Err(StoreError::DuplicateReference);
        }
        inner.ledger.push(entry);
        Ok(())
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn load(&self, account_id: &str) -> StoreResult<Option<Account>> {
        Ok(self.inner.lock().accounts.get(account_id).cloned())
    }

    async fn set_payment_status(
        &self,
        account_id: &str,
        status: PaymentStatus,
    ) -> StoreResult<PaymentStatus> {
        let mut inner = self.inner.lock();
        let account = inner
            .accounts
            .get_mut(account_id)
            .ok_or_else(|| StoreError::Unavailable(format!("no account {account_id}")))?;
        let previous = account.payment_status;
        account.payment_status = status;
        Ok(previous)
    }

    async fn set_subscription(
        &self,
        account_id: &str,
        subscription: Option<Subscription>,
    ) -> StoreResult<Option<Subscription>> {
        let mut inner = self.inner.lock();
        let account = inner
            .accounts
            .get_mut(account_id)
            .ok_or_else(|| StoreError::Unavailable(format!("no account {account_id}")))?;
        Ok(std::mem::replace(&mut account.subscription, subscription))
    }
}

#[async_trait]
impl SettingsStore for InMemoryStore {
    async fn fee_settings(&self) -> StoreResult<Vec<SettingRow>> {
        Ok(self.inner.lock().settings.clone())
    }
}

#[async_trait]
impl ReviewQueue for InMemoryStore {
    async fn submit(&self, claim: ManualPaymentClaim) -> anyhow::Result<()> {
        self.inner.lock().review_queue.push(claim);
        Ok(())
    }
}
