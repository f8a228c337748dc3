//! Entitlement State Transitions
//!
//! Applies the account-side effect of a verified payment, and nothing else:
//! the orchestrator invokes this only after the integrity validator passed,
//! and immediately follows it with the ledger append. Every successful apply
//! returns a rollback handle so a failed append can restore the prior state
//! (the compensating half of the commit).

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::info;

use crate::payment::error::{VerificationError, VerificationResult};
use crate::payment::store::AccountStore;
use crate::payment::types::{
    Account, GatewayRecord, PaymentStatus, Purpose, Subscription,
};

/// Plan identifier for exam-practice subscriptions
pub const EXAM_PRACTICE_PLAN: &str = "exam_practice";

/// Rollback handle describing what a successful apply changed.
#[derive(Debug)]
pub enum AppliedEntitlement {
    /// Program-fee status was flipped; `previous` restores it
    ProgramFee {
        /// Account whose status changed
        account_id: String,
        /// Status before the flip
        previous: PaymentStatus,
    },
    /// A fresh subscription replaced `superseded`
    SubscriptionGrant {
        /// Account the grant was made to
        account_id: String,
        /// Whatever was active before (restored on rollback)
        superseded: Option<Subscription>,
    },
    /// Nothing changed (program fee was already paid)
    AlreadySettled,
}

/// Applies and rolls back entitlement mutations.
pub struct EntitlementUpdater {
    accounts: Arc<dyn AccountStore>,
    subscription_validity: Duration,
}

impl EntitlementUpdater {
    /// Create an updater over the account store.
    pub fn new(accounts: Arc<dyn AccountStore>, subscription_validity: Duration) -> Self {
        Self {
            accounts,
            subscription_validity,
        }
    }

    /// Transition the account state for a verified payment.
    ///
    /// - `program_fee`: `unpaid` or `pending_manual` becomes `paid`.
    ///   Re-applying to an already-paid account is a no-op, not an error.
    /// - `subscription_purchase`: grants a fresh subscription expiring
    ///   `validity` from now. An existing unexpired subscription is
    ///   superseded, never extended.
    pub async fn apply(
        &self,
        account: &Account,
        purpose: Purpose,
        record: &GatewayRecord,
    ) -> VerificationResult<AppliedEntitlement> {
        match purpose {
            Purpose::ProgramFee => {
                if account.payment_status.is_paid() {
                    info!(account_id = %account.id, "program fee already settled, no-op");
                    return Ok(AppliedEntitlement::AlreadySettled);
                }
                let previous = self
                    .accounts
                    .set_payment_status(&account.id, PaymentStatus::Paid)
                    .await
                    .map_err(|e| VerificationError::PersistenceUnavailable(e.to_string()))?;
                info!(account_id = %account.id, ?previous, "program fee marked paid");
                Ok(AppliedEntitlement::ProgramFee {
                    account_id: account.id.clone(),
                    previous,
                })
            }
            Purpose::SubscriptionPurchase => {
                let grant = Subscription {
                    account_id: account.id.clone(),
                    plan: EXAM_PRACTICE_PLAN.to_string(),
                    amount_paid: record.amount,
                    expires_at: Utc::now() + self.subscription_validity,
                };
                let superseded = self
                    .accounts
                    .set_subscription(&account.id, Some(grant))
                    .await
                    .map_err(|e| VerificationError::PersistenceUnavailable(e.to_string()))?;
                info!(
                    account_id = %account.id,
                    superseded = superseded.is_some(),
                    "subscription granted"
                );
                Ok(AppliedEntitlement::SubscriptionGrant {
                    account_id: account.id.clone(),
                    superseded,
                })
            }
        }
    }

    /// Undo a previously applied entitlement.
    ///
    /// Used when the ledger append fails after the entitlement was applied,
    /// so the account never keeps an entitlement without a ledger row.
    pub async fn rollback(&self, applied: AppliedEntitlement) -> VerificationResult<()> {
        match applied {
            AppliedEntitlement::ProgramFee {
                account_id,
                previous,
            } => {
                self.accounts
                    .set_payment_status(&account_id, previous)
                    .await
                    .map_err(|e| VerificationError::PersistenceUnavailable(e.to_string()))?;
                info!(%account_id, "program fee entitlement rolled back");
            }
            AppliedEntitlement::SubscriptionGrant {
                account_id,
                superseded,
            } => {
                self.accounts
                    .set_subscription(&account_id, superseded)
                    .await
                    .map_err(|e| VerificationError::PersistenceUnavailable(e.to_string()))?;
                info!(%account_id, "subscription grant rolled back");
            }
            AppliedEntitlement::AlreadySettled => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::store::{AccountStore, InMemoryStore};
    use crate::payment::types::{GatewayStatus, ProgramType};

    fn record(amount: u64) -> GatewayRecord {
        GatewayRecord {
            status: GatewayStatus::Successful,
            amount,
            currency: "NGN".to_string(),
            reference: "8412345".to_string(),
            counterparty_reference: "MCAS-acct-1-1".to_string(),
        }
    }

    fn store_with_account(status: PaymentStatus) -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        store.put_account(Account {
            id: "acct-1".to_string(),
            program_type: ProgramType::Jamb,
            payment_status: status,
            subscription: None,
        });
        store
    }

    fn updater(store: Arc<InMemoryStore>) -> EntitlementUpdater {
        EntitlementUpdater::new(store, Duration::days(30))
    }

    #[tokio::test]
    async fn test_program_fee_flips_unpaid_to_paid() {
        let store = store_with_account(PaymentStatus::Unpaid);
        let account = store.load("acct-1").await.unwrap().unwrap();

        let applied = updater(store.clone())
            .apply(&account, Purpose::ProgramFee, &record(15000))
            .await
            .unwrap();

        assert!(matches!(
            applied,
            AppliedEntitlement::ProgramFee {
                previous: PaymentStatus::Unpaid,
                ..
            }
        ));
        let reloaded = store.load("acct-1").await.unwrap().unwrap();
        assert_eq!(reloaded.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn test_program_fee_from_pending_manual() {
        let store = store_with_account(PaymentStatus::PendingManual);
        let account = store.load("acct-1").await.unwrap().unwrap();

        updater(store.clone())
            .apply(&account, Purpose::ProgramFee, &record(15000))
            .await
            .unwrap();

        let reloaded = store.load("acct-1").await.unwrap().unwrap();
        assert_eq!(reloaded.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn test_program_fee_idempotent_when_already_paid() {
        let store = store_with_account(PaymentStatus::Paid);
        let account = store.load("acct-1").await.unwrap().unwrap();

        let applied = updater(store.clone())
            .apply(&account, Purpose::ProgramFee, &record(15000))
            .await
            .unwrap();

        assert!(matches!(applied, AppliedEntitlement::AlreadySettled));
        let reloaded = store.load("acct-1").await.unwrap().unwrap();
        assert_eq!(reloaded.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn test_subscription_is_fresh_grant_not_extension() {
        let store = store_with_account(PaymentStatus::Paid);
        let updater = updater(store.clone());

        let account = store.load("acct-1").await.unwrap().unwrap();
        updater
            .apply(&account, Purpose::SubscriptionPurchase, &record(1500))
            .await
            .unwrap();
        let first = store
            .load("acct-1")
            .await
            .unwrap()
            .unwrap()
            .subscription
            .unwrap();

        let account = store.load("acct-1").await.unwrap().unwrap();
        let applied = updater
            .apply(&account, Purpose::SubscriptionPurchase, &record(1500))
            .await
            .unwrap();
        let second = store
            .load("acct-1")
            .await
            .unwrap()
            .unwrap()
            .subscription
            .unwrap();

        // The new grant replaces the old one wholesale.
        assert!(matches!(
            applied,
            AppliedEntitlement::SubscriptionGrant {
                superseded: Some(_),
                ..
            }
        ));
        assert!(second.expires_at >= first.expires_at);
        assert_eq!(second.plan, EXAM_PRACTICE_PLAN);
        assert_eq!(second.amount_paid, 1500);
    }

    #[tokio::test]
    async fn test_rollback_restores_payment_status() {
        let store = store_with_account(PaymentStatus::Unpaid);
        let updater = updater(store.clone());
        let account = store.load("acct-1").await.unwrap().unwrap();

        let applied = updater
            .apply(&account, Purpose::ProgramFee, &record(15000))
            .await
            .unwrap();
        updater.rollback(applied).await.unwrap();

        let reloaded = store.load("acct-1").await.unwrap().unwrap();
        assert_eq!(reloaded.payment_status, PaymentStatus::Unpaid);
    }

    #[tokio::test]
    async fn test_rollback_restores_superseded_subscription() {
        let store = store_with_account(PaymentStatus::Paid);
        let updater = updater(store.clone());

        let account = store.load("acct-1").await.unwrap().unwrap();
        updater
            .apply(&account, Purpose::SubscriptionPurchase, &record(1500))
            .await
            .unwrap();
        let first = store
            .load("acct-1")
            .await
            .unwrap()
            .unwrap()
            .subscription
            .unwrap();

        let account = store.load("acct-1").await.unwrap().unwrap();
        let applied = updater
            .apply(&account, Purpose::SubscriptionPurchase, &record(1500))
            .await
            .unwrap();
        updater.rollback(applied).await.unwrap();

        let restored = store
            .load("acct-1")
            .await
            .unwrap()
            .unwrap()
            .subscription
            .unwrap();
        assert_eq!(restored, first);
    }
}
