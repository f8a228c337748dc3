//! Reconciliation Orchestrator
//!
//! Composes the replay guard, gateway verifier, fee resolver, integrity
//! validator, entitlement updater, and ledger recorder into one
//! request-scoped state machine:
//!
//! ```text
//! RECEIVED ──> REPLAY_CHECKED ──> GATEWAY_VERIFIED ──> VALIDATED
//!     │              │                   │                 │
//!     │              ▼                   ▼                 ▼
//!     │         REJECTED            REJECTED          ENTITLED ──> RECORDED
//!     │        (replay)        (declined/unavailable)     │        (success)
//!     │                                                   ▼
//!     └────────────────────────────────────────────> REJECTED
//!                                                  (rollback applied)
//! ```
//!
//! No state is skipped, no entitlement write happens before `VALIDATED`,
//! and no success is reported before `RECORDED` completes. Each request
//! owns its own pipeline pass; the only shared state is behind the injected
//! store collaborators, and no lock is held across the gateway call.

use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, error, info};

use crate::payment::audit::{AuditKind, AuditLog, AuditRecord};
use crate::payment::entitlement::EntitlementUpdater;
use crate::payment::error::{VerificationError, VerificationResult};
use crate::payment::fees::FeeSchedule;
use crate::payment::gateway::GatewayVerifier;
use crate::payment::store::{AccountStore, LedgerStore, SettingsStore, StoreError};
use crate::payment::types::{
    GatewayRecord, GatewayStatus, LedgerEntry, VerificationRequest, VerifiedPayment,
};
use crate::payment::validate::IntegrityValidator;

/// Policy knobs the orchestrator applies per request.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Single currency all payments must settle in
    pub operating_currency: String,
    /// Permitted undershoot of the expected fee, in basis points
    pub tolerance_bps: u32,
    /// Validity window for subscription grants, in days
    pub subscription_validity_days: i64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            operating_currency: "NGN".to_string(),
            tolerance_bps: 0,
            subscription_validity_days: 30,
        }
    }
}

/// Pipeline stages, in order. Logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Received,
    ReplayChecked,
    GatewayVerified,
    Validated,
    Entitled,
    Recorded,
}

impl Stage {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::ReplayChecked => "replay_checked",
            Self::GatewayVerified => "gateway_verified",
            Self::Validated => "validated",
            Self::Entitled => "entitled",
            Self::Recorded => "recorded",
        }
    }
}

/// Request-scoped verification pipeline over injected collaborators.
pub struct Reconciler {
    gateway: Arc<dyn GatewayVerifier>,
    ledger: Arc<dyn LedgerStore>,
    accounts: Arc<dyn AccountStore>,
    settings: Arc<dyn SettingsStore>,
    audit: Arc<dyn AuditLog>,
    validator: IntegrityValidator,
    entitlements: EntitlementUpdater,
}

impl Reconciler {
    /// Wire a reconciler over its collaborators.
    pub fn new(
        gateway: Arc<dyn GatewayVerifier>,
        ledger: Arc<dyn LedgerStore>,
        accounts: Arc<dyn AccountStore>,
        settings: Arc<dyn SettingsStore>,
        audit: Arc<dyn AuditLog>,
        config: ReconcilerConfig,
    ) -> Self {
        let validator =
            IntegrityValidator::new(config.operating_currency.clone(), config.tolerance_bps);
        let entitlements = EntitlementUpdater::new(
            accounts.clone(),
            Duration::days(config.subscription_validity_days),
        );
        Self {
            gateway,
            ledger,
            accounts,
            settings,
            audit,
            validator,
            entitlements,
        }
    }

    /// Run one verification request to a terminal decision.
    ///
    /// Exactly one of: `Ok` after the successful ledger append, or a typed
    /// rejection with no entitlement left applied.
    pub async fn verify(
        &self,
        request: &VerificationRequest,
    ) -> VerificationResult<VerifiedPayment> {
        let reference = request.transaction_id.as_str();
        self.advance(reference, Stage::Received);

        // Replay guard, fail-closed: a store failure here must not let the
        // request proceed as if no replay existed.
        let replayed = self
            .ledger
            .has_successful_record(reference)
            .await
            .map_err(|e| VerificationError::PersistenceUnavailable(e.to_string()))?;
        if replayed {
            let err = VerificationError::ReplayDetected;
            self.record_rejection(request, None, &err).await;
            return Err(err);
        }
        self.advance(reference, Stage::ReplayChecked);

        // The only trusted answer to "was this paid". Suspends; nothing is
        // held across it.
        let record = self.gateway.verify(reference).await?;
        if record.status != GatewayStatus::Successful {
            debug!(reference, status = ?record.status, "gateway reports non-successful payment");
            return Err(VerificationError::GatewayDeclined);
        }
        self.advance(reference, Stage::GatewayVerified);

        let account = self
            .accounts
            .load(&request.account_id)
            .await
            .map_err(|e| VerificationError::PersistenceUnavailable(e.to_string()))?
            .ok_or(VerificationError::AccountNotFound)?;

        // The stored program type is authoritative for fee resolution; the
        // claimed one is only cross-checked.
        if let Some(claimed) = request.program_type {
            if claimed != account.program_type {
                debug!(
                    account_id = %account.id,
                    claimed = %claimed,
                    stored = %account.program_type,
                    "claimed program type differs from account record"
                );
            }
        }

        let rows = self
            .settings
            .fee_settings()
            .await
            .map_err(|e| VerificationError::PersistenceUnavailable(e.to_string()))?;
        let expected = FeeSchedule::from_settings(&rows)
            .expected_amount(request.purpose, account.program_type);

        if let Err(err) = self
            .validator
            .validate(&record, expected, &request.account_id)
        {
            if err.is_security_relevant() {
                self.record_rejection(request, Some(&record), &err).await;
            }
            return Err(err);
        }
        self.advance(reference, Stage::Validated);

        let applied = self
            .entitlements
            .apply(&account, request.purpose, &record)
            .await?;
        self.advance(reference, Stage::Entitled);

        // Entitlement and ledger row commit as one logical unit: a failed
        // append rolls the entitlement back before the error surfaces.
        let entry = LedgerEntry::successful(&request.account_id, request.purpose, &record);
        match self.ledger.append(entry).await {
            Ok(()) => {
                self.advance(reference, Stage::Recorded);
                info!(
                    reference,
                    account_id = %request.account_id,
                    amount = record.amount,
                    purpose = %request.purpose,
                    "payment verified and recorded"
                );
                Ok(VerifiedPayment {
                    amount: record.amount,
                    purpose: request.purpose,
                })
            }
            Err(StoreError::DuplicateReference) => {
                // Lost the race on this reference: another request reached
                // RECORDED first. Undo our entitlement and report a replay.
                self.undo(request, applied).await;
                let err = VerificationError::ReplayDetected;
                self.record_rejection(request, Some(&record), &err).await;
                Err(err)
            }
            Err(StoreError::Unavailable(detail)) => {
                self.undo(request, applied).await;
                Err(VerificationError::PersistenceUnavailable(detail))
            }
        }
    }

    fn advance(&self, reference: &str, stage: Stage) {
        debug!(reference, stage = stage.as_str(), "verification stage");
    }

    async fn undo(
        &self,
        request: &VerificationRequest,
        applied: crate::payment::entitlement::AppliedEntitlement,
    ) {
        if let Err(rollback_err) = self.entitlements.rollback(applied).await {
            // Partial state: entitlement applied with no ledger row. This
            // needs operator attention, loudly.
            error!(
                account_id = %request.account_id,
                reference = %request.transaction_id,
                error = %rollback_err,
                "entitlement rollback failed after ledger append failure"
            );
        }
    }

    /// Append a rejected ledger row and emit an audit event for a
    /// security-relevant failure. Best effort: a failure to record the
    /// rejection never masks the rejection itself.
    async fn record_rejection(
        &self,
        request: &VerificationRequest,
        record: Option<&GatewayRecord>,
        err: &VerificationError,
    ) {
        let Some(reason) = err.reject_reason() else {
            return;
        };

        let entry = LedgerEntry::rejected(
            &request.account_id,
            request.purpose,
            &request.transaction_id,
            record,
            reason,
        );
        if let Err(append_err) = self.ledger.append(entry).await {
            error!(
                reference = %request.transaction_id,
                error = %append_err,
                "failed to record rejected attempt"
            );
        }

        let kind = match err {
            VerificationError::ReplayDetected => AuditKind::ReplayBlocked,
            VerificationError::AmountMismatch { .. } => AuditKind::AmountFraud,
            VerificationError::OwnershipMismatch => AuditKind::OwnershipFraud,
            _ => return,
        };
        let audit_record = AuditRecord {
            kind,
            account_id: request.account_id.clone(),
            reference: request.transaction_id.clone(),
            detail: err.to_string(),
        };
        if let Err(audit_err) = self.audit.record(audit_record).await {
            error!(
                reference = %request.transaction_id,
                error = %audit_err,
                "failed to write audit record"
            );
        }
    }
}
