//! Security Audit Collaborator
//!
//! Replay and fraud rejections are reported here in addition to being
//! returned to the caller and ledger-recorded. The actual sink (the
//! portal's activity-log table, a SIEM, ...) lives outside this service;
//! the default implementation writes structured tracing events.

use async_trait::async_trait;
use tracing::warn;

/// Category of a security-relevant rejection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditKind {
    /// An already-settled reference was resubmitted
    ReplayBlocked,
    /// Captured amount below the tolerated threshold
    AmountFraud,
    /// Merchant reference did not bind to the claiming account
    OwnershipFraud,
}

impl AuditKind {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReplayBlocked => "replay_blocked",
            Self::AmountFraud => "amount_fraud",
            Self::OwnershipFraud => "ownership_fraud",
        }
    }
}

/// One security-relevant rejection
#[derive(Debug, Clone)]
pub struct AuditRecord {
    /// Category of the rejection
    pub kind: AuditKind,
    /// Account the verification was claimed for
    pub account_id: String,
    /// Gateway reference involved
    pub reference: String,
    /// Full server-side detail (never echoed to the caller)
    pub detail: String,
}

/// External audit-log collaborator.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Record one security-relevant rejection.
    async fn record(&self, record: AuditRecord) -> anyhow::Result<()>;
}

/// Default sink: structured `tracing` warnings.
#[derive(Clone, Default)]
pub struct TracingAuditLog;

#[async_trait]
impl AuditLog for TracingAuditLog {
    async fn record(&self, record: AuditRecord) -> anyhow::Result<()> {
        warn!(
            kind = record.kind.as_str(),
            account_id = %record.account_id,
            reference = %record.reference,
            detail = %record.detail,
            "security-relevant rejection"
        );
        Ok(())
    }
}

/// No-op sink for tests
#[derive(Clone, Default)]
pub struct NoOpAuditLog;

#[async_trait]
impl AuditLog for NoOpAuditLog {
    async fn record(&self, _record: AuditRecord) -> anyhow::Result<()> {
        Ok(())
    }
}
