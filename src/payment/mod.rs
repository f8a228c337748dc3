//! Payment Verification & Reconciliation Core
//!
//! This module turns a student's claim of having paid the external gateway
//! into an exactly-once entitlement flip, defended against replay and
//! under/over-payment fraud:
//!
//! - **Replay Guard**: gateway references that already settled are rejected
//!   before anything else runs (ledger-backed, fail-closed)
//! - **Gateway Verifier**: one authenticated outbound call; the provider's
//!   answer is the only trusted source for amount/currency/status
//! - **Fee Schedule Resolver**: typed fees from the portal's settings rows,
//!   with a default tier for unrecognized programs
//! - **Integrity Validator**: currency, tolerance-bounded amount, and
//!   reference-ownership gates
//! - **Entitlement Updater**: idempotent paid-status flip and fresh
//!   subscription grants, with rollback handles
//! - **Ledger Recorder**: append-only rows, reference-unique among
//!   successful entries at the storage layer
//! - **Reconciliation Orchestrator**: composes the above into one
//!   request-scoped state machine
//!
//! # Data flow
//!
//! ```text
//! verification request
//!        │
//!        ▼
//! ┌──────────────┐     ┌──────────────────┐     ┌───────────────────┐
//! │ Replay Guard │ ──> │ Gateway Verifier │ ──> │ Fee Resolver +    │
//! └──────────────┘     └──────────────────┘     │ Integrity Checks  │
//!                                               └─────────┬─────────┘
//!                                                         │
//!                                 ┌───────────────────────┘
//!                                 ▼
//!                       ┌─────────────────────┐     ┌─────────────────┐
//!                       │ Entitlement Updater │ ──> │ Ledger Recorder │
//!                       └─────────────────────┘     └─────────────────┘
//! ```
//!
//! Audit logging and the manual-payment review queue are external
//! collaborators invoked as side effects, not part of the core contract.

pub mod audit;
pub mod entitlement;
pub mod error;
pub mod fees;
pub mod gateway;
pub mod orchestrator;
pub mod store;
pub mod types;
pub mod validate;

// Re-export commonly used items
pub use audit::{AuditKind, AuditLog, AuditRecord, NoOpAuditLog, TracingAuditLog};
pub use entitlement::{AppliedEntitlement, EntitlementUpdater};
pub use error::{VerificationError, VerificationResult};
pub use fees::FeeSchedule;
pub use gateway::{GatewayVerifier, HttpGatewayVerifier};
pub use orchestrator::{Reconciler, ReconcilerConfig};
pub use store::{
    AccountStore, InMemoryStore, LedgerStore, ReviewQueue, SettingRow, SettingsStore, StoreError,
};
pub use types::{
    Account, Amount, GatewayRecord, GatewayStatus, LedgerEntry, LedgerOutcome,
    ManualPaymentClaim, PaymentStatus, ProgramType, Purpose, Subscription, VerificationRequest,
    VerifiedPayment,
};
pub use validate::IntegrityValidator;
