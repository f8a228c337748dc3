//! AcadPay - Payment Verification & Reconciliation Service
//!
//! This crate provides the payment verification core of a
//! school-administration portal: it accepts a student's claim of having paid
//! the external gateway, confirms that claim against the provider's
//! verification endpoint, defends against replay and under/over-payment
//! fraud, and flips account entitlements exactly once per legitimate
//! transaction.
//!
//! # Features
//!
//! - **Replay protection**: ledger-anchored reference deduplication,
//!   fail-closed when the ledger is unreachable
//! - **Independent confirmation**: the gateway's verification endpoint is
//!   the only trusted source for amount, currency, and status
//! - **Integrity gates**: currency, tolerance-bounded amount, and
//!   reference-ownership checks
//! - **Exactly-once entitlement**: idempotent paid-status flips and fresh
//!   subscription grants, committed with the ledger row as one unit
//!
//! # Architecture
//!
//! ```text
//! Portal ──▶ HTTP Handlers ──▶ Reconciliation Orchestrator
//!                │                      │
//!                ▼                      ▼
//!          ┌──────────┐    ┌─────────────────────────────┐
//!          │ /status  │    │ Replay Guard │ Gateway Call │
//!          │ /metrics │    │ Fee Resolver │ Validators   │
//!          └──────────┘    │ Entitlement  │ Ledger       │
//!                          └─────────────────────────────┘
//!                                       │
//!                                       ▼
//!                          Persistent store (collaborator)
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use acadpay::config::AppConfig;
//! use acadpay::payment::{
//!     HttpGatewayVerifier, InMemoryStore, Reconciler, TracingAuditLog,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::from_env()?;
//! let store = Arc::new(InMemoryStore::new());
//! let gateway = Arc::new(HttpGatewayVerifier::new(&config.gateway)?);
//!
//! let reconciler = Reconciler::new(
//!     gateway,
//!     store.clone(),
//!     store.clone(),
//!     store.clone(),
//!     Arc::new(TracingAuditLog),
//!     config.reconciler_config(),
//! );
//! # let _ = reconciler;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod payment;

// Re-exports for convenience
pub use config::AppConfig;
pub use error::{Error, Result};
pub use handlers::{app_router, AppState};
pub use payment::{Reconciler, ReconcilerConfig, VerificationError, VerificationRequest};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
