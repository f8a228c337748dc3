//! Verification Error Taxonomy
//!
//! Every failure mode of the verification pipeline is recovered into one of
//! these variants; raw upstream errors (HTTP client, store driver) never
//! reach the caller.

use thiserror::Error;

use crate::payment::types::Amount;

/// Terminal result of a failed verification attempt
#[derive(Error, Debug)]
pub enum VerificationError {
    /// The gateway reference was already settled by an earlier request
    #[error("transaction has already been used")]
    ReplayDetected,

    /// The gateway could not be reached or timed out; safe to retry
    #[error("payment gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// The provider reported the payment as failed or declined
    #[error("payment failed or was declined by the provider")]
    GatewayDeclined,

    /// The gateway settled the payment in a currency this service does not operate in
    #[error("invalid currency {received}: payments must be in {expected}")]
    CurrencyMismatch {
        /// Configured operating currency
        expected: String,
        /// Currency the gateway reported
        received: String,
    },

    /// The captured amount is below the tolerated threshold for the fee
    #[error("insufficient payment: received {received}, expected {expected}")]
    AmountMismatch {
        /// Fee the schedule resolves for this purpose and program
        expected: Amount,
        /// Amount the gateway reported
        received: Amount,
    },

    /// The merchant reference does not bind to the claiming account
    #[error("payment does not belong to the claiming account")]
    OwnershipMismatch,

    /// No account exists for the claimed id
    #[error("account not found")]
    AccountNotFound,

    /// A required store read or write failed; the attempt was not processed
    #[error("payment records unavailable: {0}")]
    PersistenceUnavailable(String),
}

impl VerificationError {
    /// Failures that indicate a possible fraud attempt.
    ///
    /// These are audit-logged and produce a rejected ledger entry in
    /// addition to the error response.
    pub fn is_security_relevant(&self) -> bool {
        matches!(
            self,
            Self::ReplayDetected | Self::AmountMismatch { .. } | Self::OwnershipMismatch
        )
    }

    /// Failures the caller may retry with the same reference.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::GatewayUnavailable(_) | Self::PersistenceUnavailable(_)
        )
    }

    /// Machine-readable reason stored on rejected ledger entries.
    pub fn reject_reason(&self) -> Option<&'static str> {
        match self {
            Self::ReplayDetected => Some("replay"),
            Self::AmountMismatch { .. } => Some("amount_mismatch"),
            Self::OwnershipMismatch => Some("ownership_mismatch"),
            _ => None,
        }
    }
}

/// Result type alias for verification operations
pub type VerificationResult<T> = std::result::Result<T, VerificationError>;
