//! Core Payment Domain Types
//!
//! Strongly-typed representations of accounts, gateway verification results,
//! and ledger records used throughout the verification pipeline.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Monetary amount in whole units of the operating currency.
///
/// The gateway reports amounts as JSON numbers in major units (e.g. naira);
/// fractional parts are rounded to the nearest whole unit at normalization.
pub type Amount = u64;

/// The product or service a payment is for.
///
/// Determines which fee applies and which entitlement update runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    /// One-off program registration fee; flips the account to `paid`.
    ProgramFee,
    /// Time-boxed exam-practice access; grants a fresh subscription.
    SubscriptionPurchase,
}

impl Purpose {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProgramFee => "program_fee",
            Self::SubscriptionPurchase => "subscription_purchase",
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Academic program an account is registered for.
///
/// Unrecognized values deserialize to [`ProgramType::Unspecified`] so that a
/// stale or misconfigured account never makes the fee schedule unresolvable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProgramType {
    /// JAMB/UTME preparation program
    #[serde(rename = "JAMB")]
    Jamb,
    /// A-Level program
    #[serde(rename = "A-Level")]
    ALevel,
    /// O-Level program
    #[serde(rename = "O-Level")]
    OLevel,
    /// No program, or a value this service does not recognize
    #[serde(other)]
    Unspecified,
}

impl ProgramType {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jamb => "JAMB",
            Self::ALevel => "A-Level",
            Self::OLevel => "O-Level",
            Self::Unspecified => "unspecified",
        }
    }
}

impl FromStr for ProgramType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "JAMB" => Self::Jamb,
            "A-Level" => Self::ALevel,
            "O-Level" => Self::OLevel,
            _ => Self::Unspecified,
        })
    }
}

impl fmt::Display for ProgramType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account-side payment state.
///
/// `PendingManual` is reachable only through the offline bank-transfer path
/// and is resolved by an administrative review action outside this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// No verified payment on record
    Unpaid,
    /// Offline payment claim awaiting administrative review
    PendingManual,
    /// Program fee verified and settled
    Paid,
}

impl PaymentStatus {
    /// Check if the program fee has been settled
    pub fn is_paid(&self) -> bool {
        matches!(self, Self::Paid)
    }
}

/// A student account as seen by the verification pipeline.
///
/// Created at registration by the portal; this service mutates only the
/// payment fields, and only through the entitlement updater.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Account identifier assigned at registration
    pub id: String,
    /// Program the account registered for
    pub program_type: ProgramType,
    /// Current program-fee state
    pub payment_status: PaymentStatus,
    /// Active exam-practice subscription, if any
    #[serde(default)]
    pub subscription: Option<Subscription>,
}

/// Payment state reported by the gateway for a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayStatus {
    /// Funds captured
    Successful,
    /// Declined or reversed
    Failed,
    /// Still in flight at the provider
    Pending,
    /// A status string this service does not recognize
    #[serde(other)]
    Unknown,
}

/// Normalized result of one gateway verification call.
///
/// Ephemeral: exists only for the duration of a single verification and is
/// the sole trusted source for amount, currency, and status. Nothing the
/// client submitted about the payment is carried here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayRecord {
    /// Payment status as reported by the provider
    pub status: GatewayStatus,
    /// Amount captured, in whole units of `currency`
    pub amount: Amount,
    /// ISO currency code reported by the provider
    pub currency: String,
    /// Gateway-assigned transaction identifier (the replay-prevention anchor)
    pub reference: String,
    /// Merchant-supplied reference (tx_ref) echoed back by the provider;
    /// expected to embed the paying account's id as a sub-token
    pub counterparty_reference: String,
}

/// Terminal outcome recorded for a verification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerOutcome {
    /// Verified and entitlement applied
    Successful,
    /// Rejected for a security-relevant reason (replay, amount, ownership)
    Rejected,
}

/// Immutable row in the payment ledger.
///
/// Created exactly once per gateway reference that reaches a terminal
/// decision; never updated or deleted. The reference is globally unique
/// among `Successful` entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Row identifier
    pub id: Uuid,
    /// Account the verification was claimed for
    pub account_id: String,
    /// Amount reported by the gateway
    pub amount: Amount,
    /// Currency reported by the gateway
    pub currency: String,
    /// Gateway reference used for replay deduplication
    pub reference: String,
    /// What the payment was for
    pub purpose: Purpose,
    /// Terminal outcome of the attempt
    pub outcome: LedgerOutcome,
    /// Machine-readable rejection reason, present when outcome is `Rejected`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reject_reason: Option<String>,
    /// Gateway-assigned transaction id
    pub gateway_id: String,
    /// When the outcome was recorded
    pub recorded_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Build a successful entry from a gateway record.
    pub fn successful(account_id: &str, purpose: Purpose, record: &GatewayRecord) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id: account_id.to_string(),
            amount: record.amount,
            currency: record.currency.clone(),
            reference: record.reference.clone(),
            purpose,
            outcome: LedgerOutcome::Successful,
            reject_reason: None,
            gateway_id: record.reference.clone(),
            recorded_at: Utc::now(),
        }
    }

    /// Build a rejected entry for a fraud-class failure.
    ///
    /// `record` may be absent when the attempt was rejected before the
    /// gateway was consulted (e.g. a replayed reference).
    pub fn rejected(
        account_id: &str,
        purpose: Purpose,
        reference: &str,
        record: Option<&GatewayRecord>,
        reason: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id: account_id.to_string(),
            amount: record.map(|r| r.amount).unwrap_or(0),
            currency: record
                .map(|r| r.currency.clone())
                .unwrap_or_default(),
            reference: reference.to_string(),
            purpose,
            outcome: LedgerOutcome::Rejected,
            reject_reason: Some(reason.to_string()),
            gateway_id: reference.to_string(),
            recorded_at: Utc::now(),
        }
    }
}

/// Exam-practice subscription granted by a verified purchase.
///
/// Superseded, never mutated, by later purchases; each purchase is a fresh
/// grant and does not extend an existing unexpired subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    /// Owning account
    pub account_id: String,
    /// Plan identifier
    pub plan: String,
    /// Amount the gateway captured for this grant
    pub amount_paid: Amount,
    /// When access lapses
    pub expires_at: DateTime<Utc>,
}

impl Subscription {
    /// Check whether the subscription is still active at `now`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Inbound verification request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRequest {
    /// Gateway-assigned identifier used to query the provider
    pub transaction_id: String,
    /// Claimant's account
    pub account_id: String,
    /// What the payment was for
    pub purpose: Purpose,
    /// Required when purpose is `program_fee`
    #[serde(default)]
    pub program_type: Option<ProgramType>,
}

/// Offline bank-transfer claim forwarded to the administrative review queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualPaymentClaim {
    /// Claimant's account
    pub account_id: String,
    /// Depositor's reference or teller number
    pub reference: String,
    /// Amount the claimant says was transferred
    #[serde(default)]
    pub amount: Option<Amount>,
}

/// Successful verification result returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedPayment {
    /// Amount the gateway confirmed
    pub amount: Amount,
    /// What the payment settled
    pub purpose: Purpose,
}
