//! Payment Integrity Checks
//!
//! Three independent gates between "the gateway says money moved" and "this
//! account gets the entitlement": currency, amount, and ownership. All three
//! must pass; any failure is terminal for the attempt and none permits
//! partial entitlement.
//!
//! The ownership gate is a soft binding: merchant references initiated by
//! the portal embed the account id as a sub-token, and the check is plain
//! substring containment. That matches the deployed gateway flow, but a
//! forged reference containing a victim's id would pass it. TODO: bind
//! server-generated reference tokens at payment initiation so ownership is
//! provable rather than inferred.

use tracing::warn;

use crate::payment::error::{VerificationError, VerificationResult};
use crate::payment::types::{Amount, GatewayRecord};

/// Tolerance denominator: tolerances are expressed in basis points
pub const TOLERANCE_SCALE: u64 = 10_000;

/// Validates a gateway record against the resolved fee and claimed account.
#[derive(Debug, Clone)]
pub struct IntegrityValidator {
    operating_currency: String,
    tolerance_bps: u32,
}

impl IntegrityValidator {
    /// Create a validator for the configured operating currency and
    /// amount tolerance (in basis points, e.g. 500 = 5 %).
    pub fn new(operating_currency: impl Into<String>, tolerance_bps: u32) -> Self {
        Self {
            operating_currency: operating_currency.into(),
            tolerance_bps,
        }
    }

    /// Run all three gates.
    pub fn validate(
        &self,
        record: &GatewayRecord,
        expected: Amount,
        claimed_account_id: &str,
    ) -> VerificationResult<()> {
        self.check_currency(record)?;
        self.check_amount(record, expected, claimed_account_id)?;
        self.check_ownership(record, claimed_account_id)?;
        Ok(())
    }

    /// Currency gate: the payment must settle in the operating currency.
    fn check_currency(&self, record: &GatewayRecord) -> VerificationResult<()> {
        if record.currency != self.operating_currency {
            return Err(VerificationError::CurrencyMismatch {
                expected: self.operating_currency.clone(),
                received: record.currency.clone(),
            });
        }
        Ok(())
    }

    /// Amount gate: the captured amount may undershoot the expected fee by
    /// at most the configured tolerance (absorbs rounding and FX noise).
    fn check_amount(
        &self,
        record: &GatewayRecord,
        expected: Amount,
        claimed_account_id: &str,
    ) -> VerificationResult<()> {
        let threshold = acceptance_threshold(expected, self.tolerance_bps);
        if record.amount < threshold {
            warn!(
                account_id = claimed_account_id,
                reference = %record.reference,
                received = record.amount,
                expected,
                threshold,
                "fraud attempt: underpayment"
            );
            return Err(VerificationError::AmountMismatch {
                expected,
                received: record.amount,
            });
        }
        Ok(())
    }

    /// Ownership gate: the merchant reference must contain the claiming
    /// account's id as a sub-token.
    fn check_ownership(
        &self,
        record: &GatewayRecord,
        claimed_account_id: &str,
    ) -> VerificationResult<()> {
        if claimed_account_id.is_empty()
            || !record.counterparty_reference.contains(claimed_account_id)
        {
            warn!(
                account_id = claimed_account_id,
                reference = %record.reference,
                counterparty_reference = %record.counterparty_reference,
                "fraud attempt: receipt does not bind to claiming account"
            );
            return Err(VerificationError::OwnershipMismatch);
        }
        Ok(())
    }
}

/// Minimum acceptable amount for an expected fee at a given tolerance.
///
/// The discount is computed with integer division, so the threshold never
/// drops below `expected * (1 - tolerance)`: tolerance 500 bps on an
/// expected 1000 accepts 950 and rejects 949.
pub fn acceptance_threshold(expected: Amount, tolerance_bps: u32) -> Amount {
    let discount =
        (u128::from(expected) * u128::from(tolerance_bps) / u128::from(TOLERANCE_SCALE)) as Amount;
    expected - discount
}
