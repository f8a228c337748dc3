//! Fee Schedule Resolution
//!
//! The portal stores fees as loosely-typed key/value settings rows. This
//! module maps them into a strongly typed [`FeeSchedule`] at the boundary;
//! raw key/value pairs never reach validation logic.
//!
//! Resolution is deliberately permissive: an unrecognized program type falls
//! back to the default tier instead of erroring, so a stale account record
//! can still pay. Strictness against the actual payment is enforced by the
//! integrity validator, not here.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::payment::store::SettingRow;
use crate::payment::types::{Amount, ProgramType, Purpose};

/// Settings key for the JAMB program fee
pub const KEY_FEE_JAMB: &str = "fee_jamb";
/// Settings key for the A-Level program fee
pub const KEY_FEE_ALEVEL: &str = "fee_alevel";
/// Settings key for the O-Level program fee
pub const KEY_FEE_OLEVEL: &str = "fee_olevel";
/// Settings key for the exam-practice subscription price
pub const KEY_FEE_SUBSCRIPTION: &str = "fee_cbt_subscription";

/// Expected amounts per (purpose, program) pair, in whole currency units.
///
/// Built per request from the current settings rows so administrative fee
/// changes take effect immediately. Always resolvable: every tier defaults
/// to zero when its settings row is absent or unparsable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// JAMB program fee
    pub jamb: Amount,
    /// A-Level program fee
    pub a_level: Amount,
    /// O-Level program fee; also the default tier for unrecognized programs
    pub o_level: Amount,
    /// Exam-practice subscription price
    pub subscription: Amount,
}

impl FeeSchedule {
    /// Map raw settings rows into a typed schedule.
    ///
    /// Unknown keys are ignored; missing or unparsable fee values resolve to
    /// zero with a warning, matching the portal's historical behavior.
    pub fn from_settings(rows: &[SettingRow]) -> Self {
        Self {
            jamb: Self::lookup(rows, KEY_FEE_JAMB),
            a_level: Self::lookup(rows, KEY_FEE_ALEVEL),
            o_level: Self::lookup(rows, KEY_FEE_OLEVEL),
            subscription: Self::lookup(rows, KEY_FEE_SUBSCRIPTION),
        }
    }

    fn lookup(rows: &[SettingRow], key: &str) -> Amount {
        match rows.iter().find(|r| r.key == key) {
            Some(row) => match row.value.trim().parse::<Amount>() {
                Ok(value) => value,
                Err(_) => {
                    warn!(key, value = %row.value, "unparsable fee setting, resolving to 0");
                    0
                }
            },
            None => {
                warn!(key, "missing fee setting, resolving to 0");
                0
            }
        }
    }

    /// Resolve the expected amount for a purpose and program type.
    ///
    /// Pure over the schedule. Unrecognized program types resolve to the
    /// O-Level tier rather than erroring.
    pub fn expected_amount(&self, purpose: Purpose, program_type: ProgramType) -> Amount {
        match purpose {
            Purpose::SubscriptionPurchase => self.subscription,
            Purpose::ProgramFee => match program_type {
                ProgramType::Jamb => self.jamb,
                ProgramType::ALevel => self.a_level,
                ProgramType::OLevel | ProgramType::Unspecified => self.o_level,
            },
        }
    }
}
