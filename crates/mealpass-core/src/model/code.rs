// ── Delegated pickup codes ──
//
// A code is redeemable while unused and before its expiry. Expiry is never
// stored as a transition; it falls out of comparing against the clock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use super::id::{RecordId, UserId};

/// A short-lived, single-use code that lets someone else collect a meal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegatedCode {
    pub id: RecordId,
    pub code: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
}

/// Lifecycle state derived from `is_used` and the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CodeState {
    Active,
    Redeemed,
    Expired,
}

impl DelegatedCode {
    pub fn new(
        code: impl Into<String>,
        user_id: UserId,
        created_at: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Self {
        Self {
            id: RecordId::new(),
            code: code.into(),
            user_id,
            created_at,
            expires_at: created_at + ttl,
            is_used: false,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_redeemable_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_used && !self.is_expired_at(now)
    }

    /// A used code reports `Redeemed` even after its expiry has passed.
    pub fn state_at(&self, now: DateTime<Utc>) -> CodeState {
        if self.is_used {
            CodeState::Redeemed
        } else if self.is_expired_at(now) {
            CodeState::Expired
        } else {
            CodeState::Active
        }
    }

    /// Time left before expiry, clamped at zero.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> std::time::Duration {
        (self.expires_at - now).to_std().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn issued_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 10, 12, 0, 0).single().unwrap_or_default()
    }

    fn code() -> DelegatedCode {
        DelegatedCode::new("482913", UserId::new(), issued_at(), Duration::minutes(15))
    }

    #[test]
    fn expiry_is_creation_plus_ttl() {
        let c = code();
        assert_eq!(c.expires_at - c.created_at, Duration::minutes(15));
    }

    #[test]
    fn redeemable_until_just_before_expiry() {
        let c = code();
        let t = issued_at();
        assert!(c.is_redeemable_at(t + Duration::minutes(14) + Duration::seconds(59)));
        assert!(!c.is_redeemable_at(t + Duration::minutes(15)));
        assert!(!c.is_redeemable_at(t + Duration::minutes(15) + Duration::seconds(1)));
    }

    #[test]
    fn used_codes_stay_redeemed() {
        let mut c = code();
        c.is_used = true;
        let later = issued_at() + Duration::hours(2);
        assert_eq!(c.state_at(later), CodeState::Redeemed);
        assert!(!c.is_redeemable_at(issued_at()));
    }

    #[test]
    fn state_reports_expired() {
        let c = code();
        assert_eq!(c.state_at(issued_at()), CodeState::Active);
        assert_eq!(c.state_at(issued_at() + Duration::minutes(20)), CodeState::Expired);
    }

    #[test]
    fn remaining_clamps_at_zero() {
        let c = code();
        assert_eq!(
            c.remaining_at(issued_at() + Duration::minutes(5)),
            std::time::Duration::from_secs(600)
        );
        assert_eq!(
            c.remaining_at(issued_at() + Duration::hours(1)),
            std::time::Duration::ZERO
        );
    }
}
