// ── Verification outcomes ──
//
// The uniform result shape both verification paths produce. Live feeds and
// the CLI consume these; their `Display` text is shown to operators as is.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::meal::{AccessMethod, MealSlot};
use super::student::Student;

/// Why a verification did not log a meal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FailureReason {
    /// No student matches the presented identifier.
    NotFound { identifier: String },
    /// The student exists but their subscription is switched off.
    SubscriptionInactive { name: String },
    /// This slot was already logged for the student today.
    AlreadyRecorded { slot: MealSlot, name: String },
    /// The code exists and is unused, but its time ran out.
    CodeExpired,
    /// No unused code matches. Covers codes already redeemed or revoked.
    CodeNotFound,
    /// The record store failed or timed out after retries.
    StoreUnavailable,
}

impl FailureReason {
    /// Stable machine-readable tag, matching the serde representation.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::SubscriptionInactive { .. } => "subscription_inactive",
            Self::AlreadyRecorded { .. } => "already_recorded",
            Self::CodeExpired => "code_expired",
            Self::CodeNotFound => "code_not_found",
            Self::StoreUnavailable => "store_unavailable",
        }
    }

    /// Only infrastructure failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable)
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { identifier } => write!(f, "No student found for {identifier}"),
            Self::SubscriptionInactive { name } => {
                write!(f, "Subscription inactive for {name}")
            }
            Self::AlreadyRecorded { slot, name } => {
                write!(f, "{slot} already logged for {name} today")
            }
            Self::CodeExpired => f.write_str("Code has expired"),
            Self::CodeNotFound => f.write_str("Code not found or already used"),
            Self::StoreUnavailable => f.write_str("Record store unavailable, try again"),
        }
    }
}

/// Result of a verification attempt, broadcast to every subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VerificationOutcome {
    Success {
        student: Student,
        slot: MealSlot,
        method: AccessMethod,
        date: NaiveDate,
        at: DateTime<Utc>,
    },
    Failure {
        reason: FailureReason,
        at: DateTime<Utc>,
    },
}

impl VerificationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn failure_reason(&self) -> Option<&FailureReason> {
        match self {
            Self::Failure { reason, .. } => Some(reason),
            Self::Success { .. } => None,
        }
    }

    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Self::Success { at, .. } | Self::Failure { at, .. } => *at,
        }
    }
}

impl fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success {
                student,
                slot,
                method,
                ..
            } => match method {
                AccessMethod::SelfId => write!(f, "{slot} logged for {}", student.name),
                AccessMethod::DelegatedCode => {
                    write!(f, "{slot} logged for {} via delegated code", student.name)
                }
            },
            Self::Failure { reason, .. } => write!(f, "{reason}"),
        }
    }
}
