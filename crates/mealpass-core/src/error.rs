// ── Core error types ──
//
// Infrastructure errors only. Business outcomes (duplicate meal, inactive
// subscription, expired code) are `FailureReason` values, never errors.
// Store backends translate their own failures into these variants.

use thiserror::Error;

use crate::model::FailureReason;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Store errors ─────────────────────────────────────────────────
    #[error("Record store unavailable: {reason}")]
    StoreUnavailable { reason: String },

    #[error("Record store did not answer within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    // ── Input errors ─────────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Conflicting record: {message}")]
    Conflict { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether a retry might succeed. Only transport-level failures qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. } | Self::Timeout { .. })
    }
}

// ── Conversion from SQLite errors ────────────────────────────────────

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ref e, _) => match e.code {
                rusqlite::ErrorCode::DatabaseBusy
                | rusqlite::ErrorCode::DatabaseLocked
                | rusqlite::ErrorCode::CannotOpen
                | rusqlite::ErrorCode::SystemIoFailure => CoreError::StoreUnavailable {
                    reason: err.to_string(),
                },
                rusqlite::ErrorCode::ConstraintViolation
                    if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
                {
                    CoreError::Validation {
                        message: "record refers to an unknown student".into(),
                    }
                }
                rusqlite::ErrorCode::ConstraintViolation => CoreError::Conflict {
                    message: err.to_string(),
                },
                _ => CoreError::Internal(format!("SQLite error: {err}")),
            },
            rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::InvalidColumnType(..) => {
                CoreError::Internal(format!("Corrupt row: {err}"))
            }
            other => CoreError::Internal(format!("SQLite error: {other}")),
        }
    }
}

// ── Rejection ────────────────────────────────────────────────────────

/// Why a verification step stopped short of logging a meal.
///
/// Business rejections become failure outcomes as-is; store errors are
/// folded into `FailureReason::StoreUnavailable` at the verifier boundary.
#[derive(Debug, Error)]
pub enum Rejection {
    #[error("{0}")]
    Business(FailureReason),

    #[error(transparent)]
    Store(#[from] CoreError),
}

impl From<FailureReason> for Rejection {
    fn from(reason: FailureReason) -> Self {
        Self::Business(reason)
    }
}

impl Rejection {
    /// The reason a caller should see.
    pub fn into_reason(self) -> FailureReason {
        match self {
            Self::Business(reason) => reason,
            Self::Store(_) => FailureReason::StoreUnavailable,
        }
    }
}
