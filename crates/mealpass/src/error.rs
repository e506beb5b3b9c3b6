//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError`, `ConfigError` and verification rejections into
//! user-facing errors with actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use mealpass_config::ConfigError;
use mealpass_core::{CoreError, FailureReason, Rejection};

/// Process exit codes. Verification rejections get one code per reason so
/// scripts driving the counter can branch without parsing text.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const STORE_UNAVAILABLE: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const SUBSCRIPTION_INACTIVE: i32 = 10;
    pub const ALREADY_RECORDED: i32 = 11;
    pub const CODE_EXPIRED: i32 = 12;
    pub const CODE_NOT_FOUND: i32 = 13;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Verification ─────────────────────────────────────────────────

    #[error("{reason}")]
    #[diagnostic(code(mealpass::rejected))]
    Rejected {
        reason: FailureReason,
        #[help]
        hint: &'static str,
    },

    // ── Store ────────────────────────────────────────────────────────

    #[error("Record store unavailable: {reason}")]
    #[diagnostic(
        code(mealpass::store_unavailable),
        help(
            "Another counter may be holding the database. Try again in a moment.\n\
             Database: {path}"
        )
    )]
    StoreUnavailable { reason: String, path: String },

    #[error("Record store did not answer within {timeout_ms}ms")]
    #[diagnostic(
        code(mealpass::timeout),
        help("Raise [store] timeout_ms in the config file if the disk is slow.")
    )]
    Timeout { timeout_ms: u64 },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{message}")]
    #[diagnostic(code(mealpass::conflict), help("Run: mealpass students list"))]
    Conflict { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(mealpass::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(
        code(mealpass::config),
        help("Check the config file, or recreate it with: mealpass config init --force")
    )]
    Config(#[from] ConfigError),

    #[error("Configuration file already exists at {path}")]
    #[diagnostic(
        code(mealpass::config_exists),
        help("Use --force to overwrite it.")
    )]
    ConfigExists { path: String },

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Operation '{action}' requires confirmation")]
    #[diagnostic(
        code(mealpass::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Internal / IO ────────────────────────────────────────────────

    #[error("Internal error: {0}")]
    #[diagnostic(code(mealpass::internal))]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn rejection_help(reason: &FailureReason) -> &'static str {
    match reason {
        FailureReason::NotFound { .. } => "Check the card number. Run: mealpass students list",
        FailureReason::SubscriptionInactive { .. } => {
            "The subscription is switched off. Run: mealpass students activate <ID>"
        }
        FailureReason::AlreadyRecorded { .. } => "Each meal can be collected once per day.",
        FailureReason::CodeExpired => "Codes last 15 minutes by default. Ask for a new one.",
        FailureReason::CodeNotFound => "The code may have been used or revoked already.",
        FailureReason::StoreUnavailable => "Try again in a moment.",
    }
}

impl CliError {
    pub fn rejected(reason: FailureReason) -> Self {
        let hint = rejection_help(&reason);
        Self::Rejected { reason, hint }
    }

    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Rejected { reason, .. } => match reason {
                FailureReason::NotFound { .. } => exit_code::NOT_FOUND,
                FailureReason::SubscriptionInactive { .. } => exit_code::SUBSCRIPTION_INACTIVE,
                FailureReason::AlreadyRecorded { .. } => exit_code::ALREADY_RECORDED,
                FailureReason::CodeExpired => exit_code::CODE_EXPIRED,
                FailureReason::CodeNotFound => exit_code::CODE_NOT_FOUND,
                FailureReason::StoreUnavailable => exit_code::STORE_UNAVAILABLE,
            },
            Self::StoreUnavailable { .. } => exit_code::STORE_UNAVAILABLE,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Conflict { .. } | Self::ConfigExists { .. } => exit_code::CONFLICT,
            Self::Validation { .. }
            | Self::NonInteractiveRequiresYes { .. }
            | Self::Config(ConfigError::Validation { .. }) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::StoreUnavailable { reason } => CliError::StoreUnavailable {
                reason,
                path: "(see --db or [store] path)".into(),
            },
            CoreError::Timeout { timeout_ms } => CliError::Timeout { timeout_ms },
            CoreError::Validation { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },
            CoreError::Conflict { message } => CliError::Conflict { message },
            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

impl From<Rejection> for CliError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::Business(reason) => CliError::rejected(reason),
            Rejection::Store(err) => err.into(),
        }
    }
}

impl From<FailureReason> for CliError {
    fn from(reason: FailureReason) -> Self {
        CliError::rejected(reason)
    }
}
