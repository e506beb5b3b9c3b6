// ── Delegated code lifecycle ──
//
// Issue, redeem and revoke the short numeric codes a student hands to
// someone collecting a meal for them. Redemption claims the code and logs the
// meal in one store call; a code that loses that race is reported as not
// found.

use std::sync::Arc;

use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::{CoreError, Rejection};
use crate::gate::check_eligible;
use crate::ledger::Ledger;
use crate::model::{DelegatedCode, FailureReason, RedemptionRecord, Student, UserId};
use crate::retry::RetryPolicy;
use crate::store::{CodeClaim, RecordStore};
use crate::window::resolve_meal_slot_at;

/// A successful code redemption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Redeemed {
    pub student: Student,
    pub record: RedemptionRecord,
}

/// A freshly issued code and the student it was issued for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issued {
    pub student: Student,
    pub code: DelegatedCode,
}

/// Random string of `len` decimal digits. Leading zeros are kept.
pub fn generate_code(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| char::from(b'0' + rng.gen_range(0..10_u8)))
        .collect()
}

pub struct OtpService<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    config: Arc<EngineConfig>,
    ledger: Ledger<S>,
    retry: RetryPolicy,
}

impl<S> Clone for OtpService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            config: Arc::clone(&self.config),
            ledger: self.ledger.clone(),
            retry: self.retry,
        }
    }
}

impl<S: RecordStore> OtpService<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, config: Arc<EngineConfig>) -> Self {
        let retry = RetryPolicy::from_config(&config);
        let ledger = Ledger::new(Arc::clone(&store), Arc::clone(&clock), config.utc_offset, retry);
        Self {
            store,
            clock,
            config,
            ledger,
            retry,
        }
    }

    /// Issue a fresh code for a student. Codes are not checked for
    /// uniqueness; redemption picks the newest unused match.
    pub async fn issue_code(&self, user_id: UserId) -> Result<DelegatedCode, Rejection> {
        let owner = self
            .retry
            .read("find_user", || self.store.find_user(user_id))
            .await?;
        if owner.is_none() {
            return Err(FailureReason::NotFound {
                identifier: user_id.to_string(),
            }
            .into());
        }

        let ttl = chrono::Duration::from_std(self.config.code_ttl)
            .map_err(|e| CoreError::Validation {
                message: format!("code ttl out of range: {e}"),
            })?;
        let code = DelegatedCode::new(
            generate_code(self.config.code_length),
            user_id,
            self.clock.now(),
            ttl,
        );
        self.retry
            .write("insert_code", || self.store.insert_code(code.clone()))
            .await?;

        info!(user = %user_id, expires_at = %code.expires_at, "delegated code issued");
        Ok(code)
    }

    /// Redeem a code for the current meal slot.
    pub async fn redeem_code(&self, code: &str) -> Result<Redeemed, Rejection> {
        let code = code.trim();
        let now = self.clock.now();

        let found = self
            .retry
            .read("find_active_code", || self.store.find_active_code(code))
            .await?;
        let Some(found) = found else {
            debug!("no unused code matches");
            return Err(FailureReason::CodeNotFound.into());
        };
        if found.is_expired_at(now) {
            debug!(code_id = %found.id, expires_at = %found.expires_at, "code expired");
            return Err(FailureReason::CodeExpired.into());
        }

        let owner = self
            .retry
            .read("find_user", || self.store.find_user(found.user_id))
            .await?;
        let student = check_eligible(owner, || found.user_id.to_string())?;

        let slot = resolve_meal_slot_at(now, self.config.utc_offset, &self.config.windows);
        let (claim, record) = self
            .ledger
            .record_with_code(found.id, student.id, slot, now)
            .await?;

        match claim {
            CodeClaim::Recorded => Ok(Redeemed { student, record }),
            CodeClaim::AlreadyRecorded => Err(FailureReason::AlreadyRecorded {
                slot,
                name: student.name,
            }
            .into()),
            CodeClaim::AlreadyUsed => Err(FailureReason::CodeNotFound.into()),
        }
    }

    /// Cancel an outstanding code. Expired codes can be revoked too.
    pub async fn revoke_code(&self, code: &str) -> Result<DelegatedCode, Rejection> {
        let code = code.trim();
        let found = self
            .retry
            .read("find_active_code", || self.store.find_active_code(code))
            .await?
            .ok_or(FailureReason::CodeNotFound)?;

        let flipped = self
            .retry
            .write("mark_code_used", || self.store.mark_code_used(found.id))
            .await?;
        if !flipped {
            return Err(FailureReason::CodeNotFound.into());
        }

        info!(code_id = %found.id, user = %found.user_id, "delegated code revoked");
        Ok(DelegatedCode {
            is_used: true,
            ..found
        })
    }
}
