// ── Verification orchestrator ──
//
// Entry point for the counter. Runs the direct-ID and delegated-code flows
// against the store and publishes every outcome to subscribers. Holds no
// per-request state, so one instance serves any number of concurrent
// callers.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::{CoreError, Rejection};
use crate::gate::check_eligible;
use crate::ledger::{Ledger, LedgerEntry};
use crate::model::{
    AccessMethod, DelegatedCode, FailureReason, MealSlot, RedemptionRecord, ShortId, Student,
    VerificationOutcome,
};
use crate::otp::{Issued, OtpService, Redeemed};
use crate::retry::RetryPolicy;
use crate::store::RecordStore;
use crate::stream::{OUTCOME_BUFFER, OutcomeStream};
use crate::window::resolve_meal_slot_at;

// ── Verifier ─────────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<VerifierInner>`.
pub struct Verifier<S> {
    inner: Arc<VerifierInner<S>>,
}

impl<S> Clone for Verifier<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct VerifierInner<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    config: Arc<EngineConfig>,
    ledger: Ledger<S>,
    otp: OtpService<S>,
    retry: RetryPolicy,
    outcome_tx: broadcast::Sender<VerificationOutcome>,
}

impl<S: RecordStore> Verifier<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, config: EngineConfig) -> Self {
        let config = Arc::new(config);
        let retry = RetryPolicy::from_config(&config);
        let ledger = Ledger::new(Arc::clone(&store), Arc::clone(&clock), config.utc_offset, retry);
        let otp = OtpService::new(Arc::clone(&store), Arc::clone(&clock), Arc::clone(&config));
        let (outcome_tx, _) = broadcast::channel(OUTCOME_BUFFER);

        Self {
            inner: Arc::new(VerifierInner {
                store,
                clock,
                config,
                ledger,
                otp,
                retry,
                outcome_tx,
            }),
        }
    }

    /// A verifier reading the wall clock.
    pub fn with_system_clock(store: Arc<S>, config: EngineConfig) -> Self {
        Self::new(store, Arc::new(SystemClock), config)
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.inner.store
    }

    pub fn ledger(&self) -> &Ledger<S> {
        &self.inner.ledger
    }

    pub fn otp(&self) -> &OtpService<S> {
        &self.inner.otp
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    /// Local time of day in the operator's offset.
    pub fn local_time(&self) -> NaiveTime {
        self.now().with_timezone(&self.inner.config.utc_offset).time()
    }

    /// Today in the operator's local calendar.
    pub fn today(&self) -> NaiveDate {
        self.inner.ledger.today()
    }

    /// The slot a verification right now would be logged under.
    pub fn current_slot(&self) -> MealSlot {
        self.slot_at(self.now())
    }

    fn slot_at(&self, at: DateTime<Utc>) -> MealSlot {
        resolve_meal_slot_at(at, self.inner.config.utc_offset, &self.inner.config.windows)
    }

    /// Subscribe to every outcome produced from now on.
    pub fn subscribe(&self) -> OutcomeStream {
        OutcomeStream::new(self.inner.outcome_tx.subscribe())
    }

    // ── Verification ─────────────────────────────────────────────────

    /// A student presents their own ID at the counter.
    pub async fn verify_by_short_id(&self, short_id: ShortId) -> VerificationOutcome {
        let outcome = match self.redeem_self(short_id).await {
            Ok((student, record)) => success(student, &record),
            Err(rejection) => self.failure(rejection),
        };
        self.publish(&outcome);
        outcome
    }

    /// Someone presents a delegated code on a student's behalf.
    pub async fn verify_by_code(&self, code: &str) -> VerificationOutcome {
        let outcome = match self.inner.otp.redeem_code(code).await {
            Ok(Redeemed { student, record }) => success(student, &record),
            Err(rejection) => self.failure(rejection),
        };
        self.publish(&outcome);
        outcome
    }

    async fn redeem_self(&self, short_id: ShortId) -> Result<(Student, RedemptionRecord), Rejection> {
        let found = self
            .inner
            .retry
            .read("find_user_by_short_id", || {
                self.inner.store.find_user_by_short_id(short_id)
            })
            .await?;
        let student = check_eligible(found, || format!("#{short_id}"))?;

        // One instant decides the slot, the date and the timestamp
        let now = self.now();
        let slot = self.slot_at(now);
        let entry = self
            .inner
            .ledger
            .record_consumption_at(student.id, slot, AccessMethod::SelfId, now)
            .await?;

        match entry {
            LedgerEntry::Recorded(record) => Ok((student, record)),
            LedgerEntry::AlreadyRecorded => Err(FailureReason::AlreadyRecorded {
                slot,
                name: student.name,
            }
            .into()),
        }
    }

    fn failure(&self, rejection: Rejection) -> VerificationOutcome {
        match &rejection {
            Rejection::Store(err) => warn!(error = %err, "verification aborted by store failure"),
            Rejection::Business(reason) => debug!(reason = reason.kind(), "verification rejected"),
        }
        VerificationOutcome::Failure {
            reason: rejection.into_reason(),
            at: self.now(),
        }
    }

    fn publish(&self, outcome: &VerificationOutcome) {
        // No subscribers is fine.
        let _ = self.inner.outcome_tx.send(outcome.clone());
    }

    // ── Delegated codes ──────────────────────────────────────────────

    /// Issue a delegated code for the student with this short ID.
    pub async fn issue_code(&self, short_id: ShortId) -> Result<Issued, Rejection> {
        let student = self.require_student(short_id).await?;
        let code = self.inner.otp.issue_code(student.id).await?;
        Ok(Issued { student, code })
    }

    pub async fn revoke_code(&self, code: &str) -> Result<DelegatedCode, Rejection> {
        self.inner.otp.revoke_code(code).await
    }

    // ── Students ─────────────────────────────────────────────────────

    pub async fn enroll(&self, student: Student) -> Result<Student, CoreError> {
        self.inner
            .retry
            .write("insert_user", || self.inner.store.insert_user(student.clone()))
            .await?;
        info!(short_id = %student.short_id, name = %student.name, "student enrolled");
        Ok(student)
    }

    pub async fn students(&self) -> Result<Vec<Student>, CoreError> {
        self.inner
            .retry
            .read("list_users", || self.inner.store.list_users())
            .await
    }

    pub async fn find_student(&self, short_id: ShortId) -> Result<Option<Student>, CoreError> {
        self.inner
            .retry
            .read("find_user_by_short_id", || {
                self.inner.store.find_user_by_short_id(short_id)
            })
            .await
    }

    /// Switch a student's subscription on or off.
    pub async fn set_active(&self, short_id: ShortId, active: bool) -> Result<Student, Rejection> {
        let student = self.require_student(short_id).await?;
        let updated = self
            .inner
            .retry
            .write("set_active", || self.inner.store.set_active(student.id, active))
            .await?;
        if !updated {
            return Err(FailureReason::NotFound {
                identifier: format!("#{short_id}"),
            }
            .into());
        }
        info!(%short_id, active, "subscription updated");
        Ok(Student {
            is_active: active,
            ..student
        })
    }

    async fn require_student(&self, short_id: ShortId) -> Result<Student, Rejection> {
        self.find_student(short_id).await?.ok_or_else(|| {
            FailureReason::NotFound {
                identifier: format!("#{short_id}"),
            }
            .into()
        })
    }
}

fn success(student: Student, record: &RedemptionRecord) -> VerificationOutcome {
    VerificationOutcome::Success {
        student,
        slot: record.slot,
        method: record.method,
        date: record.date,
        at: record.created_at,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Offset, TimeZone};

    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;

    fn verifier(hour: u32) -> (Verifier<MemoryStore>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 4, 14, hour, 0, 0).unwrap(),
        ));
        let v = Verifier::new(
            Arc::new(MemoryStore::new()),
            clock.clone(),
            EngineConfig::default(),
        );
        (v, clock)
    }

    #[tokio::test]
    async fn unknown_short_id_echoes_identifier() {
        let (v, _) = verifier(12);
        let outcome = v.verify_by_short_id(ShortId::new(99)).await;
        insta::assert_snapshot!(outcome.to_string(), @"No student found for #99");
    }

    #[tokio::test]
    async fn dinner_after_cutoff() {
        let (v, _) = verifier(17);
        v.enroll(Student::new(ShortId::new(1), "Asha")).await.unwrap();
        let outcome = v.verify_by_short_id(ShortId::new(1)).await;
        insta::assert_snapshot!(outcome.to_string(), @"DINNER logged for Asha");
    }

    #[tokio::test]
    async fn every_outcome_is_published() {
        let (v, _) = verifier(12);
        let mut feed = v.subscribe();
        v.verify_by_short_id(ShortId::new(5)).await;
        v.verify_by_code("000000").await;

        assert!(matches!(
            feed.next().await.unwrap().failure_reason(),
            Some(FailureReason::NotFound { .. })
        ));
        assert_eq!(
            feed.next().await.unwrap().failure_reason(),
            Some(&FailureReason::CodeNotFound)
        );
    }

    #[tokio::test]
    async fn set_active_round_trip() {
        let (v, _) = verifier(12);
        v.enroll(Student::new(ShortId::new(3), "Kiran")).await.unwrap();
        let off = v.set_active(ShortId::new(3), false).await.unwrap();
        assert!(!off.is_active);
        let outcome = v.verify_by_short_id(ShortId::new(3)).await;
        assert_eq!(
            outcome.failure_reason(),
            Some(&FailureReason::SubscriptionInactive {
                name: "Kiran".into()
            })
        );
        let missing = v.set_active(ShortId::new(4), true).await.unwrap_err();
        assert!(matches!(
            missing.into_reason(),
            FailureReason::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn issue_code_by_short_id() {
        let (v, _) = verifier(12);
        v.enroll(Student::new(ShortId::new(8), "Meera")).await.unwrap();
        let code = v.issue_code(ShortId::new(8)).await.unwrap().code;
        let outcome = v.verify_by_code(&code.code).await;
        insta::assert_snapshot!(outcome.to_string(), @"LUNCH logged for Meera via delegated code");
    }

    /// Moves forward a millisecond every time it is read.
    struct TickingClock(std::sync::Mutex<DateTime<Utc>>);

    impl Clock for TickingClock {
        fn now(&self) -> DateTime<Utc> {
            let mut now = self.0.lock().unwrap();
            let current = *now;
            *now = current + chrono::Duration::milliseconds(1);
            current
        }
    }

    #[tokio::test]
    async fn verification_across_midnight_logs_one_day() {
        let start = Utc.with_ymd_and_hms(2026, 4, 14, 23, 59, 59).unwrap()
            + chrono::Duration::milliseconds(999);
        let clock = Arc::new(TickingClock(std::sync::Mutex::new(start)));
        let v = Verifier::new(Arc::new(MemoryStore::new()), clock, EngineConfig::default());
        v.enroll(Student::new(ShortId::new(1), "Asha")).await.unwrap();

        let VerificationOutcome::Success { slot, date, at, .. } =
            v.verify_by_short_id(ShortId::new(1)).await
        else {
            panic!("expected a logged meal");
        };
        assert_eq!(date, NaiveDate::from_ymd_opt(2026, 4, 14).unwrap());
        assert_eq!(at.date_naive(), date);
        assert_eq!(slot, resolve_meal_slot_at(at, Utc.fix(), &v.config().windows));
    }

    #[tokio::test]
    async fn issued_code_names_its_student() {
        let (v, _) = verifier(12);
        v.enroll(Student::new(ShortId::new(8), "Meera")).await.unwrap();
        let issued = v.issue_code(ShortId::new(8)).await.unwrap();
        assert_eq!(issued.student.name, "Meera");
        assert_eq!(issued.code.user_id, issued.student.id);
    }
}
