// ── Record store ──
//
// The engine's only shared mutable resource. Every write that must be
// atomic is a single trait call, so backends enforce the invariants with
// their own locking or uniqueness constraints instead of the engine doing a
// read followed by a write.

mod memory;
mod sqlite;

use std::future::Future;

use chrono::NaiveDate;

use crate::error::CoreError;
use crate::model::{DelegatedCode, RecordId, RedemptionRecord, ShortId, Student, UserId};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Result of atomically claiming a code and logging its meal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeClaim {
    /// Code claimed and the meal logged.
    Recorded,
    /// Code claimed, but the slot was already logged. The code stays used.
    AlreadyRecorded,
    /// The code was already used (or revoked) by someone else. Nothing changed.
    AlreadyUsed,
}

/// Transactional record store the engine runs against.
///
/// Futures are `Send` so callers can race verifications across tasks.
pub trait RecordStore: Send + Sync + 'static {
    // ── Students ─────────────────────────────────────────────────────

    fn find_user(
        &self,
        id: UserId,
    ) -> impl Future<Output = Result<Option<Student>, CoreError>> + Send;

    fn find_user_by_short_id(
        &self,
        short_id: ShortId,
    ) -> impl Future<Output = Result<Option<Student>, CoreError>> + Send;

    /// Enroll a student. Fails with `Conflict` if the id or short id is taken.
    fn insert_user(&self, student: Student) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Flip the active flag. Returns `false` if no such student exists.
    fn set_active(
        &self,
        id: UserId,
        active: bool,
    ) -> impl Future<Output = Result<bool, CoreError>> + Send;

    /// All students, ordered by short id.
    fn list_users(&self) -> impl Future<Output = Result<Vec<Student>, CoreError>> + Send;

    // ── Ledger ───────────────────────────────────────────────────────

    /// Insert the record unless a consumed entry already exists for its
    /// (user, date, slot). Returns `true` if this call inserted it.
    ///
    /// Check and insert happen as one indivisible step.
    fn insert_consumed_if_absent(
        &self,
        record: RedemptionRecord,
    ) -> impl Future<Output = Result<bool, CoreError>> + Send;

    /// Ledger entries for a calendar date, oldest first.
    fn redemptions_on(
        &self,
        date: NaiveDate,
    ) -> impl Future<Output = Result<Vec<RedemptionRecord>, CoreError>> + Send;

    // ── Delegated codes ──────────────────────────────────────────────

    fn insert_code(&self, code: DelegatedCode) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// The newest unused code with this text, expired or not.
    fn find_active_code(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<Option<DelegatedCode>, CoreError>> + Send;

    /// Mark a code used. Returns `true` only for the call that flipped it.
    fn mark_code_used(&self, id: RecordId) -> impl Future<Output = Result<bool, CoreError>> + Send;

    /// Claim the code and insert its ledger record in one transaction.
    ///
    /// The claim sticks even when the slot turns out to be taken.
    fn redeem_code(
        &self,
        id: RecordId,
        record: RedemptionRecord,
    ) -> impl Future<Output = Result<CodeClaim, CoreError>> + Send;
}
