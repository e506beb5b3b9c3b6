// ── In-memory record store ──
//
// Lock-free concurrent storage backed by `DashMap`. Uniqueness is enforced
// with the entry API, which holds the shard lock for the key between the
// occupancy check and the insert.

use chrono::NaiveDate;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use super::{CodeClaim, RecordStore};
use crate::error::CoreError;
use crate::model::{DelegatedCode, RecordId, RedemptionRecord, ShortId, SlotKey, Student, UserId};

/// A `RecordStore` that lives for the life of the process.
///
/// Suitable for tests and for embedding the engine where persistence is
/// handled elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Primary storage: user id -> student.
    users: DashMap<UserId, Student>,

    /// Secondary index: short id -> user id. Also the uniqueness guard.
    short_ids: DashMap<ShortId, UserId>,

    /// The ledger, keyed by the tuple that must stay unique.
    redemptions: DashMap<SlotKey, RedemptionRecord>,

    /// Primary storage: code id -> code.
    codes: DashMap<RecordId, DelegatedCode>,

    /// Secondary index: code text -> every code id ever issued with it.
    code_index: DashMap<String, Vec<RecordId>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn redemption_count(&self) -> usize {
        self.redemptions.len()
    }

    pub fn code(&self, id: RecordId) -> Option<DelegatedCode> {
        self.codes.get(&id).map(|c| c.value().clone())
    }

    /// Mirrors the foreign keys the SQLite backend declares.
    fn require_user(&self, id: UserId) -> Result<(), CoreError> {
        if self.users.contains_key(&id) {
            Ok(())
        } else {
            Err(CoreError::Validation {
                message: format!("unknown student {id}"),
            })
        }
    }
}

impl RecordStore for MemoryStore {
    async fn find_user(&self, id: UserId) -> Result<Option<Student>, CoreError> {
        Ok(self.users.get(&id).map(|s| s.value().clone()))
    }

    async fn find_user_by_short_id(&self, short_id: ShortId) -> Result<Option<Student>, CoreError> {
        let Some(id) = self.short_ids.get(&short_id).map(|r| *r.value()) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|s| s.value().clone()))
    }

    async fn insert_user(&self, student: Student) -> Result<(), CoreError> {
        // Lock order: short id first, then user id.
        match self.short_ids.entry(student.short_id) {
            Entry::Occupied(_) => Err(CoreError::Conflict {
                message: format!("short id {} is already assigned", student.short_id),
            }),
            Entry::Vacant(slot) => match self.users.entry(student.id) {
                Entry::Occupied(_) => Err(CoreError::Conflict {
                    message: format!("student {} already exists", student.id),
                }),
                Entry::Vacant(user) => {
                    slot.insert(student.id);
                    user.insert(student);
                    Ok(())
                }
            },
        }
    }

    async fn set_active(&self, id: UserId, active: bool) -> Result<bool, CoreError> {
        Ok(self
            .users
            .get_mut(&id)
            .map(|mut s| s.is_active = active)
            .is_some())
    }

    async fn list_users(&self) -> Result<Vec<Student>, CoreError> {
        let mut all: Vec<Student> = self.users.iter().map(|r| r.value().clone()).collect();
        all.sort_by_key(|s| s.short_id);
        Ok(all)
    }

    async fn insert_consumed_if_absent(&self, record: RedemptionRecord) -> Result<bool, CoreError> {
        self.require_user(record.user_id)?;
        match self.redemptions.entry(record.key()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(v) => {
                v.insert(record);
                Ok(true)
            }
        }
    }

    async fn redemptions_on(&self, date: NaiveDate) -> Result<Vec<RedemptionRecord>, CoreError> {
        let mut day: Vec<RedemptionRecord> = self
            .redemptions
            .iter()
            .filter(|r| r.key().date == date)
            .map(|r| r.value().clone())
            .collect();
        day.sort_by_key(|r| r.created_at);
        Ok(day)
    }

    async fn insert_code(&self, code: DelegatedCode) -> Result<(), CoreError> {
        self.require_user(code.user_id)?;
        match self.codes.entry(code.id) {
            Entry::Occupied(_) => Err(CoreError::Conflict {
                message: format!("code record {} already exists", code.id),
            }),
            Entry::Vacant(v) => {
                self.code_index
                    .entry(code.code.clone())
                    .or_default()
                    .push(code.id);
                v.insert(code);
                Ok(())
            }
        }
    }

    async fn find_active_code(&self, code: &str) -> Result<Option<DelegatedCode>, CoreError> {
        let Some(ids) = self.code_index.get(code).map(|r| r.value().clone()) else {
            return Ok(None);
        };
        Ok(ids
            .iter()
            .filter_map(|id| self.codes.get(id).map(|c| c.value().clone()))
            .filter(|c| !c.is_used)
            .max_by_key(|c| c.created_at))
    }

    async fn mark_code_used(&self, id: RecordId) -> Result<bool, CoreError> {
        let Some(mut code) = self.codes.get_mut(&id) else {
            return Ok(false);
        };
        if code.is_used {
            return Ok(false);
        }
        code.is_used = true;
        Ok(true)
    }

    async fn redeem_code(&self, id: RecordId, record: RedemptionRecord) -> Result<CodeClaim, CoreError> {
        self.require_user(record.user_id)?;
        // The code's shard lock is held until the ledger insert is done, so a
        // second redeemer of the same code waits and then sees it used.
        let Some(mut code) = self.codes.get_mut(&id) else {
            return Ok(CodeClaim::AlreadyUsed);
        };
        if code.is_used {
            return Ok(CodeClaim::AlreadyUsed);
        }
        code.is_used = true;

        let claim = match self.redemptions.entry(record.key()) {
            Entry::Occupied(_) => CodeClaim::AlreadyRecorded,
            Entry::Vacant(v) => {
                v.insert(record);
                CodeClaim::Recorded
            }
        };
        debug!(code_id = %id, ?claim, "code claimed");
        Ok(claim)
    }
}
