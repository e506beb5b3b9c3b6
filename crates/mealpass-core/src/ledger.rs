// ── Redemption ledger ──
//
// Append-only log of consumed meals. At most one entry per
// (student, date, slot); the check and the insert are a single store call.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::CoreError;
use crate::model::{AccessMethod, MealSlot, RecordId, RedemptionRecord, UserId};
use crate::retry::RetryPolicy;
use crate::store::{CodeClaim, RecordStore};

/// Result of asking the ledger to log a meal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "record", rename_all = "snake_case")]
pub enum LedgerEntry {
    /// This call logged the meal.
    Recorded(RedemptionRecord),
    /// The meal was already logged; nothing was written.
    AlreadyRecorded,
}

impl LedgerEntry {
    pub fn is_recorded(&self) -> bool {
        matches!(self, Self::Recorded(_))
    }
}

/// Writes and reads ledger entries through a `RecordStore`.
pub struct Ledger<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
    retry: RetryPolicy,
}

impl<S> Clone for Ledger<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            offset: self.offset,
            retry: self.retry,
        }
    }
}

impl<S: RecordStore> Ledger<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, offset: FixedOffset, retry: RetryPolicy) -> Self {
        Self {
            store,
            clock,
            offset,
            retry,
        }
    }

    /// Today in the operator's local calendar.
    pub fn today(&self) -> NaiveDate {
        self.local_date(self.clock.now())
    }

    /// The operator's calendar date at `at`.
    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }

    /// Log a consumed meal unless one already exists for the same tuple.
    pub async fn record_consumption(
        &self,
        user_id: UserId,
        date: NaiveDate,
        slot: MealSlot,
        method: AccessMethod,
    ) -> Result<LedgerEntry, CoreError> {
        let record = RedemptionRecord::consumed(user_id, date, slot, method, self.clock.now());
        self.insert(record).await
    }

    /// Log a meal consumed at `at`. The date and the timestamp both come
    /// from that one instant.
    pub async fn record_consumption_at(
        &self,
        user_id: UserId,
        slot: MealSlot,
        method: AccessMethod,
        at: DateTime<Utc>,
    ) -> Result<LedgerEntry, CoreError> {
        let record = RedemptionRecord::consumed(user_id, self.local_date(at), slot, method, at);
        self.insert(record).await
    }

    /// `record_consumption_at` for the current instant.
    pub async fn record_consumption_today(
        &self,
        user_id: UserId,
        slot: MealSlot,
        method: AccessMethod,
    ) -> Result<LedgerEntry, CoreError> {
        self.record_consumption_at(user_id, slot, method, self.clock.now())
            .await
    }

    async fn insert(&self, record: RedemptionRecord) -> Result<LedgerEntry, CoreError> {
        let inserted = self
            .retry
            .write("insert_consumed_if_absent", || {
                self.store.insert_consumed_if_absent(record.clone())
            })
            .await?;

        let (user, date, slot) = (record.user_id, record.date, record.slot);
        if inserted {
            info!(%user, %date, %slot, method = %record.method, "meal recorded");
            Ok(LedgerEntry::Recorded(record))
        } else {
            debug!(%user, %date, %slot, "meal already recorded");
            Ok(LedgerEntry::AlreadyRecorded)
        }
    }

    /// Claim a delegated code and log its meal, consumed at `at`, in one
    /// store transaction.
    ///
    /// Returns the claim result together with the record that was (or would
    /// have been) written.
    pub async fn record_with_code(
        &self,
        code_id: RecordId,
        user_id: UserId,
        slot: MealSlot,
        at: DateTime<Utc>,
    ) -> Result<(CodeClaim, RedemptionRecord), CoreError> {
        let date = self.local_date(at);
        let record =
            RedemptionRecord::consumed(user_id, date, slot, AccessMethod::DelegatedCode, at);
        let claim = self
            .retry
            .write("redeem_code", || self.store.redeem_code(code_id, record.clone()))
            .await?;

        if claim == CodeClaim::Recorded {
            info!(user = %user_id, %date, %slot, code_id = %code_id, "meal recorded via code");
        }
        Ok((claim, record))
    }

    /// Every entry logged on `date`, oldest first.
    pub async fn entries_on(&self, date: NaiveDate) -> Result<Vec<RedemptionRecord>, CoreError> {
        self.retry
            .read("redemptions_on", || self.store.redemptions_on(date))
            .await
    }
}
