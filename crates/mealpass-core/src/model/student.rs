// ── Student domain type ──

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::id::{ShortId, UserId};

/// A subscribed student.
///
/// `is_active` is the only field the engine gates on. The end date is kept
/// for display; nothing here compares it against the clock on redemption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: UserId,
    pub short_id: ShortId,
    pub name: String,
    pub is_active: bool,
    pub subscription_end_date: Option<NaiveDate>,
    pub enrolled_at: DateTime<Utc>,
}

impl Student {
    /// Enroll a new active student with no end date.
    pub fn new(short_id: ShortId, name: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            short_id,
            name: name.into(),
            is_active: true,
            subscription_end_date: None,
            enrolled_at: Utc::now(),
        }
    }

    pub fn with_end_date(mut self, end: NaiveDate) -> Self {
        self.subscription_end_date = Some(end);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Days left on the subscription relative to `today`.
    ///
    /// Negative once the end date has passed, `None` without an end date.
    pub fn days_remaining(&self, today: NaiveDate) -> Option<i64> {
        self.subscription_end_date
            .map(|end| end.signed_duration_since(today).num_days())
    }
}
