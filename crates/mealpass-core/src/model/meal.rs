// ── Meal slots and ledger entries ──

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use super::id::{RecordId, UserId};

/// One of the two daily meal periods.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum MealSlot {
    Lunch,
    Dinner,
}

/// How a meal was redeemed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum AccessMethod {
    /// The student presented their own ID at the counter.
    SelfId,
    /// A third party presented a one-time code on the student's behalf.
    DelegatedCode,
}

/// Ledger entry status. The engine only ever writes `Consumed`.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum RedemptionStatus {
    #[default]
    Consumed,
}

/// The (user, date, slot) tuple the ledger keeps unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotKey {
    pub user_id: UserId,
    pub date: NaiveDate,
    pub slot: MealSlot,
}

/// An append-only ledger entry recording one consumed meal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedemptionRecord {
    pub id: RecordId,
    pub user_id: UserId,
    pub date: NaiveDate,
    pub slot: MealSlot,
    pub status: RedemptionStatus,
    pub method: AccessMethod,
    pub created_at: DateTime<Utc>,
}

impl RedemptionRecord {
    /// Build a fresh `Consumed` entry stamped at `created_at`.
    pub fn consumed(
        user_id: UserId,
        date: NaiveDate,
        slot: MealSlot,
        method: AccessMethod,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RecordId::new(),
            user_id,
            date,
            slot,
            status: RedemptionStatus::Consumed,
            method,
            created_at,
        }
    }

    pub fn key(&self) -> SlotKey {
        SlotKey {
            user_id: self.user_id,
            date: self.date,
            slot: self.slot,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn slots_render_upper_case() {
        assert_eq!(MealSlot::Lunch.to_string(), "LUNCH");
        assert_eq!(MealSlot::Dinner.as_ref(), "DINNER");
        assert_eq!(AccessMethod::DelegatedCode.to_string(), "DELEGATED_CODE");
    }

    #[test]
    fn slots_parse_case_insensitively() {
        assert_eq!("lunch".parse::<MealSlot>().unwrap(), MealSlot::Lunch);
        assert_eq!("DINNER".parse::<MealSlot>().unwrap(), MealSlot::Dinner);
        assert!("brunch".parse::<MealSlot>().is_err());
    }

    #[test]
    fn serde_matches_display() {
        let json = serde_json::to_string(&AccessMethod::SelfId).unwrap();
        assert_eq!(json, "\"SELF_ID\"");
    }

    #[test]
    fn record_key_mirrors_fields() {
        let user = UserId::new();
        let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let rec =
            RedemptionRecord::consumed(user, date, MealSlot::Dinner, AccessMethod::SelfId, Utc::now());
        assert_eq!(
            rec.key(),
            SlotKey {
                user_id: user,
                date,
                slot: MealSlot::Dinner
            }
        );
        assert_eq!(rec.status, RedemptionStatus::Consumed);
    }
}
