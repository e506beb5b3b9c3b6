// ── Runtime engine configuration ──
//
// These types describe *how* the engine classifies time and talks to the
// store. They never touch disk: the CLI (via mealpass-config) builds an
// `EngineConfig` and hands it in.

use std::time::Duration;

use chrono::{FixedOffset, NaiveTime, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::model::MealSlot;

/// How wall-clock time maps onto a meal slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SlotPolicy {
    /// Everything before `hour` is lunch, everything from it on is dinner.
    Cutoff { hour: u32 },
    /// Match against the configured windows; outside both, use the window
    /// with the nearest boundary (lunch on a tie).
    Windowed,
}

impl Default for SlotPolicy {
    fn default() -> Self {
        Self::Cutoff {
            hour: DEFAULT_CUTOFF_HOUR,
        }
    }
}

pub const DEFAULT_CUTOFF_HOUR: u32 = 16;

/// Business hours and prices for the two daily meals.
///
/// The four boundaries are shown as business hours. Under the default
/// `Cutoff` policy they play no part in classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealWindowConfig {
    pub lunch_start: NaiveTime,
    pub lunch_end: NaiveTime,
    pub dinner_start: NaiveTime,
    pub dinner_end: NaiveTime,
    /// Price per lunch, whole currency units. Display only.
    pub lunch_price: u32,
    /// Price per dinner, whole currency units. Display only.
    pub dinner_price: u32,
    #[serde(default)]
    pub policy: SlotPolicy,
}

impl Default for MealWindowConfig {
    fn default() -> Self {
        Self {
            lunch_start: hm(12, 0),
            lunch_end: hm(15, 0),
            dinner_start: hm(19, 0),
            dinner_end: hm(22, 0),
            lunch_price: 60,
            dinner_price: 60,
            policy: SlotPolicy::default(),
        }
    }
}

impl MealWindowConfig {
    /// The `(start, end)` bounds of a slot's serving window.
    pub fn window(&self, slot: MealSlot) -> (NaiveTime, NaiveTime) {
        match slot {
            MealSlot::Lunch => (self.lunch_start, self.lunch_end),
            MealSlot::Dinner => (self.dinner_start, self.dinner_end),
        }
    }

    pub fn price_of(&self, slot: MealSlot) -> u32 {
        match slot {
            MealSlot::Lunch => self.lunch_price,
            MealSlot::Dinner => self.dinner_price,
        }
    }

    /// Reject windows that are empty or overlap, and out-of-range cutoffs.
    pub fn validate(&self) -> Result<(), String> {
        if self.lunch_start >= self.lunch_end {
            return Err("lunch window must start before it ends".into());
        }
        if self.dinner_start >= self.dinner_end {
            return Err("dinner window must start before it ends".into());
        }
        if self.lunch_end > self.dinner_start {
            return Err("lunch window must end before dinner starts".into());
        }
        if let SlotPolicy::Cutoff { hour } = self.policy {
            if hour == 0 || hour > 23 {
                return Err(format!("cutoff hour must be between 1 and 23, got {hour}"));
            }
        }
        Ok(())
    }
}

/// Everything the engine needs besides a store and a clock.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub windows: MealWindowConfig,
    /// Lifetime of a delegated code.
    pub code_ttl: Duration,
    /// Number of digits in a delegated code.
    pub code_length: usize,
    /// Offset of the operator's local calendar from UTC.
    pub utc_offset: FixedOffset,
    /// Upper bound on a single store round-trip.
    pub store_timeout: Duration,
    /// Extra attempts after a retryable store failure.
    pub store_retries: u32,
    /// Base delay between attempts, doubled each time.
    pub retry_backoff: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            windows: MealWindowConfig::default(),
            code_ttl: Duration::from_secs(15 * 60),
            code_length: 6,
            utc_offset: Utc.fix(),
            store_timeout: Duration::from_secs(5),
            store_retries: 2,
            retry_backoff: Duration::from_millis(100),
        }
    }
}

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(MealWindowConfig::default().validate().is_ok());
        assert_eq!(
            MealWindowConfig::default().policy,
            SlotPolicy::Cutoff { hour: 16 }
        );
    }

    #[test]
    fn default_code_lifetime_is_fifteen_minutes() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.code_ttl, Duration::from_secs(900));
        assert_eq!(cfg.code_length, 6);
    }

    #[test]
    fn rejects_inverted_window() {
        let cfg = MealWindowConfig {
            lunch_start: hm(15, 0),
            lunch_end: hm(12, 0),
            ..MealWindowConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_overlapping_windows() {
        let cfg = MealWindowConfig {
            lunch_end: hm(20, 0),
            ..MealWindowConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_cutoff_out_of_range() {
        let cfg = MealWindowConfig {
            policy: SlotPolicy::Cutoff { hour: 24 },
            ..MealWindowConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn prices_follow_slot() {
        let cfg = MealWindowConfig {
            lunch_price: 55,
            dinner_price: 70,
            ..MealWindowConfig::default()
        };
        assert_eq!(cfg.price_of(MealSlot::Lunch), 55);
        assert_eq!(cfg.price_of(MealSlot::Dinner), 70);
    }
}
