// ── Meal window resolution ──
//
// Pure mapping from local wall-clock time to a meal slot. No I/O, no clock
// reads: callers convert "now" into the operator's local time first.

use chrono::{DateTime, FixedOffset, NaiveTime, Timelike, Utc};

use crate::config::{MealWindowConfig, SlotPolicy};
use crate::model::MealSlot;

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Classify a local time of day into a meal slot. Always returns a slot.
pub fn resolve_meal_slot(now: NaiveTime, config: &MealWindowConfig) -> MealSlot {
    match config.policy {
        SlotPolicy::Cutoff { hour } => {
            if now.hour() < hour {
                MealSlot::Lunch
            } else {
                MealSlot::Dinner
            }
        }
        SlotPolicy::Windowed => resolve_windowed(now, config),
    }
}

/// Classify a UTC instant as seen from the operator's offset.
pub fn resolve_meal_slot_at(
    now: DateTime<Utc>,
    offset: FixedOffset,
    config: &MealWindowConfig,
) -> MealSlot {
    resolve_meal_slot(now.with_timezone(&offset).time(), config)
}

impl MealWindowConfig {
    /// Which serving window `now` falls inside, if any. Display only.
    pub fn serving_window(&self, now: NaiveTime) -> Option<MealSlot> {
        [MealSlot::Lunch, MealSlot::Dinner]
            .into_iter()
            .find(|slot| contains(self.window(*slot), now))
    }
}

fn resolve_windowed(now: NaiveTime, config: &MealWindowConfig) -> MealSlot {
    if let Some(slot) = config.serving_window(now) {
        return slot;
    }
    let lunch = distance_to_window(config.window(MealSlot::Lunch), now);
    let dinner = distance_to_window(config.window(MealSlot::Dinner), now);
    if dinner < lunch {
        MealSlot::Dinner
    } else {
        MealSlot::Lunch
    }
}

/// Start inclusive, end exclusive.
fn contains((start, end): (NaiveTime, NaiveTime), t: NaiveTime) -> bool {
    start <= t && t < end
}

/// Minutes from `t` to the closer edge of the window, measured around the
/// clock so that 01:00 counts as near a 22:00 dinner close.
fn distance_to_window((start, end): (NaiveTime, NaiveTime), t: NaiveTime) -> i64 {
    circular_minutes(t, start).min(circular_minutes(t, end))
}

fn circular_minutes(a: NaiveTime, b: NaiveTime) -> i64 {
    let diff = (minute_of_day(a) - minute_of_day(b)).rem_euclid(MINUTES_PER_DAY);
    diff.min(MINUTES_PER_DAY - diff)
}

fn minute_of_day(t: NaiveTime) -> i64 {
    i64::from(t.hour()) * 60 + i64::from(t.minute())
}

#[cfg(test)]
mod tests {
    use chrono::{Offset, TimeZone};

    use super::*;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN)
    }

    fn windowed() -> MealWindowConfig {
        MealWindowConfig {
            policy: SlotPolicy::Windowed,
            ..MealWindowConfig::default()
        }
    }

    #[test]
    fn cutoff_splits_at_the_hour() {
        let cfg = MealWindowConfig::default();
        assert_eq!(resolve_meal_slot(at(13, 0), &cfg), MealSlot::Lunch);
        assert_eq!(resolve_meal_slot(at(15, 59), &cfg), MealSlot::Lunch);
        assert_eq!(resolve_meal_slot(at(16, 0), &cfg), MealSlot::Dinner);
        assert_eq!(resolve_meal_slot(at(23, 59), &cfg), MealSlot::Dinner);
        assert_eq!(resolve_meal_slot(at(0, 0), &cfg), MealSlot::Lunch);
    }

    #[test]
    fn cutoff_ignores_window_bounds() {
        // 10:00 is before the lunch window opens; the cutoff policy still says lunch.
        let cfg = MealWindowConfig::default();
        assert_eq!(resolve_meal_slot(at(10, 0), &cfg), MealSlot::Lunch);
        assert_eq!(resolve_meal_slot(at(17, 0), &cfg), MealSlot::Dinner);
    }

    #[test]
    fn custom_cutoff_hour() {
        let cfg = MealWindowConfig {
            policy: SlotPolicy::Cutoff { hour: 18 },
            ..MealWindowConfig::default()
        };
        assert_eq!(resolve_meal_slot(at(17, 30), &cfg), MealSlot::Lunch);
        assert_eq!(resolve_meal_slot(at(18, 0), &cfg), MealSlot::Dinner);
    }

    #[test]
    fn resolution_is_deterministic() {
        let cfg = windowed();
        for minute in (0..MINUTES_PER_DAY).step_by(7) {
            let h = u32::try_from(minute / 60).unwrap_or(0);
            let m = u32::try_from(minute % 60).unwrap_or(0);
            let t = at(h, m);
            assert_eq!(resolve_meal_slot(t, &cfg), resolve_meal_slot(t, &cfg));
        }
    }

    #[test]
    fn windowed_matches_inside_windows() {
        let cfg = windowed();
        assert_eq!(resolve_meal_slot(at(12, 0), &cfg), MealSlot::Lunch);
        assert_eq!(resolve_meal_slot(at(14, 59), &cfg), MealSlot::Lunch);
        assert_eq!(resolve_meal_slot(at(19, 0), &cfg), MealSlot::Dinner);
        assert_eq!(resolve_meal_slot(at(21, 30), &cfg), MealSlot::Dinner);
    }

    #[test]
    fn windowed_falls_back_to_nearest_window() {
        // lunch 12:00-15:00, dinner 19:00-22:00
        let cfg = windowed();
        assert_eq!(resolve_meal_slot(at(16, 0), &cfg), MealSlot::Lunch);
        assert_eq!(resolve_meal_slot(at(18, 0), &cfg), MealSlot::Dinner);
        assert_eq!(resolve_meal_slot(at(9, 0), &cfg), MealSlot::Lunch);
        assert_eq!(resolve_meal_slot(at(1, 0), &cfg), MealSlot::Dinner);
    }

    #[test]
    fn windowed_tie_goes_to_lunch() {
        // 17:00 is two hours from lunch close and two from dinner open.
        assert_eq!(resolve_meal_slot(at(17, 0), &windowed()), MealSlot::Lunch);
    }

    #[test]
    fn serving_window_is_end_exclusive() {
        let cfg = MealWindowConfig::default();
        assert_eq!(cfg.serving_window(at(12, 0)), Some(MealSlot::Lunch));
        assert_eq!(cfg.serving_window(at(15, 0)), None);
        assert_eq!(cfg.serving_window(at(20, 0)), Some(MealSlot::Dinner));
        assert_eq!(cfg.serving_window(at(23, 0)), None);
    }

    #[test]
    fn utc_instant_is_read_in_operator_offset() {
        let cfg = MealWindowConfig::default();
        // 10:00 UTC is 15:30 in +05:30 (lunch) and 17:00 in +07:00 (dinner).
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).single().unwrap_or_default();
        let ist = FixedOffset::east_opt(5 * 3600 + 1800).unwrap_or(Utc.fix());
        let ict = FixedOffset::east_opt(7 * 3600).unwrap_or(Utc.fix());
        assert_eq!(resolve_meal_slot_at(now, ist, &cfg), MealSlot::Lunch);
        assert_eq!(resolve_meal_slot_at(now, ict, &cfg), MealSlot::Dinner);
    }
}
