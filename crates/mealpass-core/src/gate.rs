// ── Subscription gate ──
//
// Eligibility rests on `is_active` alone. The subscription end date is not
// compared against the clock here; expiring students is the job of whatever
// process flips the flag.

use crate::model::{FailureReason, Student};

/// Decide whether a looked-up student may redeem a meal.
///
/// `identifier` is what the caller presented (short ID, code owner) and is
/// echoed back in `NotFound` so operators see what failed to match.
pub fn check_eligible(
    student: Option<Student>,
    identifier: impl FnOnce() -> String,
) -> Result<Student, FailureReason> {
    let Some(student) = student else {
        return Err(FailureReason::NotFound {
            identifier: identifier(),
        });
    };
    if !student.is_active {
        return Err(FailureReason::SubscriptionInactive {
            name: student.name,
        });
    }
    Ok(student)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::model::ShortId;

    #[test]
    fn missing_student_is_not_found() {
        let err = check_eligible(None, || "#42".into()).unwrap_err();
        assert_eq!(
            err,
            FailureReason::NotFound {
                identifier: "#42".into()
            }
        );
    }

    #[test]
    fn inactive_student_is_rejected() {
        let s = Student::new(ShortId::new(2), "Ravi").inactive();
        let err = check_eligible(Some(s), String::new).unwrap_err();
        assert_eq!(
            err,
            FailureReason::SubscriptionInactive {
                name: "Ravi".into()
            }
        );
    }

    #[test]
    fn active_student_passes() {
        let s = Student::new(ShortId::new(1), "Asha");
        let ok = check_eligible(Some(s.clone()), String::new).unwrap();
        assert_eq!(ok, s);
    }

    #[test]
    fn lapsed_end_date_does_not_gate_an_active_student() {
        let end = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let s = Student::new(ShortId::new(1), "Asha").with_end_date(end);
        assert!(check_eligible(Some(s), String::new).is_ok());
    }
}
