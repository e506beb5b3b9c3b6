// ── Domain model ──
//
// Canonical types shared by the engine, the store backends and consumers.

pub mod code;
pub mod id;
pub mod meal;
pub mod outcome;
pub mod student;

pub use code::{CodeState, DelegatedCode};
pub use id::{RecordId, ShortId, UserId};
pub use meal::{AccessMethod, MealSlot, RedemptionRecord, RedemptionStatus, SlotKey};
pub use outcome::{FailureReason, VerificationOutcome};
pub use student::Student;
