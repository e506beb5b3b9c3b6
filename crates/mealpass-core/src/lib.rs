// mealpass-core: Meal redemption and verification engine for canteen subscriptions.

pub mod clock;
pub mod config;
pub mod error;
pub mod gate;
pub mod ledger;
pub mod model;
pub mod otp;
pub mod retry;
pub mod store;
pub mod stream;
pub mod verifier;
pub mod window;

// ── Primary re-exports ──────────────────────────────────────────────
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DEFAULT_CUTOFF_HOUR, EngineConfig, MealWindowConfig, SlotPolicy};
pub use error::{CoreError, Rejection};
pub use gate::check_eligible;
pub use ledger::{Ledger, LedgerEntry};
pub use otp::{Issued, OtpService, Redeemed, generate_code};
pub use retry::RetryPolicy;
pub use store::{CodeClaim, MemoryStore, RecordStore, SqliteStore};
pub use stream::{OutcomeBroadcastStream, OutcomeStream};
pub use verifier::Verifier;
pub use window::{resolve_meal_slot, resolve_meal_slot_at};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    AccessMethod, CodeState, DelegatedCode, FailureReason, MealSlot, RecordId, RedemptionRecord,
    RedemptionStatus, ShortId, SlotKey, Student, UserId, VerificationOutcome,
};
