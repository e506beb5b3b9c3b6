// ── Injectable clock ──
//
// Every time-dependent decision (slot, expiry, "today") reads the clock
// through this trait so tests can pin or advance it.

use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: ArcSwap<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: ArcSwap::from_pointee(start),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        self.now.store(Arc::new(instant));
    }

    pub fn advance(&self, by: chrono::Duration) {
        self.now.rcu(|current| Arc::new(**current + by));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        **self.now.load()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}
