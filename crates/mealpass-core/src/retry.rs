// ── Store call policy ──
//
// Bounds every store round-trip with a timeout and retries transport
// failures with exponential backoff. Writes are retried only when the store
// reported it never got the request; after a timeout the write may already
// have landed, so it is surfaced instead of replayed.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::CoreError;

/// Timeout and retry settings applied to each store call.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    timeout: Duration,
    retries: u32,
    backoff: Duration,
}

/// Whether replaying a call after an ambiguous failure is harmless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Replay {
    Safe,
    OnlyIfUnsent,
}

impl RetryPolicy {
    pub fn new(timeout: Duration, retries: u32, backoff: Duration) -> Self {
        Self {
            timeout,
            retries,
            backoff,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.store_timeout, config.store_retries, config.retry_backoff)
    }

    /// Run a read. Retried on timeouts and transport failures.
    pub async fn read<T, F, Fut>(&self, op: &'static str, f: F) -> Result<T, CoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        self.run(op, Replay::Safe, f).await
    }

    /// Run a write. Retried only when the store was unreachable.
    pub async fn write<T, F, Fut>(&self, op: &'static str, f: F) -> Result<T, CoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        self.run(op, Replay::OnlyIfUnsent, f).await
    }

    async fn run<T, F, Fut>(&self, op: &'static str, replay: Replay, mut f: F) -> Result<T, CoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            let result = match tokio::time::timeout(self.timeout, f()).await {
                Ok(result) => result,
                Err(_) => Err(CoreError::Timeout {
                    timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                }),
            };

            let err = match result {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let replayable = match replay {
                Replay::Safe => err.is_retryable(),
                Replay::OnlyIfUnsent => matches!(err, CoreError::StoreUnavailable { .. }),
            };
            if !replayable || attempt >= self.retries {
                if replayable {
                    warn!(op, attempts = attempt + 1, error = %err, "store call failed, giving up");
                } else {
                    debug!(op, error = %err, "store call failed");
                }
                return Err(err);
            }

            let delay = self.delay(attempt);
            warn!(op, attempt = attempt + 1, ?delay, error = %err, "store call failed, retrying");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    fn delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(1_u32 << attempt.min(10))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(Duration::from_millis(50), 2, Duration::from_millis(10))
    }

    fn unavailable() -> CoreError {
        CoreError::StoreUnavailable {
            reason: "locked".into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn read_recovers_after_transient_failure() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = policy()
            .read("find_user", || {
                let calls = Arc::clone(&calls);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(unavailable())
                    } else {
                        Ok(7)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn read_gives_up_after_configured_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let result: Result<(), _> = policy()
            .read("find_user", || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(unavailable())
                }
            })
            .await;
        assert!(matches!(result, Err(CoreError::StoreUnavailable { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_call_times_out() {
        let result: Result<(), _> = RetryPolicy::new(Duration::from_millis(50), 0, Duration::ZERO)
            .read("find_user", || async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(CoreError::Timeout { timeout_ms: 50 })));
    }

    #[tokio::test(start_paused = true)]
    async fn write_is_not_replayed_after_timeout() {
        let calls = Arc::new(AtomicU32::new(0));
        let result: Result<(), _> = policy()
            .write("insert_consumed_if_absent", || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_secs(10)).await;
                    Ok(())
                }
            })
            .await;
        assert!(matches!(result, Err(CoreError::Timeout { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn write_is_replayed_when_store_was_unreachable() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = policy()
            .write("insert_consumed_if_absent", || {
                let calls = Arc::clone(&calls);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(unavailable())
                    } else {
                        Ok(true)
                    }
                }
            })
            .await;
        assert!(result.unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn business_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let result: Result<(), _> = policy()
            .read("insert_user", || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(CoreError::Conflict {
                        message: "dup".into(),
                    })
                }
            })
            .await;
        assert!(matches!(result, Err(CoreError::Conflict { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backoff_doubles() {
        let p = policy();
        assert_eq!(p.delay(0), Duration::from_millis(10));
        assert_eq!(p.delay(1), Duration::from_millis(20));
        assert_eq!(p.delay(2), Duration::from_millis(40));
    }
}
