// ── Outcome feed ──
//
// Subscription types for consuming verification outcomes as they happen.
// A subscriber that falls behind loses the oldest outcomes instead of
// holding up verification.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::warn;

use crate::model::VerificationOutcome;

/// Outcomes buffered per subscriber before the oldest are dropped.
pub const OUTCOME_BUFFER: usize = 256;

/// A subscription to every verification outcome the engine produces.
pub struct OutcomeStream {
    receiver: broadcast::Receiver<VerificationOutcome>,
}

impl OutcomeStream {
    pub(crate) fn new(receiver: broadcast::Receiver<VerificationOutcome>) -> Self {
        Self { receiver }
    }

    /// Wait for the next outcome.
    /// Returns `None` once the engine has been dropped.
    pub async fn next(&mut self) -> Option<VerificationOutcome> {
        loop {
            match self.receiver.recv().await {
                Ok(outcome) => return Some(outcome),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "outcome subscriber lagged, skipping ahead");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take an outcome if one is already waiting.
    pub fn try_next(&mut self) -> Option<VerificationOutcome> {
        loop {
            match self.receiver.try_recv() {
                Ok(outcome) => return Some(outcome),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "outcome subscriber lagged, skipping ahead");
                }
                Err(_) => return None,
            }
        }
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> OutcomeBroadcastStream {
        OutcomeBroadcastStream {
            inner: BroadcastStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `broadcast::Receiver`. Lag is logged and
/// skipped, never yielded.
pub struct OutcomeBroadcastStream {
    inner: BroadcastStream<VerificationOutcome>,
}

impl Stream for OutcomeBroadcastStream {
    type Item = VerificationOutcome;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(outcome))) => return Poll::Ready(Some(outcome)),
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(skipped)))) => {
                    warn!(skipped, "outcome stream lagged, skipping ahead");
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use futures_util::StreamExt;

    use super::*;
    use crate::model::FailureReason;

    fn failure(reason: FailureReason) -> VerificationOutcome {
        VerificationOutcome::Failure {
            reason,
            at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn next_ends_when_sender_drops() {
        let (tx, rx) = broadcast::channel(4);
        let mut sub = OutcomeStream::new(rx);
        tx.send(failure(FailureReason::CodeExpired)).unwrap();
        drop(tx);
        assert_eq!(
            sub.next().await.and_then(|o| o.failure_reason().cloned()),
            Some(FailureReason::CodeExpired)
        );
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn lagging_subscriber_skips_to_newest() {
        let (tx, rx) = broadcast::channel(2);
        let mut sub = OutcomeStream::new(rx);
        tx.send(failure(FailureReason::CodeExpired)).unwrap();
        tx.send(failure(FailureReason::CodeNotFound)).unwrap();
        tx.send(failure(FailureReason::StoreUnavailable)).unwrap();

        assert_eq!(
            sub.try_next().and_then(|o| o.failure_reason().cloned()),
            Some(FailureReason::CodeNotFound)
        );
    }

    #[tokio::test]
    async fn stream_adapter_skips_lag() {
        let (tx, rx) = broadcast::channel(2);
        let stream = OutcomeStream::new(rx).into_stream();
        for reason in [
            FailureReason::CodeExpired,
            FailureReason::CodeNotFound,
            FailureReason::StoreUnavailable,
        ] {
            tx.send(failure(reason)).unwrap();
        }
        drop(tx);

        let reasons: Vec<_> = stream
            .map(|o| o.failure_reason().cloned())
            .collect()
            .await;
        assert_eq!(
            reasons,
            vec![
                Some(FailureReason::CodeNotFound),
                Some(FailureReason::StoreUnavailable)
            ]
        );
    }
}
