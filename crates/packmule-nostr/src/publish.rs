//! Publish with per-relay outcome accounting and bounded retry.

use std::time::Duration;

use nostr_sdk::EventBuilder;
use tracing::{debug, warn};

use crate::pool::RelayPool;

/// Overall wait for one publish attempt across all relays.
const PUBLISH_TIMEOUT: Duration = Duration::from_secs(10);

/// Retries after a total failure (all relays rejected).
const MAX_RETRIES: u32 = 2;

/// Base delay between retries; scaled linearly by attempt number.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Aggregated result of a publish workflow.
///
/// Relay endpoints fail independently; partial acceptance is the normal
/// case, not an error, so outcomes are counted rather than collapsed into
/// all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishOutcome {
    /// Relays that accepted the event.
    pub success: usize,
    /// Relays that rejected the event within the attempt window.
    pub failed: usize,
    /// Attempts made, including the first.
    pub attempts: u32,
    /// The last attempt hit the overall timeout; unresolved relays may
    /// still deliver asynchronously.
    pub timed_out: bool,
}

impl PublishOutcome {
    /// At least one relay confirmed acceptance.
    pub fn delivered(&self) -> bool {
        self.success > 0
    }

    /// Whether a further attempt is warranted: every relay answered and all
    /// of them rejected. A timeout is fire-and-forget, not retried.
    fn total_failure(&self) -> bool {
        self.success == 0 && self.failed > 0 && !self.timed_out
    }
}

/// Sends signed events to every configured relay and retries on total
/// failure with linear backoff.
#[derive(Clone)]
pub struct PublishGateway {
    pool: RelayPool,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
}

impl PublishGateway {
    pub fn new(pool: RelayPool) -> Self {
        Self {
            pool,
            timeout: PUBLISH_TIMEOUT,
            max_retries: MAX_RETRIES,
            retry_delay: RETRY_DELAY,
        }
    }

    /// Sign and publish the event to all relays.
    ///
    /// Never fails hard: delivery is fire-and-forget from the caller's point
    /// of view, and exhausted retries are logged and surfaced in the
    /// returned outcome.
    pub async fn publish(&self, builder: EventBuilder) -> PublishOutcome {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            // Re-read the pool each attempt: the supervisor may have swapped
            // the client under us during the backoff sleep.
            let client = self.pool.client().await;

            let outcome = match tokio::time::timeout(
                self.timeout,
                client.send_event_builder(builder.clone()),
            )
            .await
            {
                Ok(Ok(output)) => PublishOutcome {
                    success: output.success.len(),
                    failed: output.failed.len(),
                    attempts: attempt,
                    timed_out: false,
                },
                Ok(Err(err)) => {
                    warn!(error = %err, attempt, "publish attempt failed");
                    PublishOutcome {
                        success: 0,
                        failed: self.pool.relay_count(),
                        attempts: attempt,
                        timed_out: false,
                    }
                }
                Err(_) => {
                    warn!(attempt, "publish timed out; relays may still deliver");
                    PublishOutcome {
                        success: 0,
                        failed: 0,
                        attempts: attempt,
                        timed_out: true,
                    }
                }
            };

            if !outcome.total_failure() {
                debug!(
                    success = outcome.success,
                    failed = outcome.failed,
                    attempts = outcome.attempts,
                    "publish finished"
                );
                return outcome;
            }
            if attempt > self.max_retries {
                warn!(attempts = attempt, "publish retries exhausted, giving up");
                return outcome;
            }

            // Linear backoff: RETRY_DELAY, 2 * RETRY_DELAY, ...
            tokio::time::sleep(self.retry_delay * attempt).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_success_is_delivery() {
        let outcome = PublishOutcome {
            success: 1,
            failed: 3,
            attempts: 1,
            timed_out: false,
        };
        assert!(outcome.delivered());
        assert!(!outcome.total_failure());
    }

    #[test]
    fn test_total_failure_warrants_retry() {
        let outcome = PublishOutcome {
            success: 0,
            failed: 4,
            attempts: 1,
            timed_out: false,
        };
        assert!(!outcome.delivered());
        assert!(outcome.total_failure());
    }

    #[test]
    fn test_timeout_is_fire_and_forget() {
        let outcome = PublishOutcome {
            success: 0,
            failed: 0,
            attempts: 1,
            timed_out: true,
        };
        assert!(!outcome.delivered());
        assert!(!outcome.total_failure());
    }
}
