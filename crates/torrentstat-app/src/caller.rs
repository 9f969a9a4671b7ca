//! Bounded retry around [`RpcClient::call`].
//!
//! # Design
//! - Only reconnect failures are retried; every other error is returned at once.
//! - The backoff sleep blocks the caller, so the collection loop never overlaps polls.
//! - Exhaustion is reported as [`RetryOutcome::Exhausted`], not as an error.

use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use torrentstat_config::{ScheduleSettings, defaults};
use torrentstat_core::{RpcClient, RpcError};
use torrentstat_telemetry::Metrics;
use tracing::{debug, warn};

/// How often and how patiently a call is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per call, including the first. Values below one are treated as one.
    pub attempts: u32,
    /// Pause after each reconnect failure that is followed by another attempt.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Build a policy from explicit values.
    #[must_use]
    pub const fn new(attempts: u32, backoff: Duration) -> Self {
        Self { attempts, backoff }
    }

    /// Retry policy configured for the collector.
    #[must_use]
    pub const fn from_schedule(schedule: &ScheduleSettings) -> Self {
        Self::new(schedule.retry_attempts, schedule.retry_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(defaults::RETRY_ATTEMPTS, defaults::RETRY_BACKOFF)
    }
}

/// Result of a retried call that did not hit a fatal error.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome {
    /// The call returned a value.
    Completed(Value),
    /// Every attempt ended in a reconnect failure.
    Exhausted {
        /// Attempts made before giving up.
        attempts: u32,
    },
    /// Shutdown was requested before the call could complete.
    Cancelled,
}

/// RPC client wrapper that rides out transient disconnects.
pub struct ResilientCaller<C> {
    client: C,
    policy: RetryPolicy,
    metrics: Metrics,
    shutdown: CancellationToken,
}

impl<C: RpcClient> ResilientCaller<C> {
    /// Wrap `client`; `shutdown` interrupts pending backoff sleeps.
    #[must_use]
    pub const fn new(
        client: C,
        policy: RetryPolicy,
        metrics: Metrics,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            client,
            policy,
            metrics,
            shutdown,
        }
    }

    /// Borrow the wrapped client.
    #[must_use]
    pub const fn client(&self) -> &C {
        &self.client
    }

    /// Token that cancels pending retries.
    #[must_use]
    pub const fn shutdown(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Invoke `method` with `args`, retrying after reconnect failures.
    ///
    /// # Errors
    ///
    /// Returns the first error that is not a reconnect failure.
    pub async fn call_retry(
        &self,
        method: &str,
        args: &[Value],
    ) -> Result<RetryOutcome, RpcError> {
        let attempts = self.policy.attempts.max(1);
        for attempt in 1..=attempts {
            if self.shutdown.is_cancelled() {
                return Ok(RetryOutcome::Cancelled);
            }

            let err = match self.client.call(method, args).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(method, attempt, "rpc call recovered after reconnect");
                    }
                    return Ok(RetryOutcome::Completed(value));
                }
                Err(err) if err.is_reconnect_failure() => err,
                Err(err) => return Err(err),
            };

            if attempt == attempts {
                warn!(method, attempts, error = %err, "rpc retries exhausted");
                self.metrics.inc_rpc_exhausted();
                return Ok(RetryOutcome::Exhausted { attempts });
            }

            warn!(
                method,
                attempt,
                attempts,
                backoff_secs = self.policy.backoff.as_secs(),
                error = %err,
                "rpc reconnect failed; retrying after backoff"
            );
            self.metrics.inc_rpc_retry();
            tokio::select! {
                () = self.shutdown.cancelled() => return Ok(RetryOutcome::Cancelled),
                () = tokio::time::sleep(self.policy.backoff) => {}
            }
        }
        Ok(RetryOutcome::Exhausted { attempts })
    }
}
