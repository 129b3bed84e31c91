//! Retry Executor (§4.5): wraps a single-shot `PortalAdapter::submit` with
//! bounded retries, transient/permanent classification, and backoff that
//! honours portal rate-limit hints. No control-flow-by-exception — every
//! branch switches explicitly on `oj_core::Outcome`.

use oj_adapters::{PortalAdapter, SubmitRequest};
use oj_core::{KillSwitch, Outcome};
use rand::Rng;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_ms: u64,
    pub cap_ms: u64,
    pub kill_poll_interval_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 3, base_ms: 1_000, cap_ms: 30_000, kill_poll_interval_ms: 2_000 }
    }
}

#[derive(Debug, Clone)]
pub struct RetryResult {
    /// `None` only when the run was killed before a single attempt ran.
    pub outcome: Option<Outcome>,
    pub attempts: u32,
    pub cancelled: bool,
}

pub struct RetryExecutor<'a, P: PortalAdapter + ?Sized> {
    portal: &'a P,
    config: RetryConfig,
}

impl<'a, P: PortalAdapter + ?Sized> RetryExecutor<'a, P> {
    pub fn new(portal: &'a P, config: RetryConfig) -> Self {
        Self { portal, config }
    }

    /// Runs up to `max_attempts` submit attempts. `on_attempt(attempt,
    /// outcome)` fires after every attempt so the caller can emit a
    /// `stage_update` event; it does not run for the cancelled-before-any-
    /// attempt case.
    pub async fn execute(
        &self,
        request: &SubmitRequest,
        kill: &KillSwitch,
        mut on_attempt: impl FnMut(u32, &Outcome),
    ) -> RetryResult {
        let mut timeout_used = false;

        for attempt in 1..=self.config.max_attempts {
            if kill.is_triggered() {
                return RetryResult { outcome: None, attempts: attempt - 1, cancelled: true };
            }

            let outcome = self.portal.submit(request).await;
            on_attempt(attempt, &outcome);

            let stop_retrying = match &outcome {
                Outcome::Submitted { .. } | Outcome::DuplicateAtPortal { .. } | Outcome::PermanentClient { .. } => true,
                Outcome::Timeout => {
                    if timeout_used {
                        true
                    } else {
                        timeout_used = true;
                        false
                    }
                }
                Outcome::TransientNetwork | Outcome::Transient5xx | Outcome::RateLimited { .. } => false,
            };

            if stop_retrying || attempt == self.config.max_attempts {
                return RetryResult { outcome: Some(outcome), attempts: attempt, cancelled: false };
            }

            let delay = match &outcome {
                Outcome::RateLimited { retry_after_secs: Some(secs) } => Duration::from_secs(*secs),
                _ => self.backoff_duration(attempt),
            };

            if self.cancellable_sleep(delay, kill).await {
                return RetryResult { outcome: Some(outcome), attempts: attempt, cancelled: true };
            }
        }

        unreachable!("loop always returns by the final attempt")
    }

    /// `base * 2^(attempt-1) + jitter([0, base])`, capped at `cap_ms`.
    fn backoff_duration(&self, attempt: u32) -> Duration {
        let shift = (attempt - 1).min(32);
        let raw = self.config.base_ms.saturating_mul(1u64 << shift);
        let jitter = rand::thread_rng().gen_range(0..=self.config.base_ms);
        let total = raw.saturating_add(jitter).min(self.config.cap_ms);
        Duration::from_millis(total)
    }

    /// Sleeps `duration`, polling `kill` at `kill_poll_interval_ms`
    /// cadence. Returns `true` if the kill switch fired before the sleep
    /// completed.
    async fn cancellable_sleep(&self, duration: Duration, kill: &KillSwitch) -> bool {
        let poll = Duration::from_millis(self.config.kill_poll_interval_ms);
        let mut remaining = duration;
        loop {
            if kill.is_triggered() {
                return true;
            }
            if remaining.is_zero() {
                return false;
            }
            let step = remaining.min(poll);
            tokio::time::sleep(step).await;
            remaining -= step;
        }
    }
}
