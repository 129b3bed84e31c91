//! Engine-recognized configuration (§6), with the spec's defaults.

use crate::retry::RetryConfig;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub max_parallel_jobs_per_run: usize,
    pub retry: RetryConfig,
    pub event_replay_window: usize,
    pub kill_poll_interval_ms: u64,
    pub per_run_post_terminal_grace_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let kill_poll_interval_ms = 2_000;
        Self {
            max_parallel_jobs_per_run: 1,
            retry: RetryConfig {
                max_attempts: 3,
                base_ms: 1_000,
                cap_ms: 30_000,
                kill_poll_interval_ms,
            },
            event_replay_window: 256,
            kill_poll_interval_ms,
            per_run_post_terminal_grace_ms: 5_000,
        }
    }
}

impl EngineConfig {
    pub fn post_terminal_grace(&self) -> Duration {
        Duration::from_millis(self.per_run_post_terminal_grace_ms)
    }
}
