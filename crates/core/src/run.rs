//! Run: the Workflow Engine's per-user state snapshot (§3).

use crate::id::UserId;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
    Stopped,
}

crate::simple_display! {
    RunStatus {
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Stopped => "stopped",
    }
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

/// Level-triggered cancellation flag shared between the HTTP surface's
/// `Stop` handler and the Run's task. Cheap to clone; `Stop` sets it and
/// returns immediately without waiting for the task to observe it.
#[derive(Debug, Clone, Default)]
pub struct KillSwitch(Arc<AtomicBool>);

impl KillSwitch {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A read-only snapshot of a Run, returned by `Status` and embedded in
/// terminal events. Cheap to clone; produced from the live Run state under
/// its per-user lock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub user_id: UserId,
    pub status: RunStatus,
    pub started_at_epoch_ms: u64,
    pub cursor: u32,
    pub total: u32,
    pub submitted_count: u32,
    pub failed_count: u32,
    pub skipped_count: u32,
    pub kill_requested: bool,
    #[serde(default)]
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kill_switch_starts_untriggered() {
        let kill = KillSwitch::new();
        assert!(!kill.is_triggered());
        kill.trigger();
        assert!(kill.is_triggered());
    }

    #[test]
    fn kill_switch_clone_shares_state() {
        let kill = KillSwitch::new();
        let clone = kill.clone();
        clone.trigger();
        assert!(kill.is_triggered());
    }

    #[test]
    fn only_running_is_non_terminal() {
        assert!(!RunStatus::Running.is_terminal());
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(RunStatus::Stopped.is_terminal());
    }
}
