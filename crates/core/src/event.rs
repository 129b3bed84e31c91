//! Event Bus payloads: the ordered record of a Run's progress (§3, §4.8).

use crate::id::{ConfirmationId, JobId};
use crate::record::ApplicationStatus;
use serde::{Deserialize, Serialize};

/// One entry in a Run's event log. `seq` is assigned by the Event Bus at
/// publish time and is strictly increasing within a user's Run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub seq: u64,
    pub ts_epoch_ms: u64,
    #[serde(flatten)]
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    WorkflowStarted { total_jobs: Option<u32> },
    StageUpdate {
        job_id: Option<JobId>,
        stage: String,
        current_index: u32,
        total_jobs: u32,
        attempt: Option<u32>,
    },
    JobsFetched { total_jobs: u32 },
    JobProcessing { job_id: JobId, current_index: u32, total_jobs: u32 },
    ApplicationResult {
        job_id: JobId,
        status: ApplicationStatus,
        confirmation_id: Option<ConfirmationId>,
        error: Option<String>,
    },
    JobSkipped {
        job_id: JobId,
        reason: String,
        current_index: u32,
        total_jobs: u32,
    },
    WorkflowCompleted {
        submitted_count: u32,
        failed_count: u32,
        skipped_count: u32,
        status: String,
    },
    WorkflowFailed { error: String },
}

impl EventKind {
    /// Short machine-readable tag, used for SSE `type` framing and logging.
    pub fn tag(&self) -> &'static str {
        match self {
            EventKind::WorkflowStarted { .. } => "workflow_started",
            EventKind::StageUpdate { .. } => "stage_update",
            EventKind::JobsFetched { .. } => "jobs_fetched",
            EventKind::JobProcessing { .. } => "job_processing",
            EventKind::ApplicationResult { .. } => "application_result",
            EventKind::JobSkipped { .. } => "job_skipped",
            EventKind::WorkflowCompleted { .. } => "workflow_completed",
            EventKind::WorkflowFailed { .. } => "workflow_failed",
        }
    }

    /// Terminal events end a Run's live stream; after one, the Event Bus
    /// starts its post-terminal grace period.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventKind::WorkflowCompleted { .. } | EventKind::WorkflowFailed { .. })
    }
}
