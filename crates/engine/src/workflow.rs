//! Workflow Engine (§4.1): owns one Run per user, drives the ranked job
//! queue through the per-job stage machine, and publishes Events at every
//! boundary.

use crate::event_bus::EventBus;
use crate::gate::{GateDecision, PolicyGate};
use crate::grounder;
use crate::ranker::Ranker;
use crate::retry::RetryExecutor;
use crate::EngineConfig;
use futures::Stream;
use oj_adapters::{JobFilters, Personalizer, PortalAdapter, SubmitRequest};
use oj_core::{
    ApplicationRecord, ApplicationStatus, Clock, EngineError, Event, EventKind, Job, JobId,
    KillSwitch, Match, Outcome, Policy, Profile, RunSnapshot, RunStatus, UserId,
};
use oj_storage::Tracker;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;

struct RunHandle {
    snapshot: Arc<RwLock<RunSnapshot>>,
    kill: KillSwitch,
    // Kept alive for the Run's lifetime; dropping the engine drops this and
    // detaches (not aborts) the task.
    _task: JoinHandle<()>,
}

/// The single entry point for the HTTP surface's `/workflow/*` routes.
pub struct WorkflowEngine<C: Clock + 'static> {
    portal: Arc<dyn PortalAdapter>,
    personalizer: Arc<dyn Personalizer>,
    ranker: Arc<Ranker>,
    tracker: Arc<dyn Tracker>,
    event_bus: Arc<EventBus>,
    clock: C,
    config: EngineConfig,
    runs: RwLock<HashMap<UserId, RunHandle>>,
}

impl<C: Clock + 'static> WorkflowEngine<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        portal: Arc<dyn PortalAdapter>,
        personalizer: Arc<dyn Personalizer>,
        ranker: Arc<Ranker>,
        tracker: Arc<dyn Tracker>,
        event_bus: Arc<EventBus>,
        clock: C,
        config: EngineConfig,
    ) -> Self {
        Self { portal, personalizer, ranker, tracker, event_bus, clock, config, runs: RwLock::new(HashMap::new()) }
    }

    /// `Start`: rejects with `AlreadyRunning` if a Run for this user is
    /// still in progress; otherwise creates the Run and returns
    /// immediately while the job loop proceeds on a spawned task.
    pub fn start(self: &Arc<Self>, user_id: UserId, profile: Profile, policy: Policy) -> Result<(), EngineError> {
        {
            let runs = self.runs.read();
            if let Some(handle) = runs.get(&user_id) {
                if !handle.snapshot.read().status.is_terminal() {
                    return Err(EngineError::AlreadyRunning);
                }
            }
        }

        let kill = KillSwitch::new();
        let started_at = self.clock.epoch_ms();
        let snapshot = Arc::new(RwLock::new(RunSnapshot {
            user_id: user_id.clone(),
            status: RunStatus::Running,
            started_at_epoch_ms: started_at,
            cursor: 0,
            total: 0,
            submitted_count: 0,
            failed_count: 0,
            skipped_count: 0,
            kill_requested: false,
            errors: Vec::new(),
        }));

        tracing::info!(%user_id, "run started");
        self.event_bus.start_run(&user_id);
        self.event_bus
            .publish(&user_id, EventKind::WorkflowStarted { total_jobs: None }, started_at);

        let engine = Arc::clone(self);
        let task_user_id = user_id.clone();
        let task_snapshot = Arc::clone(&snapshot);
        let task_kill = kill.clone();
        let task = tokio::spawn(async move {
            engine.run_job_loop(task_user_id, profile, policy, task_snapshot, task_kill).await;
        });

        self.runs.write().insert(user_id, RunHandle { snapshot, kill, _task: task });
        Ok(())
    }

    /// `Stop`: level-triggered, returns immediately without waiting for the
    /// Run's task to observe the flag.
    pub fn stop(&self, user_id: &UserId) -> Result<(), EngineError> {
        let runs = self.runs.read();
        let handle = runs.get(user_id).ok_or(EngineError::NotFound)?;
        handle.kill.trigger();
        handle.snapshot.write().kill_requested = true;
        tracing::info!(%user_id, "run stop requested");
        Ok(())
    }

    pub fn status(&self, user_id: &UserId) -> Result<RunSnapshot, EngineError> {
        let runs = self.runs.read();
        let handle = runs.get(user_id).ok_or(EngineError::NotFound)?;
        Ok(handle.snapshot.read().clone())
    }

    pub fn subscribe(&self, user_id: &UserId) -> Result<impl Stream<Item = Event> + Send + 'static, EngineError> {
        if !self.runs.read().contains_key(user_id) {
            return Err(EngineError::NotFound);
        }
        Ok(self.event_bus.subscribe(user_id))
    }

    async fn run_job_loop(
        self: Arc<Self>,
        user_id: UserId,
        profile: Profile,
        policy: Policy,
        snapshot: Arc<RwLock<RunSnapshot>>,
        kill: KillSwitch,
    ) {
        let result = self.drive(&user_id, &profile, &policy, &snapshot, &kill).await;
        let now = self.clock.epoch_ms();

        let final_status = match &result {
            Ok(status) => *status,
            Err(_) => RunStatus::Failed,
        };

        {
            let mut snap = snapshot.write();
            snap.status = final_status;
            if let Err(message) = &result {
                snap.errors.push(message.clone());
            }
        }

        let snap = snapshot.read().clone();
        match result {
            Ok(status) => {
                tracing::info!(
                    %user_id,
                    status = %status,
                    submitted = snap.submitted_count,
                    failed = snap.failed_count,
                    skipped = snap.skipped_count,
                    "run finished"
                );
                self.event_bus.publish(
                    &user_id,
                    EventKind::WorkflowCompleted {
                        submitted_count: snap.submitted_count,
                        failed_count: snap.failed_count,
                        skipped_count: snap.skipped_count,
                        status: status.to_string(),
                    },
                    now,
                );
            }
            Err(message) => {
                tracing::error!(%user_id, error = %message, "run failed");
                self.event_bus.publish(&user_id, EventKind::WorkflowFailed { error: message }, now);
            }
        }
    }

    /// The stage machine. `Ok` carries the Run's final status
    /// (`Completed`/`Stopped`); `Err` is reserved for the top-level-loop
    /// bugs that transition the Run to `Failed` (§4.1d) — per-job failures
    /// never propagate here.
    async fn drive(
        &self,
        user_id: &UserId,
        profile: &Profile,
        policy: &Policy,
        snapshot: &Arc<RwLock<RunSnapshot>>,
        kill: &KillSwitch,
    ) -> Result<RunStatus, String> {
        let jobs = self
            .portal
            .list_jobs(&JobFilters { keywords: None, location: policy.required_location.clone() })
            .await
            .map_err(|e| format!("list_jobs failed: {e}"))?;

        let matches = self
            .ranker
            .rank(&profile.summary(), &profile.coverage_tokens(), &jobs, policy)
            .await;

        let jobs_by_id: HashMap<JobId, Job> = jobs.into_iter().map(|j| (j.id.clone(), j)).collect();
        let total = matches.len() as u32;

        {
            let mut snap = snapshot.write();
            snap.total = total;
        }
        self.event_bus
            .publish(user_id, EventKind::JobsFetched { total_jobs: total }, self.clock.epoch_ms());

        for (idx, candidate) in matches.iter().enumerate() {
            let current_index = idx as u32 + 1;

            if kill.is_triggered() {
                return Ok(RunStatus::Stopped);
            }

            let Some(job) = jobs_by_id.get(&candidate.job_id) else { continue };

            self.event_bus.publish(
                user_id,
                EventKind::JobProcessing { job_id: job.id.clone(), current_index, total_jobs: total },
                self.clock.epoch_ms(),
            );

            let submitted_today = self.tracker.count_submitted_since(user_id, self.clock.epoch_ms());
            let decision = PolicyGate::pre_personalize(policy, kill, job, candidate, submitted_today, 0);

            match decision {
                GateDecision::Stop(reason) => {
                    tracing::info!(%user_id, job_id = %job.id, reason, "run stopped by policy gate");
                    if reason == "daily_cap_reached" {
                        return Ok(RunStatus::Completed);
                    }
                    return Ok(RunStatus::Stopped);
                }
                GateDecision::Skip(reason) => {
                    tracing::info!(%user_id, job_id = %job.id, reason, "job skipped by policy gate");
                    self.record_skip(user_id, job, candidate, reason, current_index, total, snapshot);
                    continue;
                }
                GateDecision::Allow => {}
            }

            self.event_bus.publish(
                user_id,
                EventKind::StageUpdate {
                    job_id: Some(job.id.clone()),
                    stage: "personalizing".into(),
                    current_index,
                    total_jobs: total,
                    attempt: None,
                },
                self.clock.epoch_ms(),
            );

            let personalization = match self.personalizer.personalize(profile, job).await {
                Ok(output) => grounder::ground(profile, job.id.clone(), output),
                Err(error) => {
                    tracing::warn!(%user_id, job_id = %job.id, %error, "personalization failed");
                    self.record_failure(user_id, job, candidate, "personalization_failed", current_index, total, snapshot);
                    continue;
                }
            };

            self.event_bus.publish(
                user_id,
                EventKind::StageUpdate {
                    job_id: Some(job.id.clone()),
                    stage: "grounding".into(),
                    current_index,
                    total_jobs: total,
                    attempt: None,
                },
                self.clock.epoch_ms(),
            );

            if let GateDecision::Skip(reason) = PolicyGate::post_ground(&personalization) {
                tracing::warn!(%user_id, job_id = %job.id, reason, "ungrounded personalization rejected");
                self.record_skip(user_id, job, candidate, reason, current_index, total, snapshot);
                continue;
            }

            let request = SubmitRequest {
                job_id: job.id.clone(),
                user_id: user_id.clone(),
                cover_letter: personalization.cover_letter.clone(),
                idempotency_token: SubmitRequest::idempotency_token_for(user_id, &job.id),
            };

            let retry_executor = RetryExecutor::new(self.portal.as_ref(), self.config.retry.clone());
            let result = retry_executor
                .execute(&request, kill, |attempt, outcome| {
                    tracing::info!(%user_id, job_id = %job.id, attempt, ?outcome, "submit attempt");
                    self.event_bus.publish(
                        user_id,
                        EventKind::StageUpdate {
                            job_id: Some(job.id.clone()),
                            stage: "submitting".into(),
                            current_index,
                            total_jobs: total,
                            attempt: Some(attempt),
                        },
                        self.clock.epoch_ms(),
                    );
                })
                .await;

            self.finalize_submission(user_id, job, candidate, result, current_index, total, snapshot);
        }

        Ok(RunStatus::Completed)
    }

    fn record_skip(
        &self,
        user_id: &UserId,
        job: &Job,
        candidate: &Match,
        reason: &str,
        current_index: u32,
        total_jobs: u32,
        snapshot: &Arc<RwLock<RunSnapshot>>,
    ) {
        self.tracker.upsert_attempt(ApplicationRecord {
            user_id: user_id.clone(),
            job_id: job.id.clone(),
            job_title: job.title.clone(),
            company: job.company.clone(),
            status: ApplicationStatus::Skipped,
            submitted_at: None,
            confirmation_id: None,
            error: Some(reason.to_string()),
            retry_count: 0,
            match_score: Some(candidate.score),
            match_reasoning: Some(candidate.reasons.clone()),
        });
        {
            let mut snap = snapshot.write();
            snap.cursor = current_index;
            snap.skipped_count += 1;
        }
        self.event_bus.publish(
            user_id,
            EventKind::JobSkipped { job_id: job.id.clone(), reason: reason.to_string(), current_index, total_jobs },
            self.clock.epoch_ms(),
        );
    }

    fn record_failure(
        &self,
        user_id: &UserId,
        job: &Job,
        candidate: &Match,
        error: &str,
        current_index: u32,
        _total_jobs: u32,
        snapshot: &Arc<RwLock<RunSnapshot>>,
    ) {
        self.tracker.upsert_attempt(ApplicationRecord {
            user_id: user_id.clone(),
            job_id: job.id.clone(),
            job_title: job.title.clone(),
            company: job.company.clone(),
            status: ApplicationStatus::Failed,
            submitted_at: None,
            confirmation_id: None,
            error: Some(error.to_string()),
            retry_count: 0,
            match_score: Some(candidate.score),
            match_reasoning: Some(candidate.reasons.clone()),
        });
        {
            let mut snap = snapshot.write();
            snap.cursor = current_index;
            snap.failed_count += 1;
        }
        self.event_bus.publish(
            user_id,
            EventKind::ApplicationResult {
                job_id: job.id.clone(),
                status: ApplicationStatus::Failed,
                confirmation_id: None,
                error: Some(error.to_string()),
            },
            self.clock.epoch_ms(),
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn finalize_submission(
        &self,
        user_id: &UserId,
        job: &Job,
        candidate: &Match,
        result: crate::retry::RetryResult,
        current_index: u32,
        total_jobs: u32,
        snapshot: &Arc<RwLock<RunSnapshot>>,
    ) {
        let now = self.clock.epoch_ms();

        let (status, confirmation_id, error) = if result.cancelled {
            (ApplicationStatus::Failed, None, Some("cancelled".to_string()))
        } else {
            match result.outcome {
                Some(Outcome::Submitted { confirmation_id }) => (ApplicationStatus::Submitted, Some(confirmation_id), None),
                Some(Outcome::DuplicateAtPortal { confirmation_id: Some(id) }) => {
                    (ApplicationStatus::Submitted, Some(id), None)
                }
                Some(Outcome::DuplicateAtPortal { confirmation_id: None }) => {
                    (ApplicationStatus::Skipped, None, Some("duplicate".to_string()))
                }
                Some(Outcome::PermanentClient { message }) => (ApplicationStatus::Failed, None, Some(message)),
                Some(Outcome::TransientNetwork | Outcome::Transient5xx | Outcome::RateLimited { .. } | Outcome::Timeout) | None => {
                    (ApplicationStatus::Failed, None, Some("upstream_transient".to_string()))
                }
            }
        };

        tracing::info!(
            %user_id,
            job_id = %job.id,
            status = %status,
            attempts = result.attempts,
            error = error.as_deref().unwrap_or(""),
            "application finalized"
        );

        self.tracker.upsert_attempt(ApplicationRecord {
            user_id: user_id.clone(),
            job_id: job.id.clone(),
            job_title: job.title.clone(),
            company: job.company.clone(),
            status,
            submitted_at: if status == ApplicationStatus::Submitted { Some(now) } else { None },
            confirmation_id: confirmation_id.clone(),
            error: error.clone(),
            retry_count: result.attempts.saturating_sub(1),
            match_score: Some(candidate.score),
            match_reasoning: Some(candidate.reasons.clone()),
        });

        {
            let mut snap = snapshot.write();
            snap.cursor = current_index;
            match status {
                ApplicationStatus::Submitted => snap.submitted_count += 1,
                ApplicationStatus::Failed => snap.failed_count += 1,
                ApplicationStatus::Skipped => snap.skipped_count += 1,
                _ => {}
            }
        }

        if status == ApplicationStatus::Skipped {
            self.event_bus.publish(
                user_id,
                EventKind::JobSkipped {
                    job_id: job.id.clone(),
                    reason: error.unwrap_or_default(),
                    current_index,
                    total_jobs,
                },
                now,
            );
        } else {
            self.event_bus.publish(
                user_id,
                EventKind::ApplicationResult { job_id: job.id.clone(), status, confirmation_id, error },
                now,
            );
        }
    }
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
