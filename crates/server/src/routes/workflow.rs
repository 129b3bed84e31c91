//! `/workflow/*` routes: Start, Stop, Status, Stream (§6).

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::StreamExt;
use oj_core::{ApplicationStatus, ConfirmationId, Event, EventKind, JobId, Policy, Profile, UserId};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/workflow/start", post(start))
        .route("/workflow/kill/{user_id}", post(kill))
        .route("/workflow/status/{user_id}", get(status))
        .route("/workflow/stream/{user_id}", get(stream))
}

#[derive(Debug, Deserialize)]
struct StartRequest {
    user_id: UserId,
    profile: Profile,
    policy: Policy,
}

#[derive(Debug, Serialize)]
struct Accepted {
    accepted: bool,
}

#[derive(Debug, Serialize)]
struct Stopped {
    stopped: bool,
}

async fn start(
    State(state): State<AppState>,
    Json(req): Json<StartRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.engine.start(req.user_id, req.profile, req.policy)?;
    Ok((axum::http::StatusCode::ACCEPTED, Json(Accepted { accepted: true })))
}

async fn kill(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<impl IntoResponse, ApiError> {
    state.engine.stop(&user_id)?;
    Ok(Json(Stopped { stopped: true }))
}

async fn status(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state.engine.status(&user_id)?;
    Ok(Json(snapshot))
}

async fn stream(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<impl IntoResponse, ApiError> {
    let events = state.engine.subscribe(&user_id)?;
    let sse_stream = events.map(|event| {
        let tag = event.kind.tag();
        let frame = SseFrame::from(&event);
        let data = serde_json::to_string(&frame).unwrap_or_else(|_| "{}".to_string());
        Ok::<_, Infallible>(SseEvent::default().event(tag).data(data))
    });
    Ok(Sse::new(sse_stream).keep_alive(KeepAlive::default()))
}

/// The wire shape of an SSE message (§6): `{seq, ts, type, stage_message?,
/// current_index?, total_jobs?, job?, application?}`. Kept separate from
/// `oj_core::Event`/`EventKind`, which are the internal per-variant domain
/// model, not the external contract.
#[derive(Debug, Serialize)]
struct SseFrame {
    seq: u64,
    ts: u64,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_jobs: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    job: Option<JobFrame>,
    #[serde(skip_serializing_if = "Option::is_none")]
    application: Option<ApplicationFrame>,
}

#[derive(Debug, Serialize)]
struct JobFrame {
    job_id: JobId,
}

#[derive(Debug, Serialize)]
struct ApplicationFrame {
    status: ApplicationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    confirmation_id: Option<ConfirmationId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<&Event> for SseFrame {
    fn from(event: &Event) -> Self {
        let mut frame = SseFrame {
            seq: event.seq,
            ts: event.ts_epoch_ms,
            kind: event.kind.tag(),
            stage_message: None,
            current_index: None,
            total_jobs: None,
            job: None,
            application: None,
        };

        match &event.kind {
            EventKind::WorkflowStarted { total_jobs } => {
                frame.total_jobs = *total_jobs;
            }
            EventKind::StageUpdate { job_id, stage, current_index, total_jobs, attempt } => {
                frame.stage_message = Some(match attempt {
                    Some(n) => format!("{stage} (attempt {n})"),
                    None => stage.clone(),
                });
                frame.current_index = Some(*current_index);
                frame.total_jobs = Some(*total_jobs);
                frame.job = job_id.clone().map(|job_id| JobFrame { job_id });
            }
            EventKind::JobsFetched { total_jobs } => {
                frame.total_jobs = Some(*total_jobs);
            }
            EventKind::JobProcessing { job_id, current_index, total_jobs } => {
                frame.current_index = Some(*current_index);
                frame.total_jobs = Some(*total_jobs);
                frame.job = Some(JobFrame { job_id: job_id.clone() });
            }
            EventKind::ApplicationResult { job_id, status, confirmation_id, error } => {
                frame.job = Some(JobFrame { job_id: job_id.clone() });
                frame.application = Some(ApplicationFrame {
                    status: *status,
                    confirmation_id: confirmation_id.clone(),
                    error: error.clone(),
                });
            }
            EventKind::JobSkipped { job_id, reason, current_index, total_jobs } => {
                frame.stage_message = Some(reason.clone());
                frame.current_index = Some(*current_index);
                frame.total_jobs = Some(*total_jobs);
                frame.job = Some(JobFrame { job_id: job_id.clone() });
            }
            EventKind::WorkflowCompleted { submitted_count, failed_count, skipped_count, status } => {
                frame.stage_message =
                    Some(format!("{status}: submitted={submitted_count} failed={failed_count} skipped={skipped_count}"));
            }
            EventKind::WorkflowFailed { error } => {
                frame.stage_message = Some(error.clone());
            }
        }

        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oj_core::JobId;

    #[test]
    fn application_result_frame_uses_documented_field_names() {
        let event = Event {
            seq: 3,
            ts_epoch_ms: 1_000,
            kind: EventKind::ApplicationResult {
                job_id: JobId::new("j1"),
                status: ApplicationStatus::Submitted,
                confirmation_id: Some(ConfirmationId::new("c1")),
                error: None,
            },
        };
        let value = serde_json::to_value(SseFrame::from(&event)).unwrap();
        assert_eq!(value["seq"], 3);
        assert_eq!(value["ts"], 1000);
        assert_eq!(value["type"], "application_result");
        assert_eq!(value["job"]["job_id"], "j1");
        assert_eq!(value["application"]["status"], "submitted");
        assert!(value.get("stage_message").is_none());
    }

    #[test]
    fn stage_update_frame_folds_attempt_into_stage_message() {
        let event = Event {
            seq: 1,
            ts_epoch_ms: 500,
            kind: EventKind::StageUpdate {
                job_id: Some(JobId::new("j1")),
                stage: "submitting".into(),
                current_index: 1,
                total_jobs: 2,
                attempt: Some(2),
            },
        };
        let value = serde_json::to_value(SseFrame::from(&event)).unwrap();
        assert_eq!(value["stage_message"], "submitting (attempt 2)");
        assert_eq!(value["current_index"], 1);
        assert_eq!(value["total_jobs"], 2);
    }
}
