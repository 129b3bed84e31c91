//! `/tracker/applications/*` routes: list, single-job retry, clear (§6).

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use oj_adapters::SubmitRequest;
use oj_core::{ApplicationRecord, ApplicationStatus, Clock, JobId, KillSwitch, Outcome, SystemClock, UserId};
use oj_engine::RetryExecutor;
use oj_storage::Tracker as _;
use serde::{Deserialize, Serialize};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tracker/applications/{user_id}", get(list).delete(clear))
        .route("/tracker/applications/{user_id}/{job_id}/retry", post(retry))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    status: Option<ApplicationStatus>,
}

#[derive(Debug, Serialize)]
struct ApplicationsSummary {
    total: u32,
    submitted: u32,
    failed: u32,
    skipped: u32,
    queued: u32,
    retried: u32,
}

#[derive(Debug, Serialize)]
struct ApplicationsResponse {
    summary: ApplicationsSummary,
    applications: Vec<ApplicationRecord>,
}

async fn list(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let all = state.tracker.list(&user_id, None);
    let mut summary = ApplicationsSummary { total: 0, submitted: 0, failed: 0, skipped: 0, queued: 0, retried: 0 };
    for record in &all {
        summary.total += 1;
        match record.status {
            ApplicationStatus::Submitted => summary.submitted += 1,
            ApplicationStatus::Failed => summary.failed += 1,
            ApplicationStatus::Skipped => summary.skipped += 1,
            ApplicationStatus::Queued => summary.queued += 1,
            ApplicationStatus::Retried => summary.retried += 1,
        }
    }

    let applications = match query.status {
        Some(status) => all.into_iter().filter(|r| r.status == status).collect(),
        None => all,
    };

    Json(ApplicationsResponse { summary, applications })
}

#[derive(Debug, Serialize)]
struct Cleared {
    cleared: bool,
}

async fn clear(State(state): State<AppState>, Path(user_id): Path<UserId>) -> impl IntoResponse {
    state.tracker.clear(&user_id);
    Json(Cleared { cleared: true })
}

#[derive(Debug, Serialize)]
struct Accepted {
    accepted: bool,
}

/// A bespoke single-job retry: re-submits the job's last-generated cover
/// letter through the Retry Executor directly, bypassing the ranking and
/// personalization stages entirely since a failed submission already has
/// grounded, gate-approved content sitting on its Application Record.
async fn retry(
    State(state): State<AppState>,
    Path((user_id, job_id)): Path<(UserId, JobId)>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .tracker
        .get(&user_id, &job_id)
        .ok_or_else(|| ApiError::not_found(format!("no application record for job {job_id}")))?;

    let cover_letter = record.match_reasoning.as_ref().map(|r| r.join(". ")).unwrap_or_default();

    tokio::spawn(async move {
        let request = SubmitRequest {
            job_id: job_id.clone(),
            user_id: user_id.clone(),
            cover_letter,
            idempotency_token: SubmitRequest::idempotency_token_for(&user_id, &job_id),
        };

        let executor = RetryExecutor::new(state.portal.as_ref(), state.retry_config.clone());
        let kill = KillSwitch::new();
        let result = executor.execute(&request, &kill, |_, _| {}).await;
        let now = SystemClock.epoch_ms();

        let (status, confirmation_id, error) = match result.outcome {
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
        };

        state.tracker.upsert_attempt(ApplicationRecord {
            user_id,
            job_id,
            job_title: record.job_title,
            company: record.company,
            status,
            submitted_at: if status == ApplicationStatus::Submitted { Some(now) } else { None },
            confirmation_id,
            error,
            retry_count: record.retry_count,
            match_score: record.match_score,
            match_reasoning: record.match_reasoning,
        });
    });

    Ok((axum::http::StatusCode::ACCEPTED, Json(Accepted { accepted: true })))
}
