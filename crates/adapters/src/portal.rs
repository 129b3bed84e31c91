//! Portal Adapter (§4.6): the HTTP collaborator standing in for the
//! upstream job portal.

use crate::error::PortalError;
use async_trait::async_trait;
use oj_core::{ConfirmationId, Job, JobId, Outcome, UserId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Filters accepted by `ListJobs`. Kept narrow; the portal owns search
/// semantics, this engine only asks for "what's open".
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// A submission request, carrying the candidate contact fields, the
/// generated cover letter, and a stable per-(user, job) idempotency token
/// so repeated attempts don't create duplicate records portal-side.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitRequest {
    pub job_id: JobId,
    pub user_id: UserId,
    pub cover_letter: String,
    pub idempotency_token: String,
}

impl SubmitRequest {
    /// A stable token derived from `(user_id, job_id)`, unique per candidate
    /// application and identical across retries.
    pub fn idempotency_token_for(user_id: &UserId, job_id: &JobId) -> String {
        format!("{user_id}:{job_id}")
    }
}

#[derive(Debug, Deserialize)]
struct PortalResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    confirmation_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PortalErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[async_trait]
pub trait PortalAdapter: Send + Sync {
    async fn list_jobs(&self, filters: &JobFilters) -> Result<Vec<Job>, PortalError>;

    /// Never returns a Rust `Err`: every failure mode is a member of
    /// [`Outcome`] so the Retry Executor can switch on it without
    /// control-flow-by-exception.
    async fn submit(&self, request: &SubmitRequest) -> Outcome;

    async fn get_application(
        &self,
        confirmation_id: &ConfirmationId,
    ) -> Result<Option<serde_json::Value>, PortalError>;
}

/// Production adapter: a `reqwest` client against the configured portal
/// base URL.
pub struct HttpPortalAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPortalAdapter {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client, base_url: base_url.into() }
    }

    fn retry_after_secs(resp: &reqwest::Response) -> Option<u64> {
        resp.headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
    }
}

#[async_trait]
impl PortalAdapter for HttpPortalAdapter {
    async fn list_jobs(&self, filters: &JobFilters) -> Result<Vec<Job>, PortalError> {
        let resp = self
            .client
            .get(format!("{}/jobs", self.base_url))
            .query(filters)
            .send()
            .await
            .map_err(map_reqwest_list_err)?;

        if !resp.status().is_success() {
            return Err(PortalError::Protocol(format!("status {}", resp.status())));
        }
        resp.json::<Vec<Job>>()
            .await
            .map_err(|e| PortalError::Protocol(e.to_string()))
    }

    async fn submit(&self, request: &SubmitRequest) -> Outcome {
        let resp = match self
            .client
            .post(format!("{}/applications", self.base_url))
            .header("Idempotency-Key", &request.idempotency_token)
            .json(request)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) if e.is_timeout() => {
                tracing::warn!(job_id = %request.job_id, "portal submit timed out");
                return Outcome::Timeout;
            }
            Err(error) => {
                tracing::warn!(job_id = %request.job_id, %error, "portal submit network error");
                return Outcome::TransientNetwork;
            }
        };

        let status = resp.status();
        if status.is_success() {
            let retry_after = Self::retry_after_secs(&resp);
            let body = resp.json::<PortalResponse>().await.ok();
            return match body {
                Some(b) if b.success => {
                    let confirmation_id = b.confirmation_id.map(ConfirmationId::new);
                    match confirmation_id {
                        Some(id) => Outcome::Submitted { confirmation_id: id },
                        None => Outcome::DuplicateAtPortal { confirmation_id: None },
                    }
                }
                _ => Outcome::RateLimited { retry_after_secs: retry_after },
            };
        }

        if status == reqwest::StatusCode::CONFLICT {
            let confirmation_id = resp
                .json::<PortalResponse>()
                .await
                .ok()
                .and_then(|b| b.confirmation_id)
                .map(ConfirmationId::new);
            return Outcome::DuplicateAtPortal { confirmation_id };
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = Self::retry_after_secs(&resp);
            return Outcome::RateLimited { retry_after_secs: retry_after };
        }

        if status.is_server_error() {
            return Outcome::Transient5xx;
        }

        let message = resp
            .json::<PortalErrorBody>()
            .await
            .ok()
            .and_then(|b| b.message.or(b.error))
            .unwrap_or_else(|| format!("status {status}"));
        Outcome::PermanentClient { message }
    }

    async fn get_application(
        &self,
        confirmation_id: &ConfirmationId,
    ) -> Result<Option<serde_json::Value>, PortalError> {
        let resp = self
            .client
            .get(format!("{}/applications/{}", self.base_url, confirmation_id.as_str()))
            .send()
            .await
            .map_err(map_reqwest_list_err)?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(PortalError::Protocol(format!("status {}", resp.status())));
        }
        resp.json()
            .await
            .map(Some)
            .map_err(|e| PortalError::Protocol(e.to_string()))
    }
}

fn map_reqwest_list_err(e: reqwest::Error) -> PortalError {
    if e.is_timeout() {
        PortalError::Timeout
    } else {
        PortalError::Network(e.to_string())
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// A scripted Portal Adapter for deterministic tests: each call to
    /// `submit` for a given job pops the next scripted [`Outcome`] (or
    /// repeats the last one once the script is exhausted).
    pub struct FakePortalAdapter {
        jobs: Vec<Job>,
        scripts: Mutex<std::collections::HashMap<JobId, VecDeque<Outcome>>>,
        submit_calls: Mutex<Vec<SubmitRequest>>,
    }

    impl FakePortalAdapter {
        pub fn new(jobs: Vec<Job>) -> Self {
            Self {
                jobs,
                scripts: Mutex::new(std::collections::HashMap::new()),
                submit_calls: Mutex::new(Vec::new()),
            }
        }

        pub fn script(&self, job_id: JobId, outcomes: impl IntoIterator<Item = Outcome>) {
            self.scripts
                .lock()
                .insert(job_id, outcomes.into_iter().collect());
        }

        pub fn submit_call_count(&self, job_id: &JobId) -> usize {
            self.submit_calls
                .lock()
                .iter()
                .filter(|r| &r.job_id == job_id)
                .count()
        }
    }

    #[async_trait]
    impl PortalAdapter for FakePortalAdapter {
        async fn list_jobs(&self, _filters: &JobFilters) -> Result<Vec<Job>, PortalError> {
            Ok(self.jobs.clone())
        }

        async fn submit(&self, request: &SubmitRequest) -> Outcome {
            self.submit_calls.lock().push(request.clone());
            let mut scripts = self.scripts.lock();
            match scripts.get_mut(&request.job_id) {
                Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(Outcome::TransientNetwork),
                Some(queue) => queue.front().cloned().unwrap_or(Outcome::TransientNetwork),
                None => Outcome::Submitted {
                    confirmation_id: ConfirmationId::new(format!("conf-{}", request.job_id)),
                },
            }
        }

        async fn get_application(
            &self,
            _confirmation_id: &ConfirmationId,
        ) -> Result<Option<serde_json::Value>, PortalError> {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakePortalAdapter;
    use super::*;

    #[tokio::test]
    async fn fake_adapter_defaults_to_submitted() {
        let adapter = FakePortalAdapter::new(vec![]);
        let request = SubmitRequest {
            job_id: JobId::new("j1"),
            user_id: UserId::new("u1"),
            cover_letter: String::new(),
            idempotency_token: "u1:j1".into(),
        };
        let outcome = adapter.submit(&request).await;
        assert!(matches!(outcome, Outcome::Submitted { .. }));
    }

    #[tokio::test]
    async fn fake_adapter_replays_script_then_sticks_on_last() {
        let adapter = FakePortalAdapter::new(vec![]);
        let job_id = JobId::new("j1");
        adapter.script(
            job_id.clone(),
            [Outcome::Transient5xx, Outcome::Transient5xx, Outcome::Submitted {
                confirmation_id: ConfirmationId::new("c1"),
            }],
        );
        let request = SubmitRequest {
            job_id: job_id.clone(),
            user_id: UserId::new("u1"),
            cover_letter: String::new(),
            idempotency_token: "u1:j1".into(),
        };
        assert!(matches!(adapter.submit(&request).await, Outcome::Transient5xx));
        assert!(matches!(adapter.submit(&request).await, Outcome::Transient5xx));
        assert!(matches!(adapter.submit(&request).await, Outcome::Submitted { .. }));
        assert_eq!(adapter.submit_call_count(&job_id), 3);
    }

    #[test]
    fn idempotency_token_is_stable_for_same_pair() {
        let a = SubmitRequest::idempotency_token_for(&UserId::new("u1"), &JobId::new("j1"));
        let b = SubmitRequest::idempotency_token_for(&UserId::new("u1"), &JobId::new("j1"));
        assert_eq!(a, b);
    }
}
