//! Application Record: the Tracker's persisted row for one (user, job) pair.

use crate::id::{ConfirmationId, JobId, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Queued,
    Submitted,
    Failed,
    Skipped,
    Retried,
}

crate::simple_display! {
    ApplicationStatus {
        Queued => "queued",
        Submitted => "submitted",
        Failed => "failed",
        Skipped => "skipped",
        Retried => "retried",
    }
}

/// One row of the Tracker's table, keyed by `(user_id, job_id)`.
///
/// Invariant: at most one record per `(user_id, job_id)`; retries mutate
/// this record in place rather than appending a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub user_id: UserId,
    pub job_id: JobId,
    pub job_title: String,
    pub company: String,
    pub status: ApplicationStatus,
    #[serde(default)]
    pub submitted_at: Option<u64>,
    #[serde(default)]
    pub confirmation_id: Option<ConfirmationId>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub match_score: Option<u8>,
    #[serde(default)]
    pub match_reasoning: Option<Vec<String>>,
}

impl ApplicationRecord {
    pub fn key(&self) -> (UserId, JobId) {
        (self.user_id.clone(), self.job_id.clone())
    }
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct ApplicationRecordBuilder => ApplicationRecord {
        into {
            user_id: UserId = UserId::new("u1"),
            job_id: JobId = JobId::new("j1"),
            job_title: String = "Software Engineer",
            company: String = "Acme",
        }
        set {
            status: ApplicationStatus = ApplicationStatus::Queued,
            retry_count: u32 = 0,
        }
        option {
            submitted_at: u64 = None,
            confirmation_id: ConfirmationId = None,
            error: String = None,
            match_score: u8 = None,
            match_reasoning: Vec<String> = None,
        }
        computed {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_identifies_record_by_user_and_job() {
        let record = ApplicationRecord::builder().build();
        assert_eq!(record.key(), (UserId::new("u1"), JobId::new("j1")));
    }

    #[test]
    fn display_matches_snake_case() {
        assert_eq!(ApplicationStatus::Submitted.to_string(), "submitted");
    }
}
