//! Tracker (§4.7): the application-record store.
//!
//! In-memory only — durable persistence across process restarts is an
//! explicit non-goal. The concurrency model still matches the spec's
//! production intent: fine-grained locks keyed by `user_id`, no cross-user
//! lock held while another user's Run is doing work.

use oj_core::{ApplicationRecord, ApplicationStatus, JobId, UserId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

pub trait Tracker: Send + Sync {
    /// Insert or update the record for `(record.user_id, record.job_id)`.
    /// If a prior record for that pair has `status == Failed`, the new
    /// record's `retry_count` is bumped to `prior.retry_count + 1`
    /// regardless of what the caller passed in, so retries are counted
    /// even when the caller forgot to thread the count through.
    fn upsert_attempt(&self, record: ApplicationRecord);

    /// Records ordered by `submitted_at` descending; records with no
    /// `submitted_at` sort last, in insertion order among themselves.
    fn list(&self, user_id: &UserId, status_filter: Option<ApplicationStatus>) -> Vec<ApplicationRecord>;

    fn get(&self, user_id: &UserId, job_id: &JobId) -> Option<ApplicationRecord>;

    /// Count of `Submitted` records whose `submitted_at` falls within the
    /// rolling 24h window ending at `now_epoch_ms` (Open Question in §9:
    /// rolling window, not calendar day).
    fn count_submitted_since(&self, user_id: &UserId, now_epoch_ms: u64) -> u32;

    fn clear(&self, user_id: &UserId);
}

const ROLLING_WINDOW_MS: u64 = 24 * 60 * 60 * 1000;

type UserTable = HashMap<JobId, ApplicationRecord>;

/// Default in-process `Tracker`. Top-level `RwLock` only ever guards the
/// per-user table lookup/insert; the table itself is its own `RwLock` so
/// concurrent users never contend with each other.
#[derive(Default)]
pub struct MemoryTracker {
    users: RwLock<HashMap<UserId, Arc<RwLock<UserTable>>>>,
}

impl MemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn table_for(&self, user_id: &UserId) -> Arc<RwLock<UserTable>> {
        if let Some(table) = self.users.read().get(user_id) {
            return table.clone();
        }
        self.users
            .write()
            .entry(user_id.clone())
            .or_insert_with(|| Arc::new(RwLock::new(HashMap::new())))
            .clone()
    }
}

impl Tracker for MemoryTracker {
    fn upsert_attempt(&self, mut record: ApplicationRecord) {
        let table = self.table_for(&record.user_id);
        let mut table = table.write();
        if let Some(prior) = table.get(&record.job_id) {
            if prior.status == ApplicationStatus::Failed {
                record.retry_count = prior.retry_count + 1;
            }
        }
        tracing::debug!(
            user_id = %record.user_id,
            job_id = %record.job_id,
            status = %record.status,
            retry_count = record.retry_count,
            "tracker record upserted"
        );
        table.insert(record.job_id.clone(), record);
    }

    fn list(&self, user_id: &UserId, status_filter: Option<ApplicationStatus>) -> Vec<ApplicationRecord> {
        let table = self.table_for(user_id);
        let table = table.read();
        let mut records: Vec<ApplicationRecord> = table
            .values()
            .filter(|r| status_filter.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        records.sort_by(|a, b| match (a.submitted_at, b.submitted_at) {
            (Some(a), Some(b)) => b.cmp(&a),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        records
    }

    fn get(&self, user_id: &UserId, job_id: &JobId) -> Option<ApplicationRecord> {
        self.table_for(user_id).read().get(job_id).cloned()
    }

    fn count_submitted_since(&self, user_id: &UserId, now_epoch_ms: u64) -> u32 {
        let cutoff = now_epoch_ms.saturating_sub(ROLLING_WINDOW_MS);
        self.table_for(user_id)
            .read()
            .values()
            .filter(|r| {
                r.status == ApplicationStatus::Submitted
                    && r.submitted_at.is_some_and(|t| t >= cutoff)
            })
            .count() as u32
    }

    fn clear(&self, user_id: &UserId) {
        if let Some(table) = self.users.read().get(user_id) {
            table.write().clear();
        }
    }
}
