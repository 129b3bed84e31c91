//! Job postings: the immutable input to a Run's apply queue.

use crate::id::JobId;
use serde::{Deserialize, Serialize};

/// A job posting as ingested from the Portal Adapter.
///
/// Immutable for the duration of a Run; keyed by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub title: String,
    pub company: String,
    pub location: String,
    #[serde(default)]
    pub remote: Option<bool>,
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
}

impl Job {
    pub fn is_remote(&self) -> bool {
        self.remote.unwrap_or(false)
    }
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct JobBuilder => Job {
        into {
            id: JobId = JobId::new("job-1"),
            title: String = "Software Engineer",
            company: String = "Acme",
            location: String = "Remote",
            description: String = "",
        }
        set {
            requirements: Vec<String> = Vec::new(),
        }
        option {
            remote: bool = None,
        }
        computed {}
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
