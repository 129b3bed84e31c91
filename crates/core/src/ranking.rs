//! Ranker output: a scored job in the apply queue.

use crate::id::JobId;
use serde::{Deserialize, Serialize};

/// A job scored and annotated by the Ranker.
///
/// Ordering is by descending `score`, stable tie-broken by `job_id`
/// lexicographic — see `cmp_key`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub job_id: JobId,
    /// 0-100.
    pub score: u8,
    /// Up to three short strings: top matching requirements and any hard
    /// filter hit.
    #[serde(default)]
    pub reasons: Vec<String>,
}

impl Match {
    /// Sort key for descending score, ascending job id.
    pub fn cmp_key(&self) -> (std::cmp::Reverse<u8>, &str) {
        (std::cmp::Reverse(self.score), self.job_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_by_descending_score_then_job_id() {
        let mut matches = vec![
            Match { job_id: JobId::new("j2"), score: 82, reasons: vec![] },
            Match { job_id: JobId::new("j1"), score: 82, reasons: vec![] },
            Match { job_id: JobId::new("j3"), score: 10, reasons: vec![] },
        ];
        matches.sort_by(|a, b| a.cmp_key().cmp(&b.cmp_key()));
        let ids: Vec<&str> = matches.iter().map(|m| m.job_id.as_str()).collect();
        assert_eq!(ids, vec!["j1", "j2", "j3"]);
    }
}
