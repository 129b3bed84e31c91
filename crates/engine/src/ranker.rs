//! Ranker (§4.2): scores and orders candidate jobs by a hybrid of semantic
//! similarity (via the external Embedder) and rule-based requirement
//! coverage.

use oj_adapters::{cosine_similarity_0_100, Embedder};
use oj_core::{Job, Match, Policy};
use std::collections::HashSet;
use std::sync::Arc;

const SEMANTIC_WEIGHT: f64 = 0.7;
const COVERAGE_WEIGHT: f64 = 0.3;
const MAX_REASONS: usize = 3;

pub struct Ranker {
    embedder: Arc<dyn Embedder>,
}

impl Ranker {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }

    /// Preserves exactly the jobs that pass basic filtering (company not
    /// blocked, remote-if-required), ordered descending by score with a
    /// lexicographic job-id tie-break. `min_match_threshold` is
    /// deliberately NOT applied here — that's the Policy Gate's job, so the
    /// event stream can still show low-score skips with reasons.
    pub async fn rank(&self, profile_summary: &str, coverage_tokens: &HashSet<String>, jobs: &[Job], policy: &Policy) -> Vec<Match> {
        let profile_embedding = self.embedder.embed(profile_summary).await.unwrap_or_default();

        let mut matches = Vec::new();
        for job in jobs {
            if policy.is_company_blocked(&job.company) {
                continue;
            }
            if policy.require_remote && !job.is_remote() {
                continue;
            }

            let job_embedding = self.embedder.embed(&job.description).await.unwrap_or_default();
            let semantic = cosine_similarity_0_100(&profile_embedding, &job_embedding) as f64;
            let (coverage, matched) = requirement_coverage(&job.requirements, coverage_tokens);

            let score = (semantic * SEMANTIC_WEIGHT + coverage * 100.0 * COVERAGE_WEIGHT)
                .round()
                .clamp(0.0, 100.0) as u8;

            let reasons = matched.into_iter().take(MAX_REASONS).collect();
            matches.push(Match { job_id: job.id.clone(), score, reasons });
        }

        matches.sort_by(|a, b| a.cmp_key().cmp(&b.cmp_key()));
        matches
    }
}

/// Fraction of `requirements` whose significant tokens (length > 2, to
/// drop stop words like "in"/"of") overlap with the candidate's coverage
/// tokens (skills plus bullet/proof free text), plus the list of
/// requirements that matched.
fn requirement_coverage(requirements: &[String], coverage_tokens: &HashSet<String>) -> (f64, Vec<String>) {
    if requirements.is_empty() {
        return (0.0, Vec::new());
    }

    let mut matched = Vec::new();
    for requirement in requirements {
        let overlaps = tokenize(requirement).iter().any(|t| coverage_tokens.contains(t));
        if overlaps {
            matched.push(requirement.clone());
        }
    }

    (matched.len() as f64 / requirements.len() as f64, matched)
}

fn tokenize(s: &str) -> HashSet<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
        .map(|w| w.to_lowercase())
        .collect()
}
