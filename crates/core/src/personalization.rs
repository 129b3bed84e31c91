//! Personalizer output and its evidence-grounding annotations.

use crate::id::{EvidenceId, JobId};
use serde::{Deserialize, Serialize};

/// One requirement → evidence claim, as returned by the external Personalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceMapEntry {
    pub requirement: String,
    pub evidence_id: EvidenceId,
    /// Set by the Evidence Grounder, not the Personalizer. `None` until grounded.
    #[serde(default)]
    pub grounded: Option<bool>,
}

/// Raw output from the external Personalizer collaborator, before grounding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalizerOutput {
    pub cover_letter: String,
    pub evidence_map: Vec<RequirementClaim>,
}

/// A single requirement → evidence claim as the Personalizer phrases it.
/// `rationale` is carried for observability only; the engine never
/// interprets it, it only validates `evidence_id_claim`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementClaim {
    pub requirement: String,
    pub evidence_id_claim: EvidenceId,
    #[serde(default)]
    pub rationale: String,
}

/// A Personalization after evidence grounding: the engine-visible record
/// for one job in one Run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Personalization {
    pub job_id: JobId,
    pub cover_letter: String,
    pub evidence_map: Vec<EvidenceMapEntry>,
}

impl Personalization {
    /// `true` if every entry is grounded. Entries must already have been
    /// graded by the Evidence Grounder (`grounded.is_some()`); an ungraded
    /// entry is treated as ungrounded defensively.
    pub fn all_grounded(&self) -> bool {
        self.evidence_map
            .iter()
            .all(|e| e.grounded.unwrap_or(false))
    }

    pub fn grounded_ratio(&self) -> f64 {
        if self.evidence_map.is_empty() {
            return 1.0;
        }
        let grounded = self
            .evidence_map
            .iter()
            .filter(|e| e.grounded.unwrap_or(false))
            .count();
        grounded as f64 / self.evidence_map.len() as f64
    }

    /// Requirements whose claim failed to ground, for the `job_skipped` reason.
    pub fn ungrounded_requirements(&self) -> Vec<&str> {
        self.evidence_map
            .iter()
            .filter(|e| !e.grounded.unwrap_or(false))
            .map(|e| e.requirement.as_str())
            .collect()
    }
}
