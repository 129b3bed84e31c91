//! Evidence Grounder (§4.4): verifies that every requirement → evidence
//! claim in a Personalizer's output cites an id that actually exists in the
//! candidate's Profile. This is the safety-critical step — an ungrounded
//! claim must never reach the Retry Executor.

use oj_core::{EvidenceMapEntry, JobId, Personalization, PersonalizerOutput, Profile};

pub fn ground(profile: &Profile, job_id: JobId, output: PersonalizerOutput) -> Personalization {
    let evidence_map = output
        .evidence_map
        .into_iter()
        .map(|claim| EvidenceMapEntry {
            requirement: claim.requirement,
            grounded: Some(profile.contains(&claim.evidence_id_claim)),
            evidence_id: claim.evidence_id_claim,
        })
        .collect();

    Personalization { job_id, cover_letter: output.cover_letter, evidence_map }
}
