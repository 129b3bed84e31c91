//! Shared fixtures for tests across the workspace, gated behind `test-support`.

use crate::id::EvidenceId;
use crate::profile::{Bullet, Evidence, Profile};

/// A profile with one grounded bullet, `b1`, citing Go experience.
pub fn profile_with_bullet(id: &str, text: &str, skills: &[&str]) -> Profile {
    let mut profile = Profile::default();
    profile.evidence.insert(
        EvidenceId::new(id),
        Evidence::Bullet(Bullet {
            text: text.to_string(),
            source: "Acme Inc".to_string(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
        }),
    );
    profile
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_profile_contains_requested_bullet() {
        let profile = profile_with_bullet("b1", "Built X in Go", &["Go"]);
        assert!(profile.contains(&EvidenceId::new("b1")));
    }
}
