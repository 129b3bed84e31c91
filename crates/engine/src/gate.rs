//! Policy Gate (§4.3): the pre-personalize and post-ground checks that
//! decide whether a job proceeds, is skipped with a reason, or stops the
//! Run entirely.

use oj_core::{Job, KillSwitch, Match, Personalization, Policy};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Skip(&'static str),
    Stop(&'static str),
}

pub struct PolicyGate;

impl PolicyGate {
    /// Cheap checks evaluated before the Personalizer is called. Order
    /// matters: it determines which reason a borderline job reports.
    pub fn pre_personalize(
        policy: &Policy,
        kill: &KillSwitch,
        job: &Job,
        candidate: &Match,
        submitted_today: u32,
        in_flight: u32,
    ) -> GateDecision {
        if kill.is_triggered() {
            return GateDecision::Stop("cancelled");
        }
        if !policy.enabled {
            return GateDecision::Skip("policy_disabled");
        }
        if policy.is_company_blocked(&job.company) {
            return GateDecision::Skip("blocked_company");
        }
        if policy.matches_blocked_role_type(&job.title) {
            return GateDecision::Skip("blocked_role_type");
        }
        if policy.require_remote && !job.is_remote() {
            return GateDecision::Skip("not_remote");
        }
        if !policy.matches_required_location(&job.location) {
            return GateDecision::Skip("location_mismatch");
        }
        if candidate.score < policy.min_match_threshold {
            return GateDecision::Skip("below_threshold");
        }
        if submitted_today + in_flight >= policy.max_applications_per_day {
            return GateDecision::Stop("daily_cap_reached");
        }
        GateDecision::Allow
    }

    /// Hard safety invariant: a non-grounded personalization must never be
    /// submitted.
    pub fn post_ground(personalization: &Personalization) -> GateDecision {
        if !personalization.all_grounded() {
            return GateDecision::Skip("ungrounded_claim");
        }
        GateDecision::Allow
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> Job {
        Job::builder()
            .id("j1")
            .title("Senior Manager, Platform")
            .company("AcmeCorp")
            .location("Austin, TX")
            .remote(true)
            .build()
    }

    fn candidate(score: u8) -> Match {
        Match { job_id: oj_core::JobId::new("j1"), score, reasons: vec![] }
    }

    #[test]
    fn kill_switch_takes_priority_and_stops() {
        let policy = Policy::builder().build();
        let kill = KillSwitch::new();
        kill.trigger();
        let decision = PolicyGate::pre_personalize(&policy, &kill, &job(), &candidate(90), 0, 0);
        assert_eq!(decision, GateDecision::Stop("cancelled"));
    }

    #[test]
    fn blocked_company_is_skipped() {
        let policy = Policy::builder()
            .blocked_companies(["AcmeCorp".to_string()].into())
            .build();
        let kill = KillSwitch::new();
        let decision = PolicyGate::pre_personalize(&policy, &kill, &job(), &candidate(90), 0, 0);
        assert_eq!(decision, GateDecision::Skip("blocked_company"));
    }

    #[test]
    fn below_threshold_is_skipped() {
        let policy = Policy::builder().min_match_threshold(50).build();
        let kill = KillSwitch::new();
        let decision = PolicyGate::pre_personalize(&policy, &kill, &job(), &candidate(10), 0, 0);
        assert_eq!(decision, GateDecision::Skip("below_threshold"));
    }

    #[test]
    fn daily_cap_stops_the_run() {
        let policy = Policy::builder().max_applications_per_day(5).build();
        let kill = KillSwitch::new();
        let decision = PolicyGate::pre_personalize(&policy, &kill, &job(), &candidate(90), 5, 0);
        assert_eq!(decision, GateDecision::Stop("daily_cap_reached"));
    }

    #[test]
    fn passes_all_checks_is_allowed() {
        let policy = Policy::builder().min_match_threshold(10).build();
        let kill = KillSwitch::new();
        let decision = PolicyGate::pre_personalize(&policy, &kill, &job(), &candidate(90), 0, 0);
        assert_eq!(decision, GateDecision::Allow);
    }

    #[test]
    fn ungrounded_personalization_is_skipped_post_ground() {
        let personalization = Personalization {
            job_id: oj_core::JobId::new("j1"),
            cover_letter: String::new(),
            evidence_map: vec![oj_core::EvidenceMapEntry {
                requirement: "Python".into(),
                evidence_id: oj_core::EvidenceId::new("b_unknown"),
                grounded: Some(false),
            }],
        };
        assert_eq!(PolicyGate::post_ground(&personalization), GateDecision::Skip("ungrounded_claim"));
    }
}
