//! Per-user apply policy: an immutable snapshot taken at Run start.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub max_applications_per_day: u32,
    /// 0-100.
    pub min_match_threshold: u8,
    #[serde(default)]
    pub blocked_companies: HashSet<String>,
    #[serde(default)]
    pub blocked_role_types: HashSet<String>,
    #[serde(default)]
    pub required_location: Option<String>,
    #[serde(default)]
    pub require_remote: bool,
}

fn default_true() -> bool {
    true
}

impl Policy {
    pub fn is_company_blocked(&self, company: &str) -> bool {
        self.blocked_companies
            .iter()
            .any(|blocked| blocked.eq_ignore_ascii_case(company))
    }

    /// Case-insensitive whole-word match of any blocked role token in `title`.
    pub fn matches_blocked_role_type(&self, title: &str) -> bool {
        let words: Vec<String> = title
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(|w| w.to_lowercase())
            .collect();
        self.blocked_role_types
            .iter()
            .any(|blocked| words.iter().any(|w| w == &blocked.to_lowercase()))
    }

    pub fn matches_required_location(&self, location: &str) -> bool {
        match &self.required_location {
            None => true,
            Some(required) => location
                .to_lowercase()
                .contains(&required.to_lowercase()),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct PolicyBuilder => Policy {
        set {
            enabled: bool = true,
            max_applications_per_day: u32 = 50,
            min_match_threshold: u8 = 0,
            blocked_companies: HashSet<String> = HashSet::new(),
            blocked_role_types: HashSet<String> = HashSet::new(),
            require_remote: bool = false,
        }
        option {
            required_location: String = None,
        }
        computed {}
    }
}
