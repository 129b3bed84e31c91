//! Candidate profile: the evidence a Personalization must ground every claim in.

use crate::id::EvidenceId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// An atomic achievement statement with a source experience.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bullet {
    pub text: String,
    pub source: String,
    #[serde(default)]
    pub skills: Vec<String>,
}

/// An external link backing a claim (portfolio, repository, publication).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proof {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub related_to: Vec<String>,
}

/// Tagged union over the two kinds of grounding evidence a Profile holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Evidence {
    Bullet(Bullet),
    Proof(Proof),
}

impl Evidence {
    pub fn skills(&self) -> &[String] {
        match self {
            Evidence::Bullet(b) => &b.skills,
            Evidence::Proof(p) => &p.related_to,
        }
    }

    /// Free text used for requirement-coverage scoring and semantic similarity.
    pub fn text(&self) -> &str {
        match self {
            Evidence::Bullet(b) => &b.text,
            Evidence::Proof(p) => &p.title,
        }
    }
}

/// The candidate's bullet bank and proof pack, opaque to the engine except
/// for the id → evidence lookup used by the Evidence Grounder.
///
/// Invariant: every evidence reference emitted downstream must cite an id
/// present in `evidence`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub evidence: IndexMap<EvidenceId, Evidence>,
}

impl Profile {
    pub fn get(&self, id: &EvidenceId) -> Option<&Evidence> {
        self.evidence.get(id)
    }

    pub fn contains(&self, id: &EvidenceId) -> bool {
        self.evidence.contains_key(id)
    }

    /// A short summary used as the Ranker's semantic-similarity input:
    /// all evidence text joined, deduplicated by nothing — the Embedder
    /// collaborator is responsible for making sense of repetition.
    pub fn summary(&self) -> String {
        self.evidence
            .values()
            .map(Evidence::text)
            .collect::<Vec<_>>()
            .join(". ")
    }

    /// The union of every skill/related-to token across all evidence,
    /// lowercased, used by the Ranker's requirement-coverage term.
    pub fn skill_tokens(&self) -> std::collections::HashSet<String> {
        self.evidence
            .values()
            .flat_map(Evidence::skills)
            .map(|s| s.to_lowercase())
            .collect()
    }

    /// The requirement-coverage overlap universe: `skill_tokens` plus every
    /// significant word token (length > 2) drawn from each evidence's free
    /// text, so a requirement covered only by a bullet's prose — not its
    /// `skills` list — still counts.
    pub fn coverage_tokens(&self) -> std::collections::HashSet<String> {
        let mut tokens = self.skill_tokens();
        for evidence in self.evidence.values() {
            tokens.extend(tokenize_words(evidence.text()));
        }
        tokens
    }
}

fn tokenize_words(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
        .map(|w| w.to_lowercase())
}
