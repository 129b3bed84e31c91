//! Personalizer (§4.4): the external text-generation collaborator.
//!
//! Out of scope per the spec: the prompting and generation strategy itself.
//! This module only defines the narrow interface the engine calls through,
//! plus a production HTTP client and a scriptable fake for tests.

use crate::error::PersonalizerError;
use async_trait::async_trait;
use oj_core::{Job, PersonalizerOutput, Profile};
use std::time::Duration;

#[async_trait]
pub trait Personalizer: Send + Sync {
    async fn personalize(
        &self,
        profile: &Profile,
        job: &Job,
    ) -> Result<PersonalizerOutput, PersonalizerError>;
}

pub struct HttpPersonalizer {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPersonalizer {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client, base_url: base_url.into() }
    }
}

#[derive(serde::Serialize)]
struct PersonalizeRequest<'a> {
    profile: &'a Profile,
    job: &'a Job,
}

#[async_trait]
impl Personalizer for HttpPersonalizer {
    async fn personalize(
        &self,
        profile: &Profile,
        job: &Job,
    ) -> Result<PersonalizerOutput, PersonalizerError> {
        let resp = self
            .client
            .post(format!("{}/personalize", self.base_url))
            .json(&PersonalizeRequest { profile, job })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PersonalizerError::Timeout
                } else {
                    PersonalizerError::Request(e.to_string())
                }
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            tracing::warn!(job_id = %job.id, %status, "personalizer request failed");
            return Err(PersonalizerError::Request(format!("status {status}")));
        }

        resp.json::<PersonalizerOutput>()
            .await
            .map_err(|e| PersonalizerError::MalformedOutput(e.to_string()))
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use oj_core::RequirementClaim;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// A scriptable Personalizer: returns a canned output per job id, or
    /// fails with `PersonalizerError::Request` if the job id was scripted
    /// to fail (simulating a downstream outage).
    pub struct FakePersonalizer {
        outputs: Mutex<HashMap<String, Result<PersonalizerOutput, String>>>,
    }

    impl FakePersonalizer {
        pub fn new() -> Self {
            Self { outputs: Mutex::new(HashMap::new()) }
        }

        /// Script a grounded output for `job_id`, claiming `evidence_id` for
        /// every `requirement`.
        pub fn script_grounded(&self, job_id: &str, requirement: &str, evidence_id: &str) {
            self.outputs.lock().insert(
                job_id.to_string(),
                Ok(PersonalizerOutput {
                    cover_letter: format!("Dear hiring team, regarding {job_id}..."),
                    evidence_map: vec![RequirementClaim {
                        requirement: requirement.to_string(),
                        evidence_id_claim: evidence_id.into(),
                        rationale: String::new(),
                    }],
                }),
            );
        }

        pub fn script_failure(&self, job_id: &str, message: &str) {
            self.outputs
                .lock()
                .insert(job_id.to_string(), Err(message.to_string()));
        }
    }

    impl Default for FakePersonalizer {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl Personalizer for FakePersonalizer {
        async fn personalize(
            &self,
            _profile: &Profile,
            job: &Job,
        ) -> Result<PersonalizerOutput, PersonalizerError> {
            match self.outputs.lock().get(job.id.as_str()) {
                Some(Ok(output)) => Ok(output.clone()),
                Some(Err(message)) => Err(PersonalizerError::Request(message.clone())),
                None => Ok(PersonalizerOutput {
                    cover_letter: format!("Dear hiring team, regarding {}...", job.title),
                    evidence_map: Vec::new(),
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakePersonalizer;
    use super::*;

    #[tokio::test]
    async fn fake_personalizer_returns_scripted_failure() {
        let personalizer = FakePersonalizer::new();
        personalizer.script_failure("j1", "timeout upstream");
        let job = Job::builder().id("j1").build();
        let profile = Profile::default();
        let result = personalizer.personalize(&profile, &job).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn fake_personalizer_defaults_to_empty_evidence_map() {
        let personalizer = FakePersonalizer::new();
        let job = Job::builder().id("j1").build();
        let profile = Profile::default();
        let output = personalizer.personalize(&profile, &job).await.unwrap();
        assert!(output.evidence_map.is_empty());
    }
}
