//! Error kinds surfaced in logs and events. Never leak stack traces to consumers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A classified error kind, attached to Application Records and `workflow_failed`
/// events. Distinct from the transport-level [`crate::Outcome`] taxonomy: this is
/// what a consumer of the HTTP surface or event stream ultimately sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InputInvalid,
    AlreadyRunning,
    NotFound,
    UpstreamTransient,
    UpstreamPermanent,
    PersonalizationFailed,
    UngroundedClaim,
    PolicyViolation,
    Cancelled,
    Internal,
}

crate::simple_display! {
    ErrorKind {
        InputInvalid => "input_invalid",
        AlreadyRunning => "already_running",
        NotFound => "not_found",
        UpstreamTransient => "upstream_transient",
        UpstreamPermanent => "upstream_permanent",
        PersonalizationFailed => "personalization_failed",
        UngroundedClaim => "ungrounded_claim",
        PolicyViolation => "policy_violation",
        Cancelled => "cancelled",
        Internal => "internal",
    }
}

/// Errors returned by the Workflow Engine's synchronous operations
/// (`Start`, `Stop`, `Status`, `Subscribe`). Asynchronous per-job failures
/// are recorded on the Application Record instead of returned here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("a run is already in progress for this user")]
    AlreadyRunning,
    #[error("no run found for this user")]
    NotFound,
    #[error("invalid input: {0}")]
    InputInvalid(String),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::AlreadyRunning => ErrorKind::AlreadyRunning,
            EngineError::NotFound => ErrorKind::NotFound,
            EngineError::InputInvalid(_) => ErrorKind::InputInvalid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_snake_case() {
        assert_eq!(ErrorKind::UngroundedClaim.to_string(), "ungrounded_claim");
        assert_eq!(ErrorKind::PersonalizationFailed.to_string(), "personalization_failed");
    }

    #[test]
    fn engine_error_maps_to_kind() {
        assert_eq!(EngineError::AlreadyRunning.kind(), ErrorKind::AlreadyRunning);
        assert_eq!(
            EngineError::InputInvalid("bad".into()).kind(),
            ErrorKind::InputInvalid
        );
    }
}
