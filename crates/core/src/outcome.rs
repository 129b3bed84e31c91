//! The Portal Adapter's submit outcome taxonomy (§4.5, §4.6).
//!
//! No control-flow-by-exception: every way a submit attempt can end is a
//! variant here, and the Retry Executor switches on it explicitly.

use crate::id::ConfirmationId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    /// Terminal success.
    Submitted { confirmation_id: ConfirmationId },
    /// Terminal success-equivalent: the portal already has this application.
    /// Carries a confirmation id when the portal returns one; otherwise the
    /// caller records `skipped(duplicate)`.
    DuplicateAtPortal { confirmation_id: Option<ConfirmationId> },
    /// Retryable: connection-level failure.
    TransientNetwork,
    /// Retryable: 5xx response.
    Transient5xx,
    /// Retryable, with an optional portal-supplied backoff floor in seconds.
    RateLimited { retry_after_secs: Option<u64> },
    /// Terminal failure: 4xx other than 409/429.
    PermanentClient { message: String },
    /// Retryable once, then treated as permanent.
    Timeout,
}

impl Outcome {
    /// Whether this outcome may be retried at all. `Timeout` is retryable
    /// only on its first occurrence; the Retry Executor tracks that itself
    /// since a bare `Outcome` doesn't know the attempt count.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Outcome::TransientNetwork
                | Outcome::Transient5xx
                | Outcome::RateLimited { .. }
                | Outcome::Timeout
        )
    }

    pub fn is_terminal_success(&self) -> bool {
        matches!(self, Outcome::Submitted { .. } | Outcome::DuplicateAtPortal { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_outcomes_are_retryable() {
        assert!(Outcome::TransientNetwork.is_retryable());
        assert!(Outcome::Transient5xx.is_retryable());
        assert!(Outcome::RateLimited { retry_after_secs: Some(3) }.is_retryable());
        assert!(Outcome::Timeout.is_retryable());
    }

    #[test]
    fn permanent_and_success_outcomes_are_not_retryable() {
        assert!(!Outcome::PermanentClient { message: "bad request".into() }.is_retryable());
        assert!(!Outcome::Submitted { confirmation_id: ConfirmationId::new("c1") }.is_retryable());
    }

    #[test]
    fn duplicate_with_confirmation_is_terminal_success() {
        let outcome = Outcome::DuplicateAtPortal {
            confirmation_id: Some(ConfirmationId::new("c1")),
        };
        assert!(outcome.is_terminal_success());
    }
}
