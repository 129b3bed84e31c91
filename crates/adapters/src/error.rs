//! Adapter-level errors. These never reach a consumer of the HTTP surface
//! directly — the engine classifies them into `oj_core::ErrorKind` or,
//! for the Portal Adapter, into `oj_core::Outcome`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortalError {
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    #[error("unexpected response: {0}")]
    Protocol(String),
}

#[derive(Debug, Error)]
pub enum PersonalizerError {
    #[error("personalizer request failed: {0}")]
    Request(String),
    #[error("personalizer request timed out")]
    Timeout,
    #[error("personalizer returned malformed output: {0}")]
    MalformedOutput(String),
}

#[derive(Debug, Error)]
pub enum EmbedderError {
    #[error("embedding request failed: {0}")]
    Request(String),
    #[error("embedding request timed out")]
    Timeout,
}
