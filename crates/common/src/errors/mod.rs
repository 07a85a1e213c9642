//! Error taxonomy shared by every pipeline stage.
//!
//! The six kinds below are not six Rust types — they are the dimensions the
//! orchestrator and the shared retry helper reason about. Each carries enough
//! context to log usefully; `severity()` and `is_retryable()` are the two
//! properties callers actually branch on.

use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Log severity to dispatch an error at. Mirrors the propagation policy in
/// the error handling design: per-item errors warn, stage aborts error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warn,
    Error,
}

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Timeout or 5xx from an upstream HTTP dependency (preprint API, PDF
    /// host, embedding/LLM endpoint). Retried per the calling stage's policy.
    #[error("transient network error calling {target}: {message}")]
    TransientNetwork { target: String, message: String },

    /// 503/429 from an upstream that wants multiplicative backoff.
    #[error("rate limited by {target}: {message}")]
    RateLimited { target: String, message: String },

    /// Malformed XML/JSON from an upstream response. The offending item is
    /// dropped, never retried.
    #[error("failed to parse {what}: {message}")]
    ParseFailure { what: String, message: String },

    /// LLM structured output didn't match the expected schema. Retried up to
    /// the stage's R, then the item is dropped.
    #[error("schema validation failed for {what}: {message}")]
    ValidationFailure { what: String, message: String },

    /// Expected row missing on a DB lookup. Item dropped with a warning.
    #[error("{resource} not found: {id}")]
    ResourceMissing { resource: String, id: String },

    /// Schema/constraint violation or misconfiguration. Bubbles up and
    /// aborts the current stage.
    #[error("fatal error in {context}: {message}")]
    Fatal { context: String, message: String },

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("http client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    pub fn fatal(context: impl Into<String>, message: impl std::fmt::Display) -> Self {
        PipelineError::Fatal {
            context: context.into(),
            message: message.to_string(),
        }
    }

    pub fn validation(what: impl Into<String>, message: impl std::fmt::Display) -> Self {
        PipelineError::ValidationFailure {
            what: what.into(),
            message: message.to_string(),
        }
    }

    pub fn parse(what: impl Into<String>, message: impl std::fmt::Display) -> Self {
        PipelineError::ParseFailure {
            what: what.into(),
            message: message.to_string(),
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            PipelineError::ParseFailure { .. }
            | PipelineError::ResourceMissing { .. }
            | PipelineError::ValidationFailure { .. }
            | PipelineError::TransientNetwork { .. }
            | PipelineError::RateLimited { .. } => Severity::Warn,
            PipelineError::Fatal { .. }
            | PipelineError::Database(_)
            | PipelineError::HttpClient(_)
            | PipelineError::Serialization(_)
            | PipelineError::Configuration(_)
            | PipelineError::Other(_) => Severity::Error,
        }
    }

    /// Whether the shared backoff helper should retry this error kind.
    /// Per the error handling design: TransientNetwork and RateLimited are
    /// retried; ParseFailure, ResourceMissing, and Fatal never are.
    /// ValidationFailure is retried by the calling stage up to its own R,
    /// which the stage itself tracks (not this helper), so it reports
    /// non-retryable here to avoid double-counting attempts.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PipelineError::TransientNetwork { .. } | PipelineError::RateLimited { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_network_is_retryable() {
        let err = PipelineError::TransientNetwork {
            target: "arxiv".into(),
            message: "timeout".into(),
        };
        assert!(err.is_retryable());
        assert_eq!(err.severity(), Severity::Warn);
    }

    #[test]
    fn fatal_is_not_retryable_and_errors() {
        let err = PipelineError::fatal("l2", "embedding outage");
        assert!(!err.is_retryable());
        assert_eq!(err.severity(), Severity::Error);
    }

    #[test]
    fn parse_failure_is_dropped_not_retried() {
        let err = PipelineError::parse("atom entry", "missing id");
        assert!(!err.is_retryable());
    }
}
