//! Per-item outcome used inside a stage's worker loop.
//!
//! §9 "Exception-based control flow": the original raises an exception to
//! abort one paper's processing inside a stage. Here that becomes a result
//! variant the stage's collector pattern-matches on instead of a thrown
//! error, so a single bad paper can never unwind past its own worker.

use curator_common::errors::PipelineError;

#[derive(Debug)]
pub enum Outcome<T> {
    Ok(T),
    /// Dropped without being treated as an error — e.g. zero active anchors
    /// for a paper, or an L3 verdict that came back `is_relevant: false`.
    Skipped(String),
    /// Retries exhausted or a non-retryable failure; counted in stage
    /// statistics but never aborts the stage itself.
    Err(PipelineError),
}

impl<T> Outcome<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            Outcome::Ok(v) => Some(v),
            _ => None,
        }
    }
}
