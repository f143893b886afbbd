use crate::models::Dimension;
use thiserror::Error;

/// Errors raised by the matching core
///
/// Only `Validation`, `InvalidProfile` and `SourceUnavailable` with zero
/// candidates ever reach the caller as an `error` event. The rest are
/// recovered inside the session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown weighting profile: {0}")]
    InvalidProfile(String),

    #[error("Invalid weights for profile {profile}: {reason}")]
    InvalidWeights { profile: String, reason: String },

    #[error("Incomplete profile for {dimension}: {reason}")]
    IncompleteProfile { dimension: Dimension, reason: String },

    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Candidate {external_id} could not be scored: {reason}")]
    CandidateScoring { external_id: String, reason: String },

    #[error("Session cancelled")]
    SessionCancelled,

    #[error("Invalid session transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}

impl MatchError {
    pub fn incomplete(dimension: Dimension, reason: impl Into<String>) -> Self {
        MatchError::IncompleteProfile {
            dimension,
            reason: reason.into(),
        }
    }

    pub fn candidate(external_id: &str, reason: impl Into<String>) -> Self {
        MatchError::CandidateScoring {
            external_id: external_id.to_string(),
            reason: reason.into(),
        }
    }
}
