use crate::core::emitter::CancellationHandle;
use crate::core::error::MatchError;
use crate::core::ranking::RankedResults;
use crate::core::scoring::ScoringProfile;
use crate::models::ResumeProfile;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

/// Lifecycle of a matching session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Init,
    CachedLookup,
    LiveAcquire,
    Complete,
    Error,
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Complete | SessionState::Error | SessionState::Cancelled
        )
    }

    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Init, CachedLookup)
                | (CachedLookup, LiveAcquire)
                | (CachedLookup, Complete)
                | (LiveAcquire, Complete)
                | (Init | CachedLookup | LiveAcquire, Error)
                | (Init | CachedLookup | LiveAcquire, Cancelled)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Init => "init",
            SessionState::CachedLookup => "cached_lookup",
            SessionState::LiveAcquire => "live_acquire",
            SessionState::Complete => "complete",
            SessionState::Error => "error",
            SessionState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tunables for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionParams {
    pub qualified_threshold: f64,
    pub min_display_score: f64,
    /// Live acquisition starts when fewer qualified matches are cached
    pub min_qualified: usize,
    /// Cap on candidates examined across both sources
    pub max_candidates: usize,
    pub profile: ScoringProfile,
    pub acquisition_enabled: bool,
    #[serde(with = "duration_secs")]
    pub time_budget: Duration,
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            qualified_threshold: 60.0,
            min_display_score: 30.0,
            min_qualified: 10,
            max_candidates: 200,
            profile: ScoringProfile::Fast,
            acquisition_enabled: true,
            time_budget: Duration::from_secs(90),
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

/// Mutable state of one matching run; owned by exactly one orchestrator task
#[derive(Debug)]
pub struct MatchSession {
    pub id: Uuid,
    pub resume: Arc<ResumeProfile>,
    pub target_city: String,
    pub keywords: Vec<String>,
    pub params: SessionParams,
    pub state: SessionState,
    pub results: RankedResults,
    pub seen: HashSet<String>,
    pub examined: usize,
    pub from_cached: usize,
    pub from_live: usize,
    pub warnings: Vec<String>,
    cancel: CancellationHandle,
    deadline: Option<Instant>,
}

impl MatchSession {
    pub fn new(
        resume: Arc<ResumeProfile>,
        target_city: impl Into<String>,
        keywords: Vec<String>,
        params: SessionParams,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            resume,
            target_city: target_city.into(),
            keywords,
            params,
            state: SessionState::Init,
            results: RankedResults::new(),
            seen: HashSet::new(),
            examined: 0,
            from_cached: 0,
            from_live: 0,
            warnings: Vec::new(),
            cancel: CancellationHandle::new(),
            deadline: None,
        }
    }

    /// Share an externally owned cancellation handle (e.g. the emitter's)
    pub fn with_cancellation(mut self, cancel: CancellationHandle) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation(&self) -> CancellationHandle {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        let p = &self.params;
        if self.resume.resume_id.trim().is_empty() {
            return Err(MatchError::Validation("resume id is empty".to_string()));
        }
        if !(0.0..=100.0).contains(&p.qualified_threshold) {
            return Err(MatchError::Validation(format!(
                "qualified threshold {} outside [0,100]",
                p.qualified_threshold
            )));
        }
        if !(0.0..=100.0).contains(&p.min_display_score) {
            return Err(MatchError::Validation(format!(
                "display threshold {} outside [0,100]",
                p.min_display_score
            )));
        }
        if self.target_city.trim().is_empty() {
            return Err(MatchError::Validation("target city is empty".to_string()));
        }
        if self.keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(MatchError::Validation("search keywords are empty".to_string()));
        }
        if p.max_candidates == 0 {
            return Err(MatchError::Validation("max candidates must be positive".to_string()));
        }
        Ok(())
    }

    pub fn transition(&mut self, next: SessionState) -> Result<(), MatchError> {
        if !self.state.can_transition_to(next) {
            return Err(MatchError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        tracing::debug!(session_id = %self.id, "Session {} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }

    /// Start the wall-clock budget; called once when the session begins running
    pub fn start_clock(&mut self) -> Instant {
        let budget = self.params.time_budget;
        *self.deadline.get_or_insert_with(|| Instant::now() + budget)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Record an id; returns false when it was already seen
    pub fn mark_seen(&mut self, external_id: &str) -> bool {
        self.seen.insert(external_id.to_string())
    }

    pub fn remaining_capacity(&self) -> usize {
        self.params.max_candidates.saturating_sub(self.examined)
    }

    pub fn qualified_count(&self) -> usize {
        self.results.qualified_count()
    }

    /// Qualified matches still missing to reach the desired minimum
    pub fn needed(&self) -> usize {
        self.params.min_qualified.saturating_sub(self.qualified_count())
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(session_id = %self.id, "{}", message);
        self.warnings.push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_session() -> MatchSession {
        let resume: ResumeProfile =
            serde_json::from_value(serde_json::json!({ "resume_id": "r-1" })).unwrap();
        MatchSession::new(
            Arc::new(resume),
            "深圳",
            vec!["Python".to_string()],
            SessionParams::default(),
        )
    }

    #[test]
    fn test_valid_session() {
        assert!(create_test_session().validate().is_ok());
    }

    #[test]
    fn test_validation_failures() {
        let mut s = create_test_session();
        s.params.qualified_threshold = 120.0;
        assert!(matches!(s.validate(), Err(MatchError::Validation(_))));

        let mut s = create_test_session();
        s.params.min_display_score = -1.0;
        assert!(matches!(s.validate(), Err(MatchError::Validation(_))));

        let mut s = create_test_session();
        s.keywords = vec!["  ".to_string()];
        assert!(matches!(s.validate(), Err(MatchError::Validation(_))));

        let mut s = create_test_session();
        s.target_city.clear();
        assert!(matches!(s.validate(), Err(MatchError::Validation(_))));

        let mut s = create_test_session();
        s.params.max_candidates = 0;
        assert!(matches!(s.validate(), Err(MatchError::Validation(_))));
    }

    #[test]
    fn test_transitions() {
        let mut s = create_test_session();
        assert!(s.transition(SessionState::LiveAcquire).is_err());
        s.transition(SessionState::CachedLookup).unwrap();
        s.transition(SessionState::LiveAcquire).unwrap();
        s.transition(SessionState::Complete).unwrap();
        assert!(s.state.is_terminal());
        assert!(matches!(
            s.transition(SessionState::Error),
            Err(MatchError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_seen_and_capacity() {
        let mut s = create_test_session();
        s.params.max_candidates = 3;
        assert!(s.mark_seen("a"));
        assert!(!s.mark_seen("a"));
        s.examined = 2;
        assert_eq!(s.remaining_capacity(), 1);
        assert_eq!(s.needed(), 10);
    }
}
