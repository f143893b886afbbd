//! DeepCareer Match - incremental multi-source job matching service
//!
//! Scores resume/job pairs across weighted dimensions, merges stored and
//! freshly acquired postings into one ranked set, and streams the ranking
//! to the caller as it improves.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{MatchError, MatchSession, Orchestrator, ScoringEngine, ScoringProfile, SessionParams};
pub use models::{JobProfile, MatchEvent, MatchResult, ResumeProfile, SmartMatchRequest, SmartMatchResponse};
