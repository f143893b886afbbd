// Core matching exports
pub mod dimensions;
pub mod emitter;
pub mod error;
pub mod keywords;
pub mod orchestrator;
pub mod ranking;
pub mod scoring;
pub mod session;
pub mod sources;

pub use emitter::{event_channel, CancellationHandle, EventEmitter, EventStream};
pub use error::MatchError;
pub use keywords::{extract_search_keywords, merge_keywords, normalize_city, resolve_city};
pub use orchestrator::{Orchestrator, OrchestratorSettings, SessionOutcome};
pub use ranking::RankedResults;
pub use scoring::{ScoringConfig, ScoringEngine, ScoringProfile, WeightVector};
pub use session::{MatchSession, SessionParams, SessionState};
pub use sources::{
    AcquisitionError, AcquisitionQuery, CachedSource, JobAcquirer, JobRepository, LiveSource,
    PostingStream,
};
