// Model exports
pub mod domain;
pub mod events;
pub mod requests;
pub mod responses;

pub use domain::{
    Dimension, DimensionScore, EducationLevel, Evidence, ExperienceRange, Extensions, FitSignals,
    JobCategory, JobProfile, MatchResult, Provenance, ResumeProfile, SalaryRange,
};
pub use events::{MatchEvent, SessionEvent};
pub use requests::SmartMatchRequest;
pub use responses::{ErrorResponse, HealthResponse, KeywordsResponse, SmartMatchResponse};
