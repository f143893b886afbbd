use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to run a matching session
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SmartMatchRequest {
    #[validate(length(min = 1))]
    pub resume_id: String,
    /// Overrides the resume's target city
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    #[validate(length(max = 10))]
    pub extra_keywords: Vec<String>,
    /// Minimum qualified matches wanted before live acquisition stops
    #[serde(default = "default_min_jobs")]
    #[validate(range(min = 1, max = 100))]
    pub min_jobs: usize,
    #[serde(default)]
    #[validate(range(min = 1, max = 1000))]
    pub max_candidates: Option<usize>,
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_enable_acquisition")]
    pub enable_acquisition: bool,
    #[serde(default)]
    #[validate(range(min = 0.0, max = 100.0))]
    pub qualified_threshold: Option<f64>,
    #[serde(default)]
    #[validate(range(min = 0.0, max = 100.0))]
    pub min_display_score: Option<f64>,
}

fn default_min_jobs() -> usize {
    10
}

fn default_profile() -> String {
    "fast".to_string()
}

fn default_enable_acquisition() -> bool {
    true
}
