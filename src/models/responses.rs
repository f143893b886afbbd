use crate::models::MatchResult;
use serde::{Deserialize, Serialize};

/// Collected result of a non-streaming matching session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartMatchResponse {
    pub resume_id: String,
    pub resume_name: String,
    pub search_keywords: Vec<String>,
    pub target_city: String,
    pub total_matched: usize,
    pub qualified_count: usize,
    pub from_database: usize,
    pub from_acquisition: usize,
    pub matches: Vec<MatchResult>,
    pub warnings: Vec<String>,
}

/// Suggested search parameters for a resume
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordsResponse {
    pub resume_id: String,
    pub keywords: Vec<String>,
    pub city: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
