use crate::core::error::MatchError;
use crate::models::JobProfile;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;
use thiserror::Error;

/// Minimum per-keyword count hint sent to the acquisition collaborator
const MIN_PER_KEYWORD_HINT: usize = 5;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AcquisitionError {
    /// Transient outage; the stream should be treated as exhausted
    #[error("Acquisition unavailable: {0}")]
    Unavailable(String),

    /// A single posting could not be decoded
    #[error("Malformed posting: {0}")]
    Malformed(String),

    #[error("Acquisition request failed: {0}")]
    Request(String),
}

impl AcquisitionError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, AcquisitionError::Unavailable(_))
    }
}

impl From<AcquisitionError> for MatchError {
    fn from(err: AcquisitionError) -> Self {
        MatchError::SourceUnavailable(err.to_string())
    }
}

/// Lazy, finite sequence of postings from live acquisition
pub type PostingStream = BoxStream<'static, Result<JobProfile, AcquisitionError>>;

/// What to ask the acquisition collaborator for
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionQuery {
    pub city: String,
    pub keywords: Vec<String>,
    /// Suggested number of postings per keyword
    pub per_keyword_hint: usize,
}

/// Read-only access to previously stored postings
#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn fetch_jobs(
        &self,
        city: &str,
        keywords: &[String],
        limit: usize,
    ) -> Result<Vec<JobProfile>, MatchError>;
}

/// On-demand retrieval of fresh postings
#[async_trait]
pub trait JobAcquirer: Send + Sync {
    async fn acquire(&self, query: &AcquisitionQuery) -> Result<PostingStream, AcquisitionError>;
}

/// Finite batch of stored candidates
#[derive(Clone)]
pub struct CachedSource {
    repository: Arc<dyn JobRepository>,
}

impl CachedSource {
    pub fn new(repository: Arc<dyn JobRepository>) -> Self {
        Self { repository }
    }

    pub async fn fetch(
        &self,
        city: &str,
        keywords: &[String],
        limit: usize,
    ) -> Result<Vec<JobProfile>, MatchError> {
        self.repository.fetch_jobs(city, keywords, limit).await
    }
}

/// Lazy sequence of freshly acquired candidates
#[derive(Clone)]
pub struct LiveSource {
    acquirer: Arc<dyn JobAcquirer>,
}

impl LiveSource {
    pub fn new(acquirer: Arc<dyn JobAcquirer>) -> Self {
        Self { acquirer }
    }

    /// Open the posting stream; the caller bounds how many items it merges
    pub async fn acquire(
        &self,
        city: &str,
        keywords: &[String],
        needed: usize,
    ) -> Result<PostingStream, AcquisitionError> {
        let query = AcquisitionQuery {
            city: city.to_string(),
            keywords: keywords.to_vec(),
            per_keyword_hint: per_keyword_hint(needed, keywords.len()),
        };
        self.acquirer.acquire(&query).await
    }
}

/// `max(5, needed / keyword_count + 1)`
pub fn per_keyword_hint(needed: usize, keyword_count: usize) -> usize {
    (needed / keyword_count.max(1) + 1).max(MIN_PER_KEYWORD_HINT)
}
