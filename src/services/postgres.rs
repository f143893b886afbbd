use crate::core::error::MatchError;
use crate::core::sources::JobRepository;
use crate::models::{
    EducationLevel, ExperienceRange, Extensions, FitSignals, JobCategory, JobProfile,
    ResumeProfile, SalaryRange,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when interacting with PostgreSQL
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<RepositoryError> for MatchError {
    fn from(err: RepositoryError) -> Self {
        MatchError::SourceUnavailable(err.to_string())
    }
}

/// Extracted attributes stored in `jobs.structured_data`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredJobAttributes {
    #[serde(default, deserialize_with = "lenient")]
    pub category: Option<JobCategory>,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub experience: Option<ExperienceRange>,
    #[serde(default, deserialize_with = "lenient")]
    pub education: Option<EducationLevel>,
    #[serde(default)]
    pub signals: FitSignals,
    #[serde(flatten)]
    pub extensions: Extensions,
}

/// Extracted attributes stored in `resumes.structured_data`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredResumeAttributes {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub desired_categories: Vec<JobCategory>,
    #[serde(default)]
    pub current_position: Option<String>,
    #[serde(default)]
    pub desired_positions: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub years_experience: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub education: Option<EducationLevel>,
    #[serde(default)]
    pub target_city: Option<String>,
    #[serde(default)]
    pub search_keywords: Vec<String>,
    #[serde(default)]
    pub expected_salary: Option<SalaryRange>,
    #[serde(flatten)]
    pub extensions: Extensions,
}

/// Extractor output outside the known vocabulary decodes as absent
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let values = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?;
    Ok(values
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect())
}

/// Read-only PostgreSQL access to stored postings and resumes
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, RepositoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, RepositoryError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    /// Active postings in a city, ordered by keyword hits in the title, then recency
    pub async fn fetch_active_jobs(
        &self,
        city: &str,
        keywords: &[String],
        limit: usize,
    ) -> Result<Vec<JobProfile>, RepositoryError> {
        let query = r#"
            SELECT external_id, platform, job_url, title, company_name, city,
                   salary_min, salary_max, structured_data,
                   description_embedding::real[] AS embedding
            FROM jobs
            WHERE is_active = TRUE
              AND city ILIKE '%' || $1 || '%'
            ORDER BY (
                SELECT COUNT(*) FROM unnest($2::text[]) AS kw
                WHERE title ILIKE '%' || kw || '%'
            ) DESC,
            crawled_at DESC NULLS LAST
            LIMIT $3
        "#;

        let rows = sqlx::query(query)
            .bind(city)
            .bind(keywords)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        let jobs = keep_decoded(rows.iter().map(job_from_row));

        tracing::debug!("Fetched {} stored jobs for city {}", jobs.len(), city);

        Ok(jobs)
    }

    /// Load a resume snapshot by id
    pub async fn get_resume(&self, resume_id: &str) -> Result<Option<ResumeProfile>, RepositoryError> {
        let query = r#"
            SELECT id::text AS resume_id, structured_data,
                   text_embedding::real[] AS embedding
            FROM resumes
            WHERE id::text = $1
        "#;

        let row = sqlx::query(query)
            .bind(resume_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(resume_from_row).transpose()
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, RepositoryError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

#[async_trait]
impl JobRepository for PostgresClient {
    async fn fetch_jobs(
        &self,
        city: &str,
        keywords: &[String],
        limit: usize,
    ) -> Result<Vec<JobProfile>, MatchError> {
        Ok(self.fetch_active_jobs(city, keywords, limit).await?)
    }
}

/// Drop rows that fail to decode so one bad posting does not sink the batch
fn keep_decoded(rows: impl Iterator<Item = Result<JobProfile, RepositoryError>>) -> Vec<JobProfile> {
    rows.filter_map(|row| match row {
        Ok(job) => Some(job),
        Err(e) => {
            tracing::warn!("Skipping stored job: {}", e);
            None
        }
    })
    .collect()
}

fn job_from_row(row: &PgRow) -> Result<JobProfile, RepositoryError> {
    let title: String = row.try_get("title")?;
    let attributes = row
        .try_get::<Option<Json<StoredJobAttributes>>, _>("structured_data")?
        .map(|Json(attributes)| attributes)
        .unwrap_or_default();
    let salary_min: Option<i32> = row.try_get("salary_min")?;
    let salary_max: Option<i32> = row.try_get("salary_max")?;

    let salary = match (salary_min, salary_max) {
        (Some(min), Some(max)) => Some(SalaryRange {
            min: f64::from(min),
            max: f64::from(max),
        }),
        (Some(v), None) | (None, Some(v)) => Some(SalaryRange {
            min: f64::from(v),
            max: f64::from(v),
        }),
        (None, None) => None,
    };

    Ok(JobProfile {
        external_id: row.try_get("external_id")?,
        source: row
            .try_get::<Option<String>, _>("platform")?
            .unwrap_or_default(),
        url: row.try_get("job_url")?,
        company: row.try_get("company_name")?,
        category: attributes
            .category
            .or_else(|| JobCategory::infer_from_title(&title)),
        title,
        required_skills: attributes.required_skills,
        experience: attributes.experience,
        education: attributes.education,
        embedding: row.try_get("embedding")?,
        city: row.try_get("city")?,
        salary,
        signals: attributes.signals,
        extensions: attributes.extensions,
    })
}

fn resume_from_row(row: &PgRow) -> Result<ResumeProfile, RepositoryError> {
    let attributes = row
        .try_get::<Option<Json<StoredResumeAttributes>>, _>("structured_data")?
        .map(|Json(attributes)| attributes)
        .unwrap_or_default();

    let desired_categories = if attributes.desired_categories.is_empty() {
        attributes
            .desired_positions
            .iter()
            .chain(attributes.current_position.iter())
            .filter_map(|title| JobCategory::infer_from_title(title))
            .take(1)
            .collect()
    } else {
        attributes.desired_categories
    };

    Ok(ResumeProfile {
        resume_id: row.try_get("resume_id")?,
        name: attributes.name,
        desired_categories,
        current_position: attributes.current_position,
        desired_positions: attributes.desired_positions,
        skills: attributes.skills,
        years_experience: attributes.years_experience,
        education: attributes.education,
        embedding: row.try_get("embedding")?,
        target_city: attributes.target_city,
        search_keywords: attributes.search_keywords,
        expected_salary: attributes.expected_salary,
        extensions: attributes.extensions,
    })
}
