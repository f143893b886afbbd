use crate::core::dimensions::{
    score_education, score_experience, score_location, score_position, score_salary,
    score_semantic, score_signal, score_skills, DimensionOutcome, ExperienceDecay, SkillSynonyms,
};
use crate::core::error::MatchError;
use crate::models::{Dimension, DimensionScore, Evidence, JobProfile, MatchResult, Provenance, ResumeProfile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Named weighting profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringProfile {
    /// Rule + embedding scoring over the five core dimensions
    Fast,
    /// Seven dimensions including externally supplied fit signals
    Precise,
}

impl Default for ScoringProfile {
    fn default() -> Self {
        ScoringProfile::Fast
    }
}

impl FromStr for ScoringProfile {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fast" => Ok(ScoringProfile::Fast),
            "precise" => Ok(ScoringProfile::Precise),
            other => Err(MatchError::InvalidProfile(other.to_string())),
        }
    }
}

impl fmt::Display for ScoringProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoringProfile::Fast => f.write_str("fast"),
            ScoringProfile::Precise => f.write_str("precise"),
        }
    }
}

/// Per-dimension weights of one profile; iteration order is the breakdown order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightVector(BTreeMap<Dimension, f64>);

impl WeightVector {
    pub fn new<I: IntoIterator<Item = (Dimension, f64)>>(weights: I) -> Self {
        Self(weights.into_iter().collect())
    }

    pub fn fast_default() -> Self {
        Self::new([
            (Dimension::Position, 0.30),
            (Dimension::Skills, 0.25),
            (Dimension::Experience, 0.20),
            (Dimension::Education, 0.15),
            (Dimension::Semantic, 0.10),
        ])
    }

    pub fn precise_default() -> Self {
        Self::new([
            (Dimension::Skills, 0.25),
            (Dimension::Experience, 0.20),
            (Dimension::Salary, 0.15),
            (Dimension::Location, 0.10),
            (Dimension::Culture, 0.10),
            (Dimension::Growth, 0.10),
            (Dimension::Stability, 0.10),
        ])
    }

    pub fn get(&self, dimension: Dimension) -> Option<f64> {
        self.0.get(&dimension).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, f64)> + '_ {
        self.0.iter().map(|(d, w)| (*d, *w))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn validate(&self, profile: ScoringProfile) -> Result<(), MatchError> {
        let invalid = |reason: String| MatchError::InvalidWeights {
            profile: profile.to_string(),
            reason,
        };

        if self.0.is_empty() {
            return Err(invalid("no dimensions configured".to_string()));
        }
        if let Some((d, w)) = self.iter().find(|(_, w)| !w.is_finite() || *w < 0.0) {
            return Err(invalid(format!("weight for {} is {}", d, w)));
        }
        let sum: f64 = self.0.values().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(invalid(format!("weights sum to {}, expected 1.0", sum)));
        }
        Ok(())
    }
}

/// Immutable scoring configuration handed to the engine
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    /// Substituted for a dimension whose inputs are missing
    pub neutral_score: f64,
    pub fast: WeightVector,
    pub precise: WeightVector,
    pub experience: ExperienceDecay,
    /// Points lost per education step below the requirement
    pub education_step_penalty: f64,
    /// Multiplier on the relative salary shortfall (in percent)
    pub salary_shortfall_decay: f64,
    pub synonyms: SkillSynonyms,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            neutral_score: 50.0,
            fast: WeightVector::fast_default(),
            precise: WeightVector::precise_default(),
            experience: ExperienceDecay::default(),
            education_step_penalty: 25.0,
            salary_shortfall_decay: 2.0,
            synonyms: SkillSynonyms::default(),
        }
    }
}

/// Turns a (resume, job) pair into a weighted, explainable match score
///
/// Scoring is a pure function of its inputs and the configuration; the
/// engine holds no mutable state and is shared across sessions.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    config: Arc<ScoringConfig>,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Result<Self, MatchError> {
        config.fast.validate(ScoringProfile::Fast)?;
        config.precise.validate(ScoringProfile::Precise)?;
        if !(0.0..=100.0).contains(&config.neutral_score) {
            return Err(MatchError::Validation(format!(
                "neutral score {} outside [0,100]",
                config.neutral_score
            )));
        }
        Ok(Self {
            config: Arc::new(config),
        })
    }

    pub fn with_defaults() -> Self {
        Self {
            config: Arc::new(ScoringConfig::default()),
        }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn weights(&self, profile: ScoringProfile) -> &WeightVector {
        match profile {
            ScoringProfile::Fast => &self.config.fast,
            ScoringProfile::Precise => &self.config.precise,
        }
    }

    /// Score one candidate.
    ///
    /// Missing attributes fall back to the neutral score for that dimension;
    /// malformed candidates yield `CandidateScoring`.
    pub fn score(
        &self,
        resume: &ResumeProfile,
        job: Arc<JobProfile>,
        profile: ScoringProfile,
        threshold: f64,
        provenance: Provenance,
    ) -> Result<MatchResult, MatchError> {
        if job.external_id.trim().is_empty() {
            return Err(MatchError::candidate(&job.external_id, "missing external id"));
        }

        let weights = self.weights(profile);
        let mut dimensions = Vec::with_capacity(weights.len());

        for (dimension, _) in weights.iter() {
            let mut score = match self.score_dimension(dimension, resume, &job) {
                Ok(score) => score,
                Err(MatchError::IncompleteProfile { reason, .. }) => {
                    tracing::trace!(
                        "Neutral {} score for job {}: {}",
                        dimension,
                        job.external_id,
                        reason
                    );
                    DimensionScore {
                        dimension,
                        value: self.config.neutral_score,
                        evidence: Evidence::Neutral { reason },
                    }
                }
                Err(e) => return Err(e),
            };
            score.value = round2(score.value.clamp(0.0, 100.0));
            dimensions.push(score);
        }

        let score = weighted_total(&job.external_id, &dimensions, weights)?;

        Ok(MatchResult {
            job,
            score,
            dimensions,
            qualified: score >= threshold,
            provenance,
        })
    }

    /// Run the scorer for a single dimension without neutral substitution
    pub fn score_dimension(
        &self,
        dimension: Dimension,
        resume: &ResumeProfile,
        job: &JobProfile,
    ) -> DimensionOutcome {
        match dimension {
            Dimension::Position => score_position(resume, job),
            Dimension::Skills => score_skills(resume, job, &self.config.synonyms),
            Dimension::Experience => score_experience(resume, job, &self.config.experience),
            Dimension::Education => {
                score_education(resume, job, self.config.education_step_penalty)
            }
            Dimension::Semantic => score_semantic(resume, job),
            Dimension::Salary => score_salary(resume, job, self.config.salary_shortfall_decay),
            Dimension::Location => score_location(resume, job),
            Dimension::Culture | Dimension::Growth | Dimension::Stability => {
                score_signal(dimension, job)
            }
        }
    }
}

/// Weighted sum of dimension values, rounded to two decimals
fn weighted_total(
    external_id: &str,
    dimensions: &[DimensionScore],
    weights: &WeightVector,
) -> Result<f64, MatchError> {
    let total: f64 = dimensions
        .iter()
        .map(|d| d.value * weights.get(d.dimension).unwrap_or(0.0))
        .sum();
    if !total.is_finite() {
        return Err(MatchError::candidate(external_id, "aggregate score is not finite"));
    }
    Ok(round2(total.clamp(0.0, 100.0)))
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Round to two decimals
#[inline]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
