use crate::core::error::MatchError;
use crate::core::keywords::normalize_city;
use crate::models::{Dimension, DimensionScore, Evidence, JobCategory, JobProfile, ResumeProfile};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Outcome of a single dimension scorer.
///
/// `IncompleteProfile` is recovered by the engine with the neutral score;
/// any other error marks the candidate as malformed.
pub type DimensionOutcome = Result<DimensionScore, MatchError>;

/// Linear decay applied when resume years fall outside the required range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExperienceDecay {
    pub below_per_year: f64,
    pub below_floor: f64,
    pub above_per_year: f64,
    pub above_floor: f64,
}

impl Default for ExperienceDecay {
    fn default() -> Self {
        Self {
            below_per_year: 20.0,
            below_floor: 0.0,
            above_per_year: 10.0,
            above_floor: 70.0,
        }
    }
}

/// Caller-supplied skill alias table (e.g. `k8s -> kubernetes`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkillSynonyms(HashMap<String, String>);

impl SkillSynonyms {
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (fold(k.as_ref()), fold(v.as_ref())))
                .collect(),
        )
    }

    /// Lowercase, collapse whitespace, then resolve aliases
    pub fn normalize(&self, skill: &str) -> String {
        let folded = fold(skill);
        match self.0.get(&folded) {
            Some(canonical) => canonical.clone(),
            None => folded,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn fold(skill: &str) -> String {
    skill
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Partial credit for adjacent categories (symmetric)
const ADJACENT_CATEGORIES: &[(JobCategory, JobCategory, f64)] = &[
    (JobCategory::FullStack, JobCategory::Backend, 80.0),
    (JobCategory::FullStack, JobCategory::Frontend, 80.0),
    (JobCategory::Architect, JobCategory::Backend, 80.0),
    (JobCategory::Frontend, JobCategory::Mobile, 70.0),
    (JobCategory::Dba, JobCategory::Data, 70.0),
    (JobCategory::Dba, JobCategory::Backend, 60.0),
    (JobCategory::Data, JobCategory::Algorithm, 70.0),
    (JobCategory::Devops, JobCategory::Backend, 65.0),
    (JobCategory::Testing, JobCategory::Backend, 60.0),
    (JobCategory::Security, JobCategory::Devops, 70.0),
    (JobCategory::ProjectManager, JobCategory::ProductManager, 60.0),
    (JobCategory::Operations, JobCategory::ProductManager, 50.0),
    (JobCategory::Sales, JobCategory::Operations, 50.0),
];

const SAME_TECHNICAL_GROUP: f64 = 60.0;
const SAME_NON_TECHNICAL_GROUP: f64 = 40.0;

/// Categorical distance between two categories, as a score in [0,100]
pub fn category_affinity(a: JobCategory, b: JobCategory) -> f64 {
    if a == b {
        return 100.0;
    }
    if let Some((_, _, score)) = ADJACENT_CATEGORIES
        .iter()
        .find(|(x, y, _)| (*x == a && *y == b) || (*x == b && *y == a))
    {
        return *score;
    }
    match (a.is_technical(), b.is_technical()) {
        (true, true) => SAME_TECHNICAL_GROUP,
        (false, false) => SAME_NON_TECHNICAL_GROUP,
        _ => 0.0,
    }
}

pub fn score_position(resume: &ResumeProfile, job: &JobProfile) -> DimensionOutcome {
    let job_category = job
        .category
        .ok_or_else(|| MatchError::incomplete(Dimension::Position, "job category unknown"))?;
    if resume.desired_categories.is_empty() {
        return Err(MatchError::incomplete(
            Dimension::Position,
            "resume has no desired categories",
        ));
    }

    let (best, value) = resume
        .desired_categories
        .iter()
        .map(|c| (*c, category_affinity(*c, job_category)))
        .fold((None, 0.0_f64), |(best, max), (c, score)| {
            if best.is_none() || score > max {
                (Some(c), score)
            } else {
                (best, max)
            }
        });

    Ok(DimensionScore {
        dimension: Dimension::Position,
        value,
        evidence: Evidence::Category {
            resume: resume.desired_categories.clone(),
            job: job_category,
            matched: best.filter(|c| *c == job_category),
        },
    })
}

/// Share of required skills present in the resume, on normalized strings
pub fn score_skills(
    resume: &ResumeProfile,
    job: &JobProfile,
    synonyms: &SkillSynonyms,
) -> DimensionOutcome {
    let mut seen = HashSet::new();
    let required: Vec<(&str, String)> = job
        .required_skills
        .iter()
        .map(|s| (s.as_str(), synonyms.normalize(s)))
        .filter(|(_, normalized)| !normalized.is_empty() && seen.insert(normalized.clone()))
        .collect();

    if required.is_empty() {
        return Err(MatchError::incomplete(
            Dimension::Skills,
            "job lists no required skills",
        ));
    }

    let owned: HashSet<String> = resume
        .skills
        .iter()
        .map(|s| synonyms.normalize(s))
        .collect();

    let (matched, missing): (Vec<_>, Vec<_>) = required
        .iter()
        .partition(|(_, normalized)| owned.contains(normalized));

    let value = matched.len() as f64 / required.len() as f64 * 100.0;

    Ok(DimensionScore {
        dimension: Dimension::Skills,
        value,
        evidence: Evidence::Skills {
            matched: matched.iter().map(|(raw, _)| raw.to_string()).collect(),
            missing: missing.iter().map(|(raw, _)| raw.to_string()).collect(),
        },
    })
}

pub fn score_experience(
    resume: &ResumeProfile,
    job: &JobProfile,
    decay: &ExperienceDecay,
) -> DimensionOutcome {
    let years = resume
        .years_experience
        .ok_or_else(|| MatchError::incomplete(Dimension::Experience, "resume years unknown"))?;
    let required = job
        .experience
        .ok_or_else(|| MatchError::incomplete(Dimension::Experience, "job experience unknown"))?;

    let max_ok = required.max_years.map_or(true, |max| max.is_finite() && max >= required.min_years);
    if !required.min_years.is_finite() || required.min_years < 0.0 || !max_ok {
        return Err(MatchError::candidate(
            &job.external_id,
            "experience range is malformed",
        ));
    }
    if !years.is_finite() {
        return Err(MatchError::incomplete(Dimension::Experience, "resume years not finite"));
    }

    let value = if years < required.min_years {
        let gap = required.min_years - years;
        (100.0 - gap * decay.below_per_year).max(decay.below_floor.max(0.0))
    } else {
        match required.max_years {
            Some(max) if years > max => {
                let gap = years - max;
                (100.0 - gap * decay.above_per_year).max(decay.above_floor.max(0.0))
            }
            _ => 100.0,
        }
    };

    Ok(DimensionScore {
        dimension: Dimension::Experience,
        value: value.min(100.0),
        evidence: Evidence::Experience {
            resume_years: years,
            required,
        },
    })
}

pub fn score_education(
    resume: &ResumeProfile,
    job: &JobProfile,
    step_penalty: f64,
) -> DimensionOutcome {
    let owned = resume
        .education
        .ok_or_else(|| MatchError::incomplete(Dimension::Education, "resume education unknown"))?;
    let required = job
        .education
        .ok_or_else(|| MatchError::incomplete(Dimension::Education, "job education unknown"))?;

    let value = if owned >= required {
        100.0
    } else {
        let steps = f64::from(required.rank() - owned.rank());
        (100.0 - steps * step_penalty).max(0.0)
    };

    Ok(DimensionScore {
        dimension: Dimension::Education,
        value,
        evidence: Evidence::Education {
            resume: owned,
            required,
        },
    })
}

/// Cosine similarity rescaled from [-1,1] to [0,100]
pub fn score_semantic(resume: &ResumeProfile, job: &JobProfile) -> DimensionOutcome {
    let job_vec = match job.embedding.as_deref() {
        Some(v) if !v.is_empty() => v,
        _ => return Err(MatchError::incomplete(Dimension::Semantic, "job embedding missing")),
    };
    let resume_vec = match resume.embedding.as_deref() {
        Some(v) if !v.is_empty() => v,
        _ => {
            return Err(MatchError::incomplete(
                Dimension::Semantic,
                "resume embedding missing",
            ))
        }
    };

    if resume_vec.iter().any(|x| !x.is_finite()) {
        return Err(MatchError::incomplete(
            Dimension::Semantic,
            "resume embedding contains non-finite values",
        ));
    }
    if job_vec.iter().any(|x| !x.is_finite()) {
        return Err(MatchError::candidate(
            &job.external_id,
            "embedding contains non-finite values",
        ));
    }
    if job_vec.len() != resume_vec.len() {
        return Err(MatchError::candidate(
            &job.external_id,
            format!(
                "embedding dimension {} does not match resume dimension {}",
                job_vec.len(),
                resume_vec.len()
            ),
        ));
    }

    let cosine = cosine_similarity(resume_vec, job_vec);

    Ok(DimensionScore {
        dimension: Dimension::Semantic,
        value: (cosine + 1.0) / 2.0 * 100.0,
        evidence: Evidence::Semantic { cosine },
    })
}

/// Cosine similarity; zero-magnitude vectors are treated as orthogonal
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

/// Full credit when the offer reaches the expected minimum; decays with the relative shortfall
pub fn score_salary(
    resume: &ResumeProfile,
    job: &JobProfile,
    shortfall_decay: f64,
) -> DimensionOutcome {
    let offered = job
        .salary
        .ok_or_else(|| MatchError::incomplete(Dimension::Salary, "job salary unknown"))?;
    let expected = resume
        .expected_salary
        .ok_or_else(|| MatchError::incomplete(Dimension::Salary, "expected salary unknown"))?;

    if !offered.min.is_finite() || !offered.max.is_finite() || offered.min > offered.max || offered.min < 0.0 {
        return Err(MatchError::candidate(&job.external_id, "salary range is malformed"));
    }
    if !expected.min.is_finite() || expected.min <= 0.0 {
        return Err(MatchError::incomplete(Dimension::Salary, "expected salary unusable"));
    }

    let value = if offered.max >= expected.min {
        100.0
    } else {
        let shortfall = (expected.min - offered.max) / expected.min;
        (100.0 - shortfall * 100.0 * shortfall_decay).max(0.0)
    };

    Ok(DimensionScore {
        dimension: Dimension::Salary,
        value,
        evidence: Evidence::Salary { expected, offered },
    })
}

pub fn score_location(resume: &ResumeProfile, job: &JobProfile) -> DimensionOutcome {
    let resume_city = resume
        .target_city
        .as_deref()
        .map(normalize_city)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| MatchError::incomplete(Dimension::Location, "resume city unknown"))?;
    let job_city = job
        .city
        .as_deref()
        .map(normalize_city)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| MatchError::incomplete(Dimension::Location, "job city unknown"))?;

    let (a, b) = (resume_city.to_lowercase(), job_city.to_lowercase());
    let value = if a == b { 100.0 } else { 0.0 };

    Ok(DimensionScore {
        dimension: Dimension::Location,
        value,
        evidence: Evidence::Location {
            resume_city,
            job_city,
        },
    })
}

/// Externally supplied culture / growth / stability signal
pub fn score_signal(dimension: Dimension, job: &JobProfile) -> DimensionOutcome {
    let raw = match dimension {
        Dimension::Culture => job.signals.culture,
        Dimension::Growth => job.signals.growth,
        Dimension::Stability => job.signals.stability,
        other => {
            return Err(MatchError::candidate(
                &job.external_id,
                format!("{} is not an external signal", other),
            ))
        }
    }
    .ok_or_else(|| MatchError::incomplete(dimension, "signal not supplied"))?;

    if !raw.is_finite() {
        return Err(MatchError::candidate(
            &job.external_id,
            format!("{} signal is not finite", dimension),
        ));
    }

    Ok(DimensionScore {
        dimension,
        value: raw.clamp(0.0, 100.0),
        evidence: Evidence::Signal { raw },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EducationLevel, ExperienceRange, FitSignals, SalaryRange};

    fn resume() -> ResumeProfile {
        ResumeProfile {
            resume_id: "r-1".to_string(),
            name: "Test".to_string(),
            desired_categories: vec![JobCategory::Backend],
            current_position: None,
            desired_positions: vec![],
            skills: vec!["Python".to_string(), "K8s".to_string()],
            years_experience: Some(3.0),
            education: Some(EducationLevel::Bachelor),
            embedding: Some(vec![1.0, 0.0]),
            target_city: Some("深圳市".to_string()),
            search_keywords: vec![],
            expected_salary: Some(SalaryRange { min: 20.0, max: 30.0 }),
            extensions: Default::default(),
        }
    }

    fn job() -> JobProfile {
        JobProfile {
            external_id: "j-1".to_string(),
            source: "test".to_string(),
            title: "Backend Engineer".to_string(),
            company: "Acme".to_string(),
            url: None,
            category: Some(JobCategory::Backend),
            required_skills: vec!["python".to_string(), "Kubernetes".to_string()],
            experience: Some(ExperienceRange { min_years: 3.0, max_years: Some(5.0) }),
            education: Some(EducationLevel::Bachelor),
            embedding: Some(vec![1.0, 0.0]),
            city: Some("深圳".to_string()),
            salary: Some(SalaryRange { min: 25.0, max: 35.0 }),
            signals: FitSignals::default(),
            extensions: Default::default(),
        }
    }

    #[test]
    fn test_category_affinity_table() {
        assert_eq!(category_affinity(JobCategory::Backend, JobCategory::Backend), 100.0);
        assert_eq!(category_affinity(JobCategory::Backend, JobCategory::FullStack), 80.0);
        assert_eq!(category_affinity(JobCategory::Mobile, JobCategory::Security), 60.0);
        assert_eq!(category_affinity(JobCategory::Finance, JobCategory::Sales), 40.0);
        assert_eq!(category_affinity(JobCategory::Backend, JobCategory::ProductManager), 0.0);
    }

    #[test]
    fn test_position_takes_best_category() {
        let mut r = resume();
        r.desired_categories = vec![JobCategory::ProductManager, JobCategory::Frontend];
        let mut j = job();
        j.category = Some(JobCategory::FullStack);

        let score = score_position(&r, &j).unwrap();
        assert_eq!(score.value, 80.0);
    }

    #[test]
    fn test_position_missing_category_is_incomplete() {
        let mut j = job();
        j.category = None;
        let err = score_position(&resume(), &j).unwrap_err();
        assert!(matches!(err, MatchError::IncompleteProfile { dimension: Dimension::Position, .. }));
    }

    #[test]
    fn test_skills_without_synonyms() {
        let score = score_skills(&resume(), &job(), &SkillSynonyms::default()).unwrap();
        assert_eq!(score.value, 50.0);
        match score.evidence {
            Evidence::Skills { matched, missing } => {
                assert_eq!(matched, vec!["python"]);
                assert_eq!(missing, vec!["Kubernetes"]);
            }
            other => panic!("unexpected evidence {:?}", other),
        }
    }

    #[test]
    fn test_skills_with_synonyms() {
        let synonyms = SkillSynonyms::new([("k8s", "kubernetes")]);
        let score = score_skills(&resume(), &job(), &synonyms).unwrap();
        assert_eq!(score.value, 100.0);
    }

    #[test]
    fn test_skills_empty_resume_scores_zero() {
        let mut r = resume();
        r.skills.clear();
        let score = score_skills(&r, &job(), &SkillSynonyms::default()).unwrap();
        assert_eq!(score.value, 0.0);
    }

    #[test]
    fn test_experience_decay_both_sides() {
        let decay = ExperienceDecay::default();
        let mut r = resume();

        r.years_experience = Some(1.0);
        assert_eq!(score_experience(&r, &job(), &decay).unwrap().value, 60.0);

        r.years_experience = Some(7.0);
        assert_eq!(score_experience(&r, &job(), &decay).unwrap().value, 80.0);

        r.years_experience = Some(20.0);
        assert_eq!(score_experience(&r, &job(), &decay).unwrap().value, 70.0);
    }

    #[test]
    fn test_experience_open_ended() {
        let mut j = job();
        j.experience = Some(ExperienceRange { min_years: 2.0, max_years: None });
        let mut r = resume();
        r.years_experience = Some(15.0);
        assert_eq!(score_experience(&r, &j, &ExperienceDecay::default()).unwrap().value, 100.0);
    }

    #[test]
    fn test_experience_malformed_range() {
        let mut j = job();
        j.experience = Some(ExperienceRange { min_years: 5.0, max_years: Some(2.0) });
        let err = score_experience(&resume(), &j, &ExperienceDecay::default()).unwrap_err();
        assert!(matches!(err, MatchError::CandidateScoring { .. }));
    }

    #[test]
    fn test_education_penalty() {
        let mut j = job();
        j.education = Some(EducationLevel::Doctorate);
        assert_eq!(score_education(&resume(), &j, 25.0).unwrap().value, 50.0);

        j.education = Some(EducationLevel::Associate);
        assert_eq!(score_education(&resume(), &j, 25.0).unwrap().value, 100.0);
    }

    #[test]
    fn test_semantic_rescaling() {
        let mut j = job();
        assert!((score_semantic(&resume(), &j).unwrap().value - 100.0).abs() < 1e-9);

        j.embedding = Some(vec![-1.0, 0.0]);
        assert!(score_semantic(&resume(), &j).unwrap().value.abs() < 1e-9);

        j.embedding = Some(vec![0.0, 1.0]);
        assert!((score_semantic(&resume(), &j).unwrap().value - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_semantic_dimension_mismatch_is_malformed() {
        let mut j = job();
        j.embedding = Some(vec![1.0, 0.0, 0.0]);
        let err = score_semantic(&resume(), &j).unwrap_err();
        assert!(matches!(err, MatchError::CandidateScoring { .. }));
    }

    #[test]
    fn test_semantic_non_finite_resume_embedding_is_incomplete() {
        let mut r = resume();
        r.embedding = Some(vec![f32::NAN, 0.0]);
        let err = score_semantic(&r, &job()).unwrap_err();
        assert!(matches!(err, MatchError::IncompleteProfile { .. }));
    }

    #[test]
    fn test_salary_shortfall() {
        let mut j = job();
        assert_eq!(score_salary(&resume(), &j, 2.0).unwrap().value, 100.0);

        j.salary = Some(SalaryRange { min: 10.0, max: 18.0 });
        assert!((score_salary(&resume(), &j, 2.0).unwrap().value - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_location_normalizes_suffix() {
        assert_eq!(score_location(&resume(), &job()).unwrap().value, 100.0);

        let mut j = job();
        j.city = Some("北京".to_string());
        assert_eq!(score_location(&resume(), &j).unwrap().value, 0.0);
    }

    #[test]
    fn test_location_partial_name_is_different_city() {
        let mut r = resume();
        let mut j = job();
        r.target_city = Some("北京".to_string());
        j.city = Some("京".to_string());
        assert_eq!(score_location(&r, &j).unwrap().value, 0.0);

        r.target_city = Some("Shenzhen".to_string());
        j.city = Some("Shen".to_string());
        assert_eq!(score_location(&r, &j).unwrap().value, 0.0);

        j.city = Some("SHENZHEN".to_string());
        assert_eq!(score_location(&r, &j).unwrap().value, 100.0);
    }

    #[test]
    fn test_signal_clamped() {
        let mut j = job();
        j.signals.growth = Some(140.0);
        assert_eq!(score_signal(Dimension::Growth, &j).unwrap().value, 100.0);
        assert!(score_signal(Dimension::Culture, &j).is_err());
    }
}
