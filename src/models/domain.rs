use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Free-form attributes carried alongside the typed fields.
///
/// Extraction collaborators may attach anything here; the scoring engine
/// never reads it.
pub type Extensions = BTreeMap<String, serde_json::Value>;

/// Job direction a resume targets or a posting belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobCategory {
    Backend,
    Frontend,
    FullStack,
    Mobile,
    Testing,
    Devops,
    Data,
    Algorithm,
    Security,
    Architect,
    Dba,
    ProductManager,
    Designer,
    ProjectManager,
    Operations,
    Sales,
    HumanResources,
    Finance,
}

/// Title keywords used to infer a category when extraction left it empty.
///
/// Order matters: the first category with a hit wins.
const CATEGORY_KEYWORDS: &[(JobCategory, &[&str])] = &[
    (JobCategory::FullStack, &["全栈", "full stack", "fullstack"]),
    (JobCategory::Architect, &["架构", "architect", "技术专家", "技术总监"]),
    (JobCategory::Testing, &["测试", "qa", "sdet", "quality"]),
    (JobCategory::Devops, &["运维", "devops", "sre", "k8s", "kubernetes"]),
    (JobCategory::Security, &["安全", "security", "渗透", "攻防"]),
    (JobCategory::Dba, &["dba", "数据库管理"]),
    (JobCategory::Algorithm, &["算法", "机器学习", "深度学习", "nlp", "machine learning", "deep learning"]),
    (JobCategory::Data, &["数据", "etl", "hadoop", "spark", "flink", "数仓", "data engineer"]),
    (JobCategory::Mobile, &["ios", "android", "移动", "flutter", "客户端"]),
    (JobCategory::Frontend, &["前端", "frontend", "front-end", "react", "vue", "h5", "小程序"]),
    (JobCategory::Backend, &["后端", "服务端", "backend", "back-end", "java", "python", "golang", "php", "c++"]),
    (JobCategory::ProjectManager, &["项目经理", "pmo", "项目管理", "scrum master"]),
    (JobCategory::ProductManager, &["产品", "product manager"]),
    (JobCategory::Designer, &["设计", "ui", "ux", "视觉", "交互", "designer"]),
    (JobCategory::Operations, &["运营", "增长", "operations"]),
    (JobCategory::Sales, &["销售", "商务", "客户经理", "sales"]),
    (JobCategory::HumanResources, &["hr", "人力", "招聘", "薪酬", "recruit"]),
    (JobCategory::Finance, &["财务", "会计", "审计", "税务", "finance", "accountant"]),
];

impl JobCategory {
    /// Whether the category belongs to the technical super-group
    pub fn is_technical(self) -> bool {
        matches!(
            self,
            JobCategory::Backend
                | JobCategory::Frontend
                | JobCategory::FullStack
                | JobCategory::Mobile
                | JobCategory::Testing
                | JobCategory::Devops
                | JobCategory::Data
                | JobCategory::Algorithm
                | JobCategory::Security
                | JobCategory::Architect
                | JobCategory::Dba
        )
    }

    /// Best-effort category lookup from a posting or position title
    pub fn infer_from_title(title: &str) -> Option<Self> {
        let lower = title.to_lowercase();
        CATEGORY_KEYWORDS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|kw| lower.contains(kw)))
            .map(|(category, _)| *category)
    }
}

/// Ordinal education level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EducationLevel {
    #[serde(alias = "高中")]
    HighSchool = 1,
    #[serde(alias = "大专", alias = "专科")]
    Associate = 2,
    #[serde(alias = "本科", alias = "学士")]
    Bachelor = 3,
    #[serde(alias = "硕士", alias = "研究生")]
    Master = 4,
    #[serde(alias = "博士")]
    Doctorate = 5,
}

impl EducationLevel {
    pub fn rank(self) -> u8 {
        self as u8
    }
}

/// Required experience in years; an absent max means "min years or more"
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExperienceRange {
    pub min_years: f64,
    #[serde(default)]
    pub max_years: Option<f64>,
}

/// Monthly salary range in thousands
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SalaryRange {
    pub min: f64,
    pub max: f64,
}

/// Fit signals produced outside the engine (e.g. by a language model review)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FitSignals {
    #[serde(default)]
    pub culture: Option<f64>,
    #[serde(default)]
    pub growth: Option<f64>,
    #[serde(default)]
    pub stability: Option<f64>,
}

/// Snapshot of the resume attributes used at match time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeProfile {
    pub resume_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub desired_categories: Vec<JobCategory>,
    #[serde(default)]
    pub current_position: Option<String>,
    #[serde(default)]
    pub desired_positions: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub years_experience: Option<f64>,
    #[serde(default)]
    pub education: Option<EducationLevel>,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub target_city: Option<String>,
    #[serde(default)]
    pub search_keywords: Vec<String>,
    #[serde(default)]
    pub expected_salary: Option<SalaryRange>,
    #[serde(default)]
    pub extensions: Extensions,
}

/// Normalized posting attributes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobProfile {
    pub external_id: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub category: Option<JobCategory>,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub experience: Option<ExperienceRange>,
    #[serde(default)]
    pub education: Option<EducationLevel>,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub salary: Option<SalaryRange>,
    #[serde(default)]
    pub signals: FitSignals,
    #[serde(default)]
    pub extensions: Extensions,
}

/// One independently scored axis of fit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Position,
    Skills,
    Experience,
    Education,
    Semantic,
    Salary,
    Location,
    Culture,
    Growth,
    Stability,
}

impl Dimension {
    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Position => "position",
            Dimension::Skills => "skills",
            Dimension::Experience => "experience",
            Dimension::Education => "education",
            Dimension::Semantic => "semantic",
            Dimension::Salary => "salary",
            Dimension::Location => "location",
            Dimension::Culture => "culture",
            Dimension::Growth => "growth",
            Dimension::Stability => "stability",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw inputs behind a dimension score, kept for explainability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Evidence {
    Category {
        resume: Vec<JobCategory>,
        job: JobCategory,
        matched: Option<JobCategory>,
    },
    Skills {
        matched: Vec<String>,
        missing: Vec<String>,
    },
    Experience {
        resume_years: f64,
        required: ExperienceRange,
    },
    Education {
        resume: EducationLevel,
        required: EducationLevel,
    },
    Semantic {
        cosine: f64,
    },
    Salary {
        expected: SalaryRange,
        offered: SalaryRange,
    },
    Location {
        resume_city: String,
        job_city: String,
    },
    Signal {
        raw: f64,
    },
    /// A required attribute was missing; the neutral default was used
    Neutral {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionScore {
    pub dimension: Dimension,
    pub value: f64,
    pub evidence: Evidence,
}

/// Where a match came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Cached,
    Live,
}

/// Scored (resume, job) pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub job: Arc<JobProfile>,
    pub score: f64,
    pub dimensions: Vec<DimensionScore>,
    pub qualified: bool,
    pub provenance: Provenance,
}

impl MatchResult {
    pub fn dimension(&self, dimension: Dimension) -> Option<&DimensionScore> {
        self.dimensions.iter().find(|d| d.dimension == dimension)
    }

    /// Semantic sub-score used as the first tie-breaker
    pub fn semantic_score(&self) -> f64 {
        self.dimension(Dimension::Semantic)
            .map(|d| d.value)
            .unwrap_or(0.0)
    }

    pub fn external_id(&self) -> &str {
        &self.job.external_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_category_from_title() {
        assert_eq!(JobCategory::infer_from_title("高级Java后端工程师"), Some(JobCategory::Backend));
        assert_eq!(JobCategory::infer_from_title("Senior Frontend Engineer"), Some(JobCategory::Frontend));
        assert_eq!(JobCategory::infer_from_title("全栈开发"), Some(JobCategory::FullStack));
        assert_eq!(JobCategory::infer_from_title("产品经理"), Some(JobCategory::ProductManager));
        assert_eq!(JobCategory::infer_from_title("Barista"), None);
    }

    #[test]
    fn test_education_ordering() {
        assert!(EducationLevel::Doctorate > EducationLevel::Master);
        assert!(EducationLevel::Associate < EducationLevel::Bachelor);
        assert_eq!(EducationLevel::Bachelor.rank(), 3);
    }

    #[test]
    fn test_education_aliases() {
        let level: EducationLevel = serde_json::from_str("\"本科\"").unwrap();
        assert_eq!(level, EducationLevel::Bachelor);
        let level: EducationLevel = serde_json::from_str("\"master\"").unwrap();
        assert_eq!(level, EducationLevel::Master);
    }

    #[test]
    fn test_job_profile_defaults() {
        let job: JobProfile = serde_json::from_str(r#"{"external_id": "j-1"}"#).unwrap();
        assert_eq!(job.external_id, "j-1");
        assert!(job.required_skills.is_empty());
        assert!(job.signals.culture.is_none());
    }
}
