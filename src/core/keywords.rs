use crate::models::ResumeProfile;
use std::collections::HashSet;

/// Seniority markers stripped from position titles before searching
const SENIORITY_MARKERS: &[&str] = &["高级", "资深", "初级"];
const SENIORITY_WORDS: &[&str] = &["senior", "junior", "lead", "sr.", "jr."];

const MAX_DESIRED_POSITIONS: usize = 2;
const MAX_SKILL_KEYWORDS: usize = 3;

/// Trim and drop the trailing "市" suffix
pub fn normalize_city(city: &str) -> String {
    let trimmed = city.trim();
    trimmed
        .strip_suffix('市')
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}

/// Derive search keywords from a resume.
///
/// Priority: current position, desired positions, then skills.
pub fn extract_search_keywords(resume: &ResumeProfile, max_keywords: usize) -> Vec<String> {
    let mut keywords = Vec::new();

    if let Some(position) = resume.current_position.as_deref() {
        let cleaned = strip_seniority(position);
        if cleaned.chars().count() >= 2 {
            keywords.push(cleaned);
        }
    }

    keywords.extend(
        resume
            .desired_positions
            .iter()
            .filter(|p| !p.trim().is_empty())
            .take(MAX_DESIRED_POSITIONS)
            .map(|p| p.trim().to_string()),
    );

    keywords.extend(
        resume
            .skills
            .iter()
            .filter(|s| !s.trim().is_empty())
            .take(MAX_SKILL_KEYWORDS)
            .map(|s| s.trim().to_string()),
    );

    dedup_keywords(keywords, max_keywords)
}

fn strip_seniority(position: &str) -> String {
    let stripped = SENIORITY_MARKERS
        .iter()
        .fold(position.to_string(), |acc, marker| acc.replace(marker, ""));
    stripped
        .split_whitespace()
        .filter(|word| !SENIORITY_WORDS.contains(&word.to_lowercase().as_str()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Combine derived and caller-supplied keywords, falling back when both are empty
pub fn merge_keywords(
    derived: Vec<String>,
    extra: &[String],
    fallback: &[String],
    max_keywords: usize,
) -> Vec<String> {
    let combined = derived.into_iter().chain(extra.iter().cloned()).collect();
    let merged = dedup_keywords(combined, max_keywords);
    if merged.is_empty() {
        return dedup_keywords(fallback.to_vec(), max_keywords);
    }
    merged
}

/// Order-preserving, case-insensitive dedup with a cap
fn dedup_keywords(keywords: Vec<String>, max_keywords: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    keywords
        .into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty() && seen.insert(k.to_lowercase()))
        .take(max_keywords)
        .collect()
}

/// Pick the target city: request, then resume, then the configured default
pub fn resolve_city(requested: Option<&str>, resume: &ResumeProfile, default_city: &str) -> String {
    [requested, resume.target_city.as_deref(), Some(default_city)]
        .into_iter()
        .flatten()
        .map(normalize_city)
        .find(|c| !c.is_empty())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resume() -> ResumeProfile {
        ResumeProfile {
            resume_id: "r-1".to_string(),
            name: "张三".to_string(),
            desired_categories: vec![],
            current_position: Some("高级Python开发工程师".to_string()),
            desired_positions: vec!["后端开发".to_string(), "架构师".to_string(), "技术经理".to_string()],
            skills: vec!["Python".to_string(), "Go".to_string(), "Redis".to_string(), "MySQL".to_string()],
            years_experience: None,
            education: None,
            embedding: None,
            target_city: Some("广州市".to_string()),
            search_keywords: vec![],
            expected_salary: None,
            extensions: Default::default(),
        }
    }

    #[test]
    fn test_extract_keywords_priority() {
        let keywords = extract_search_keywords(&resume(), 5);
        assert_eq!(
            keywords,
            vec!["Python开发工程师", "后端开发", "架构师", "Python", "Go"]
        );
    }

    #[test]
    fn test_strip_latin_seniority() {
        assert_eq!(strip_seniority("Senior Backend Engineer"), "Backend Engineer");
        assert_eq!(strip_seniority("Team Leader"), "Team Leader");
    }

    #[test]
    fn test_short_position_dropped() {
        let mut r = resume();
        r.current_position = Some("资深A".to_string());
        r.desired_positions.clear();
        r.skills.clear();
        assert!(extract_search_keywords(&r, 5).is_empty());
    }

    #[test]
    fn test_merge_keywords_dedups_case_insensitive() {
        let merged = merge_keywords(
            vec!["Python".to_string()],
            &["python".to_string(), "Rust".to_string()],
            &[],
            5,
        );
        assert_eq!(merged, vec!["Python", "Rust"]);
    }

    #[test]
    fn test_merge_keywords_fallback() {
        let merged = merge_keywords(vec![], &[], &["开发工程师".to_string()], 5);
        assert_eq!(merged, vec!["开发工程师"]);
    }

    #[test]
    fn test_resolve_city_order() {
        let r = resume();
        assert_eq!(resolve_city(Some("北京市"), &r, "深圳"), "北京");
        assert_eq!(resolve_city(None, &r, "深圳"), "广州");
        assert_eq!(resolve_city(Some("  "), &r, "深圳"), "广州");

        let mut r = resume();
        r.target_city = None;
        assert_eq!(resolve_city(None, &r, "深圳"), "深圳");
    }
}
