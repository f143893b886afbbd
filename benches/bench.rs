// Criterion benchmarks for DeepCareer Match

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use deepcareer_match::core::{RankedResults, ScoringEngine, ScoringProfile};
use deepcareer_match::models::{
    EducationLevel, ExperienceRange, FitSignals, JobCategory, JobProfile, Provenance,
    ResumeProfile, SalaryRange,
};
use std::sync::Arc;

const EMBEDDING_DIM: usize = 768;

fn embedding(seed: usize) -> Vec<f32> {
    (0..EMBEDDING_DIM)
        .map(|i| (((i + seed) % 17) as f32 - 8.0) / 8.0)
        .collect()
}

fn create_resume() -> ResumeProfile {
    ResumeProfile {
        resume_id: "bench-resume".to_string(),
        name: "Bench".to_string(),
        desired_categories: vec![JobCategory::Backend, JobCategory::Data],
        current_position: Some("Senior Backend Engineer".to_string()),
        desired_positions: vec!["后端开发".to_string()],
        skills: ["Rust", "Go", "PostgreSQL", "Redis", "Kafka", "Kubernetes"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        years_experience: Some(6.0),
        education: Some(EducationLevel::Master),
        embedding: Some(embedding(0)),
        target_city: Some("深圳".to_string()),
        search_keywords: vec![],
        expected_salary: Some(SalaryRange { min: 30.0, max: 45.0 }),
        extensions: Default::default(),
    }
}

fn create_job(id: usize) -> JobProfile {
    let categories = [JobCategory::Backend, JobCategory::Frontend, JobCategory::Data, JobCategory::Devops];
    JobProfile {
        external_id: format!("job-{}", id),
        source: "bench".to_string(),
        title: "Backend Engineer".to_string(),
        company: format!("Company {}", id % 50),
        url: None,
        category: Some(categories[id % categories.len()]),
        required_skills: ["Rust", "PostgreSQL", "Docker", "gRPC"]
            .iter()
            .take(2 + id % 3)
            .map(|s| s.to_string())
            .collect(),
        experience: Some(ExperienceRange {
            min_years: (id % 8) as f64,
            max_years: Some((id % 8 + 3) as f64),
        }),
        education: Some(EducationLevel::Bachelor),
        embedding: Some(embedding(id)),
        city: Some("深圳".to_string()),
        salary: Some(SalaryRange { min: 20.0 + (id % 10) as f64, max: 35.0 + (id % 15) as f64 }),
        signals: FitSignals {
            culture: Some(70.0),
            growth: Some((id % 100) as f64),
            stability: None,
        },
        extensions: Default::default(),
    }
}

fn bench_score_single(c: &mut Criterion) {
    let engine = ScoringEngine::with_defaults();
    let resume = create_resume();
    let job = Arc::new(create_job(7));

    let mut group = c.benchmark_group("score_single");
    for profile in [ScoringProfile::Fast, ScoringProfile::Precise] {
        group.bench_with_input(BenchmarkId::from_parameter(profile), &profile, |b, &profile| {
            b.iter(|| {
                engine.score(
                    black_box(&resume),
                    black_box(job.clone()),
                    profile,
                    60.0,
                    Provenance::Cached,
                )
            });
        });
    }
    group.finish();
}

fn bench_score_and_rank(c: &mut Criterion) {
    let engine = ScoringEngine::with_defaults();
    let resume = create_resume();

    let mut group = c.benchmark_group("score_and_rank");
    for count in [50, 200, 1000].iter() {
        let jobs: Vec<Arc<JobProfile>> = (0..*count).map(|i| Arc::new(create_job(i))).collect();

        group.bench_with_input(BenchmarkId::from_parameter(count), &jobs, |b, jobs| {
            b.iter(|| {
                let mut results = RankedResults::with_capacity(jobs.len());
                for job in jobs {
                    if let Ok(result) =
                        engine.score(&resume, job.clone(), ScoringProfile::Fast, 60.0, Provenance::Cached)
                    {
                        results.insert(result);
                    }
                }
                black_box(results.qualified_count())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_score_single, bench_score_and_rank);
criterion_main!(benches);
