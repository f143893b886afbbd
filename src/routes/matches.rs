use crate::config::MatchingSettings;
use crate::core::{
    extract_search_keywords, merge_keywords, resolve_city, MatchError, MatchSession,
    Orchestrator, ScoringProfile,
};
use crate::models::{
    ErrorResponse, HealthResponse, KeywordsResponse, MatchEvent, ResumeProfile, SessionEvent,
    SmartMatchRequest, SmartMatchResponse,
};
use crate::services::{CacheKey, CacheManager, PostgresClient, RepositoryError};
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, Responder};
use futures::{stream, StreamExt};
use std::sync::Arc;
use validator::Validate;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub postgres: Arc<PostgresClient>,
    pub cache: Arc<CacheManager>,
    pub matching: Arc<MatchingSettings>,
}

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/smart-match/stream", web::post().to(smart_match_stream))
        .route("/smart-match", web::post().to(smart_match))
        .route(
            "/smart-match/keywords/{resume_id}",
            web::get().to(suggest_keywords),
        );
}

fn error_response(status: StatusCode, error: &str, message: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message: message.into(),
        status_code: status.as_u16(),
    })
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let pg_healthy = state.postgres.health_check().await.unwrap_or(false);

    let status = if pg_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if pg_healthy { "up" } else { "down" }.to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Load a resume snapshot, going through the cache first
async fn load_resume(
    state: &AppState,
    resume_id: &str,
) -> Result<Option<Arc<ResumeProfile>>, RepositoryError> {
    let key = CacheKey::resume(resume_id);
    if let Ok(resume) = state.cache.get::<ResumeProfile>(&key).await {
        return Ok(Some(Arc::new(resume)));
    }

    let Some(resume) = state.postgres.get_resume(resume_id).await? else {
        return Ok(None);
    };
    if let Err(e) = state.cache.set(&key, &resume).await {
        tracing::warn!("Failed to cache resume {}: {}", resume_id, e);
    }
    Ok(Some(Arc::new(resume)))
}

/// Resolve keywords, city and parameters into a ready-to-run session
pub fn build_session(
    matching: &MatchingSettings,
    req: &SmartMatchRequest,
    resume: Arc<ResumeProfile>,
) -> Result<MatchSession, MatchError> {
    let profile: ScoringProfile = req.profile.parse()?;

    let derived = if resume.search_keywords.is_empty() {
        extract_search_keywords(&resume, matching.max_keywords)
    } else {
        resume.search_keywords.clone()
    };
    let keywords = merge_keywords(
        derived,
        &req.extra_keywords,
        &matching.fallback_keywords,
        matching.max_keywords,
    );
    let city = resolve_city(req.city.as_deref(), &resume, &matching.default_city);

    let mut params = matching.session_params();
    params.profile = profile;
    params.min_qualified = req.min_jobs;
    params.acquisition_enabled = req.enable_acquisition;
    if let Some(max_candidates) = req.max_candidates {
        params.max_candidates = max_candidates;
    }
    if let Some(threshold) = req.qualified_threshold {
        params.qualified_threshold = threshold;
    }
    if let Some(min_display) = req.min_display_score {
        params.min_display_score = min_display;
    }

    Ok(MatchSession::new(resume, city, keywords, params))
}

fn single_event_stream(event: MatchEvent) -> HttpResponse {
    let frame = SessionEvent { seq: 1, event }
        .to_sse_frame()
        .map(web::Bytes::from);
    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(stream::once(async move { frame }))
}

/// Streaming match endpoint
///
/// POST /api/v1/smart-match/stream
///
/// Responds with server-sent events: `cached_batch`, then `status` and
/// `live_match` while acquiring, and finally `complete` or `error`.
async fn smart_match_stream(
    state: web::Data<AppState>,
    req: web::Json<SmartMatchRequest>,
) -> HttpResponse {
    if let Err(errors) = req.validate() {
        return error_response(StatusCode::BAD_REQUEST, "Validation failed", errors.to_string());
    }

    tracing::info!("Streaming match for resume {}", req.resume_id);

    let resume = match load_resume(&state, &req.resume_id).await {
        Ok(Some(resume)) => resume,
        Ok(None) => {
            return single_event_stream(MatchEvent::Error {
                message: format!("Resume {} not found", req.resume_id),
            })
        }
        Err(e) => {
            tracing::error!("Failed to load resume {}: {}", req.resume_id, e);
            return single_event_stream(MatchEvent::Error {
                message: format!("Failed to load resume: {}", e),
            });
        }
    };

    let session = match build_session(&state.matching, &req, resume) {
        Ok(session) => session,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, "Invalid request", e.to_string()),
    };

    let (events, _handle) = state.orchestrator.spawn(session);
    let frames = events.map(|event| event.to_sse_frame().map(web::Bytes::from));

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(frames)
}

/// Collected match endpoint
///
/// POST /api/v1/smart-match
///
/// Runs the same session as the streaming endpoint and returns the top
/// `max_results` matches once it completes.
async fn smart_match(
    state: web::Data<AppState>,
    req: web::Json<SmartMatchRequest>,
) -> HttpResponse {
    if let Err(errors) = req.validate() {
        return error_response(StatusCode::BAD_REQUEST, "Validation failed", errors.to_string());
    }

    let resume = match load_resume(&state, &req.resume_id).await {
        Ok(Some(resume)) => resume,
        Ok(None) => {
            return error_response(
                StatusCode::NOT_FOUND,
                "Resume not found",
                format!("Resume {} not found", req.resume_id),
            )
        }
        Err(e) => {
            tracing::error!("Failed to load resume {}: {}", req.resume_id, e);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load resume",
                e.to_string(),
            );
        }
    };

    let session = match build_session(&state.matching, &req, resume) {
        Ok(session) => session,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, "Invalid request", e.to_string()),
    };

    let (outcome, _events) = state.orchestrator.run_to_end(session).await;

    match outcome.error {
        None => {}
        Some(e @ (MatchError::Validation(_) | MatchError::InvalidProfile(_))) => {
            return error_response(StatusCode::BAD_REQUEST, "Invalid request", e.to_string())
        }
        Some(e) => {
            return error_response(StatusCode::SERVICE_UNAVAILABLE, "Matching failed", e.to_string())
        }
    }

    let total_matched = outcome.results.len();
    let mut matches = outcome.results;
    matches.truncate(state.matching.max_results);

    tracing::info!(
        "Returning {} of {} matches for resume {}",
        matches.len(),
        total_matched,
        outcome.resume_id
    );

    HttpResponse::Ok().json(SmartMatchResponse {
        resume_id: outcome.resume_id,
        resume_name: outcome.resume_name,
        search_keywords: outcome.search_keywords,
        target_city: outcome.target_city,
        total_matched,
        qualified_count: outcome.qualified_count,
        from_database: outcome.from_cached,
        from_acquisition: outcome.from_live,
        matches,
        warnings: outcome.warnings,
    })
}

/// Suggested search keywords and city for a resume
///
/// GET /api/v1/smart-match/keywords/{resume_id}
async fn suggest_keywords(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let resume_id = path.into_inner();

    let resume = match load_resume(&state, &resume_id).await {
        Ok(Some(resume)) => resume,
        Ok(None) => {
            return error_response(
                StatusCode::NOT_FOUND,
                "Resume not found",
                format!("Resume {} not found", resume_id),
            )
        }
        Err(e) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load resume",
                e.to_string(),
            )
        }
    };

    let matching = &state.matching;
    let keywords = merge_keywords(
        extract_search_keywords(&resume, matching.max_keywords),
        &[],
        &matching.fallback_keywords,
        matching.max_keywords,
    );
    let city = resolve_city(None, &resume, &matching.default_city);

    HttpResponse::Ok().json(KeywordsResponse {
        resume_id,
        keywords,
        city,
    })
}
