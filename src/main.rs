use actix_cors::Cors;
use actix_web::{web, App, HttpServer, HttpResponse, middleware, error, http::StatusCode};
use deepcareer_match::config::Settings;
use deepcareer_match::core::{CachedSource, LiveSource, Orchestrator, ScoringEngine};
use deepcareer_match::routes::{self, matches::AppState};
use deepcareer_match::services::{CacheManager, HttpAcquisitionClient, PostgresClient};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, error};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle path extraction errors
pub fn handle_path_error(err: error::PathError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_path".to_string(),
        message: format!("Invalid path: {}", err),
        status_code: 400,
    }
    .into()
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Initialize logging
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }

    info!("Starting DeepCareer matching service...");

    let settings = Settings::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    info!("Configuration loaded successfully");

    // Initialize cache manager (Redis optional)
    let cache_ttl = settings.cache.ttl_secs.unwrap_or(300);
    let l1_cache_size = settings.cache.l1_cache_size.unwrap_or(1000);
    let cache = Arc::new(
        CacheManager::from_settings(
            settings.cache.redis_url.as_deref(),
            l1_cache_size,
            cache_ttl,
            Duration::from_secs(settings.cache.connection_timeout_secs.unwrap_or(3)),
        )
        .await,
    );

    info!("Cache manager initialized (L1: {} entries, TTL: {}s)", l1_cache_size, cache_ttl);

    // Initialize PostgreSQL client
    let db_max_conn = settings.database.max_connections.unwrap_or(10);
    let postgres = Arc::new(
        PostgresClient::from_settings(
            &settings.database.url,
            Some(db_max_conn),
            settings.database.min_connections,
            settings.database.acquire_timeout_secs,
            settings.database.idle_timeout_secs,
        )
        .await
        .map_err(|e| {
            error!("Failed to connect to PostgreSQL: {}", e);
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, e.to_string())
        })?,
    );

    info!("PostgreSQL client initialized (max: {} connections)", db_max_conn);

    // Live acquisition is only wired when an endpoint is configured
    let acquisition = HttpAcquisitionClient::from_settings(&settings.acquisition).map_err(|e| {
        error!("Failed to create acquisition client: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;
    let live = if acquisition.is_configured() {
        info!("Live acquisition enabled (source: {})", settings.acquisition.source);
        Some(LiveSource::new(Arc::new(acquisition)))
    } else {
        info!("Live acquisition disabled: no endpoint configured");
        None
    };

    let engine = ScoringEngine::new(settings.scoring.to_scoring_config()).map_err(|e| {
        error!("Invalid scoring configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    info!("Scoring engine initialized with weights: {:?}", engine.config().fast);

    let orchestrator = Orchestrator::new(
        Arc::new(engine),
        CachedSource::new(postgres.clone()),
        live,
        settings.matching.orchestrator_settings(),
    );

    // Build application state
    let app_state = AppState {
        orchestrator,
        postgres,
        cache,
        matching: Arc::new(settings.matching.clone()),
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::PathConfig::default().error_handler(handle_path_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
