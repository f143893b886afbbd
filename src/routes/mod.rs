// HTTP surface
pub mod matches;

pub use matches::AppState;

use actix_web::web;

/// Mount every matching route under the versioned API scope
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/api/v1").configure(matches::configure));
}
