use actix_web::{web, HttpResponse};
use serde_json::json;

pub const SERVICE_NAME: &str = "inventory-realtime-service";

/// Liveness probe
///
/// Endpoint: GET /api/health
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/health", web::get().to(health));
}
