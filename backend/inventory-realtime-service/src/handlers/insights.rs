/// Pantry insight endpoints
///
/// Request bodies use the browser client's camelCase keys.
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::services::pantry_insights;

#[derive(Debug, Deserialize)]
pub struct CategorizeRequest {
    #[serde(rename = "productData")]
    pub product_data: Option<ProductData>,
}

#[derive(Debug, Deserialize)]
pub struct ProductData {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SuggestionsRequest {
    pub inventory: Option<Vec<Value>>,
    #[serde(default)]
    pub preferences: Option<Map<String, Value>>,
}

/// Endpoint: POST /api/ai/categorize
pub async fn categorize(body: web::Json<CategorizeRequest>) -> HttpResponse {
    let name = body
        .product_data
        .as_ref()
        .and_then(|data| data.name.as_deref())
        .map(str::trim)
        .filter(|name| !name.is_empty());

    match name {
        Some(name) => {
            let category = pantry_insights::categorize(name);
            debug!(product = name, category, "Product categorized");
            HttpResponse::Ok().json(json!({
                "success": true,
                "category": category,
                "confidence": "high"
            }))
        }
        None => HttpResponse::BadRequest().json(json!({
            "error": "Product data with name is required"
        })),
    }
}

/// Endpoint: POST /api/ai/suggestions
pub async fn suggestions(body: web::Json<SuggestionsRequest>) -> HttpResponse {
    let request = body.into_inner();
    let Some(inventory) = request.inventory else {
        return HttpResponse::BadRequest().json(json!({
            "error": "Inventory data is required"
        }));
    };

    let preferences = request.preferences.unwrap_or_default();
    let suggestions = pantry_insights::suggest(&inventory, &preferences, chrono::Utc::now());

    HttpResponse::Ok().json(json!({
        "success": true,
        "suggestions": suggestions
    }))
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/ai")
            .route("/categorize", web::post().to(categorize))
            .route("/suggestions", web::post().to(suggestions)),
    );
}
