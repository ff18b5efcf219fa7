/// Broadcast gateway HTTP surface
///
/// Called by the inventory CRUD API after a write has been persisted.
use actix_web::{web, HttpResponse};

use crate::error::AppError;
use crate::models::{InventoryChangeEvent, UserId};
use crate::services::BroadcastGateway;

/// Push an inventory change to every live session of a user
///
/// Endpoint: POST /api/v1/inventory/{user_id}/changes
pub async fn notify_inventory_change(
    path: web::Path<String>,
    gateway: web::Data<BroadcastGateway>,
    body: web::Json<InventoryChangeEvent>,
) -> Result<HttpResponse, AppError> {
    let user_id = UserId::parse(&path.into_inner())
        .ok_or_else(|| AppError::BadRequest("user id is required".to_string()))?;

    let outcome = gateway
        .notify_inventory_change(user_id, body.into_inner())
        .await;

    Ok(HttpResponse::Accepted().json(outcome))
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/inventory")
            .route("/{user_id}/changes", web::post().to(notify_inventory_change)),
    );
}
