/// WebSocket entry point and hub status endpoints
///
/// Clients connect to `GET /ws`; everything after the handshake is handled by
/// [`WsSession`].
use actix::Addr;
use actix_web::{web, Error, HttpRequest, HttpResponse, Result as ActixResult};
use actix_web_actors::ws;
use serde_json::json;

use crate::error::AppError;
use crate::websocket::{BroadcastHub, GetHubStats, WsSession};

/// WebSocket frame size limit (256 KB)
const WS_MESSAGE_SIZE_LIMIT: usize = 256_000;

/// Open a realtime session
///
/// Endpoint: GET /ws
pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    hub: web::Data<Addr<BroadcastHub>>,
) -> Result<HttpResponse, Error> {
    ws::WsResponseBuilder::new(WsSession::new(hub.get_ref().clone()), &req, stream)
        .frame_size(WS_MESSAGE_SIZE_LIMIT)
        .start()
}

/// Get connection metrics
///
/// Endpoint: GET /api/v1/ws/metrics
pub async fn ws_metrics(hub: web::Data<Addr<BroadcastHub>>) -> ActixResult<HttpResponse> {
    let stats = hub.send(GetHubStats).await.map_err(AppError::from)?;

    Ok(HttpResponse::Ok().json(json!({
        "total_connections": stats.total_connections,
        "bound_users": stats.bound_users,
        "active_channels": stats.active_channels,
        "average_connections_per_user": if stats.bound_users > 0 {
            stats.total_connections as f64 / stats.bound_users as f64
        } else {
            0.0
        }
    })))
}

/// Register WebSocket routes
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/ws", web::get().to(ws_index))
        .service(web::scope("/api/v1/ws").route("/metrics", web::get().to(ws_metrics)));
}
