/// Integration tests for the inventory-realtime-service HTTP API
///
/// This test module covers:
/// - Broadcast gateway endpoint and its response format
/// - Request validation on the gateway path
/// - Health and WebSocket stats endpoints
/// - Pantry insight endpoints
use actix::{Actor, Addr};
use actix_web::{http::StatusCode, test, web, App};
use inventory_realtime_service::handlers::{
    register_health, register_insights, register_inventory, register_websocket,
};
use inventory_realtime_service::services::BroadcastGateway;
use inventory_realtime_service::websocket::{
    BroadcastHub, ClientEvent, Connect, InboundEvent, OutboundEvent,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc;

async fn joined_session(
    hub: &Addr<BroadcastHub>,
    user: &str,
) -> mpsc::UnboundedReceiver<OutboundEvent> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let connection_id = hub.send(Connect { sender: tx }).await.unwrap();
    assert!(matches!(rx.recv().await, Some(OutboundEvent::Connected { .. })));
    hub.send(ClientEvent {
        connection_id,
        event: InboundEvent::JoinInventory(user.into()),
    })
    .await
    .unwrap();
    rx
}

macro_rules! app {
    ($hub:expr) => {{
        let gateway = BroadcastGateway::new(Arc::new($hub.clone()));
        test::init_service(
            App::new()
                .app_data(web::Data::new($hub.clone()))
                .app_data(web::Data::new(gateway))
                .configure(register_health)
                .configure(register_inventory)
                .configure(register_insights)
                .configure(register_websocket),
        )
        .await
    }};
}

#[actix_web::test]
async fn test_gateway_pushes_change_to_user_sessions() {
    let hub = BroadcastHub::new().start();
    let mut alice = joined_session(&hub, "alice").await;
    let mut bob = joined_session(&hub, "bob").await;
    let app = app!(hub);

    let payload = json!({"action": "updated", "itemId": "i-1", "quantity": 3});
    let req = test::TestRequest::post()
        .uri("/api/v1/inventory/alice/changes")
        .set_json(&payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({"channel": "inventory:alice", "delivered": 1}));

    assert_eq!(alice.try_recv().ok(), Some(OutboundEvent::InventoryChanged(payload)));
    assert!(bob.try_recv().is_err());
}

#[actix_web::test]
async fn test_gateway_with_no_listeners_still_accepts() {
    let hub = BroadcastHub::new().start();
    let app = app!(hub);

    let req = test::TestRequest::post()
        .uri("/api/v1/inventory/nobody/changes")
        .set_json(json!({"action": "deleted"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["delivered"], 0);
}

#[actix_web::test]
async fn test_gateway_rejects_blank_user_id() {
    let hub = BroadcastHub::new().start();
    let app = app!(hub);

    let req = test::TestRequest::post()
        .uri("/api/v1/inventory/%20/changes")
        .set_json(json!({"action": "added"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "BAD_REQUEST");
}

#[actix_web::test]
async fn test_health_endpoint() {
    let hub = BroadcastHub::new().start();
    let app = app!(hub);

    let req = test::TestRequest::get().uri("/api/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "inventory-realtime-service");
}

#[actix_web::test]
async fn test_ws_stats_reflect_live_sessions() {
    let hub = BroadcastHub::new().start();
    let _alice = joined_session(&hub, "alice").await;
    let app = app!(hub);

    let req = test::TestRequest::get().uri("/api/v1/ws/metrics").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total_connections"], 1);
    assert_eq!(body["bound_users"], 1);
    assert_eq!(body["active_channels"], 1);
}

#[actix_web::test]
async fn test_categorize_endpoint() {
    let hub = BroadcastHub::new().start();
    let app = app!(hub);

    let req = test::TestRequest::post()
        .uri("/api/ai/categorize")
        .set_json(json!({"productData": {"name": "Cheddar cheese"}}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["category"], "Dairy & Eggs");
}
