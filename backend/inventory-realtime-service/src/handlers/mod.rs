/// HTTP handlers for the inventory realtime service
pub mod health;
pub mod insights;
pub mod inventory;
pub mod websocket;

pub use health::register_routes as register_health;
pub use insights::register_routes as register_insights;
pub use inventory::register_routes as register_inventory;
pub use websocket::register_routes as register_websocket;
