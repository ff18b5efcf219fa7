pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod services;
pub mod websocket;

pub use config::Config;
pub use error::{AppError, Result};
pub use services::{BroadcastGateway, EventPublisher, ExpiryScanner, InventoryStore};
pub use websocket::{BroadcastHub, Hub};
