pub mod broadcast_gateway;
pub mod expiry_scanner;
pub mod pantry_insights;
pub mod publisher;
pub mod store;

pub use broadcast_gateway::*;
pub use expiry_scanner::*;
pub use publisher::*;
pub use store::*;
