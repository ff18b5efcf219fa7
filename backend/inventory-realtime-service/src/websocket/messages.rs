/// WebSocket envelope types for the inventory realtime channel
///
/// Every frame is a JSON object `{"event": <name>, "data": <payload>}`.
use serde::{Deserialize, Serialize};

use crate::models::{ConnectionId, ExpiryAlertEvent, InventoryChangeEvent, UserId};

/// Events sent by clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum InboundEvent {
    /// Bind this connection to a user and join `inventory:<user>`
    JoinInventory(ClientUserId),

    /// Re-broadcast an inventory change to the bound user's sessions
    InventoryUpdate(InventoryChangeEvent),

    /// Join `expiry:<user>`
    SubscribeExpiry(ClientUserId),

    /// Client-initiated teardown
    Disconnect,
}

impl InboundEvent {
    pub fn name(&self) -> &'static str {
        match self {
            InboundEvent::JoinInventory(_) => "join-inventory",
            InboundEvent::InventoryUpdate(_) => "inventory-update",
            InboundEvent::SubscribeExpiry(_) => "subscribe-expiry",
            InboundEvent::Disconnect => "disconnect",
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// User id as sent by browsers: usually a string, occasionally a bare number.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ClientUserId {
    Text(String),
    Number(i64),
}

impl ClientUserId {
    pub fn to_user_id(&self) -> Option<UserId> {
        match self {
            ClientUserId::Text(raw) => UserId::parse(raw),
            ClientUserId::Number(n) => UserId::parse(&n.to_string()),
        }
    }
}

impl From<&str> for ClientUserId {
    fn from(raw: &str) -> Self {
        ClientUserId::Text(raw.to_string())
    }
}

/// Events pushed by the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum OutboundEvent {
    /// Sent once after the handshake
    Connected { connection_id: ConnectionId },

    InventoryChanged(InventoryChangeEvent),

    ExpiryAlert(ExpiryAlertEvent),
}

impl OutboundEvent {
    pub fn name(&self) -> &'static str {
        match self {
            OutboundEvent::Connected { .. } => "connected",
            OutboundEvent::InventoryChanged(_) => "inventory-changed",
            OutboundEvent::ExpiryAlert(_) => "expiry-alert",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
