use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use super::publisher::EventPublisher;
use crate::models::{ChannelKey, InventoryChangeEvent, UserId};
use crate::websocket::OutboundEvent;

/// Result of a gateway notification
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NotifyOutcome {
    pub channel: String,
    pub delivered: usize,
}

/// Entry point for collaborators that already persisted an inventory write
/// and want live sessions to hear about it.
///
/// Notification is decoupled from the write: it never fails, and a delivery
/// problem shows up only as `delivered == 0` in the outcome and a log line.
#[derive(Clone)]
pub struct BroadcastGateway {
    publisher: Arc<dyn EventPublisher>,
}

impl BroadcastGateway {
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self { publisher }
    }

    pub async fn notify_inventory_change(
        &self,
        user_id: UserId,
        payload: InventoryChangeEvent,
    ) -> NotifyOutcome {
        let channel = ChannelKey::Inventory(user_id);
        let channel_name = channel.to_string();

        let delivered = match self
            .publisher
            .publish(channel, OutboundEvent::InventoryChanged(payload))
            .await
        {
            Ok(delivered) => {
                debug!(channel = %channel_name, delivered, "Inventory change pushed");
                delivered
            }
            Err(e) => {
                warn!(channel = %channel_name, error = %e, "Inventory change push failed");
                0
            }
        };

        NotifyOutcome {
            channel: channel_name,
            delivered,
        }
    }
}
