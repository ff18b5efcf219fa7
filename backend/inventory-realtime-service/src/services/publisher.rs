use actix::Addr;
use async_trait::async_trait;

use crate::error::Result;
use crate::models::ChannelKey;
use crate::websocket::{BroadcastHub, OutboundEvent, Publish};

/// Server-side entry point into the broadcast hub.
///
/// The expiry scanner and the broadcast gateway only see this trait, which
/// keeps them testable without a running actor system.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Fan `event` out to the current subscribers of `channel`.
    ///
    /// Returns how many sessions the event was queued for. Delivery is
    /// best-effort: no acknowledgement, no retry.
    async fn publish(&self, channel: ChannelKey, event: OutboundEvent) -> Result<usize>;
}

#[async_trait]
impl EventPublisher for Addr<BroadcastHub> {
    async fn publish(&self, channel: ChannelKey, event: OutboundEvent) -> Result<usize> {
        let delivered = self.send(Publish { channel, event }).await?;
        Ok(delivered)
    }
}
