/// Broadcast hub
///
/// [`Hub`] owns the connection registry and the room router and is the only
/// place either is mutated. [`BroadcastHub`] runs a `Hub` inside an actix actor,
/// so every connect, disconnect, client event and publish is applied one at a
/// time from the actor's mailbox without locks.
use actix::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use super::ingress::IngressOutcome;
use super::registry::{ConnectionRegistry, SessionSender};
use super::router::RoomRouter;
use super::{InboundEvent, OutboundEvent};
use crate::metrics;
use crate::models::{ChannelKey, ConnectionId};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct HubStats {
    pub total_connections: usize,
    pub bound_users: usize,
    pub active_channels: usize,
}

#[derive(Default)]
pub struct Hub {
    pub(super) registry: ConnectionRegistry,
    pub(super) router: RoomRouter,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session and greet it with its connection id.
    ///
    /// A session that cannot take the greeting is already gone and is not
    /// registered.
    pub fn connect(&mut self, sender: SessionSender) -> ConnectionId {
        let connection_id = ConnectionId::new();
        if sender
            .send(OutboundEvent::Connected { connection_id })
            .is_err()
        {
            debug!(connection_id = %connection_id, "Session closed before greeting, not registered");
            return connection_id;
        }
        self.registry.register(connection_id, sender);
        metrics::set_active_connections(self.registry.len());

        debug!(connection_id = %connection_id, "Connection registered");
        connection_id
    }

    /// Remove a session and every channel membership it held.
    ///
    /// Returns `false` if the connection was already gone.
    pub fn disconnect(&mut self, connection_id: ConnectionId) -> bool {
        if !self.registry.contains(connection_id) {
            return false;
        }

        let released = self.router.unsubscribe_all(connection_id);
        let user_id = self.registry.unregister(connection_id);
        metrics::set_active_connections(self.registry.len());

        match user_id {
            Some(user_id) => info!(
                connection_id = %connection_id,
                user_id = %user_id,
                released_channels = released,
                "User disconnected"
            ),
            None => debug!(connection_id = %connection_id, "Unbound connection closed"),
        }
        true
    }

    /// Process one client event. See [`super::ingress`].
    pub fn handle(&mut self, connection_id: ConnectionId, event: InboundEvent) -> IngressOutcome {
        super::ingress::dispatch(self, connection_id, event)
    }

    /// Fan `event` out to every current subscriber of `channel`.
    ///
    /// Returns the number of sessions the event was queued for.
    pub fn publish(&self, channel: &ChannelKey, event: &OutboundEvent) -> usize {
        let registry = &self.registry;
        let delivered = self
            .router
            .publish(channel, |connection_id| registry.deliver(connection_id, event));

        metrics::record_delivered(channel.kind(), delivered);
        debug!(
            channel = %channel,
            event = event.name(),
            delivered,
            "Event published"
        );
        delivered
    }

    pub fn stats(&self) -> HubStats {
        HubStats {
            total_connections: self.registry.len(),
            bound_users: self.registry.bound_user_count(),
            active_channels: self.router.channel_count(),
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn router(&self) -> &RoomRouter {
        &self.router
    }

    /// Drop all sessions and memberships. Used on shutdown.
    pub fn clear(&mut self) {
        self.router.clear();
        self.registry.clear();
        metrics::set_active_connections(0);
    }
}

/// Actor owning the process-wide [`Hub`]
#[derive(Default)]
pub struct BroadcastHub {
    hub: Hub,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Actor for BroadcastHub {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        info!("Broadcast hub started");
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        let stats = self.hub.stats();
        self.hub.clear();
        info!(
            dropped_connections = stats.total_connections,
            "Broadcast hub stopped"
        );
    }
}

/// New session; replies with its id
#[derive(Message)]
#[rtype(result = "ConnectionId")]
pub struct Connect {
    pub sender: SessionSender,
}

/// Session closed
#[derive(Message)]
#[rtype(result = "bool")]
pub struct Disconnect {
    pub connection_id: ConnectionId,
}

/// Event received from a session
#[derive(Message)]
#[rtype(result = "IngressOutcome")]
pub struct ClientEvent {
    pub connection_id: ConnectionId,
    pub event: InboundEvent,
}

/// Server-side publish; replies with the delivered count
#[derive(Message)]
#[rtype(result = "usize")]
pub struct Publish {
    pub channel: ChannelKey,
    pub event: OutboundEvent,
}

#[derive(Message)]
#[rtype(result = "HubStats")]
pub struct GetHubStats;

impl Handler<Connect> for BroadcastHub {
    type Result = MessageResult<Connect>;

    fn handle(&mut self, msg: Connect, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.hub.connect(msg.sender))
    }
}

impl Handler<Disconnect> for BroadcastHub {
    type Result = bool;

    fn handle(&mut self, msg: Disconnect, _ctx: &mut Self::Context) -> Self::Result {
        self.hub.disconnect(msg.connection_id)
    }
}

impl Handler<ClientEvent> for BroadcastHub {
    type Result = MessageResult<ClientEvent>;

    fn handle(&mut self, msg: ClientEvent, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.hub.handle(msg.connection_id, msg.event))
    }
}

impl Handler<Publish> for BroadcastHub {
    type Result = usize;

    fn handle(&mut self, msg: Publish, _ctx: &mut Self::Context) -> Self::Result {
        self.hub.publish(&msg.channel, &msg.event)
    }
}

impl Handler<GetHubStats> for BroadcastHub {
    type Result = MessageResult<GetHubStats>;

    fn handle(&mut self, _msg: GetHubStats, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.hub.stats())
    }
}
