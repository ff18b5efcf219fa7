/// Event Ingress
///
/// Validates client events and applies them to the hub. Nothing here returns
/// an error: channel membership is soft state that a reconnecting client
/// rebuilds, so invalid or out-of-order events are reported as
/// [`IngressOutcome::Ignored`] and otherwise have no effect.
use tracing::{debug, info};

use super::hub::Hub;
use super::messages::ClientUserId;
use super::registry::BindOutcome;
use super::{InboundEvent, OutboundEvent};
use crate::metrics;
use crate::models::{ChannelKey, ConnectionId, InventoryChangeEvent, UserId};

#[derive(Debug, Clone, PartialEq)]
pub enum IngressOutcome {
    Applied(Applied),
    /// Soft-fail: no error surfaced to the sender, no state changed
    Ignored(SoftFail),
}

impl IngressOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, IngressOutcome::Applied(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    Joined { channel: ChannelKey },
    Published { channel: ChannelKey, delivered: usize },
    Subscribed { channel: ChannelKey },
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoftFail {
    /// Event arrived for a connection the registry does not know
    UnknownConnection,
    /// `join-inventory` / `subscribe-expiry` without a usable user id
    EmptyUserId,
    /// `inventory-update` before any `join-inventory`
    UnboundConnection,
    /// Connection is bound to, or already holds channels of, a different user
    UserMismatch { bound_to: UserId },
}

impl SoftFail {
    pub fn reason(&self) -> &'static str {
        match self {
            SoftFail::UnknownConnection => "unknown_connection",
            SoftFail::EmptyUserId => "empty_user_id",
            SoftFail::UnboundConnection => "unbound_connection",
            SoftFail::UserMismatch { .. } => "user_mismatch",
        }
    }
}

pub(super) fn dispatch(
    hub: &mut Hub,
    connection_id: ConnectionId,
    event: InboundEvent,
) -> IngressOutcome {
    let event_name = event.name();
    let outcome = match event {
        InboundEvent::JoinInventory(user) => join_inventory(hub, connection_id, &user),
        InboundEvent::InventoryUpdate(payload) => inventory_update(hub, connection_id, payload),
        InboundEvent::SubscribeExpiry(user) => subscribe_expiry(hub, connection_id, &user),
        InboundEvent::Disconnect => {
            if hub.disconnect(connection_id) {
                IngressOutcome::Applied(Applied::Disconnected)
            } else {
                IngressOutcome::Ignored(SoftFail::UnknownConnection)
            }
        }
    };

    if let IngressOutcome::Ignored(soft_fail) = &outcome {
        metrics::record_ingress_ignored(soft_fail.reason());
        debug!(
            connection_id = %connection_id,
            event = event_name,
            reason = soft_fail.reason(),
            "Inbound event ignored"
        );
    }
    outcome
}

fn join_inventory(hub: &mut Hub, connection_id: ConnectionId, user: &ClientUserId) -> IngressOutcome {
    let Some(user_id) = user.to_user_id() else {
        return IngressOutcome::Ignored(SoftFail::EmptyUserId);
    };

    if let Some(other) = foreign_member_user(hub, connection_id, &user_id) {
        return IngressOutcome::Ignored(SoftFail::UserMismatch { bound_to: other });
    }

    match hub.registry.bind_user(connection_id, user_id.clone()) {
        BindOutcome::Bound | BindOutcome::AlreadyBound => {
            let channel = ChannelKey::Inventory(user_id);
            hub.router.subscribe(connection_id, channel.clone());
            info!(connection_id = %connection_id, channel = %channel, "User joined inventory room");
            IngressOutcome::Applied(Applied::Joined { channel })
        }
        BindOutcome::Conflict { bound_to } => {
            IngressOutcome::Ignored(SoftFail::UserMismatch { bound_to })
        }
        BindOutcome::UnknownConnection => IngressOutcome::Ignored(SoftFail::UnknownConnection),
    }
}

fn inventory_update(
    hub: &mut Hub,
    connection_id: ConnectionId,
    payload: InventoryChangeEvent,
) -> IngressOutcome {
    let Some(user_id) = hub.registry.lookup_user(connection_id).cloned() else {
        let soft_fail = if hub.registry.contains(connection_id) {
            SoftFail::UnboundConnection
        } else {
            SoftFail::UnknownConnection
        };
        return IngressOutcome::Ignored(soft_fail);
    };

    let channel = ChannelKey::Inventory(user_id);
    let delivered = hub.publish(&channel, &OutboundEvent::InventoryChanged(payload));
    info!(channel = %channel, delivered, "Inventory update broadcasted");
    IngressOutcome::Applied(Applied::Published { channel, delivered })
}

/// Does not require a prior `join-inventory` and does not bind the connection.
fn subscribe_expiry(hub: &mut Hub, connection_id: ConnectionId, user: &ClientUserId) -> IngressOutcome {
    let Some(user_id) = user.to_user_id() else {
        return IngressOutcome::Ignored(SoftFail::EmptyUserId);
    };
    if !hub.registry.contains(connection_id) {
        return IngressOutcome::Ignored(SoftFail::UnknownConnection);
    }
    if let Some(bound_to) = hub.registry.lookup_user(connection_id) {
        if *bound_to != user_id {
            return IngressOutcome::Ignored(SoftFail::UserMismatch {
                bound_to: bound_to.clone(),
            });
        }
    }
    if let Some(other) = foreign_member_user(hub, connection_id, &user_id) {
        return IngressOutcome::Ignored(SoftFail::UserMismatch { bound_to: other });
    }

    let channel = ChannelKey::Expiry(user_id);
    hub.router.subscribe(connection_id, channel.clone());
    info!(connection_id = %connection_id, channel = %channel, "Subscribed to expiry notifications");
    IngressOutcome::Applied(Applied::Subscribed { channel })
}

/// Owner of any channel the connection already holds that belongs to a user
/// other than `user_id`. A connection only ever holds one user's channels.
fn foreign_member_user(hub: &Hub, connection_id: ConnectionId, user_id: &UserId) -> Option<UserId> {
    hub.router
        .channels_of(connection_id)
        .into_iter()
        .map(|channel| channel.user_id().clone())
        .find(|owner| owner != user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::mpsc;

    fn user(id: &str) -> UserId {
        UserId::parse(id).unwrap()
    }

    fn connect(hub: &mut Hub) -> (ConnectionId, mpsc::UnboundedReceiver<OutboundEvent>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = hub.connect(tx);
        // discard greeting
        let _ = rx.try_recv();
        (id, rx)
    }

    #[test]
    fn test_join_binds_and_subscribes() {
        let mut hub = Hub::new();
        let (conn, _rx) = connect(&mut hub);

        let outcome = hub.handle(conn, InboundEvent::JoinInventory("alice".into()));
        assert_eq!(
            outcome,
            IngressOutcome::Applied(Applied::Joined {
                channel: ChannelKey::Inventory(user("alice"))
            })
        );
        assert_eq!(hub.registry().lookup_user(conn), Some(&user("alice")));
        assert!(hub
            .router()
            .is_subscribed(conn, &ChannelKey::Inventory(user("alice"))));
    }

    #[test]
    fn test_join_with_blank_user_is_soft_fail() {
        let mut hub = Hub::new();
        let (conn, _rx) = connect(&mut hub);

        let outcome = hub.handle(conn, InboundEvent::JoinInventory("  ".into()));
        assert_eq!(outcome, IngressOutcome::Ignored(SoftFail::EmptyUserId));
        assert_eq!(hub.registry().lookup_user(conn), None);
    }

    #[test]
    fn test_rejoin_as_other_user_keeps_first_binding() {
        let mut hub = Hub::new();
        let (conn, _rx) = connect(&mut hub);
        hub.handle(conn, InboundEvent::JoinInventory("alice".into()));

        let outcome = hub.handle(conn, InboundEvent::JoinInventory("mallory".into()));
        assert_eq!(
            outcome,
            IngressOutcome::Ignored(SoftFail::UserMismatch {
                bound_to: user("alice")
            })
        );
        assert!(!hub
            .router()
            .is_subscribed(conn, &ChannelKey::Inventory(user("mallory"))));
    }

    #[test]
    fn test_update_from_unbound_connection_is_dropped() {
        let mut hub = Hub::new();
        let (conn, mut rx) = connect(&mut hub);

        let outcome = hub.handle(conn, InboundEvent::InventoryUpdate(json!({"id": 1})));
        assert_eq!(outcome, IngressOutcome::Ignored(SoftFail::UnboundConnection));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_update_from_unknown_connection() {
        let mut hub = Hub::new();
        let outcome = hub.handle(
            ConnectionId::new(),
            InboundEvent::InventoryUpdate(json!({"id": 1})),
        );
        assert_eq!(outcome, IngressOutcome::Ignored(SoftFail::UnknownConnection));
    }

    #[test]
    fn test_update_echoes_to_sender_room() {
        let mut hub = Hub::new();
        let (conn, mut rx) = connect(&mut hub);
        hub.handle(conn, InboundEvent::JoinInventory("alice".into()));

        let outcome = hub.handle(conn, InboundEvent::InventoryUpdate(json!({"id": 1})));
        assert_eq!(
            outcome,
            IngressOutcome::Applied(Applied::Published {
                channel: ChannelKey::Inventory(user("alice")),
                delivered: 1
            })
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            OutboundEvent::InventoryChanged(json!({"id": 1}))
        );
    }

    #[test]
    fn test_subscribe_expiry_without_join() {
        let mut hub = Hub::new();
        let (conn, _rx) = connect(&mut hub);

        let outcome = hub.handle(conn, InboundEvent::SubscribeExpiry("alice".into()));
        assert!(outcome.is_applied());
        assert!(hub
            .router()
            .is_subscribed(conn, &ChannelKey::Expiry(user("alice"))));
        // subscribing to alerts does not bind the connection
        assert_eq!(hub.registry().lookup_user(conn), None);
    }

    #[test]
    fn test_subscribe_expiry_for_other_user_is_rejected() {
        let mut hub = Hub::new();
        let (conn, _rx) = connect(&mut hub);
        hub.handle(conn, InboundEvent::JoinInventory("alice".into()));

        let outcome = hub.handle(conn, InboundEvent::SubscribeExpiry("bob".into()));
        assert_eq!(
            outcome,
            IngressOutcome::Ignored(SoftFail::UserMismatch {
                bound_to: user("alice")
            })
        );
    }

    #[test]
    fn test_join_after_expiry_subscription_for_other_user_is_rejected() {
        let mut hub = Hub::new();
        let (conn, _rx) = connect(&mut hub);
        assert!(hub
            .handle(conn, InboundEvent::SubscribeExpiry("bob".into()))
            .is_applied());

        let outcome = hub.handle(conn, InboundEvent::JoinInventory("alice".into()));
        assert_eq!(
            outcome,
            IngressOutcome::Ignored(SoftFail::UserMismatch {
                bound_to: user("bob")
            })
        );
        assert_eq!(hub.registry().lookup_user(conn), None);
        assert_eq!(
            hub.router().channels_of(conn),
            vec![ChannelKey::Expiry(user("bob"))]
        );
    }

    #[test]
    fn test_join_after_expiry_subscription_for_same_user() {
        let mut hub = Hub::new();
        let (conn, _rx) = connect(&mut hub);
        hub.handle(conn, InboundEvent::SubscribeExpiry("alice".into()));

        let outcome = hub.handle(conn, InboundEvent::JoinInventory("alice".into()));
        assert!(outcome.is_applied());
        assert_eq!(hub.registry().lookup_user(conn), Some(&user("alice")));
        assert_eq!(hub.router().channels_of(conn).len(), 2);
    }

    #[test]
    fn test_unbound_connection_cannot_subscribe_to_two_users() {
        let mut hub = Hub::new();
        let (conn, _rx) = connect(&mut hub);
        hub.handle(conn, InboundEvent::SubscribeExpiry("bob".into()));

        let outcome = hub.handle(conn, InboundEvent::SubscribeExpiry("carol".into()));
        assert_eq!(
            outcome,
            IngressOutcome::Ignored(SoftFail::UserMismatch {
                bound_to: user("bob")
            })
        );
        assert!(!hub
            .router()
            .is_subscribed(conn, &ChannelKey::Expiry(user("carol"))));
    }

    #[test]
    fn test_disconnect_event_unregisters() {
        let mut hub = Hub::new();
        let (conn, _rx) = connect(&mut hub);
        hub.handle(conn, InboundEvent::JoinInventory("alice".into()));
        hub.handle(conn, InboundEvent::SubscribeExpiry("alice".into()));

        let outcome = hub.handle(conn, InboundEvent::Disconnect);
        assert_eq!(outcome, IngressOutcome::Applied(Applied::Disconnected));
        assert!(hub.router().channels_of(conn).is_empty());

        let outcome = hub.handle(conn, InboundEvent::Disconnect);
        assert_eq!(outcome, IngressOutcome::Ignored(SoftFail::UnknownConnection));
    }
}
