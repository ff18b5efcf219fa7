/// Fan-out properties of the broadcast hub
///
/// Covers:
/// - Per-user room isolation for inventory updates
/// - Membership release on unregister
/// - Soft-fail for unbound senders
/// - Exactly-once delivery per connection
use inventory_realtime_service::models::{ChannelKey, ConnectionId, UserId};
use inventory_realtime_service::websocket::{
    Applied, Hub, InboundEvent, IngressOutcome, OutboundEvent, SoftFail,
};
use serde_json::json;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver};

struct Client {
    id: ConnectionId,
    rx: UnboundedReceiver<OutboundEvent>,
}

impl Client {
    fn connect(hub: &mut Hub) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = hub.connect(tx);
        assert_eq!(rx.try_recv().unwrap(), OutboundEvent::Connected { connection_id: id });
        Client { id, rx }
    }

    fn join(hub: &mut Hub, user: &str) -> Self {
        let client = Self::connect(hub);
        let outcome = hub.handle(client.id, InboundEvent::JoinInventory(user.into()));
        assert!(outcome.is_applied(), "join failed: {:?}", outcome);
        client
    }

    fn drain(&mut self) -> Vec<OutboundEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}

fn inventory(user: &str) -> ChannelKey {
    ChannelKey::Inventory(UserId::parse(user).unwrap())
}

#[test]
fn test_inventory_publish_reaches_every_session_of_the_user_only() {
    let mut hub = Hub::new();
    let mut alice_phone = Client::join(&mut hub, "alice");
    let mut alice_laptop = Client::join(&mut hub, "alice");
    let mut bob = Client::join(&mut hub, "bob");

    let payload = json!({"action": "updated", "item": {"id": "i1", "quantity": 3}});
    let delivered = hub.publish(&inventory("alice"), &OutboundEvent::InventoryChanged(payload.clone()));

    assert_eq!(delivered, 2);
    assert_eq!(alice_phone.drain(), vec![OutboundEvent::InventoryChanged(payload.clone())]);
    assert_eq!(alice_laptop.drain(), vec![OutboundEvent::InventoryChanged(payload)]);
    assert!(bob.drain().is_empty());
}

#[test]
fn test_update_from_one_session_fans_out_to_sibling_sessions() {
    let mut hub = Hub::new();
    let mut sender = Client::join(&mut hub, "alice");
    let mut sibling = Client::join(&mut hub, "alice");
    let mut stranger = Client::join(&mut hub, "bob");

    let payload = json!({"action": "consumed", "item": "milk"});
    let outcome = hub.handle(sender.id, InboundEvent::InventoryUpdate(payload.clone()));

    assert_eq!(
        outcome,
        IngressOutcome::Applied(Applied::Published {
            channel: inventory("alice"),
            delivered: 2
        })
    );
    assert_eq!(sibling.drain(), vec![OutboundEvent::InventoryChanged(payload.clone())]);
    assert_eq!(sender.drain(), vec![OutboundEvent::InventoryChanged(payload)]);
    assert!(stranger.drain().is_empty());
}

#[test]
fn test_unregistered_connection_receives_nothing_afterwards() {
    let mut hub = Hub::new();
    let mut leaving = Client::join(&mut hub, "alice");
    hub.handle(leaving.id, InboundEvent::SubscribeExpiry("alice".into()));
    let mut staying = Client::join(&mut hub, "alice");

    assert!(hub.disconnect(leaving.id));
    assert!(hub.router().channels_of(leaving.id).is_empty());

    let delivered = hub.publish(&inventory("alice"), &OutboundEvent::InventoryChanged(json!(1)));
    let expiry = ChannelKey::Expiry(UserId::parse("alice").unwrap());
    let expiry_delivered = hub.publish(&expiry, &OutboundEvent::InventoryChanged(json!(2)));

    assert_eq!(delivered, 1);
    assert_eq!(expiry_delivered, 0);
    assert_eq!(staying.drain().len(), 1);
    // Sender half was dropped by the registry, so the queue is closed and empty.
    assert_eq!(leaving.rx.try_recv(), Err(TryRecvError::Disconnected));
}

#[test]
fn test_update_from_unbound_connection_produces_no_deliveries() {
    let mut hub = Hub::new();
    let mut unbound = Client::connect(&mut hub);
    let mut alice = Client::join(&mut hub, "alice");

    let outcome = hub.handle(unbound.id, InboundEvent::InventoryUpdate(json!({"id": 1})));

    assert_eq!(outcome, IngressOutcome::Ignored(SoftFail::UnboundConnection));
    assert!(unbound.drain().is_empty());
    assert!(alice.drain().is_empty());
}

#[test]
fn test_two_sessions_each_receive_a_single_copy() {
    let mut hub = Hub::new();
    let mut first = Client::join(&mut hub, "household-7");
    let mut second = Client::join(&mut hub, "household-7");

    // Rejoining is idempotent and must not duplicate membership.
    hub.handle(first.id, InboundEvent::JoinInventory("household-7".into()));

    hub.handle(first.id, InboundEvent::InventoryUpdate(json!({"seq": 1})));

    assert_eq!(first.drain().len(), 1);
    assert_eq!(second.drain().len(), 1);
}

#[test]
fn test_per_channel_order_matches_publish_order() {
    let mut hub = Hub::new();
    let mut client = Client::join(&mut hub, "alice");

    for seq in 0..5 {
        hub.publish(&inventory("alice"), &OutboundEvent::InventoryChanged(json!({"seq": seq})));
    }

    let received: Vec<OutboundEvent> = client.drain();
    let expected: Vec<OutboundEvent> = (0..5)
        .map(|seq| OutboundEvent::InventoryChanged(json!({"seq": seq})))
        .collect();
    assert_eq!(received, expected);
}

#[test]
fn test_closed_session_is_not_counted_as_delivered() {
    let mut hub = Hub::new();
    let gone = Client::join(&mut hub, "alice");
    let mut live = Client::join(&mut hub, "alice");
    drop(gone.rx);

    let delivered = hub.publish(&inventory("alice"), &OutboundEvent::InventoryChanged(json!({})));
    assert_eq!(delivered, 1);
    assert_eq!(live.drain().len(), 1);
}
