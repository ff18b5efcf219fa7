/// WebSocket real-time inventory channel
///
/// Architecture:
/// 1. ConnectionRegistry: live sessions and their bound user
/// 2. RoomRouter: `inventory:<user>` / `expiry:<user>` membership and fan-out
/// 3. Ingress: validation and dispatch of client events
/// 4. BroadcastHub: actor owning the above; its mailbox is the event loop
/// 5. WsSession: one actor per WebSocket transport

pub mod hub;
pub mod ingress;
pub mod messages;
pub mod registry;
pub mod router;
pub mod session;

pub use hub::{BroadcastHub, ClientEvent, Connect, Disconnect, GetHubStats, Hub, HubStats, Publish};
pub use ingress::{Applied, IngressOutcome, SoftFail};
pub use messages::{ClientUserId, InboundEvent, OutboundEvent};
pub use registry::{BindOutcome, ConnectionRegistry, SessionSender};
pub use router::RoomRouter;
pub use session::WsSession;
