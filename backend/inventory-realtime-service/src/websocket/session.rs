/// Per-connection WebSocket actor
///
/// Forwards parsed client frames to the [`BroadcastHub`] in arrival order and
/// writes whatever the hub queues for this connection back to the socket.
use actix::prelude::*;
use actix_web_actors::ws;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};

use super::hub::{BroadcastHub, ClientEvent, Connect, Disconnect};
use super::{InboundEvent, OutboundEvent};
use crate::models::ConnectionId;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct WsSession {
    connection_id: Option<ConnectionId>,
    hub: Addr<BroadcastHub>,
    hb: Instant,
}

impl WsSession {
    pub fn new(hub: Addr<BroadcastHub>) -> Self {
        Self {
            connection_id: None,
            hub,
            hb: Instant::now(),
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                warn!(
                    connection_id = ?act.connection_id,
                    "WebSocket heartbeat failed, disconnecting"
                );
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn forward(&self, text: &str, ctx: &mut ws::WebsocketContext<Self>) {
        let Some(connection_id) = self.connection_id else {
            debug!("Frame received before registration completed, ignoring");
            return;
        };

        let event = match InboundEvent::from_json(text) {
            Ok(event) => event,
            Err(e) => {
                debug!(connection_id = %connection_id, error = %e, "Malformed inbound frame ignored");
                return;
            }
        };

        let closing = matches!(event, InboundEvent::Disconnect);
        self.hub.do_send(ClientEvent {
            connection_id,
            event,
        });

        if closing {
            ctx.close(None);
            ctx.stop();
        }
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.hb(ctx);

        let (tx, rx) = mpsc::unbounded_channel::<OutboundEvent>();
        ctx.add_stream(UnboundedReceiverStream::new(rx));

        // Hold every other message until the hub has assigned an id.
        self.hub
            .send(Connect { sender: tx })
            .into_actor(self)
            .then(|res, act, ctx| {
                match res {
                    Ok(connection_id) => {
                        info!(connection_id = %connection_id, "User connected");
                        act.connection_id = Some(connection_id);
                    }
                    Err(e) => {
                        warn!(error = %e, "Broadcast hub unavailable, closing session");
                        ctx.stop();
                    }
                }
                fut::ready(())
            })
            .wait(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        if let Some(connection_id) = self.connection_id.take() {
            debug!(connection_id = %connection_id, "WebSocket session stopped");
            self.hub.do_send(Disconnect { connection_id });
        }
    }
}

/// Events queued by the hub for this connection
impl StreamHandler<OutboundEvent> for WsSession {
    fn handle(&mut self, event: OutboundEvent, ctx: &mut Self::Context) {
        match event.to_json() {
            Ok(json) => ctx.text(json),
            Err(e) => warn!(event = event.name(), error = %e, "Failed to serialize outbound event"),
        }
    }

    fn finished(&mut self, ctx: &mut Self::Context) {
        // The hub dropped our sender: the connection was unregistered.
        ctx.stop();
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.hb = Instant::now();
                self.forward(&text, ctx);
            }
            Ok(ws::Message::Binary(_)) => {
                debug!("Binary WebSocket messages not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                debug!(?reason, "WebSocket close message received");
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) | Ok(ws::Message::Nop) => {}
            Err(e) => {
                warn!(error = %e, "WebSocket protocol error");
                ctx.stop();
            }
        }
    }
}
