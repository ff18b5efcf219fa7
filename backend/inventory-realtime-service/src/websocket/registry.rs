/// Connection Registry
///
/// Tracks live sessions and the user each one is bound to. Owned by the
/// [`Hub`](super::hub::Hub); channel membership lives in the router.
use std::collections::HashMap;
use tokio::sync::mpsc;

use super::OutboundEvent;
use crate::models::{ConnectionId, UserId};

/// Outbound queue of a single session
pub type SessionSender = mpsc::UnboundedSender<OutboundEvent>;

struct ConnectionEntry {
    sender: SessionSender,
    user_id: Option<UserId>,
}

/// Result of [`ConnectionRegistry::bind_user`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindOutcome {
    /// First binding for this connection
    Bound,
    /// Connection was already bound to the same user
    AlreadyBound,
    /// Connection is bound to another user; the binding is unchanged
    Conflict { bound_to: UserId },
    UnknownConnection,
}

#[derive(Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, ConnectionEntry>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a freshly opened session. Re-registering an id replaces its sender
    /// and clears the binding.
    pub fn register(&mut self, connection_id: ConnectionId, sender: SessionSender) {
        self.connections.insert(
            connection_id,
            ConnectionEntry {
                sender,
                user_id: None,
            },
        );
    }

    /// First write wins: once bound, a connection keeps its user until it is
    /// unregistered.
    pub fn bind_user(&mut self, connection_id: ConnectionId, user_id: UserId) -> BindOutcome {
        let Some(entry) = self.connections.get_mut(&connection_id) else {
            return BindOutcome::UnknownConnection;
        };

        match &entry.user_id {
            None => {
                entry.user_id = Some(user_id);
                BindOutcome::Bound
            }
            Some(existing) if *existing == user_id => BindOutcome::AlreadyBound,
            Some(existing) => BindOutcome::Conflict {
                bound_to: existing.clone(),
            },
        }
    }

    pub fn lookup_user(&self, connection_id: ConnectionId) -> Option<&UserId> {
        self.connections
            .get(&connection_id)
            .and_then(|entry| entry.user_id.as_ref())
    }

    pub fn contains(&self, connection_id: ConnectionId) -> bool {
        self.connections.contains_key(&connection_id)
    }

    /// Forget a session. Returns the user it was bound to, if any.
    pub fn unregister(&mut self, connection_id: ConnectionId) -> Option<UserId> {
        self.connections
            .remove(&connection_id)
            .and_then(|entry| entry.user_id)
    }

    /// Queue an event for one session. `false` when the session is unknown or
    /// its receiving half has gone away.
    pub fn deliver(&self, connection_id: ConnectionId, event: &OutboundEvent) -> bool {
        match self.connections.get(&connection_id) {
            Some(entry) => entry.sender.send(event.clone()).is_ok(),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Number of distinct users with at least one bound session
    pub fn bound_user_count(&self) -> usize {
        let mut users: Vec<&UserId> = self
            .connections
            .values()
            .filter_map(|entry| entry.user_id.as_ref())
            .collect();
        users.sort();
        users.dedup();
        users.len()
    }

    pub fn clear(&mut self) {
        self.connections.clear();
    }
}
