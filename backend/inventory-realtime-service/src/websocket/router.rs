/// Room Router
///
/// Channel membership table. Keeps a forward index (channel -> members) for
/// publishing and a reverse index (connection -> channels) so a disconnect can
/// release every membership in one step.
use std::collections::{HashMap, HashSet};

use crate::models::{ChannelKey, ConnectionId};

#[derive(Default)]
pub struct RoomRouter {
    channels: HashMap<ChannelKey, HashSet<ConnectionId>>,
    memberships: HashMap<ConnectionId, HashSet<ChannelKey>>,
}

impl RoomRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the connection was already a member.
    pub fn subscribe(&mut self, connection_id: ConnectionId, channel: ChannelKey) -> bool {
        let added = self
            .channels
            .entry(channel.clone())
            .or_default()
            .insert(connection_id);
        if added {
            self.memberships
                .entry(connection_id)
                .or_default()
                .insert(channel);
        }
        added
    }

    /// Returns `false` when the connection was not a member.
    pub fn unsubscribe(&mut self, connection_id: ConnectionId, channel: &ChannelKey) -> bool {
        let removed = match self.channels.get_mut(channel) {
            Some(members) => {
                let removed = members.remove(&connection_id);
                if members.is_empty() {
                    self.channels.remove(channel);
                }
                removed
            }
            None => false,
        };

        if removed {
            if let Some(joined) = self.memberships.get_mut(&connection_id) {
                joined.remove(channel);
                if joined.is_empty() {
                    self.memberships.remove(&connection_id);
                }
            }
        }
        removed
    }

    /// Drop every membership held by a connection. Returns how many were released.
    pub fn unsubscribe_all(&mut self, connection_id: ConnectionId) -> usize {
        let Some(joined) = self.memberships.remove(&connection_id) else {
            return 0;
        };

        for channel in &joined {
            if let Some(members) = self.channels.get_mut(channel) {
                members.remove(&connection_id);
                if members.is_empty() {
                    self.channels.remove(channel);
                }
            }
        }
        joined.len()
    }

    /// Hand the event to every current member of `channel` via `deliver`.
    ///
    /// Each member is visited exactly once. Returns the number of members for
    /// which `deliver` reported success.
    pub fn publish<F>(&self, channel: &ChannelKey, mut deliver: F) -> usize
    where
        F: FnMut(ConnectionId) -> bool,
    {
        match self.channels.get(channel) {
            Some(members) => members
                .iter()
                .filter(|connection_id| deliver(**connection_id))
                .count(),
            None => 0,
        }
    }

    pub fn members(&self, channel: &ChannelKey) -> Vec<ConnectionId> {
        self.channels
            .get(channel)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn channels_of(&self, connection_id: ConnectionId) -> Vec<ChannelKey> {
        self.memberships
            .get(&connection_id)
            .map(|joined| joined.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_subscribed(&self, connection_id: ConnectionId, channel: &ChannelKey) -> bool {
        self.channels
            .get(channel)
            .is_some_and(|members| members.contains(&connection_id))
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn clear(&mut self) {
        self.channels.clear();
        self.memberships.clear();
    }
}
