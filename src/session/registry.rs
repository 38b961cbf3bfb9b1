//! Participant registry.
//!
//! Named participants keyed by their live connection. Entries exist only for
//! connected sockets; the session removes them on disconnect or kick.

use std::collections::BTreeMap;

use super::ConnectionId;

/// Connection ids are allocated in increasing order, so iteration over the
/// map is join order.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    participants: BTreeMap<ConnectionId, String>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or rename. Re-registering keeps the original join position.
    pub fn register(&mut self, connection: ConnectionId, name: impl Into<String>) {
        self.participants.insert(connection, name.into());
    }

    /// Returns the removed participant's name, if the connection was registered.
    pub fn remove(&mut self, connection: ConnectionId) -> Option<String> {
        self.participants.remove(&connection)
    }

    /// First connection (in join order) registered under `name`.
    pub fn find_by_name(&self, name: &str) -> Option<ConnectionId> {
        self.participants
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(id, _)| *id)
    }

    /// Display names in join order. Duplicates are kept.
    pub fn names(&self) -> Vec<String> {
        self.participants.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}
