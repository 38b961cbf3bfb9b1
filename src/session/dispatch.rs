//! Broadcast dispatcher.
//!
//! Fan-out of [`ServerEvent`]s to every attached connection, or to a single
//! target. Each connection has a bounded outlet drained by its socket writer.
//! Delivery never blocks: a full or closed outlet drops the event for that
//! connection only. Missed events are not replayed.

use std::collections::BTreeMap;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::protocol::ServerEvent;
use super::ConnectionId;

#[derive(Debug)]
pub struct BroadcastDispatcher {
    outlets: BTreeMap<ConnectionId, mpsc::Sender<ServerEvent>>,
    queue_size: usize,
}

impl BroadcastDispatcher {
    pub fn new(queue_size: usize) -> Self {
        Self {
            outlets: BTreeMap::new(),
            queue_size: queue_size.max(1),
        }
    }

    /// Open an outlet for a connection and hand back its receiving end.
    pub fn attach(&mut self, connection: ConnectionId) -> mpsc::Receiver<ServerEvent> {
        let (tx, rx) = mpsc::channel(self.queue_size);
        self.outlets.insert(connection, tx);
        debug!(connection = %connection, "outlet attached");
        rx
    }

    /// Close a connection's outlet. Queued events are still delivered to the
    /// receiver before it observes the close.
    pub fn detach(&mut self, connection: ConnectionId) -> bool {
        self.outlets.remove(&connection).is_some()
    }

    pub fn is_attached(&self, connection: ConnectionId) -> bool {
        self.outlets.contains_key(&connection)
    }

    /// Deliver to every attached connection. Returns how many accepted it.
    pub fn broadcast(&self, event: &ServerEvent) -> usize {
        self.outlets
            .iter()
            .filter(|(id, tx)| deliver(**id, tx, event.clone()))
            .count()
    }

    /// Deliver to one connection.
    pub fn send_to(&self, connection: ConnectionId, event: ServerEvent) -> bool {
        match self.outlets.get(&connection) {
            Some(tx) => deliver(connection, tx, event),
            None => false,
        }
    }

    pub fn connection_count(&self) -> usize {
        self.outlets.len()
    }
}

fn deliver(connection: ConnectionId, tx: &mpsc::Sender<ServerEvent>, event: ServerEvent) -> bool {
    match tx.try_send(event) {
        Ok(()) => true,
        Err(err) => {
            warn!(connection = %connection, "dropping event: {}", err);
            false
        }
    }
}
