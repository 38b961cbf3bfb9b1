//! Session hub
//!
//! The single serialization point of a live session. One mutex guards the
//! lifecycle (poll, tally, history), the registry and the dispatcher outlets;
//! every command, disconnect and timer expiry runs entirely under it, so no
//! two state changes interleave. Replies are queued on the caller's outlet
//! while the lock is still held and therefore stay ordered with broadcasts.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::dispatch::BroadcastDispatcher;
use super::protocol::{error_shape, ClientCommand, ClientFrame, ServerEvent};
use super::registry::ConnectionRegistry;
use super::{ConnectionId, SessionError};
use crate::polls::timer::{TimerFire, TimerScheduler, TimerSink, TokioTimers};
use crate::polls::{
    HistoryEntry, LifecycleSettings, LifecycleState, Poll, PollDraft, PollError, PollId,
    PollLifecycle, TallySnapshot,
};

/// Longest accepted display name, in characters.
pub const MAX_NAME_LEN: usize = 64;

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub lifecycle: LifecycleSettings,
    /// Events buffered per connection before new ones are dropped
    pub connection_queue_size: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            lifecycle: LifecycleSettings::default(),
            connection_queue_size: 100,
        }
    }
}

/// Point-in-time counters for health reporting.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub state: LifecycleState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_id: Option<PollId>,
    pub participants: usize,
    pub connections: usize,
    pub polls_completed: usize,
}

struct SessionCore {
    lifecycle: PollLifecycle,
    registry: ConnectionRegistry,
    dispatcher: BroadcastDispatcher,
}

pub struct SessionHub {
    core: Mutex<SessionCore>,
    timers: TokioTimers,
    next_connection: AtomicU64,
}

impl SessionHub {
    /// Create the hub. Timers are spawned on the ambient tokio runtime.
    pub fn new(settings: SessionSettings) -> Arc<Self> {
        Arc::new_cyclic(|hub: &Weak<SessionHub>| {
            let sink: Weak<dyn TimerSink> = hub.clone();
            SessionHub {
                core: Mutex::new(SessionCore {
                    lifecycle: PollLifecycle::new(settings.lifecycle),
                    registry: ConnectionRegistry::new(),
                    dispatcher: BroadcastDispatcher::new(settings.connection_queue_size),
                }),
                timers: TokioTimers::new(sink),
                next_connection: AtomicU64::new(1),
            }
        })
    }

    /// Attach a new socket and queue its initial synchronization:
    /// `connected`, `snapshot`, the last tally when not voting, then the
    /// participant list.
    pub fn connect(&self) -> (ConnectionId, mpsc::Receiver<ServerEvent>) {
        let id = ConnectionId::new(self.next_connection.fetch_add(1, Ordering::Relaxed));
        let mut core = self.core.lock();
        let rx = core.dispatcher.attach(id);
        core.dispatcher
            .send_to(id, ServerEvent::Connected { connection_id: id });
        core.lifecycle.sync_connection(id, &core.dispatcher);
        core.dispatcher.send_to(
            id,
            ServerEvent::ParticipantsChanged {
                names: core.registry.names(),
            },
        );
        info!(connection = %id, "connection opened");
        (id, rx)
    }

    /// Detach a closed socket and drop it from the registry.
    pub fn disconnect(&self, connection: ConnectionId) {
        let mut core = self.core.lock();
        core.dispatcher.detach(connection);
        if let Some(name) = core.registry.remove(connection) {
            info!(connection = %connection, name = %name, "participant left");
            core.broadcast_participants();
        } else {
            debug!(connection = %connection, "connection closed");
        }
    }

    /// Register `connection` under a display name. Returns the new name list.
    pub fn register(&self, connection: ConnectionId, name: &str) -> Result<Vec<String>, SessionError> {
        let mut core = self.core.lock();
        core.ensure_attached(connection)?;
        core.register(connection, name)
    }

    /// Remove the first participant named `name`. Silent no-op when nobody
    /// holds that name.
    pub fn kick(&self, name: &str) -> bool {
        self.core.lock().kick(name)
    }

    pub fn create_poll(&self, draft: PollDraft) -> Result<Poll, PollError> {
        let mut core = self.core.lock();
        let SessionCore {
            lifecycle,
            dispatcher,
            ..
        } = &mut *core;
        lifecycle.create_poll(draft, dispatcher, &self.timers)
    }

    pub fn record_vote(
        &self,
        connection: ConnectionId,
        poll_id: PollId,
        option_index: i64,
    ) -> Result<TallySnapshot, SessionError> {
        let mut core = self.core.lock();
        core.ensure_attached(connection)?;
        Ok(core.record_vote(connection, poll_id, option_index, &self.timers)?)
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.core.lock().lifecycle.history().list().to_vec()
    }

    pub fn participants(&self) -> Vec<String> {
        self.core.lock().registry.names()
    }

    pub fn state(&self) -> LifecycleState {
        self.core.lock().lifecycle.state()
    }

    pub fn current_poll(&self) -> Option<Poll> {
        self.core.lock().lifecycle.current_poll().cloned()
    }

    pub fn tally(&self) -> Option<TallySnapshot> {
        self.core.lock().lifecycle.tally()
    }

    pub fn stats(&self) -> SessionStats {
        let core = self.core.lock();
        SessionStats {
            state: core.lifecycle.state(),
            poll_id: core.lifecycle.current_poll().map(|p| p.id),
            participants: core.registry.len(),
            connections: core.dispatcher.connection_count(),
            polls_completed: core.lifecycle.history().len(),
        }
    }

    /// Parse and execute one inbound text frame, replying on the sender's
    /// outlet.
    pub fn handle_frame(&self, connection: ConnectionId, text: &str) {
        let frame = match ClientFrame::parse(text) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(connection = %connection, "rejected frame: {}", err);
                let core = self.core.lock();
                core.dispatcher.send_to(
                    connection,
                    ServerEvent::err(
                        ClientFrame::salvage_id(text),
                        error_shape("INVALID_REQUEST", err.to_string()),
                    ),
                );
                return;
            }
        };
        self.handle_command(connection, frame);
    }

    pub fn handle_command(&self, connection: ConnectionId, frame: ClientFrame) {
        let ClientFrame { id, command } = frame;
        let method = command.name();
        let mut core = self.core.lock();

        let reply = match core.execute(connection, command, &self.timers) {
            Ok(result) => ServerEvent::ok(id, result),
            Err(err) => {
                debug!(connection = %connection, method, code = err.code(), "command rejected");
                ServerEvent::err(id, err.to_shape())
            }
        };
        core.dispatcher.send_to(connection, reply);
    }
}

impl TimerSink for SessionHub {
    fn fire(&self, fire: TimerFire) {
        let mut core = self.core.lock();
        let SessionCore {
            lifecycle,
            dispatcher,
            ..
        } = &mut *core;
        lifecycle.on_timer(fire, dispatcher, &self.timers);
    }
}

impl SessionCore {
    fn execute(
        &mut self,
        connection: ConnectionId,
        command: ClientCommand,
        timers: &dyn TimerScheduler,
    ) -> Result<Value, SessionError> {
        self.ensure_attached(connection)?;
        match command {
            ClientCommand::Join { name } => {
                let names = self.register(connection, &name)?;
                Ok(json!({ "names": names }))
            }
            ClientCommand::CreatePoll(draft) => {
                let poll = self
                    .lifecycle
                    .create_poll(draft, &self.dispatcher, timers)?;
                Ok(json!({ "poll": poll }))
            }
            ClientCommand::Vote {
                poll_id,
                option_index,
            } => {
                let tally = self.record_vote(connection, poll_id, option_index, timers)?;
                Ok(json!({ "tally": tally }))
            }
            ClientCommand::Kick { name } => Ok(json!({ "kicked": self.kick(&name) })),
            ClientCommand::FetchHistory => Ok(json!({
                "history": self.lifecycle.history().list()
            })),
            ClientCommand::FetchResults { poll_id } => Ok(json!({
                "pollId": poll_id,
                "tally": self.lifecycle.results_for(poll_id),
            })),
        }
    }

    /// Kicked or closed connections may still have frames in flight.
    fn ensure_attached(&self, connection: ConnectionId) -> Result<(), SessionError> {
        if self.dispatcher.is_attached(connection) {
            Ok(())
        } else {
            debug!(connection = %connection, "command from detached connection ignored");
            Err(SessionError::Detached)
        }
    }

    fn register(&mut self, connection: ConnectionId, name: &str) -> Result<Vec<String>, SessionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::InvalidRequest("name is required".to_string()));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(SessionError::InvalidRequest(format!(
                "name cannot exceed {} characters",
                MAX_NAME_LEN
            )));
        }
        self.registry.register(connection, name);
        info!(connection = %connection, name = %name, participants = self.registry.len(), "participant joined");
        self.broadcast_participants();
        Ok(self.registry.names())
    }

    fn kick(&mut self, name: &str) -> bool {
        let Some(target) = self.registry.find_by_name(name) else {
            debug!(name = %name, "kick ignored; no such participant");
            return false;
        };
        self.dispatcher
            .send_to(target, ServerEvent::RemovedFromSession);
        self.dispatcher.detach(target);
        self.registry.remove(target);
        info!(connection = %target, name = %name, "participant removed");
        self.broadcast_participants();
        true
    }

    fn record_vote(
        &mut self,
        connection: ConnectionId,
        poll_id: PollId,
        option_index: i64,
        timers: &dyn TimerScheduler,
    ) -> Result<TallySnapshot, PollError> {
        let participants = self.registry.len();
        self.lifecycle.record_vote(
            poll_id,
            option_index,
            connection,
            participants,
            &self.dispatcher,
            timers,
        )
    }

    fn broadcast_participants(&self) {
        self.dispatcher.broadcast(&ServerEvent::ParticipantsChanged {
            names: self.registry.names(),
        });
    }
}
