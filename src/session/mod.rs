//! Live session
//!
//! Connection registry, broadcast fan-out, wire protocol and the hub that
//! serializes every state change of the session.

pub mod dispatch;
pub mod hub;
pub mod protocol;
pub mod registry;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::polls::PollError;

pub use dispatch::BroadcastDispatcher;
pub use hub::{SessionHub, SessionStats};
pub use protocol::{ClientCommand, ClientFrame, ErrorShape, ServerEvent};
pub use registry::ConnectionRegistry;

/// Identifier of one live socket. Allocated in increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Rejection of an inbound command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Poll(#[from] PollError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The connection was kicked or closed; its frames are no longer honoured
    #[error("connection is no longer part of the session")]
    Detached,
}

impl SessionError {
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::Poll(err) => err.code(),
            SessionError::InvalidRequest(_) | SessionError::Detached => "INVALID_REQUEST",
        }
    }

    pub fn to_shape(&self) -> ErrorShape {
        protocol::error_shape(self.code(), self.to_string())
    }
}
