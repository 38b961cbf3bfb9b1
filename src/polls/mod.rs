//! Polling Module
//!
//! One live poll at a time: the lifecycle state machine, its vote tally,
//! timers and the history of concluded polls.

pub mod config;
pub mod error;
pub mod history;
pub mod lifecycle;
pub mod tally;
pub mod timer;

pub use config::{LifecycleState, Poll, PollDraft, PollId, PollLimits, PollOption};
pub use error::PollError;
pub use history::{ClosureReason, HistoryEntry, HistoryStore};
pub use lifecycle::{LifecycleSettings, PollLifecycle, DEFAULT_RESULTS_VIEW};
pub use tally::{TallySnapshot, VoteTally};
