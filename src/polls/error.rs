//! Poll domain errors.

use thiserror::Error;

/// Rejection of a single poll command.
///
/// Every variant is recoverable and reported back to the issuing connection;
/// none of them alter session state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    #[error("a poll is already active")]
    PollAlreadyActive,

    #[error("no active poll with this id")]
    NoActivePoll,

    #[error("option index {index} is out of range (poll has {option_count} options)")]
    InvalidOption { index: i64, option_count: usize },

    #[error("this connection has already voted on the poll")]
    DuplicateVote,

    #[error("invalid poll: {0}")]
    InvalidPoll(String),
}

impl PollError {
    /// Stable wire code for the error.
    pub fn code(&self) -> &'static str {
        match self {
            PollError::PollAlreadyActive => "POLL_ALREADY_ACTIVE",
            PollError::NoActivePoll => "NO_ACTIVE_POLL",
            PollError::InvalidOption { .. } => "INVALID_OPTION",
            PollError::DuplicateVote => "DUPLICATE_VOTE",
            PollError::InvalidPoll(_) => "INVALID_POLL",
        }
    }
}
