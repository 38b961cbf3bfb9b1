//! Vote Tally
//!
//! Per-poll vote counters plus the set of connections that already voted.
//! The sum of all counts always equals the number of voters.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::config::PollId;
use super::error::PollError;
use crate::session::ConnectionId;

/// Live counters for one poll.
#[derive(Debug, Clone)]
pub struct VoteTally {
    poll_id: PollId,
    counts: Vec<u32>,
    voters: HashSet<ConnectionId>,
    frozen: bool,
}

impl VoteTally {
    /// Zeroed tally for a poll with `option_count` options.
    pub fn new(poll_id: PollId, option_count: usize) -> Self {
        Self {
            poll_id,
            counts: vec![0; option_count],
            voters: HashSet::new(),
            frozen: false,
        }
    }

    pub fn poll_id(&self) -> PollId {
        self.poll_id
    }

    /// Record one vote.
    ///
    /// Only the counters are checked here; whether the poll is still
    /// `Voting` is the lifecycle's concern.
    ///
    /// The index arrives as a signed wire value; anything outside
    /// `0..option_count` is an `InvalidOption`.
    pub fn record(&mut self, option_index: i64, voter: ConnectionId) -> Result<(), PollError> {
        if self.frozen {
            return Err(PollError::NoActivePoll);
        }
        let option_count = self.counts.len();
        let slot = usize::try_from(option_index)
            .ok()
            .filter(|i| *i < option_count)
            .ok_or(PollError::InvalidOption {
                index: option_index,
                option_count,
            })?;
        if !self.voters.insert(voter) {
            return Err(PollError::DuplicateVote);
        }
        self.counts[slot] += 1;
        Ok(())
    }

    /// Stop accepting votes. Counts never change afterwards.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn has_voted(&self, voter: ConnectionId) -> bool {
        self.voters.contains(&voter)
    }

    pub fn voter_count(&self) -> usize {
        self.voters.len()
    }

    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    pub fn snapshot(&self) -> TallySnapshot {
        TallySnapshot {
            poll_id: self.poll_id,
            counts: self.counts.clone(),
            total_votes: self.voters.len() as u32,
        }
    }
}

/// Serializable view of a tally, as broadcast to clients and kept in history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TallySnapshot {
    pub poll_id: PollId,
    /// Votes per option, indexed like the poll's options
    pub counts: Vec<u32>,
    pub total_votes: u32,
}
