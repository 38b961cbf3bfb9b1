//! Poll Lifecycle
//!
//! The state machine `Idle -> Voting -> ShowingResults -> Idle` for the one
//! poll a session can run at a time. It owns the current poll, its tally, the
//! history and both timers.
//!
//! Every transition that a timer or a racing event can trigger is guarded by
//! the poll id and the expected state. Cancelling a timer only saves work; the
//! guard is what makes a second closure a no-op.

use std::time::Duration;

use tracing::{debug, info};

use super::config::{now_millis, LifecycleState, Poll, PollDraft, PollId, PollLimits};
use super::error::PollError;
use super::history::{ClosureReason, HistoryEntry, HistoryStore};
use super::tally::{TallySnapshot, VoteTally};
use super::timer::{TimerFire, TimerHandle, TimerKind, TimerScheduler};
use crate::session::{BroadcastDispatcher, ConnectionId, ServerEvent};

/// How long final results stay on screen before the session goes idle.
pub const DEFAULT_RESULTS_VIEW: Duration = Duration::from_secs(25);

#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    pub limits: PollLimits,
    pub results_view: Duration,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            limits: PollLimits::default(),
            results_view: DEFAULT_RESULTS_VIEW,
        }
    }
}

#[derive(Debug)]
pub struct PollLifecycle {
    settings: LifecycleSettings,
    /// Last created poll; stays readable after the cycle returns to idle
    current: Option<Poll>,
    tally: Option<VoteTally>,
    history: HistoryStore,
    next_poll_id: PollId,
    voting_timer: Option<TimerHandle>,
    results_timer: Option<TimerHandle>,
}

impl PollLifecycle {
    pub fn new(settings: LifecycleSettings) -> Self {
        Self {
            settings,
            current: None,
            tally: None,
            history: HistoryStore::new(),
            next_poll_id: 1,
            voting_timer: None,
            results_timer: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.current
            .as_ref()
            .map(|p| p.state)
            .unwrap_or(LifecycleState::Idle)
    }

    pub fn current_poll(&self) -> Option<&Poll> {
        self.current.as_ref()
    }

    pub fn tally(&self) -> Option<TallySnapshot> {
        self.tally.as_ref().map(VoteTally::snapshot)
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Tally of any poll this session ran: live for the current poll, final
    /// from history otherwise. `None` for an id never allocated.
    pub fn results_for(&self, poll_id: PollId) -> Option<TallySnapshot> {
        if let Some(tally) = self.tally.as_ref().filter(|t| t.poll_id() == poll_id) {
            return Some(tally.snapshot());
        }
        self.history
            .list()
            .iter()
            .find(|entry| entry.poll.id == poll_id)
            .map(|entry| entry.tally.clone())
    }

    /// Start a new poll and broadcast it.
    ///
    /// Rejected while another poll is `Voting`. A results view left over from
    /// the previous cycle is cut short.
    pub fn create_poll(
        &mut self,
        draft: PollDraft,
        out: &BroadcastDispatcher,
        timers: &dyn TimerScheduler,
    ) -> Result<Poll, PollError> {
        if self.state() == LifecycleState::Voting {
            return Err(PollError::PollAlreadyActive);
        }
        let duration_secs = draft.validate(&self.settings.limits)?;

        cancel(&mut self.results_timer);
        cancel(&mut self.voting_timer);

        let id = self.next_poll_id;
        self.next_poll_id += 1;

        let poll = Poll::from_draft(id, draft, duration_secs);
        self.tally = Some(VoteTally::new(id, poll.option_count()));
        self.current = Some(poll.clone());

        self.voting_timer = Some(timers.schedule(
            Duration::from_secs(duration_secs),
            TimerFire {
                kind: TimerKind::VotingDeadline,
                poll_id: id,
            },
        ));

        info!(poll_id = id, options = poll.option_count(), duration_secs, "poll started");
        out.broadcast(&ServerEvent::PollStarted { poll: poll.clone() });
        Ok(poll)
    }

    /// Record a vote from `voter` and broadcast the new tally.
    ///
    /// `participants` is the registry size at this moment; once the number
    /// of voters reaches it, voting closes early.
    pub fn record_vote(
        &mut self,
        poll_id: PollId,
        option_index: i64,
        voter: ConnectionId,
        participants: usize,
        out: &BroadcastDispatcher,
        timers: &dyn TimerScheduler,
    ) -> Result<TallySnapshot, PollError> {
        if !self.is_voting_on(poll_id) {
            return Err(PollError::NoActivePoll);
        }
        let tally = self.tally.as_mut().ok_or(PollError::NoActivePoll)?;
        tally.record(option_index, voter)?;

        let snapshot = tally.snapshot();
        let voters = tally.voter_count();
        debug!(poll_id, option_index, voter = %voter, voters, participants, "vote recorded");
        out.broadcast(&ServerEvent::TallyUpdated {
            tally: snapshot.clone(),
        });

        if voters >= participants {
            self.close_voting(poll_id, ClosureReason::AllVoted, out, timers);
        }
        Ok(snapshot)
    }

    /// Move `poll_id` from `Voting` to `ShowingResults`.
    ///
    /// Returns `false` without side effects when the poll already left
    /// `Voting` or was superseded.
    pub fn close_voting(
        &mut self,
        poll_id: PollId,
        reason: ClosureReason,
        out: &BroadcastDispatcher,
        timers: &dyn TimerScheduler,
    ) -> bool {
        if !self.is_voting_on(poll_id) {
            debug!(poll_id, ?reason, "close ignored; poll is not voting");
            return false;
        }
        cancel(&mut self.voting_timer);

        let (Some(poll), Some(tally)) = (self.current.as_mut(), self.tally.as_mut()) else {
            return false;
        };
        poll.state = LifecycleState::ShowingResults;
        tally.freeze();
        let snapshot = tally.snapshot();

        info!(poll_id, ?reason, total_votes = snapshot.total_votes, "voting closed");
        out.broadcast(&ServerEvent::VotingClosed {
            poll_id,
            tally: snapshot.clone(),
            reason,
        });

        self.history.append(HistoryEntry {
            poll: poll.clone(),
            tally: snapshot,
            closed_at: now_millis(),
            reason,
        });

        self.results_timer = Some(timers.schedule(
            self.settings.results_view,
            TimerFire {
                kind: TimerKind::ResultsView,
                poll_id,
            },
        ));
        true
    }

    /// End the results view of `poll_id` and tell everyone the poll is cleared.
    pub fn clear_results(&mut self, poll_id: PollId, out: &BroadcastDispatcher) -> bool {
        let Some(poll) = self.current.as_mut() else {
            return false;
        };
        if poll.id != poll_id || poll.state != LifecycleState::ShowingResults {
            debug!(poll_id, "clear ignored; results not showing");
            return false;
        }
        cancel(&mut self.results_timer);
        poll.state = LifecycleState::Idle;

        info!(poll_id, "poll cleared");
        out.broadcast(&ServerEvent::PollCleared { poll_id });
        true
    }

    /// Route a timer expiry to its transition.
    pub fn on_timer(
        &mut self,
        fire: TimerFire,
        out: &BroadcastDispatcher,
        timers: &dyn TimerScheduler,
    ) -> bool {
        match fire.kind {
            TimerKind::VotingDeadline => {
                self.close_voting(fire.poll_id, ClosureReason::Timer, out, timers)
            }
            TimerKind::ResultsView => self.clear_results(fire.poll_id, out),
        }
    }

    /// Bring a newly attached connection up to date: the current poll (or the
    /// none-yet signal), then the last tally unless votes are still open.
    pub fn sync_connection(&self, connection: ConnectionId, out: &BroadcastDispatcher) {
        let state = self.state();
        out.send_to(
            connection,
            ServerEvent::Snapshot {
                state,
                poll: self.current.clone(),
            },
        );
        if state != LifecycleState::Voting {
            if let Some(tally) = self.tally() {
                out.send_to(connection, ServerEvent::TallyUpdated { tally });
            }
        }
    }

    fn is_voting_on(&self, poll_id: PollId) -> bool {
        matches!(&self.current, Some(p) if p.id == poll_id && p.state == LifecycleState::Voting)
    }
}

fn cancel(timer: &mut Option<TimerHandle>) {
    if let Some(handle) = timer.take() {
        handle.cancel();
    }
}
