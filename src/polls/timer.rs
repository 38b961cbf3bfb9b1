//! Lifecycle timers.
//!
//! Timers are armed by the lifecycle and fire back into the session through a
//! [`TimerSink`]. Cancelling a timer that already fired is a no-op, and a late
//! firing is filtered by the lifecycle's poll id + state guard.

use std::sync::Weak;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::config::PollId;

/// Which transition a timer drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Voting window elapsed
    VotingDeadline,
    /// Results view elapsed
    ResultsView,
}

/// A timer expiry, tagged with the poll it was armed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFire {
    pub kind: TimerKind,
    pub poll_id: PollId,
}

/// Handle to an armed timer. Dropping it does not cancel.
#[derive(Debug, Clone, Default)]
pub struct TimerHandle {
    token: CancellationToken,
}

impl TimerHandle {
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Arms timers on behalf of the lifecycle.
pub trait TimerScheduler: Send + Sync {
    fn schedule(&self, delay: Duration, fire: TimerFire) -> TimerHandle;
}

/// Receives timer expiries.
pub trait TimerSink: Send + Sync {
    fn fire(&self, fire: TimerFire);
}

/// Scheduler backed by `tokio::time::sleep`, one task per timer.
///
/// Must be used from inside a tokio runtime.
pub struct TokioTimers {
    sink: Weak<dyn TimerSink>,
}

impl TokioTimers {
    pub fn new(sink: Weak<dyn TimerSink>) -> Self {
        Self { sink }
    }
}

impl TimerScheduler for TokioTimers {
    fn schedule(&self, delay: Duration, fire: TimerFire) -> TimerHandle {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let sink = self.sink.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {
                    debug!(poll_id = fire.poll_id, kind = ?fire.kind, "timer cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    if let Some(sink) = sink.upgrade() {
                        sink.fire(fire);
                    }
                }
            }
        });

        TimerHandle::new(token)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex;

    /// Records armed timers instead of running them.
    #[derive(Default)]
    pub struct ManualTimers {
        armed: Mutex<Vec<(Duration, TimerFire, TimerHandle)>>,
    }

    impl ManualTimers {
        /// Timers armed so far that have not been cancelled.
        pub fn pending(&self) -> Vec<(Duration, TimerFire)> {
            self.armed
                .lock()
                .iter()
                .filter(|(_, _, h)| !h.is_cancelled())
                .map(|(d, f, _)| (*d, *f))
                .collect()
        }
    }

    impl TimerScheduler for ManualTimers {
        fn schedule(&self, delay: Duration, fire: TimerFire) -> TimerHandle {
            let handle = TimerHandle::default();
            self.armed.lock().push((delay, fire, handle.clone()));
            handle
        }
    }
}
