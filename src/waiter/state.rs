use std::fmt;

use serde::{Deserialize, Serialize};

use super::job::WaitOutcome;
use crate::firecrawl::{JobState, JobStatus};

/// States of a single wait.
///
/// A wait flows NOT_STARTED → POLLING → one of the terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaitState {
    NotStarted,
    Polling,
    Completed,
    Failed,
    TimedOut,
    Cancelled,
    /// The very first status check failed.
    Unavailable,
    /// A status check failed after at least one succeeded.
    Interrupted,
}

impl WaitState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, WaitState::NotStarted | WaitState::Polling)
    }
}

impl fmt::Display for WaitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitState::NotStarted => write!(f, "NOT_STARTED"),
            WaitState::Polling => write!(f, "POLLING"),
            WaitState::Completed => write!(f, "COMPLETED"),
            WaitState::Failed => write!(f, "FAILED"),
            WaitState::TimedOut => write!(f, "TIMED_OUT"),
            WaitState::Cancelled => write!(f, "CANCELLED"),
            WaitState::Unavailable => write!(f, "UNAVAILABLE"),
            WaitState::Interrupted => write!(f, "INTERRUPTED"),
        }
    }
}

/// What one step of the poll loop learned.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// A regular status check answered.
    Status(JobStatus),
    /// The check made after the wait budget ran out answered.
    FinalStatus(JobStatus),
    /// The status check itself failed.
    Unavailable(String),
    /// Cancellation was requested between polls.
    Cancelled,
}

/// Drives one wait through [`WaitState`]s and remembers the last good status.
#[derive(Debug, Clone)]
pub struct WaitMachine {
    state: WaitState,
    history: Vec<WaitState>,
    checks: u32,
    last: Option<JobStatus>,
    error: Option<String>,
}

impl Default for WaitMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitMachine {
    pub fn new() -> Self {
        Self {
            state: WaitState::NotStarted,
            history: Vec::new(),
            checks: 0,
            last: None,
            error: None,
        }
    }

    pub fn state(&self) -> WaitState {
        self.state
    }

    /// States left so far, oldest first. The current state is not included.
    pub fn history(&self) -> &[WaitState] {
        &self.history
    }

    /// Number of status checks issued, failed ones included.
    pub fn checks(&self) -> u32 {
        self.checks
    }

    pub fn last_status(&self) -> Option<&JobStatus> {
        self.last.as_ref()
    }

    /// Why the wait ended without a status, if it did.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Apply an observation and return the resulting state.
    ///
    /// - `completed` / `failed` end the wait whatever the observation kind.
    /// - Any other state keeps polling, or times out on the final check.
    /// - A failed check ends in `Unavailable` if nothing was seen yet,
    ///   otherwise in `Interrupted` with the last good status kept.
    /// - Terminal states ignore further observations.
    pub fn observe(&mut self, observation: Observation) -> WaitState {
        if self.state.is_terminal() {
            return self.state;
        }

        let next = match observation {
            Observation::Status(status) => self.record(status, WaitState::Polling),
            Observation::FinalStatus(status) => self.record(status, WaitState::TimedOut),
            Observation::Unavailable(reason) => {
                self.checks += 1;
                self.error = Some(reason);
                if self.last.is_some() {
                    WaitState::Interrupted
                } else {
                    WaitState::Unavailable
                }
            }
            Observation::Cancelled if self.last.is_some() => WaitState::Cancelled,
            Observation::Cancelled => {
                self.error = Some("cancelled before any status was observed".to_string());
                WaitState::Unavailable
            }
        };

        if next != self.state {
            self.history.push(self.state);
            self.state = next;
        }
        next
    }

    fn record(&mut self, status: JobStatus, non_terminal: WaitState) -> WaitState {
        self.checks += 1;
        let next = match status.state {
            JobState::Completed => WaitState::Completed,
            JobState::Failed => WaitState::Failed,
            _ => non_terminal,
        };
        self.last = Some(status);
        next
    }

    /// Consume the machine into the value handed back to the caller.
    pub fn into_outcome(self) -> WaitOutcome {
        let reason = self
            .error
            .unwrap_or_else(|| "no status was observed".to_string());
        match (self.state, self.last) {
            (WaitState::Completed, Some(status)) => WaitOutcome::Completed(status),
            (WaitState::Failed, Some(status)) => WaitOutcome::Failed(status),
            (WaitState::TimedOut, Some(status)) => WaitOutcome::TimedOut(status),
            (WaitState::Cancelled, Some(status)) => WaitOutcome::Cancelled(status),
            (WaitState::Interrupted, Some(last)) => WaitOutcome::Interrupted { last, reason },
            _ => WaitOutcome::Unavailable { reason },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(completed: u64, total: u64) -> JobStatus {
        JobStatus::new(JobState::Pending, completed, total)
    }

    #[test]
    fn happy_path_walks_states() {
        let mut machine = WaitMachine::new();
        assert_eq!(machine.state(), WaitState::NotStarted);

        assert_eq!(
            machine.observe(Observation::Status(pending(0, 10))),
            WaitState::Polling
        );
        assert_eq!(
            machine.observe(Observation::Status(pending(3, 10))),
            WaitState::Polling
        );
        assert_eq!(
            machine.observe(Observation::Status(JobStatus::new(JobState::Completed, 10, 10))),
            WaitState::Completed
        );
        assert_eq!(machine.checks(), 3);
        assert_eq!(
            machine.history(),
            &[WaitState::NotStarted, WaitState::Polling]
        );
        assert!(matches!(machine.into_outcome(), WaitOutcome::Completed(s) if s.completed == 10));
    }

    #[test]
    fn terminal_state_ignores_further_observations() {
        let mut machine = WaitMachine::new();
        machine.observe(Observation::Status(JobStatus::new(JobState::Failed, 1, 4)));
        assert_eq!(
            machine.observe(Observation::Status(pending(2, 4))),
            WaitState::Failed
        );
        assert_eq!(machine.observe(Observation::Cancelled), WaitState::Failed);
        assert_eq!(machine.checks(), 1);
        assert!(matches!(machine.into_outcome(), WaitOutcome::Failed(s) if s.completed == 1));
    }

    #[test]
    fn first_failure_is_unavailable() {
        let mut machine = WaitMachine::new();
        let state = machine.observe(Observation::Unavailable("connection refused".into()));
        assert_eq!(state, WaitState::Unavailable);
        match machine.into_outcome() {
            WaitOutcome::Unavailable { reason } => assert_eq!(reason, "connection refused"),
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }

    #[test]
    fn later_failure_keeps_last_status() {
        let mut machine = WaitMachine::new();
        machine.observe(Observation::Status(pending(5, 10)));
        let state = machine.observe(Observation::Unavailable("502".into()));
        assert_eq!(state, WaitState::Interrupted);
        match machine.into_outcome() {
            WaitOutcome::Interrupted { last, reason } => {
                assert_eq!(last.completed, 5);
                assert_eq!(reason, "502");
            }
            other => panic!("expected Interrupted, got {other:?}"),
        }
    }

    #[test]
    fn final_check_times_out_unless_terminal() {
        let mut machine = WaitMachine::new();
        machine.observe(Observation::Status(pending(1, 10)));
        assert_eq!(
            machine.observe(Observation::FinalStatus(pending(2, 10))),
            WaitState::TimedOut
        );
        assert!(matches!(machine.into_outcome(), WaitOutcome::TimedOut(s) if s.completed == 2));

        let mut machine = WaitMachine::new();
        machine.observe(Observation::Status(pending(1, 10)));
        assert_eq!(
            machine.observe(Observation::FinalStatus(JobStatus::new(JobState::Completed, 10, 10))),
            WaitState::Completed
        );
    }

    #[test]
    fn cancellation_keeps_last_status() {
        let mut machine = WaitMachine::new();
        machine.observe(Observation::Status(pending(3, 10)));
        assert_eq!(machine.observe(Observation::Cancelled), WaitState::Cancelled);
        assert_eq!(machine.checks(), 1);
        assert!(matches!(machine.into_outcome(), WaitOutcome::Cancelled(s) if s.completed == 3));
    }

    #[test]
    fn cancellation_before_any_status_is_unavailable() {
        let mut machine = WaitMachine::new();
        assert_eq!(machine.observe(Observation::Cancelled), WaitState::Unavailable);
        assert!(matches!(machine.into_outcome(), WaitOutcome::Unavailable { .. }));
    }

    #[test]
    fn state_display() {
        assert_eq!(WaitState::NotStarted.to_string(), "NOT_STARTED");
        assert_eq!(WaitState::Polling.to_string(), "POLLING");
        assert_eq!(WaitState::TimedOut.to_string(), "TIMED_OUT");
        assert_eq!(WaitState::Interrupted.to_string(), "INTERRUPTED");
    }

    #[test]
    fn terminal_classification() {
        assert!(!WaitState::NotStarted.is_terminal());
        assert!(!WaitState::Polling.is_terminal());
        for state in [
            WaitState::Completed,
            WaitState::Failed,
            WaitState::TimedOut,
            WaitState::Cancelled,
            WaitState::Unavailable,
            WaitState::Interrupted,
        ] {
            assert!(state.is_terminal(), "{state} should be terminal");
        }
    }
}
