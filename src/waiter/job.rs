use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::state::{WaitMachine, WaitState};
use crate::firecrawl::JobStatus;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WaitError {
    #[error("job id must not be empty")]
    EmptyJobId,

    #[error("poll interval must be greater than zero")]
    ZeroPollInterval,

    #[error("maximum wait must be greater than zero")]
    ZeroMaxWait,
}

/// Identifier the API hands out when a batch or crawl job is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Result<Self, WaitError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(WaitError::EmptyJobId);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for JobId {
    type Error = WaitError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<JobId> for String {
    fn from(id: JobId) -> Self {
        id.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a wait ended. None of these are errors: a failed job, a slow job and
/// an unreachable status endpoint are all ordinary results for the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum WaitOutcome {
    Completed(JobStatus),
    Failed(JobStatus),
    /// The wait budget ran out; carries the status from the final check.
    TimedOut(JobStatus),
    /// The caller cancelled; carries the last status seen before that.
    Cancelled(JobStatus),
    /// A status check failed mid-wait; carries the last good status.
    Interrupted { last: JobStatus, reason: String },
    /// The first status check failed, so nothing is known about the job.
    Unavailable { reason: String },
}

impl WaitOutcome {
    pub fn state(&self) -> WaitState {
        match self {
            WaitOutcome::Completed(_) => WaitState::Completed,
            WaitOutcome::Failed(_) => WaitState::Failed,
            WaitOutcome::TimedOut(_) => WaitState::TimedOut,
            WaitOutcome::Cancelled(_) => WaitState::Cancelled,
            WaitOutcome::Interrupted { .. } => WaitState::Interrupted,
            WaitOutcome::Unavailable { .. } => WaitState::Unavailable,
        }
    }

    /// The status carried by the outcome, if any was observed.
    pub fn status(&self) -> Option<&JobStatus> {
        match self {
            WaitOutcome::Completed(s)
            | WaitOutcome::Failed(s)
            | WaitOutcome::TimedOut(s)
            | WaitOutcome::Cancelled(s)
            | WaitOutcome::Interrupted { last: s, .. } => Some(s),
            WaitOutcome::Unavailable { .. } => None,
        }
    }

    pub fn into_status(self) -> Option<JobStatus> {
        match self {
            WaitOutcome::Completed(s)
            | WaitOutcome::Failed(s)
            | WaitOutcome::TimedOut(s)
            | WaitOutcome::Cancelled(s)
            | WaitOutcome::Interrupted { last: s, .. } => Some(s),
            WaitOutcome::Unavailable { .. } => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, WaitOutcome::Completed(_))
    }
}

/// Structured record of a finished wait, handed to progress reporters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitReport {
    pub job_id: JobId,
    pub state: WaitState,
    pub state_transitions: Vec<WaitState>,
    pub checks: u32,
    pub completed: u64,
    pub total: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl WaitReport {
    pub fn from_machine(job_id: &JobId, machine: &WaitMachine, started_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        let mut transitions = machine.history().to_vec();
        transitions.push(machine.state());
        let (completed, total) = machine
            .last_status()
            .map(|s| (s.completed, s.total))
            .unwrap_or((0, 0));

        Self {
            job_id: job_id.clone(),
            state: machine.state(),
            state_transitions: transitions,
            checks: machine.checks(),
            completed,
            total,
            error: machine.error().map(str::to_string),
            started_at,
            finished_at: now,
            duration_ms: (now - started_at).num_milliseconds(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firecrawl::JobState;
    use crate::waiter::state::Observation;

    #[test]
    fn job_id_rejects_blank() {
        assert_eq!(JobId::new(""), Err(WaitError::EmptyJobId));
        assert_eq!(JobId::new("  "), Err(WaitError::EmptyJobId));
        assert_eq!(JobId::new("abc").unwrap().as_str(), "abc");
    }

    #[test]
    fn job_id_serializes_as_string() {
        let id = JobId::new("job-123").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""job-123""#);
        let parsed: JobId = serde_json::from_str(r#""job-123""#).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn outcome_status_accessors() {
        let status = JobStatus::new(JobState::Pending, 3, 10);
        let outcome = WaitOutcome::Interrupted {
            last: status.clone(),
            reason: "boom".into(),
        };
        assert_eq!(outcome.state(), WaitState::Interrupted);
        assert_eq!(outcome.status(), Some(&status));
        assert!(!outcome.is_completed());

        let outcome = WaitOutcome::Unavailable {
            reason: "down".into(),
        };
        assert_eq!(outcome.status(), None);
        assert_eq!(outcome.into_status(), None);
    }

    #[test]
    fn report_from_machine() {
        let id = JobId::new("job-1").unwrap();
        let started = Utc::now();
        let mut machine = WaitMachine::new();
        machine.observe(Observation::Status(JobStatus::new(JobState::Pending, 0, 4)));
        machine.observe(Observation::Status(JobStatus::new(JobState::Completed, 4, 4)));

        let report = WaitReport::from_machine(&id, &machine, started);
        assert_eq!(report.job_id, id);
        assert_eq!(report.state, WaitState::Completed);
        assert_eq!(
            report.state_transitions,
            vec![WaitState::NotStarted, WaitState::Polling, WaitState::Completed]
        );
        assert_eq!(report.checks, 2);
        assert_eq!((report.completed, report.total), (4, 4));
        assert!(report.error.is_none());
        assert!(report.duration_ms >= 0);
    }

    #[test]
    fn report_serializes_without_empty_error() {
        let id = JobId::new("job-2").unwrap();
        let machine = WaitMachine::new();
        let report = WaitReport::from_machine(&id, &machine, Utc::now());
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains(r#""state":"NotStarted""#));
        assert!(!json.contains("error"));
    }
}
