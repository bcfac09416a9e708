mod job;
mod poll;
mod state;

pub use job::{JobId, WaitError, WaitOutcome, WaitReport};
pub use poll::{
    DEFAULT_MAX_WAIT, DEFAULT_POLL_INTERVAL, JobWaiter, LogProgress, ProgressReporter, StatusCheck,
};
pub use state::{Observation, WaitMachine, WaitState};
