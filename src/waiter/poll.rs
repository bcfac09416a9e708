//! Polling loop that waits for an asynchronous job to reach a terminal state.
//!
//! [`JobWaiter`] checks the job once, and while the job is still running it
//! reports progress, sleeps for the poll interval and checks again. When the
//! wait budget is exhausted it checks one final time and returns that status.
//! A failed status check is never retried.

use std::time::Duration;

use chrono::Utc;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::job::{JobId, WaitError, WaitOutcome, WaitReport};
use super::state::{Observation, WaitMachine, WaitState};
use crate::firecrawl::{FirecrawlError, JobStatus};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(3600);

/// Source of job status snapshots. Any `Err` means the status is unavailable.
#[allow(async_fn_in_trait)]
pub trait StatusCheck {
    async fn check_status(&self, job_id: &JobId) -> Result<JobStatus, FirecrawlError>;
}

/// Side channel for progress while a wait is running.
pub trait ProgressReporter {
    /// Called once after every non-terminal status check.
    fn progress(&self, job_id: &JobId, completed: u64, total: u64);

    /// Called once when the wait ends, whatever the outcome.
    fn finished(&self, _report: &WaitReport) {}
}

/// Reports progress as `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn progress(&self, job_id: &JobId, completed: u64, total: u64) {
        info!(%job_id, completed, total, "Job {job_id}: {completed}/{total} completed");
    }

    fn finished(&self, report: &WaitReport) {
        let job_id = &report.job_id;
        match report.state {
            WaitState::Completed => info!(%job_id, checks = report.checks, "Job {job_id} completed"),
            WaitState::Failed => warn!(%job_id, "Job {job_id} failed"),
            WaitState::TimedOut => warn!(
                %job_id,
                duration_ms = report.duration_ms,
                "Job {job_id} timed out at {}/{}", report.completed, report.total
            ),
            WaitState::Cancelled => info!(%job_id, "Wait for job {job_id} cancelled"),
            state => warn!(
                %job_id,
                %state,
                error = report.error.as_deref().unwrap_or(""),
                "Status of job {job_id} unavailable"
            ),
        }
    }
}

/// Fixed-interval waiter for batch and crawl jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobWaiter {
    poll_interval: Duration,
    max_wait: Duration,
}

impl Default for JobWaiter {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_wait: DEFAULT_MAX_WAIT,
        }
    }
}

impl JobWaiter {
    pub fn new(poll_interval: Duration, max_wait: Duration) -> Result<Self, WaitError> {
        if poll_interval.is_zero() {
            return Err(WaitError::ZeroPollInterval);
        }
        if max_wait.is_zero() {
            return Err(WaitError::ZeroMaxWait);
        }
        Ok(Self {
            poll_interval,
            max_wait,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    pub async fn wait(
        &self,
        job_id: &JobId,
        checker: &impl StatusCheck,
        progress: &impl ProgressReporter,
    ) -> WaitOutcome {
        self.wait_with_cancel(job_id, checker, progress, &CancellationToken::new())
            .await
    }

    /// Like [`wait`](Self::wait), but gives up early once `cancel` fires.
    ///
    /// The token is looked at between the sleep and the next check; a pending
    /// sleep is cut short when it fires.
    pub async fn wait_with_cancel(
        &self,
        job_id: &JobId,
        checker: &impl StatusCheck,
        progress: &impl ProgressReporter,
        cancel: &CancellationToken,
    ) -> WaitOutcome {
        let started = Instant::now();
        let started_at = Utc::now();
        let mut machine = WaitMachine::new();
        debug!(
            %job_id,
            poll_interval_secs = self.poll_interval.as_secs_f64(),
            max_wait_secs = self.max_wait.as_secs_f64(),
            "waiting for job"
        );

        loop {
            let state = machine.observe(check(checker, job_id, false).await);
            if state.is_terminal() {
                break;
            }

            if let Some(status) = machine.last_status() {
                progress.progress(job_id, status.completed, status.total);
            }

            tokio::select! {
                _ = sleep(self.poll_interval) => {}
                _ = cancel.cancelled() => {}
            }

            if cancel.is_cancelled() {
                machine.observe(Observation::Cancelled);
                break;
            }

            if started.elapsed() >= self.max_wait {
                debug!(%job_id, "wait budget exhausted, final status check");
                machine.observe(check(checker, job_id, true).await);
                break;
            }
        }

        let report = WaitReport::from_machine(job_id, &machine, started_at);
        progress.finished(&report);
        machine.into_outcome()
    }
}

async fn check(checker: &impl StatusCheck, job_id: &JobId, final_check: bool) -> Observation {
    match checker.check_status(job_id).await {
        Ok(status) => {
            debug!(
                %job_id,
                state = %status.state,
                completed = status.completed,
                total = status.total,
                "status check"
            );
            if final_check {
                Observation::FinalStatus(status)
            } else {
                Observation::Status(status)
            }
        }
        Err(e) => {
            warn!(%job_id, error = %e, "status check failed");
            Observation::Unavailable(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firecrawl::JobState;
    use serde_json::json;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;

    /// Replays a scripted sequence of answers; repeats the last one when exhausted.
    struct ScriptedCheck {
        answers: RefCell<VecDeque<Result<JobStatus, u16>>>,
        last: RefCell<Option<Result<JobStatus, u16>>>,
        calls: Cell<u32>,
        call_times: RefCell<Vec<Duration>>,
        started: Instant,
        cancel_on_call: Option<(u32, CancellationToken)>,
    }

    impl ScriptedCheck {
        fn new(answers: Vec<Result<JobStatus, u16>>) -> Self {
            Self {
                answers: RefCell::new(answers.into()),
                last: RefCell::new(None),
                calls: Cell::new(0),
                call_times: RefCell::new(Vec::new()),
                started: Instant::now(),
                cancel_on_call: None,
            }
        }

        fn cancelling_on(mut self, call: u32, token: CancellationToken) -> Self {
            self.cancel_on_call = Some((call, token));
            self
        }

        fn calls(&self) -> u32 {
            self.calls.get()
        }
    }

    impl StatusCheck for ScriptedCheck {
        async fn check_status(&self, _job_id: &JobId) -> Result<JobStatus, FirecrawlError> {
            let call = self.calls.get() + 1;
            self.calls.set(call);
            self.call_times.borrow_mut().push(self.started.elapsed());

            if let Some((n, token)) = &self.cancel_on_call
                && *n == call
            {
                token.cancel();
            }

            let answer = match self.answers.borrow_mut().pop_front() {
                Some(answer) => {
                    *self.last.borrow_mut() = Some(answer.clone());
                    answer
                }
                None => self
                    .last
                    .borrow()
                    .clone()
                    .expect("script must have at least one answer"),
            };
            answer.map_err(|status| FirecrawlError::ApiError {
                status,
                message: "scripted failure".into(),
            })
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        events: RefCell<Vec<(u64, u64)>>,
        reports: RefCell<Vec<WaitReport>>,
    }

    impl ProgressReporter for RecordingProgress {
        fn progress(&self, _job_id: &JobId, completed: u64, total: u64) {
            assert!(
                self.reports.borrow().is_empty(),
                "progress reported after the wait finished"
            );
            self.events.borrow_mut().push((completed, total));
        }

        fn finished(&self, report: &WaitReport) {
            self.reports.borrow_mut().push(report.clone());
        }
    }

    fn pending(completed: u64, total: u64) -> Result<JobStatus, u16> {
        Ok(JobStatus::new(JobState::Pending, completed, total))
    }

    fn completed(done: u64) -> Result<JobStatus, u16> {
        Ok(JobStatus::new(JobState::Completed, done, done))
    }

    fn job() -> JobId {
        JobId::new("batch-123").unwrap()
    }

    fn waiter(poll_secs: u64, max_secs: u64) -> JobWaiter {
        JobWaiter::new(Duration::from_secs(poll_secs), Duration::from_secs(max_secs)).unwrap()
    }

    #[test]
    fn zero_durations_are_rejected() {
        assert_eq!(
            JobWaiter::new(Duration::ZERO, Duration::from_secs(1)),
            Err(WaitError::ZeroPollInterval)
        );
        assert_eq!(
            JobWaiter::new(Duration::from_secs(1), Duration::ZERO),
            Err(WaitError::ZeroMaxWait)
        );
    }

    #[test]
    fn default_intervals() {
        let waiter = JobWaiter::default();
        assert_eq!(waiter.poll_interval(), Duration::from_secs(30));
        assert_eq!(waiter.max_wait(), Duration::from_secs(3600));
    }

    #[tokio::test(start_paused = true)]
    async fn scenario_pending_pending_completed() {
        let checker = ScriptedCheck::new(vec![
            pending(0, 10),
            pending(3, 10),
            Ok(JobStatus::new(JobState::Completed, 10, 10).with_data(json!("X"))),
        ]);
        let progress = RecordingProgress::default();

        let outcome = waiter(1, 5).wait(&job(), &checker, &progress).await;

        match outcome {
            WaitOutcome::Completed(status) => assert_eq!(status.data, Some(json!("X"))),
            other => panic!("expected Completed, got {other:?}"),
        }
        assert_eq!(checker.calls(), 3);
        assert_eq!(
            *checker.call_times.borrow(),
            vec![
                Duration::ZERO,
                Duration::from_secs(1),
                Duration::from_secs(2)
            ]
        );
        assert_eq!(*progress.events.borrow(), vec![(0, 10), (3, 10)]);
        let reports = progress.reports.borrow();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].state, WaitState::Completed);
        assert_eq!(reports[0].checks, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn completes_on_nth_call_within_budget() {
        for n in 1..=5u64 {
            let mut script: Vec<_> = (0..n - 1).map(|i| pending(i, n)).collect();
            script.push(completed(n));
            let checker = ScriptedCheck::new(script);
            let progress = RecordingProgress::default();

            let outcome = waiter(1, 5).wait(&job(), &checker, &progress).await;

            assert!(outcome.is_completed(), "n = {n}: {outcome:?}");
            assert_eq!(checker.calls() as u64, n);
            assert_eq!(progress.events.borrow().len() as u64, n - 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn default_cadence_completes_on_fourth_call() {
        let checker = ScriptedCheck::new(vec![
            pending(0, 4),
            pending(1, 4),
            pending(2, 4),
            completed(4),
        ]);
        let outcome = JobWaiter::default()
            .wait(&job(), &checker, &RecordingProgress::default())
            .await;
        assert!(outcome.is_completed());
        assert_eq!(checker.calls(), 4);
        assert_eq!(checker.call_times.borrow()[3], Duration::from_secs(90));
    }

    #[tokio::test(start_paused = true)]
    async fn budget_shorter_than_interval_checks_twice_and_times_out() {
        let checker = ScriptedCheck::new(vec![pending(1, 10), pending(2, 10)]);
        let progress = RecordingProgress::default();

        let outcome = waiter(10, 5).wait(&job(), &checker, &progress).await;

        match outcome {
            WaitOutcome::TimedOut(status) => assert_eq!(status.completed, 2),
            other => panic!("expected TimedOut, got {other:?}"),
        }
        assert_eq!(checker.calls(), 2);
        // The final check after the deadline does not report progress.
        assert_eq!(*progress.events.borrow(), vec![(1, 10)]);
        assert_eq!(progress.reports.borrow()[0].state, WaitState::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn always_pending_times_out_after_budget() {
        let checker = ScriptedCheck::new(vec![pending(0, 10)]);
        let progress = RecordingProgress::default();

        let outcome = waiter(30, 100).wait(&job(), &checker, &progress).await;

        assert!(matches!(outcome, WaitOutcome::TimedOut(_)));
        // Checks at 0, 30, 60, 90; deadline reached after the sleep to 120; final check.
        assert_eq!(checker.calls(), 5);
        assert_eq!(progress.events.borrow().len(), 4);
        assert_eq!(
            checker.call_times.borrow().last().copied(),
            Some(Duration::from_secs(120))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn final_check_may_still_complete() {
        let checker = ScriptedCheck::new(vec![pending(9, 10), completed(10)]);
        let outcome = waiter(10, 5)
            .wait(&job(), &checker, &RecordingProgress::default())
            .await;
        assert!(outcome.is_completed());
        assert_eq!(checker.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn first_check_unavailable_is_not_retried() {
        let checker = ScriptedCheck::new(vec![Err(503)]);
        let progress = RecordingProgress::default();

        let outcome = waiter(1, 5).wait(&job(), &checker, &progress).await;

        match outcome {
            WaitOutcome::Unavailable { reason } => assert!(reason.contains("503")),
            other => panic!("expected Unavailable, got {other:?}"),
        }
        assert_eq!(checker.calls(), 1);
        assert!(progress.events.borrow().is_empty());
        assert_eq!(progress.reports.borrow()[0].state, WaitState::Unavailable);
    }

    #[tokio::test(start_paused = true)]
    async fn mid_poll_unavailable_returns_last_good_status() {
        let checker = ScriptedCheck::new(vec![pending(0, 10), pending(4, 10), Err(500), pending(9, 10)]);
        let progress = RecordingProgress::default();

        let outcome = waiter(1, 60).wait(&job(), &checker, &progress).await;

        match outcome {
            WaitOutcome::Interrupted { last, reason } => {
                assert_eq!(last.completed, 4);
                assert!(reason.contains("500"));
            }
            other => panic!("expected Interrupted, got {other:?}"),
        }
        assert_eq!(checker.calls(), 3);
        assert_eq!(progress.events.borrow().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_job_stops_polling() {
        let checker = ScriptedCheck::new(vec![
            pending(0, 3),
            Ok(JobStatus::new(JobState::Failed, 1, 3)),
            completed(3),
        ]);
        let progress = RecordingProgress::default();

        let outcome = waiter(1, 60).wait(&job(), &checker, &progress).await;

        match outcome {
            WaitOutcome::Failed(status) => assert_eq!(status.completed, 1),
            other => panic!("expected Failed, got {other:?}"),
        }
        assert_eq!(checker.calls(), 2);
        assert_eq!(*progress.events.borrow(), vec![(0, 3)]);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_states_keep_polling() {
        let checker = ScriptedCheck::new(vec![
            Ok(JobStatus::new(JobState::Other("queued".into()), 0, 2)),
            Ok(JobStatus::new(JobState::Scraping, 1, 2)),
            completed(2),
        ]);
        let outcome = waiter(1, 60)
            .wait(&job(), &checker, &RecordingProgress::default())
            .await;
        assert!(outcome.is_completed());
        assert_eq!(checker.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_after_second_poll_skips_third_call() {
        let token = CancellationToken::new();
        let checker = ScriptedCheck::new(vec![
            pending(0, 10),
            pending(3, 10),
            completed(10),
        ])
        .cancelling_on(2, token.clone());
        let progress = RecordingProgress::default();

        let outcome = waiter(1, 5)
            .wait_with_cancel(&job(), &checker, &progress, &token)
            .await;

        match outcome {
            WaitOutcome::Cancelled(status) => {
                assert_eq!(status.state, JobState::Pending);
                assert_eq!((status.completed, status.total), (3, 10));
            }
            other => panic!("expected Cancelled, got {other:?}"),
        }
        assert_eq!(checker.calls(), 2);
        assert_eq!(*progress.events.borrow(), vec![(0, 10), (3, 10)]);
        assert_eq!(progress.reports.borrow()[0].state, WaitState::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_cuts_the_sleep_short() {
        let token = CancellationToken::new();
        let checker = ScriptedCheck::new(vec![pending(0, 1)]);
        let canceller = token.clone();
        tokio::spawn(async move {
            sleep(Duration::from_secs(5)).await;
            canceller.cancel();
        });

        let started = Instant::now();
        let outcome = waiter(60, 3600)
            .wait_with_cancel(&job(), &checker, &RecordingProgress::default(), &token)
            .await;

        assert!(matches!(outcome, WaitOutcome::Cancelled(_)));
        assert_eq!(checker.calls(), 1);
        assert!(started.elapsed() < Duration::from_secs(60));
    }
}
