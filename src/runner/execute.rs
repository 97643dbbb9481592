use std::time::{Duration, Instant};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    config::{TargetTag, format_tags},
    error::{Error, Result},
    service::{Arn, AssessmentService, RunStatus, ServiceError},
};

pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Extra time on top of the scan duration for the service to provision and finalize.
pub const SAFETY_MARGIN: Duration = Duration::from_secs(180);

pub fn poll_budget(run_duration: Duration) -> Duration {
    run_duration + SAFETY_MARGIN
}

/// Source of time for the blocking waits.
pub trait Clock {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;

    fn sleep(&self, duration: Duration);
}

pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Clock that only moves when slept on.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ManualClock {
    now: std::cell::Cell<Duration>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.now.set(self.now.get() + duration);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalState {
    Completed,
    TimedOut,
    Failed,
}

impl TerminalState {
    /// Whether the service is known to be done with the run.
    pub fn is_settled(&self) -> bool {
        matches!(self, TerminalState::Completed | TerminalState::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
    NotStarted,
    Running,
    Finished(TerminalState),
}

/// What the liveness callback hears from [`RunExecutor::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollEvent<'s> {
    /// One status query answered.
    Tick(&'s RunStatus),
    /// Polling is over, whatever the outcome. Sent before any closing log line.
    Done,
}

pub type Progress<'a> = &'a dyn Fn(PollEvent<'_>);

/// Starts an assessment run and waits for it to settle.
pub struct RunExecutor<'a> {
    service: &'a dyn AssessmentService,
    clock: &'a dyn Clock,
    cancel: CancellationToken,
    interval: Duration,
    progress: Option<Progress<'a>>,
    state: ExecutorState,
}

impl<'a> RunExecutor<'a> {
    pub fn new(service: &'a dyn AssessmentService, clock: &'a dyn Clock) -> Self {
        Self {
            service,
            clock,
            cancel: CancellationToken::new(),
            interval: POLL_INTERVAL,
            progress: None,
            state: ExecutorState::NotStarted,
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: Option<Progress<'a>>) -> Self {
        self.progress = progress;
        self
    }

    pub fn state(&self) -> ExecutorState {
        self.state
    }

    pub fn start(&mut self, template: &Arn, name: &str, target_tags: &[TargetTag]) -> Result<Arn> {
        let run = self
            .service
            .start_assessment_run(template, name)
            .map_err(|err| match err {
                ServiceError::NoSuchEntity(_) => Error::NoMatchingResources {
                    tags: format_tags(target_tags),
                },
                other => Error::TransientService {
                    operation: "StartAssessmentRun",
                    source: other,
                },
            })?;

        self.state = ExecutorState::Running;

        info!(%run, "assessment run started");

        Ok(run)
    }

    /// Blocks until the run completes, fails or `budget` runs out.
    ///
    /// Running out of budget is an outcome, not an error. The last sleep is clipped
    /// to the remaining budget so this returns within `budget` plus one interval.
    pub fn poll(&mut self, run: &Arn, budget: Duration) -> Result<TerminalState> {
        info!(budget_secs = budget.as_secs(), "waiting for assessment to complete");

        let started = self.clock.now();
        let settled = self.wait_until_settled(run, budget, started);

        if let Some(progress) = self.progress {
            progress(PollEvent::Done);
        }

        let (terminal, status) = settled?;
        let elapsed = self.clock.now().saturating_sub(started);

        match terminal {
            TerminalState::Completed => {
                info!(elapsed_secs = elapsed.as_secs(), "assessment run completed")
            }
            TerminalState::Failed => warn!(%status, "assessment run ended without completing"),
            TerminalState::TimedOut => warn!(
                elapsed_secs = elapsed.as_secs(),
                "could not get results from the assessment run in time"
            ),
        }

        Ok(self.finish(terminal))
    }

    fn wait_until_settled(
        &self,
        run: &Arn,
        budget: Duration,
        started: Duration,
    ) -> Result<(TerminalState, RunStatus)> {
        loop {
            if self.cancel.is_cancelled() {
                return Err(Error::Interrupted);
            }

            let status = self
                .service
                .describe_assessment_run(run)
                .map_err(Error::service("DescribeAssessmentRuns"))?;

            debug!(%status, "assessment run status");

            if let Some(progress) = self.progress {
                progress(PollEvent::Tick(&status));
            }

            if status.is_completed() {
                return Ok((TerminalState::Completed, status));
            }

            if status.is_terminal() {
                return Ok((TerminalState::Failed, status));
            }

            let elapsed = self.clock.now().saturating_sub(started);

            if elapsed >= budget {
                return Ok((TerminalState::TimedOut, status));
            }

            self.clock.sleep(self.interval.min(budget - elapsed));
        }
    }

    fn finish(&mut self, terminal: TerminalState) -> TerminalState {
        self.state = ExecutorState::Finished(terminal);
        terminal
    }
}
