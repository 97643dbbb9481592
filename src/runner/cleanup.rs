use std::{fmt, time::Duration};

use tracing::{debug, info, warn};

use crate::service::{Arn, AssessmentService, ServiceResult};

use super::{RunState, execute::Clock};

/// Upper bound on how long to wait for a stopped run to leave the running state.
pub const MAX_STOP_WAIT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupStep {
    StopRun,
    DeleteTarget,
    DeleteTemplate,
    DeleteRun,
}

impl fmt::Display for CleanupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleanupStep::StopRun => f.write_str("stop assessment run"),
            CleanupStep::DeleteTarget => f.write_str("delete assessment target"),
            CleanupStep::DeleteTemplate => f.write_str("delete assessment template"),
            CleanupStep::DeleteRun => f.write_str("delete assessment run"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupFailure {
    pub step: CleanupStep,
    pub arn: Arn,
    pub reason: String,
}

/// What teardown did. Failures are collected here instead of being raised.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub completed: Vec<(CleanupStep, Arn)>,
    pub failures: Vec<CleanupFailure>,
}

impl CleanupReport {
    /// Runs one teardown call, recording its failure without propagating it.
    fn attempt<F>(&mut self, step: CleanupStep, arn: &Arn, call: F) -> bool
    where
        F: FnOnce(&Arn) -> ServiceResult<()>,
    {
        match call(arn) {
            Ok(()) => {
                debug!(%step, %arn, "cleanup step done");
                self.completed.push((step, arn.clone()));
                true
            }
            Err(err) => {
                warn!(%step, %arn, error = %err, "Could not shutdown resource");
                self.failures.push(CleanupFailure {
                    step,
                    arn: arn.clone(),
                    reason: err.to_string(),
                });
                false
            }
        }
    }

    pub fn did(&self, step: CleanupStep) -> bool {
        self.completed.iter().any(|(done, _)| *done == step)
    }
}

/// Best-effort teardown of whatever the run managed to create.
///
/// Resource groups are left behind; the service offers no call to delete them.
pub struct ResourceCleaner<'a> {
    service: &'a dyn AssessmentService,
    clock: &'a dyn Clock,
}

impl<'a> ResourceCleaner<'a> {
    pub fn new(service: &'a dyn AssessmentService, clock: &'a dyn Clock) -> Self {
        Self { service, clock }
    }

    pub fn cleanup(&self, state: &RunState, run_duration: Duration) -> CleanupReport {
        info!("cleaning up resources before exiting");

        let mut report = CleanupReport::default();

        self.stop_if_running(state, run_duration, &mut report);
        self.delete_all(state, &mut report);

        if !report.failures.is_empty() {
            warn!(failures = report.failures.len(), "cleanup finished with failures");
        }

        report
    }

    /// A run that is still active can't be deleted, so it gets stopped first and
    /// given up to a minute to wind down.
    pub fn stop_if_running(&self, state: &RunState, run_duration: Duration, report: &mut CleanupReport) {
        let Some(run) = &state.run else {
            return;
        };

        if state.outcome.is_some_and(|outcome| outcome.is_settled()) {
            debug!(%run, "run already settled, nothing to stop");
            return;
        }

        match self.service.describe_assessment_run(run) {
            Ok(status) if status.is_terminal() => {
                debug!(%run, %status, "run already settled, nothing to stop");
                return;
            }
            Ok(_) => (),
            Err(err) => debug!(%run, error = %err, "can't read run status, stopping anyway"),
        }

        if report.attempt(CleanupStep::StopRun, run, |arn| self.service.stop_assessment_run(arn)) {
            let wait = run_duration.min(MAX_STOP_WAIT);
            info!(wait_secs = wait.as_secs(), "waiting for the run to stop");
            self.clock.sleep(wait);
        }
    }

    /// Deletes target, template and run in that order. Each deletion stands alone:
    /// a failure is recorded and the next one still runs. Absent handles are skipped.
    pub fn delete_all(&self, state: &RunState, report: &mut CleanupReport) {
        if let Some(target) = &state.target {
            report.attempt(CleanupStep::DeleteTarget, target, |arn| {
                self.service.delete_assessment_target(arn)
            });
        }

        if let Some(template) = &state.template {
            report.attempt(CleanupStep::DeleteTemplate, template, |arn| {
                self.service.delete_assessment_template(arn)
            });
        }

        if let Some(run) = &state.run {
            report.attempt(CleanupStep::DeleteRun, run, |arn| {
                self.service.delete_assessment_run(arn)
            });
        }
    }
}
