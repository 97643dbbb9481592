//! The assessment lifecycle: provision, execute, report, tear down.
//!
//! All four phases share one [`RunState`], so they live behind a single
//! [`AssessmentRunner`] that drives them in order.

use std::io::Write;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    config::RunConfig,
    error::{Error, Result},
    service::{Arn, AssessmentService, Finding},
};

pub mod cleanup;
pub mod execute;
pub mod provision;
pub mod report;

pub use cleanup::{CleanupFailure, CleanupReport, CleanupStep, ResourceCleaner};
pub use execute::{
    Clock, ExecutorState, PollEvent, Progress, RunExecutor, SystemClock, TerminalState,
};
pub use provision::ResourceProvisioner;
pub use report::{FindingsReport, FindingsReporter, MetricMatch, emit, evaluate_for_failure};

/// Everything one run has created or learned so far. Handles only ever go from
/// absent to present.
#[derive(Debug, Clone)]
pub struct RunState {
    pub run_name: String,
    pub rule_arns: Vec<Arn>,
    pub resource_group: Option<Arn>,
    pub target: Option<Arn>,
    pub template: Option<Arn>,
    pub run: Option<Arn>,
    pub findings: Vec<Finding>,
    pub outcome: Option<TerminalState>,
}

impl RunState {
    pub fn new(name_prefix: &str) -> Self {
        let suffix = hex::encode(rand::random::<[u8; 5]>());

        Self {
            run_name: format!("{}-{}", name_prefix, suffix),
            rule_arns: vec![],
            resource_group: None,
            target: None,
            template: None,
            run: None,
            findings: vec![],
            outcome: None,
        }
    }
}

fn record(slot: &mut Option<Arn>, arn: &Arn) {
    debug_assert!(slot.is_none(), "handle recorded twice");
    slot.get_or_insert_with(|| arn.clone());
}

pub struct AssessmentRunner<'a> {
    service: &'a dyn AssessmentService,
    clock: &'a dyn Clock,
    config: RunConfig,
    state: RunState,
    cancel: CancellationToken,
    progress: Option<Progress<'a>>,
}

impl<'a> AssessmentRunner<'a> {
    pub fn new(service: &'a dyn AssessmentService, clock: &'a dyn Clock, config: RunConfig) -> Self {
        let state = RunState::new(&config.name_prefix);

        Self {
            service,
            clock,
            config,
            state,
            cancel: CancellationToken::new(),
            progress: None,
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: Progress<'a>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Interrupted);
        }

        Ok(())
    }

    /// Provisions, runs and reports. Stops at the first fatal error, leaving
    /// whatever was created recorded in the state for [`Self::cleanup`].
    pub fn run(&mut self) -> Result<FindingsReport> {
        info!(run_name = %self.state.run_name, "starting assessment");

        let provisioner = ResourceProvisioner::new(self.service);

        self.check_cancelled()?;
        self.state.rule_arns = provisioner.resolve_rule_handles(&self.config.selected_rules)?;

        self.check_cancelled()?;
        let group = provisioner.create_resource_group(&self.config.target_tags)?;
        record(&mut self.state.resource_group, &group);

        self.check_cancelled()?;
        let target_name = format!("{}-assessment-target", self.state.run_name);
        let target = provisioner.create_target(&group, &target_name)?;
        record(&mut self.state.target, &target);

        self.check_cancelled()?;
        let template_name = format!("{}-assessment-template", self.state.run_name);
        let template = provisioner.create_template(
            &target,
            &template_name,
            self.config.run_duration,
            &self.state.rule_arns,
        )?;
        record(&mut self.state.template, &template);

        self.check_cancelled()?;
        let mut executor = RunExecutor::new(self.service, self.clock)
            .with_cancellation(self.cancel.clone())
            .with_progress(self.progress);

        let run_name = format!("{}-assessment-run", self.state.run_name);
        let run = executor.start(&template, &run_name, &self.config.target_tags)?;
        record(&mut self.state.run, &run);

        let outcome = executor.poll(&run, execute::poll_budget(self.config.run_duration))?;
        self.state.outcome = Some(outcome);

        let findings = FindingsReporter::new(self.service).fetch_findings(&run)?;
        let failed_metrics = evaluate_for_failure(&findings, &self.config.failure_metrics);

        if !failed_metrics.is_empty() {
            warn!(count = failed_metrics.len(), "findings reached failure metrics");
        }

        self.state.findings = findings;

        Ok(FindingsReport {
            run_name: self.state.run_name.clone(),
            assessment_run_arn: Some(run),
            outcome: Some(outcome),
            generated_at: chrono::Utc::now().to_rfc3339(),
            findings: self.state.findings.clone(),
            failed_metrics,
        })
    }

    /// Never fails; problems end up in the returned report and the log.
    pub fn cleanup(&self) -> CleanupReport {
        ResourceCleaner::new(self.service, self.clock).cleanup(&self.state, self.config.run_duration)
    }
}

/// Runs the assessment, writes the report to `sink` and, when enabled, tears
/// everything down afterwards whatever the outcome.
pub fn execute(runner: &mut AssessmentRunner<'_>, sink: &mut dyn Write) -> Result<CleanupReport> {
    let result = runner
        .run()
        .and_then(|report| emit(&report, sink).map_err(Error::Output));

    let cleanup = if runner.config().cleanup_enabled {
        runner.cleanup()
    } else {
        CleanupReport::default()
    };

    result.map(|_| cleanup)
}
