use std::io::Write;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    config::{FailureMetric, MetricValue},
    error::{Error, Result},
    service::{Arn, AssessmentService, Finding},
};

use super::execute::TerminalState;

/// The document written to stdout at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct FindingsReport {
    pub run_name: String,
    pub assessment_run_arn: Option<Arn>,
    pub outcome: Option<TerminalState>,
    pub generated_at: String,
    pub findings: Vec<Finding>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_metrics: Vec<MetricMatch>,
}

/// A finding whose field reached one of the configured failure metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricMatch {
    pub finding_arn: String,
    pub field: String,
    pub threshold: MetricValue,
    pub actual: Value,
}

pub struct FindingsReporter<'a> {
    service: &'a dyn AssessmentService,
}

impl<'a> FindingsReporter<'a> {
    pub fn new(service: &'a dyn AssessmentService) -> Self {
        Self { service }
    }

    /// Whatever the service has recorded for the run so far, in its own order.
    pub fn fetch_findings(&self, run: &Arn) -> Result<Vec<Finding>> {
        let arns = self
            .service
            .list_findings(run)
            .map_err(Error::service("ListFindings"))?;

        if arns.is_empty() {
            info!("assessment run has no findings");
            return Ok(vec![]);
        }

        let findings = self
            .service
            .describe_findings(&arns)
            .map_err(Error::service("DescribeFindings"))?;

        info!(count = findings.len(), "findings retrieved");

        Ok(findings)
    }
}

pub fn emit(report: &FindingsReport, sink: &mut dyn Write) -> std::io::Result<()> {
    serde_json::to_writer_pretty(&mut *sink, report)?;
    writeln!(sink)?;
    sink.flush()
}

fn metric_matches(threshold: &MetricValue, actual: &Value) -> bool {
    match threshold {
        MetricValue::Number(limit) => actual.as_f64().is_some_and(|value| value >= *limit),
        MetricValue::Bool(expected) => actual.as_bool() == Some(*expected),
        MetricValue::Text(expected) => actual
            .as_str()
            .is_some_and(|value| value.eq_ignore_ascii_case(expected)),
    }
}

/// Checks every finding against the configured failure metrics.
///
/// Numeric thresholds match findings at or above them; booleans and strings match on
/// equality. A field the finding doesn't carry never matches.
pub fn evaluate_for_failure(findings: &[Finding], thresholds: &[FailureMetric]) -> Vec<MetricMatch> {
    if thresholds.is_empty() {
        return vec![];
    }

    let mut matches = Vec::new();

    for finding in findings {
        let Ok(Value::Object(fields)) = serde_json::to_value(finding) else {
            continue;
        };

        for metric in thresholds {
            let Some(actual) = fields.get(&metric.field) else {
                continue;
            };

            if metric_matches(&metric.value, actual) {
                warn!(
                    finding = %finding.arn,
                    field = %metric.field,
                    %actual,
                    "finding reached failure metric"
                );

                matches.push(MetricMatch {
                    finding_arn: finding.arn.clone(),
                    field: metric.field.clone(),
                    threshold: metric.value.clone(),
                    actual: actual.clone(),
                });
            }
        }
    }

    matches
}
