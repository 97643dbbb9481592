//! The scanning API the runner drives.
//!
//! [`AssessmentService`] mirrors the handful of Inspector calls the tool needs.
//! The runner only ever sees the trait; [`inspector::InspectorService`] is the
//! real backend and tests run against an in-memory fake.

use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};
use thiserror::Error;

use crate::config::TargetTag;

pub mod inspector;
pub mod model;

#[cfg(test)]
pub(crate) mod fake;

pub use model::*;

/// Opaque handle of a resource created by the service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arn(pub String);

impl Arn {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Arn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Arn {
    fn from(value: &str) -> Self {
        Arn(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulePackage {
    pub arn: Arn,
    pub name: String,
}

/// Assessment run state as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    CompletedWithErrors,
    Failed,
    Error,
    Canceled,
    /// Any of the in-flight states (`CREATED`, `COLLECTING_DATA`, ...).
    InProgress(String),
}

impl RunStatus {
    pub fn from_state(state: &str) -> Self {
        match state {
            "COMPLETED" => RunStatus::Completed,
            "COMPLETED_WITH_ERRORS" => RunStatus::CompletedWithErrors,
            "FAILED" => RunStatus::Failed,
            "ERROR" => RunStatus::Error,
            "CANCELED" => RunStatus::Canceled,
            other => RunStatus::InProgress(other.to_string()),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::CompletedWithErrors)
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::InProgress(_))
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Completed => f.write_str("COMPLETED"),
            RunStatus::CompletedWithErrors => f.write_str("COMPLETED_WITH_ERRORS"),
            RunStatus::Failed => f.write_str("FAILED"),
            RunStatus::Error => f.write_str("ERROR"),
            RunStatus::Canceled => f.write_str("CANCELED"),
            RunStatus::InProgress(state) => f.write_str(state),
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("no such entity: {0}")]
    NoSuchEntity(String),

    #[error("{0}")]
    Api(String),

    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

pub trait AssessmentService {
    fn list_rules_packages(&self) -> ServiceResult<Vec<Arn>>;

    fn describe_rules_packages(&self, arns: &[Arn]) -> ServiceResult<Vec<RulePackage>>;

    fn create_resource_group(&self, tags: &[TargetTag]) -> ServiceResult<Arn>;

    fn create_assessment_target(&self, name: &str, resource_group: &Arn) -> ServiceResult<Arn>;

    fn delete_assessment_target(&self, target: &Arn) -> ServiceResult<()>;

    fn create_assessment_template(
        &self,
        target: &Arn,
        name: &str,
        duration: Duration,
        rules: &[Arn],
    ) -> ServiceResult<Arn>;

    fn delete_assessment_template(&self, template: &Arn) -> ServiceResult<()>;

    /// Fails with [`ServiceError::NoSuchEntity`] when the target's tags match no resources.
    fn start_assessment_run(&self, template: &Arn, name: &str) -> ServiceResult<Arn>;

    fn stop_assessment_run(&self, run: &Arn) -> ServiceResult<()>;

    fn delete_assessment_run(&self, run: &Arn) -> ServiceResult<()>;

    fn describe_assessment_run(&self, run: &Arn) -> ServiceResult<RunStatus>;

    fn list_findings(&self, run: &Arn) -> ServiceResult<Vec<Arn>>;

    fn describe_findings(&self, findings: &[Arn]) -> ServiceResult<Vec<Finding>>;
}
