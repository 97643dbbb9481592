use std::{
    cell::{Cell, RefCell},
    collections::{HashSet, VecDeque},
    time::Duration,
};

use super::{
    Arn, AssessmentService, Finding, RulePackage, RunStatus, ServiceError, ServiceResult,
};
use crate::config::TargetTag;

/// In-memory stand-in for the scanning API that records every call it sees.
#[derive(Default)]
pub struct FakeService {
    pub catalog: Vec<RulePackage>,
    pub findings: Vec<Finding>,
    /// Status answers handed out in order; the last one repeats.
    pub statuses: RefCell<VecDeque<RunStatus>>,
    pub no_matching_resources: bool,
    /// Operation names that should fail with an API error.
    pub failing: HashSet<&'static str>,
    pub calls: RefCell<Vec<String>>,
    pub status_queries: Cell<usize>,
    pub template_rules: RefCell<Vec<Arn>>,
}

impl FakeService {
    pub fn with_catalog(names: &[&str]) -> Self {
        let catalog = names
            .iter()
            .enumerate()
            .map(|(idx, name)| RulePackage {
                arn: Arn(format!("arn:aws:inspector:rulespackage/{}", idx)),
                name: name.to_string(),
            })
            .collect();

        Self {
            catalog,
            ..Default::default()
        }
    }

    pub fn script_statuses(&self, statuses: Vec<RunStatus>) {
        *self.statuses.borrow_mut() = statuses.into();
    }

    pub fn fail(mut self, operation: &'static str) -> Self {
        self.failing.insert(operation);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn position(&self, call: &str) -> Option<usize> {
        self.calls.borrow().iter().position(|c| c == call)
    }

    fn record(&self, operation: &'static str, detail: impl std::fmt::Display) -> ServiceResult<()> {
        self.calls.borrow_mut().push(format!("{} {}", operation, detail));

        if self.failing.contains(operation) {
            return Err(ServiceError::Api(format!("{} rejected", operation)));
        }

        Ok(())
    }
}

impl AssessmentService for FakeService {
    fn list_rules_packages(&self) -> ServiceResult<Vec<Arn>> {
        self.record("list_rules_packages", "")?;
        Ok(self.catalog.iter().map(|p| p.arn.clone()).collect())
    }

    fn describe_rules_packages(&self, arns: &[Arn]) -> ServiceResult<Vec<RulePackage>> {
        self.record("describe_rules_packages", arns.len())?;
        Ok(self
            .catalog
            .iter()
            .filter(|p| arns.contains(&p.arn))
            .cloned()
            .collect())
    }

    fn create_resource_group(&self, tags: &[TargetTag]) -> ServiceResult<Arn> {
        self.record("create_resource_group", tags.len())?;
        Ok(Arn::from("arn:group"))
    }

    fn create_assessment_target(&self, name: &str, _resource_group: &Arn) -> ServiceResult<Arn> {
        self.record("create_assessment_target", name)?;
        Ok(Arn::from("arn:target"))
    }

    fn delete_assessment_target(&self, target: &Arn) -> ServiceResult<()> {
        self.record("delete_assessment_target", target)
    }

    fn create_assessment_template(
        &self,
        _target: &Arn,
        name: &str,
        duration: Duration,
        rules: &[Arn],
    ) -> ServiceResult<Arn> {
        self.record("create_assessment_template", format!("{} {}", name, duration.as_secs()))?;
        *self.template_rules.borrow_mut() = rules.to_vec();
        Ok(Arn::from("arn:template"))
    }

    fn delete_assessment_template(&self, template: &Arn) -> ServiceResult<()> {
        self.record("delete_assessment_template", template)
    }

    fn start_assessment_run(&self, template: &Arn, name: &str) -> ServiceResult<Arn> {
        self.record("start_assessment_run", name)?;

        if self.no_matching_resources {
            return Err(ServiceError::NoSuchEntity(template.to_string()));
        }

        Ok(Arn::from("arn:run"))
    }

    fn stop_assessment_run(&self, run: &Arn) -> ServiceResult<()> {
        self.record("stop_assessment_run", run)
    }

    fn delete_assessment_run(&self, run: &Arn) -> ServiceResult<()> {
        self.record("delete_assessment_run", run)
    }

    fn describe_assessment_run(&self, _run: &Arn) -> ServiceResult<RunStatus> {
        if self.failing.contains("describe_assessment_run") {
            return Err(ServiceError::Api("describe_assessment_run rejected".to_string()));
        }

        self.status_queries.set(self.status_queries.get() + 1);

        let mut statuses = self.statuses.borrow_mut();

        let status = if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().cloned()
        };

        Ok(status.unwrap_or_else(|| RunStatus::InProgress("COLLECTING_DATA".to_string())))
    }

    fn list_findings(&self, run: &Arn) -> ServiceResult<Vec<Arn>> {
        self.record("list_findings", run)?;
        Ok(self.findings.iter().map(|f| Arn(f.arn.clone())).collect())
    }

    fn describe_findings(&self, findings: &[Arn]) -> ServiceResult<Vec<Finding>> {
        self.record("describe_findings", findings.len())?;
        Ok(self
            .findings
            .iter()
            .filter(|f| findings.iter().any(|arn| arn.as_str() == f.arn))
            .cloned()
            .collect())
    }
}

pub fn finding(arn: &str, severity: &str, numeric_severity: f64) -> Finding {
    Finding {
        arn: arn.to_string(),
        schema_version: Some(1),
        service: Some("Inspector".to_string()),
        service_attributes: None,
        asset_type: Some("ec2-instance".to_string()),
        asset_attributes: Some(super::AssetAttributes {
            schema_version: 1,
            agent_id: Some("i-2a42ffac".to_string()),
            auto_scaling_group: None,
            ami_id: None,
            hostname: Some("build-agent".to_string()),
            ipv4_addresses: vec!["10.0.0.12".to_string()],
            tags: vec![],
        }),
        id: Some(format!("{}-id", arn)),
        title: Some(format!("{} finding", severity)),
        description: Some("Instance is configured to allow root login over SSH".to_string()),
        recommendation: Some("Disable root login".to_string()),
        severity: Some(severity.to_string()),
        numeric_severity: Some(numeric_severity),
        confidence: Some(10),
        indicator_of_compromise: Some(false),
        attributes: vec![],
        user_attributes: vec![],
        created_at: "2026-10-14T09:00:00+00:00".to_string(),
        updated_at: "2026-10-14T09:05:00+00:00".to_string(),
    }
}
