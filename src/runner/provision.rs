use std::{collections::BTreeSet, time::Duration};

use tracing::{debug, info};

use crate::{
    config::{ConfigError, TargetTag},
    error::{Error, Result},
    service::{Arn, AssessmentService},
};

/// Turns run parameters into live scan infrastructure, one resource per call.
pub struct ResourceProvisioner<'a> {
    service: &'a dyn AssessmentService,
}

impl<'a> ResourceProvisioner<'a> {
    pub fn new(service: &'a dyn AssessmentService) -> Self {
        Self { service }
    }

    /// Rule packages are region specific, so the catalog is looked up every run.
    pub fn resolve_rule_handles(&self, selected_rules: &BTreeSet<String>) -> Result<Vec<Arn>> {
        let available = self
            .service
            .list_rules_packages()
            .map_err(Error::service("ListRulesPackages"))?;

        let packages = if available.is_empty() {
            vec![]
        } else {
            self.service
                .describe_rules_packages(&available)
                .map_err(Error::service("DescribeRulesPackages"))?
        };

        let selected = packages
            .into_iter()
            .filter(|package| selected_rules.contains(&package.name))
            .inspect(|package| debug!(name = %package.name, arn = %package.arn, "rule package selected"))
            .map(|package| package.arn)
            .collect::<Vec<Arn>>();

        if selected.is_empty() {
            return Err(ConfigError::NoRulePackages {
                requested: selected_rules
                    .iter()
                    .cloned()
                    .collect::<Vec<String>>()
                    .join(", "),
            }
            .into());
        }

        info!(count = selected.len(), "rule packages resolved");

        Ok(selected)
    }

    pub fn create_resource_group(&self, target_tags: &[TargetTag]) -> Result<Arn> {
        let arn = self
            .service
            .create_resource_group(target_tags)
            .map_err(Error::service("CreateResourceGroup"))?;

        info!(%arn, "resource group created");

        Ok(arn)
    }

    pub fn create_target(&self, resource_group: &Arn, name: &str) -> Result<Arn> {
        let arn = self
            .service
            .create_assessment_target(name, resource_group)
            .map_err(Error::service("CreateAssessmentTarget"))?;

        info!(%arn, name, "assessment target created");

        Ok(arn)
    }

    pub fn create_template(
        &self,
        target: &Arn,
        name: &str,
        duration: Duration,
        rules: &[Arn],
    ) -> Result<Arn> {
        let arn = self
            .service
            .create_assessment_template(target, name, duration, rules)
            .map_err(Error::service("CreateAssessmentTemplate"))?;

        info!(%arn, name, duration_secs = duration.as_secs(), "assessment template created");

        Ok(arn)
    }
}
