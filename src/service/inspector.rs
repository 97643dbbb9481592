use std::{future::Future, time::Duration};

use aws_sdk_inspector::{
    Client,
    config::Region,
    error::{DisplayErrorContext, SdkError},
    operation::start_assessment_run::StartAssessmentRunError,
    primitives::DateTime,
    types::{self, AssessmentRunState, ResourceGroupTag},
};
use tokio::runtime::Handle;
use tracing::debug;

use super::{
    Arn, AssessmentService, AssetAttributes, Finding, KeyValue, RulePackage, RunStatus,
    ServiceAttributes, ServiceError, ServiceResult,
};
use crate::config::TargetTag;

// per-call ARN limits of DescribeRulesPackages and DescribeFindings
const DESCRIBE_RULES_BATCH_SIZE: usize = 10;
const DESCRIBE_FINDINGS_BATCH_SIZE: usize = 100;

/// AWS Inspector (Classic) backend.
///
/// The SDK is async; every call blocks on the runtime handed in by the binary.
pub struct InspectorService {
    client: Client,
    runtime: Handle,
}

impl InspectorService {
    pub fn connect(runtime: Handle, region: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());

        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }

        let sdk_config = runtime.block_on(loader.load());

        debug!(region = ?sdk_config.region(), "inspector client configured");

        Self {
            client: Client::new(&sdk_config),
            runtime,
        }
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

fn api_error<E: std::error::Error>(err: E) -> ServiceError {
    ServiceError::Api(DisplayErrorContext(err).to_string())
}

// SDK getters return plain values for required members and options otherwise
fn optional<T>(value: impl Into<Option<T>>) -> Option<T> {
    value.into()
}

fn returned_arn<'a>(value: impl Into<Option<&'a str>>, operation: &str) -> ServiceResult<Arn> {
    value
        .into()
        .map(Arn::from)
        .ok_or_else(|| ServiceError::Api(format!("{} returned no ARN", operation)))
}

/// Keeps "no such entity" apart from every other failure: it is how the service
/// says the target's tags matched nothing.
fn start_run_error<R>(err: SdkError<StartAssessmentRunError, R>, template: &Arn) -> ServiceError
where
    R: std::fmt::Debug,
{
    let no_such_entity = err
        .as_service_error()
        .is_some_and(|service_err| service_err.is_no_such_entity_exception());

    if no_such_entity {
        ServiceError::NoSuchEntity(template.to_string())
    } else {
        api_error(err)
    }
}

fn arn_strings(arns: &[Arn]) -> Vec<String> {
    arns.iter().map(|arn| arn.0.clone()).collect()
}

fn timestamp(value: &DateTime) -> String {
    chrono::DateTime::<chrono::Utc>::from_timestamp(value.secs(), value.subsec_nanos())
        .map(|at| at.to_rfc3339())
        .unwrap_or_default()
}

fn key_values(attributes: &[types::Attribute]) -> Vec<KeyValue> {
    attributes
        .iter()
        .map(|attribute| KeyValue {
            key: optional::<&str>(attribute.key())
                .unwrap_or_default()
                .to_string(),
            value: attribute.value().map(ToString::to_string),
        })
        .collect()
}

fn asset_attributes(asset: &types::AssetAttributes) -> AssetAttributes {
    AssetAttributes {
        schema_version: optional(asset.schema_version()).unwrap_or_default(),
        agent_id: asset.agent_id().map(ToString::to_string),
        auto_scaling_group: asset.auto_scaling_group().map(ToString::to_string),
        ami_id: asset.ami_id().map(ToString::to_string),
        hostname: asset.hostname().map(ToString::to_string),
        ipv4_addresses: asset.ipv4_addresses().to_vec(),
        tags: asset
            .tags()
            .iter()
            .map(|tag| KeyValue {
                key: optional::<&str>(tag.key()).unwrap_or_default().to_string(),
                value: tag.value().map(ToString::to_string),
            })
            .collect(),
    }
}

fn finding_from_sdk(finding: &types::Finding) -> Finding {
    Finding {
        arn: optional::<&str>(finding.arn())
            .unwrap_or_default()
            .to_string(),
        schema_version: optional(finding.schema_version()),
        service: finding.service().map(ToString::to_string),
        service_attributes: finding
            .service_attributes()
            .map(|attributes| ServiceAttributes {
                schema_version: optional(attributes.schema_version()).unwrap_or_default(),
                assessment_run_arn: attributes.assessment_run_arn().map(ToString::to_string),
                rules_package_arn: attributes.rules_package_arn().map(ToString::to_string),
            }),
        asset_type: finding.asset_type().map(|t| t.as_str().to_string()),
        asset_attributes: finding.asset_attributes().map(asset_attributes),
        id: finding.id().map(ToString::to_string),
        title: finding.title().map(ToString::to_string),
        description: finding.description().map(ToString::to_string),
        recommendation: finding.recommendation().map(ToString::to_string),
        severity: finding.severity().map(|s| s.as_str().to_string()),
        numeric_severity: optional(finding.numeric_severity()),
        confidence: optional(finding.confidence()),
        indicator_of_compromise: optional(finding.indicator_of_compromise()),
        attributes: key_values(finding.attributes()),
        user_attributes: key_values(finding.user_attributes()),
        created_at: optional::<&DateTime>(finding.created_at())
            .map(timestamp)
            .unwrap_or_default(),
        updated_at: optional::<&DateTime>(finding.updated_at())
            .map(timestamp)
            .unwrap_or_default(),
    }
}

impl AssessmentService for InspectorService {
    fn list_rules_packages(&self) -> ServiceResult<Vec<Arn>> {
        let mut arns = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .block_on(
                    self.client
                        .list_rules_packages()
                        .set_next_token(next_token.take())
                        .send(),
                )
                .map_err(api_error)?;

            arns.extend(output.rules_package_arns().iter().map(|arn| Arn(arn.clone())));

            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(arns)
    }

    fn describe_rules_packages(&self, arns: &[Arn]) -> ServiceResult<Vec<RulePackage>> {
        let mut packages = Vec::new();

        for batch in arns.chunks(DESCRIBE_RULES_BATCH_SIZE) {
            let output = self
                .block_on(
                    self.client
                        .describe_rules_packages()
                        .set_rules_package_arns(Some(arn_strings(batch)))
                        .send(),
                )
                .map_err(api_error)?;

            packages.extend(output.rules_packages().iter().map(|package| RulePackage {
                arn: Arn::from(optional::<&str>(package.arn()).unwrap_or_default()),
                name: optional::<&str>(package.name())
                    .unwrap_or_default()
                    .to_string(),
            }));
        }

        Ok(packages)
    }

    fn create_resource_group(&self, tags: &[TargetTag]) -> ServiceResult<Arn> {
        let tags = tags
            .iter()
            .map(|tag| {
                ResourceGroupTag::builder()
                    .key(&tag.key)
                    .value(&tag.value)
                    .build()
                    .map_err(api_error)
            })
            .collect::<ServiceResult<Vec<ResourceGroupTag>>>()?;

        let output = self
            .block_on(
                self.client
                    .create_resource_group()
                    .set_resource_group_tags(Some(tags))
                    .send(),
            )
            .map_err(api_error)?;

        returned_arn(output.resource_group_arn(), "CreateResourceGroup")
    }

    fn create_assessment_target(&self, name: &str, resource_group: &Arn) -> ServiceResult<Arn> {
        let output = self
            .block_on(
                self.client
                    .create_assessment_target()
                    .assessment_target_name(name)
                    .resource_group_arn(resource_group.as_str())
                    .send(),
            )
            .map_err(api_error)?;

        returned_arn(output.assessment_target_arn(), "CreateAssessmentTarget")
    }

    fn delete_assessment_target(&self, target: &Arn) -> ServiceResult<()> {
        self.block_on(
            self.client
                .delete_assessment_target()
                .assessment_target_arn(target.as_str())
                .send(),
        )
        .map_err(api_error)?;

        Ok(())
    }

    fn create_assessment_template(
        &self,
        target: &Arn,
        name: &str,
        duration: Duration,
        rules: &[Arn],
    ) -> ServiceResult<Arn> {
        let seconds = i32::try_from(duration.as_secs())
            .map_err(|err| ServiceError::Other(Box::new(err)))?;

        let output = self
            .block_on(
                self.client
                    .create_assessment_template()
                    .assessment_target_arn(target.as_str())
                    .assessment_template_name(name)
                    .duration_in_seconds(seconds)
                    .set_rules_package_arns(Some(arn_strings(rules)))
                    .send(),
            )
            .map_err(api_error)?;

        returned_arn(output.assessment_template_arn(), "CreateAssessmentTemplate")
    }

    fn delete_assessment_template(&self, template: &Arn) -> ServiceResult<()> {
        self.block_on(
            self.client
                .delete_assessment_template()
                .assessment_template_arn(template.as_str())
                .send(),
        )
        .map_err(api_error)?;

        Ok(())
    }

    fn start_assessment_run(&self, template: &Arn, name: &str) -> ServiceResult<Arn> {
        let output = self
            .block_on(
                self.client
                    .start_assessment_run()
                    .assessment_template_arn(template.as_str())
                    .assessment_run_name(name)
                    .send(),
            )
            .map_err(|err| start_run_error(err, template))?;

        returned_arn(output.assessment_run_arn(), "StartAssessmentRun")
    }

    fn stop_assessment_run(&self, run: &Arn) -> ServiceResult<()> {
        self.block_on(
            self.client
                .stop_assessment_run()
                .assessment_run_arn(run.as_str())
                .send(),
        )
        .map_err(api_error)?;

        Ok(())
    }

    fn delete_assessment_run(&self, run: &Arn) -> ServiceResult<()> {
        self.block_on(
            self.client
                .delete_assessment_run()
                .assessment_run_arn(run.as_str())
                .send(),
        )
        .map_err(api_error)?;

        Ok(())
    }

    fn describe_assessment_run(&self, run: &Arn) -> ServiceResult<RunStatus> {
        let output = self
            .block_on(
                self.client
                    .describe_assessment_runs()
                    .assessment_run_arns(run.as_str())
                    .send(),
            )
            .map_err(api_error)?;

        let described = output
            .assessment_runs()
            .first()
            .ok_or_else(|| ServiceError::NoSuchEntity(run.to_string()))?;

        let state = optional::<&AssessmentRunState>(described.state())
            .ok_or_else(|| ServiceError::Api(format!("run {} has no state", run)))?;

        Ok(RunStatus::from_state(state.as_str()))
    }

    fn list_findings(&self, run: &Arn) -> ServiceResult<Vec<Arn>> {
        let mut arns = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .block_on(
                    self.client
                        .list_findings()
                        .assessment_run_arns(run.as_str())
                        .set_next_token(next_token.take())
                        .send(),
                )
                .map_err(api_error)?;

            arns.extend(output.finding_arns().iter().map(|arn| Arn(arn.clone())));

            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(arns)
    }

    fn describe_findings(&self, findings: &[Arn]) -> ServiceResult<Vec<Finding>> {
        let mut described = Vec::with_capacity(findings.len());

        for batch in findings.chunks(DESCRIBE_FINDINGS_BATCH_SIZE) {
            let output = self
                .block_on(
                    self.client
                        .describe_findings()
                        .set_finding_arns(Some(arn_strings(batch)))
                        .send(),
                )
                .map_err(api_error)?;

            described.extend(output.findings().iter().map(finding_from_sdk));
        }

        Ok(described)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_inspector::types::{
        AssetType, NoSuchEntityErrorCode, Severity, error::NoSuchEntityException,
    };

    // 2026-10-14T09:00:00Z
    const CREATED_AT: i64 = 1_791_968_400;

    fn sdk_finding() -> types::Finding {
        types::Finding::builder()
            .arn("arn:aws:inspector:us-east-1:123456789012:target/0-abc/finding/0-xyz")
            .schema_version(1)
            .service("Inspector")
            .service_attributes(
                types::InspectorServiceAttributes::builder()
                    .schema_version(1)
                    .assessment_run_arn("arn:run")
                    .rules_package_arn("arn:aws:inspector:rulespackage/0")
                    .build(),
            )
            .asset_type(AssetType::Ec2Instance)
            .asset_attributes(
                types::AssetAttributes::builder()
                    .schema_version(1)
                    .agent_id("i-2a42ffac")
                    .hostname("build-agent")
                    .ipv4_addresses("10.0.0.12")
                    .tags(
                        types::Tag::builder()
                            .key("auditable")
                            .value("true")
                            .build()
                            .expect("tag"),
                    )
                    .build(),
            )
            .id("root-login")
            .title("Instance allows root login")
            .description("Instance is configured to allow root login over SSH")
            .recommendation("Disable root login")
            .severity(Severity::High)
            .numeric_severity(9.0)
            .confidence(10)
            .indicator_of_compromise(false)
            .attributes(
                types::Attribute::builder()
                    .key("INSTANCE_ID")
                    .value("i-2a42ffac")
                    .build()
                    .expect("attribute"),
            )
            .set_user_attributes(Some(vec![]))
            .created_at(DateTime::from_secs(CREATED_AT))
            .updated_at(DateTime::from_secs(CREATED_AT + 300))
            .build()
            .expect("finding")
    }

    #[test]
    fn sdk_findings_convert_field_by_field() {
        let finding = finding_from_sdk(&sdk_finding());

        assert_eq!(
            finding.arn,
            "arn:aws:inspector:us-east-1:123456789012:target/0-abc/finding/0-xyz"
        );
        assert_eq!(finding.schema_version, Some(1));
        assert_eq!(finding.service.as_deref(), Some("Inspector"));
        assert_eq!(finding.asset_type.as_deref(), Some("ec2-instance"));
        assert_eq!(finding.id.as_deref(), Some("root-login"));
        assert_eq!(finding.title.as_deref(), Some("Instance allows root login"));
        assert_eq!(finding.recommendation.as_deref(), Some("Disable root login"));
        assert_eq!(finding.severity.as_deref(), Some("High"));
        assert_eq!(finding.numeric_severity, Some(9.0));
        assert_eq!(finding.confidence, Some(10));
        assert_eq!(finding.indicator_of_compromise, Some(false));
        assert_eq!(finding.created_at, "2026-10-14T09:00:00+00:00");
        assert_eq!(finding.updated_at, "2026-10-14T09:05:00+00:00");

        let service = finding.service_attributes.expect("service attributes");
        assert_eq!(service.assessment_run_arn.as_deref(), Some("arn:run"));
        assert_eq!(
            service.rules_package_arn.as_deref(),
            Some("arn:aws:inspector:rulespackage/0")
        );

        let asset = finding.asset_attributes.expect("asset attributes");
        assert_eq!(asset.agent_id.as_deref(), Some("i-2a42ffac"));
        assert_eq!(asset.hostname.as_deref(), Some("build-agent"));
        assert_eq!(asset.ipv4_addresses, vec!["10.0.0.12".to_string()]);
        assert_eq!(
            asset.tags,
            vec![KeyValue {
                key: "auditable".to_string(),
                value: Some("true".to_string()),
            }]
        );

        assert_eq!(
            finding.attributes,
            vec![KeyValue {
                key: "INSTANCE_ID".to_string(),
                value: Some("i-2a42ffac".to_string()),
            }]
        );
        assert!(finding.user_attributes.is_empty());
    }

    #[test]
    fn no_such_entity_on_start_is_kept_distinct() {
        let exception = NoSuchEntityException::builder()
            .message("no resources matched the target")
            .error_code(NoSuchEntityErrorCode::AssessmentTargetDoesNotExist)
            .can_retry(false)
            .build()
            .expect("exception");

        let err = SdkError::service_error(
            StartAssessmentRunError::NoSuchEntityException(exception),
            (),
        );

        let mapped = start_run_error(err, &Arn::from("arn:template"));

        match mapped {
            ServiceError::NoSuchEntity(arn) => assert_eq!(arn, "arn:template"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn other_start_failures_stay_api_errors() {
        let err = SdkError::<StartAssessmentRunError, ()>::construction_failure(
            "request could not be built",
        );

        let mapped = start_run_error(err, &Arn::from("arn:template"));

        assert!(matches!(mapped, ServiceError::Api(_)));
    }
}
