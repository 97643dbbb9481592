use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt, str::FromStr, time::Duration};

use crate::config::serde::{CommaList, KnownOrCustom, PairList, ScalarString};

/// Rule packages that can be selected by their short abbreviation.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum KnownRulePackage {
    Sec,
    Run,
    Com,
    Cis,
}

impl KnownRulePackage {
    pub fn display_name(&self) -> &'static str {
        match self {
            KnownRulePackage::Sec => "Security Best Practices",
            KnownRulePackage::Run => "Runtime Behavior Analysis",
            KnownRulePackage::Com => "Common Vulnerabilities and Exposures",
            KnownRulePackage::Cis => "CIS Operating System Security Configuration Benchmarks",
        }
    }
}

impl FromStr for KnownRulePackage {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SEC" => Ok(KnownRulePackage::Sec),
            "RUN" => Ok(KnownRulePackage::Run),
            "COM" => Ok(KnownRulePackage::Com),
            "CIS" => Ok(KnownRulePackage::Cis),
            _ => Err(()),
        }
    }
}

pub type RuleSelection = KnownOrCustom<KnownRulePackage, String>;

impl RuleSelection {
    pub fn display_name(&self) -> &str {
        match self {
            RuleSelection::Known(known) => known.display_name(),
            RuleSelection::Custom(name) => name,
        }
    }
}

/// Config options as read from a file or the command line, before validation.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct RawConfig {
    #[serde(default)]
    pub aws_name_prefix: Option<String>,

    #[serde(default)]
    pub rules_to_run: Option<CommaList<RuleSelection>>,

    #[serde(default)]
    pub target_tags: Option<PairList>,

    #[serde(default)]
    pub asset_duration: Option<ScalarString>,

    #[serde(default)]
    pub cleanup_resources: Option<ScalarString>,

    #[serde(default)]
    pub failure_metrics: Option<PairList>,

    #[serde(default)]
    pub region: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetTag {
    pub key: String,
    pub value: String,
}

impl fmt::Display for TargetTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.key, self.value)
    }
}

/// Renders a tag set the way it is written on the command line.
pub fn format_tags(tags: &[TargetTag]) -> String {
    tags.iter()
        .map(ToString::to_string)
        .collect::<Vec<String>>()
        .join(",")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl MetricValue {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();

        if let Ok(value) = raw.parse::<bool>() {
            return MetricValue::Bool(value);
        }

        if let Ok(value) = raw.parse::<f64>() {
            return MetricValue::Number(value);
        }

        MetricValue::Text(raw.to_string())
    }
}

/// A `field:value` threshold checked against every finding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureMetric {
    pub field: String,
    pub value: MetricValue,
}

/// Validated parameters for one assessment run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub name_prefix: String,
    pub run_duration: Duration,
    pub selected_rules: BTreeSet<String>,
    pub target_tags: Vec<TargetTag>,
    pub cleanup_enabled: bool,
    pub failure_metrics: Vec<FailureMetric>,
    pub region: Option<String>,
}
