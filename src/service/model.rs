use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceAttributes {
    pub schema_version: i32,
    #[serde(default)]
    pub assessment_run_arn: Option<String>,
    #[serde(default)]
    pub rules_package_arn: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetAttributes {
    pub schema_version: i32,
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub auto_scaling_group: Option<String>,
    #[serde(default)]
    pub ami_id: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub ipv4_addresses: Vec<String>,
    #[serde(default)]
    pub tags: Vec<KeyValue>,
}

/// A single scan result, as the service describes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub arn: String,
    #[serde(default)]
    pub schema_version: Option<i32>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub service_attributes: Option<ServiceAttributes>,
    #[serde(default)]
    pub asset_type: Option<String>,
    #[serde(default)]
    pub asset_attributes: Option<AssetAttributes>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub recommendation: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub numeric_severity: Option<f64>,
    #[serde(default)]
    pub confidence: Option<i32>,
    #[serde(default)]
    pub indicator_of_compromise: Option<bool>,
    #[serde(default)]
    pub attributes: Vec<KeyValue>,
    #[serde(default)]
    pub user_attributes: Vec<KeyValue>,
    /// RFC 3339
    pub created_at: String,
    /// RFC 3339
    pub updated_at: String,
}
