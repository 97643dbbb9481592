use miette::Diagnostic;
use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;
use tracing::{debug, warn};

pub mod model;
pub mod serde;

pub use model::*;

pub const DEFAULT_CONFIG_FILE: &str = "config.yml";

pub const MAX_ASSET_DURATION_SECS: u64 = i32::MAX as u64;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("Missing config options: {0}")]
    #[diagnostic(help("set the option in the config file or pass the matching command line flag"))]
    MissingOption(&'static str),

    #[error("invalid value for `{option}`: {reason}")]
    InvalidOption {
        option: &'static str,
        reason: String,
    },

    #[error("can't read config file {}", .path.display())]
    CantReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}: {reason}", .path.display())]
    #[diagnostic(help("config files are YAML unless they end in .toml"))]
    InvalidFile { path: PathBuf, reason: String },

    #[error("none of the selected rule packages are available in this region: {requested}")]
    #[diagnostic(help("check the rule package names against the ones offered in the region"))]
    NoRulePackages { requested: String },
}

impl RawConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::CantReadFile {
            path: path.to_path_buf(),
            source,
        })?;

        let parsed = if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str::<Self>(&contents).map_err(|e| e.to_string())
        } else if contents.trim().is_empty() {
            Ok(Self::default())
        } else {
            serde_yaml_ng::from_str::<Self>(&contents).map_err(|e| e.to_string())
        };

        parsed.map_err(|reason| ConfigError::InvalidFile {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Reads the config file, falling back to an empty config when the default
    /// file isn't there. A file the user named explicitly must exist.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = explicit else {
            return match Self::load(Path::new(DEFAULT_CONFIG_FILE)) {
                Ok(config) => Ok(config),
                Err(ConfigError::CantReadFile { .. }) => {
                    warn!("no config file provided, using command line args only");
                    Ok(Self::default())
                }
                Err(other) => Err(other),
            };
        };

        Self::load(path)
    }

    /// Layers `overrides` on top of `self`; any option set in `overrides` wins.
    pub fn merge(self, overrides: RawConfig) -> RawConfig {
        RawConfig {
            aws_name_prefix: overrides.aws_name_prefix.or(self.aws_name_prefix),
            rules_to_run: overrides.rules_to_run.or(self.rules_to_run),
            target_tags: overrides.target_tags.or(self.target_tags),
            asset_duration: overrides.asset_duration.or(self.asset_duration),
            cleanup_resources: overrides.cleanup_resources.or(self.cleanup_resources),
            failure_metrics: overrides.failure_metrics.or(self.failure_metrics),
            region: overrides.region.or(self.region),
        }
    }

    pub fn validate(self) -> Result<RunConfig, ConfigError> {
        let name_prefix = self
            .aws_name_prefix
            .ok_or(ConfigError::MissingOption("aws_name_prefix"))?;

        if name_prefix.trim().is_empty() {
            return Err(ConfigError::InvalidOption {
                option: "aws_name_prefix",
                reason: "must not be empty".to_string(),
            });
        }

        let rules = self
            .rules_to_run
            .ok_or(ConfigError::MissingOption("rules_to_run"))?;

        let selected_rules = rules
            .0
            .iter()
            .map(|rule| rule.display_name().to_string())
            .filter(|name| !name.is_empty())
            .collect::<BTreeSet<String>>();

        if selected_rules.is_empty() {
            return Err(ConfigError::InvalidOption {
                option: "rules_to_run",
                reason: "at least one rule package is required".to_string(),
            });
        }

        let tags = self
            .target_tags
            .ok_or(ConfigError::MissingOption("target_tags"))?;

        if tags.is_empty() {
            return Err(ConfigError::InvalidOption {
                option: "target_tags",
                reason: "at least one tag is required to select resources".to_string(),
            });
        }

        let target_tags = tags
            .0
            .into_iter()
            .map(|(key, value)| TargetTag { key, value })
            .collect::<Vec<TargetTag>>();

        let duration = self
            .asset_duration
            .ok_or(ConfigError::MissingOption("asset_duration"))?;

        let seconds = duration
            .0
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidOption {
                option: "asset_duration",
                reason: format!("expected a number of seconds, got `{}`", duration.0),
            })?;

        if seconds == 0 {
            return Err(ConfigError::InvalidOption {
                option: "asset_duration",
                reason: "must be greater than zero".to_string(),
            });
        }

        // the service takes the duration as a 32-bit count of seconds
        if seconds > MAX_ASSET_DURATION_SECS {
            return Err(ConfigError::InvalidOption {
                option: "asset_duration",
                reason: format!("must be at most {} seconds", MAX_ASSET_DURATION_SECS),
            });
        }

        let cleanup = self
            .cleanup_resources
            .ok_or(ConfigError::MissingOption("cleanup_resources"))?;

        let cleanup_enabled =
            cleanup
                .0
                .trim()
                .parse::<bool>()
                .map_err(|_| ConfigError::InvalidOption {
                    option: "cleanup_resources",
                    reason: format!("expected true or false, got `{}`", cleanup.0),
                })?;

        let failure_metrics = self
            .failure_metrics
            .unwrap_or_default()
            .0
            .into_iter()
            .map(|(field, value)| FailureMetric {
                field,
                value: MetricValue::parse(&value),
            })
            .collect::<Vec<FailureMetric>>();

        let config = RunConfig {
            name_prefix,
            run_duration: Duration::from_secs(seconds),
            selected_rules,
            target_tags,
            cleanup_enabled,
            failure_metrics,
            region: self.region,
        };

        debug!(?config, "run config validated");

        Ok(config)
    }
}
