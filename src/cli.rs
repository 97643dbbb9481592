//! CLI parsing for inspect-run

use std::path::PathBuf;

use clap::Parser;

use crate::config::{
    ConfigError, RawConfig, RuleSelection, RunConfig,
    serde::{CommaList, PairList, ScalarString},
};

#[derive(Parser, Debug)]
#[command(name = "inspect-run")]
#[command(about = "Run a single AWS Inspector assessment against tagged instances", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file to read, YAML unless it ends in .toml
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Prefix for the names of every resource the run creates
    #[arg(long, short = 'n')]
    pub aws_name_prefix: Option<String>,

    /// Rule packages to run, by abbreviation (SEC, RUN, COM, CIS) or full name
    #[arg(long, short = 'r')]
    pub rules_to_run: Option<String>,

    /// Tags selecting the instances to assess, as key:value,key:value
    #[arg(long, short = 't')]
    pub target_tags: Option<String>,

    /// How long the assessment runs, in seconds
    #[arg(long, short = 'd')]
    pub asset_duration: Option<u64>,

    /// Delete created resources before exiting
    #[arg(long, short = 'x', overrides_with = "no_cleanup_resources")]
    pub cleanup_resources: bool,

    /// Leave created resources in place
    #[arg(long, overrides_with = "cleanup_resources")]
    pub no_cleanup_resources: bool,

    /// Finding fields that flag the run, as field:value,field:value
    #[arg(long, short = 'f')]
    pub failure_metrics: Option<String>,

    /// AWS region, defaults to the one from the environment
    #[arg(long)]
    pub region: Option<String>,

    #[arg(long, short)]
    pub verbose: bool,
}

impl Cli {
    /// The options given on the command line, in the same shape as a config file.
    pub fn overrides(&self) -> Result<RawConfig, ConfigError> {
        let target_tags = self
            .target_tags
            .as_deref()
            .map(PairList::parse_cli)
            .transpose()
            .map_err(|reason| ConfigError::InvalidOption {
                option: "target_tags",
                reason,
            })?;

        let failure_metrics = self
            .failure_metrics
            .as_deref()
            .map(PairList::parse_cli)
            .transpose()
            .map_err(|reason| ConfigError::InvalidOption {
                option: "failure_metrics",
                reason,
            })?;

        let rules_to_run = self.rules_to_run.as_deref().map(|raw| {
            CommaList(
                raw.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(RuleSelection::from_name)
                    .collect(),
            )
        });

        let cleanup_resources = match (self.cleanup_resources, self.no_cleanup_resources) {
            (true, _) => Some(ScalarString("true".to_string())),
            (false, true) => Some(ScalarString("false".to_string())),
            (false, false) => None,
        };

        Ok(RawConfig {
            aws_name_prefix: self.aws_name_prefix.clone(),
            rules_to_run,
            target_tags,
            asset_duration: self.asset_duration.map(|secs| ScalarString(secs.to_string())),
            cleanup_resources,
            failure_metrics,
            region: self.region.clone(),
        })
    }

    /// Config file layered under the command line, then validated.
    pub fn run_config(&self) -> Result<RunConfig, ConfigError> {
        let overrides = self.overrides()?;

        RawConfig::load_or_default(self.config.as_deref())?
            .merge(overrides)
            .validate()
    }
}
