//! Stack upgrade configuration.

use std::path::Path;

use serde_json::{Map, Value};

use crate::domain::StackUpgrade;
use crate::error::ConfigError;

/// Everything a stack upgrade run needs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StackUpgradeConfig {
    pub stack_name: String,
    /// Resolve the newest catalog revision before upgrading
    pub to_latest: bool,
    pub docker_compose: String,
    pub rancher_compose: String,
    /// Environment override; `None` keeps whatever the resolver decides
    pub environment: Option<Map<String, Value>>,
    /// Pinned template revision, empty when not pinned
    pub external_id: String,
}

impl StackUpgradeConfig {
    /// Read the optional compose and env files and validate the record
    pub fn load(
        stack_name: String,
        to_latest: bool,
        compose_file: Option<&Path>,
        rancher_file: Option<&Path>,
        env_file: Option<&Path>,
        external_id: Option<String>,
    ) -> Result<Self, ConfigError> {
        super::require("stackname", &stack_name)?;

        let docker_compose = compose_file.map(super::read_file).transpose()?;
        let rancher_compose = rancher_file.map(super::read_file).transpose()?;
        let environment = env_file
            .map(|path| super::read_file(path).map(|content| parse_env_file(&content)))
            .transpose()?;

        Ok(Self {
            stack_name,
            to_latest,
            docker_compose: docker_compose.unwrap_or_default(),
            rancher_compose: rancher_compose.unwrap_or_default(),
            environment,
            external_id: external_id.unwrap_or_default(),
        })
    }

    /// Upgrade input built from the caller's values alone
    pub fn to_upgrade(&self) -> StackUpgrade {
        StackUpgrade {
            docker_compose: self.docker_compose.clone(),
            rancher_compose: self.rancher_compose.clone(),
            external_id: self.external_id.clone(),
            environment: self.environment.clone(),
        }
    }
}

/// Parse `KEY=VALUE` lines. A line without `=` maps its key to an empty
/// value; blank lines are skipped. Values keep any further `=`.
pub fn parse_env_file(content: &str) -> Map<String, Value> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| match line.split_once('=') {
            Some((key, value)) => (key.to_string(), Value::String(value.to_string())),
            None => (line.to_string(), Value::String(String::new())),
        })
        .collect()
}
