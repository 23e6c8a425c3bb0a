//! In-service upgrade strategy construction

use serde::Serialize;

use super::model::LaunchConfig;
use super::selector::MatchedConfigs;
use crate::error::ConfigError;

/// Run-level batching parameters shared by every upgraded service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPolicy {
    batch_size: u64,
    interval_secs: u64,
    start_first: bool,
}

impl BatchPolicy {
    /// Validate batching parameters.
    ///
    /// Batch size must be positive and the interval must fit in
    /// milliseconds without overflow.
    pub fn new(batch_size: u64, interval_secs: u64, start_first: bool) -> Result<Self, ConfigError> {
        if batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "batchsize".to_string(),
                value: batch_size.to_string(),
            });
        }
        if interval_secs.checked_mul(1000).is_none() {
            return Err(ConfigError::InvalidValue {
                field: "interval".to_string(),
                value: interval_secs.to_string(),
            });
        }

        Ok(Self {
            batch_size,
            interval_secs,
            start_first,
        })
    }

    pub fn batch_size(&self) -> u64 {
        self.batch_size
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }

    pub fn interval_millis(&self) -> u64 {
        self.interval_secs * 1000
    }

    pub fn start_first(&self) -> bool {
        self.start_first
    }
}

/// Strategy payload for the service upgrade action
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InServiceUpgradeStrategy {
    pub batch_size: u64,
    pub interval_millis: u64,
    pub start_first: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub launch_config: Option<LaunchConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_launch_configs: Option<Vec<LaunchConfig>>,
}

/// Service upgrade action input
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceUpgrade {
    pub in_service_strategy: InServiceUpgradeStrategy,
}

/// Build the strategy for one service from its matched configurations
pub fn build_strategy(policy: &BatchPolicy, matched: MatchedConfigs) -> ServiceUpgrade {
    let (launch_config, secondary_launch_configs) = match matched {
        MatchedConfigs::Primary(primary) => (Some(primary), None),
        MatchedConfigs::Secondary(secondaries) => (None, Some(secondaries)),
        MatchedConfigs::Both(primary, secondaries) => (Some(primary), Some(secondaries)),
    };

    ServiceUpgrade {
        in_service_strategy: InServiceUpgradeStrategy {
            batch_size: policy.batch_size(),
            interval_millis: policy.interval_millis(),
            start_first: policy.start_first(),
            launch_config,
            secondary_launch_configs,
        },
    }
}
