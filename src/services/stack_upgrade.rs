//! Stack upgrade - one named stack, optionally moved to its newest
//! catalog revision, driven through the same upgrade protocol as services.

use std::time::Instant;

use tokio::sync::watch;
use tracing::info;

use crate::config::StackUpgradeConfig;
use crate::domain::Stack;
use crate::error::{PlatformError, UpgradeError};
use crate::infrastructure::{Catalog, Platform};
use crate::services::driver::{complete_upgrade, PollPolicy, TargetReport, UpgradeOutcome};
use crate::services::template_resolver::{Resolution, TemplateResolver};

pub struct StackUpgrader<'a> {
    platform: &'a dyn Platform,
    catalog: &'a dyn Catalog,
    policy: PollPolicy,
    shutdown: watch::Receiver<bool>,
}

impl<'a> StackUpgrader<'a> {
    pub fn new(
        platform: &'a dyn Platform,
        catalog: &'a dyn Catalog,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            platform,
            catalog,
            policy: PollPolicy::default(),
            shutdown,
        }
    }

    async fn find_stack(&self, name: &str) -> Result<Stack, UpgradeError> {
        self.platform
            .list_stacks()
            .await?
            .into_iter()
            .find(|stack| stack.name == name)
            .ok_or_else(|| {
                PlatformError::NotFound {
                    kind: "Stack".to_string(),
                    name: name.to_string(),
                }
                .into()
            })
    }

    /// Upgrade the configured stack. Any failure aborts the run.
    pub async fn run(&mut self, config: &StackUpgradeConfig) -> Result<TargetReport, UpgradeError> {
        let started = Instant::now();
        let stack = self.find_stack(&config.stack_name).await?;

        let upgrade = if config.to_latest {
            match TemplateResolver::new(self.catalog).resolve(&stack, config).await? {
                Resolution::AlreadyLatest { external_id } => {
                    info!("Latest template version already ({})", external_id);
                    return Ok(TargetReport::new(
                        "stack",
                        stack.id,
                        stack.name,
                        started,
                        Ok(UpgradeOutcome::AlreadyLatest { external_id }),
                    ));
                }
                Resolution::Upgrade(upgrade) => upgrade,
            }
        } else {
            config.to_upgrade()
        };

        info!("upgrading stack '{}' ({})", stack.name, stack.id);
        let upgrading = self.platform.upgrade_stack(&stack, &upgrade).await?;
        let outcome =
            complete_upgrade(self.platform, upgrading, &self.policy, &mut self.shutdown).await?;

        Ok(TargetReport::new("stack", stack.id, stack.name, started, Ok(outcome)))
    }
}
