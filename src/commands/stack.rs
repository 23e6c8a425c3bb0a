use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::info;

use crate::config::{PlatformConfig, StackUpgradeConfig};
use crate::infrastructure::RancherClient;
use crate::services::StackUpgrader;
use crate::ui;

#[allow(clippy::too_many_arguments)]
pub async fn execute(
    platform: PlatformConfig,
    stack_name: String,
    to_latest: bool,
    compose_file: Option<PathBuf>,
    rancher_file: Option<PathBuf>,
    env_file: Option<PathBuf>,
    external_id: Option<String>,
    shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let config = StackUpgradeConfig::load(
        stack_name,
        to_latest,
        compose_file.as_deref(),
        rancher_file.as_deref(),
        env_file.as_deref(),
        external_id,
    )?;

    ui::print_header(&format!("Stack upgrade: {}", config.stack_name));
    if config.to_latest {
        info!("   Target: latest catalog revision");
    }
    if !config.external_id.is_empty() {
        info!("   Pinned revision: {}", config.external_id);
    }

    let client = RancherClient::new(&platform)
        .with_context(|| format!("Failed to create platform client for {}", platform.url))?;
    let report = StackUpgrader::new(&client, &client, shutdown)
        .run(&config)
        .await
        .with_context(|| format!("Upgrade of stack '{}' failed", config.stack_name))?;

    ui::print_reports(std::slice::from_ref(&report));
    Ok(())
}
