use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::info;

use crate::config::{PlatformConfig, ServiceOverrides, ServiceUpgradeConfig, ServiceUpgradeFile};
use crate::infrastructure::RancherClient;
use crate::services::ServiceUpgrader;
use crate::ui;

pub async fn execute(
    platform: PlatformConfig,
    overrides: ServiceOverrides,
    config_file: Option<PathBuf>,
    shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let file = config_file
        .as_deref()
        .map(ServiceUpgradeFile::load)
        .transpose()?;
    let config = ServiceUpgradeConfig::resolve(overrides, file)?;

    ui::print_header("Service upgrade");
    info!("   Selector: {}", config.selector);
    info!("   Image: {}", config.image);
    info!(
        "   Batch size: {}, interval: {}s, start first: {}",
        config.batch.batch_size(),
        config.batch.interval_secs(),
        config.batch.start_first()
    );

    let client = RancherClient::new(&platform)
        .with_context(|| format!("Failed to create platform client for {}", platform.url))?;
    let reports = ServiceUpgrader::new(Arc::new(client), shutdown)
        .run(&config)
        .await?;

    ui::print_reports(&reports);

    let failed = reports.iter().filter(|r| r.is_failure()).count();
    if failed > 0 {
        anyhow::bail!("{} of {} service upgrade(s) failed", failed, reports.len());
    }
    Ok(())
}
