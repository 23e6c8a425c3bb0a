use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::{CatalogPublishConfig, CatalogSources};
use crate::infrastructure::git::redact_url;
use crate::services::CatalogPublisher;
use crate::ui;

/// Flags of the `catalog` subcommand
pub struct CatalogArgs {
    pub repo_url: String,
    pub branch: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub cache_root: Option<PathBuf>,
    pub folder_name: String,
    pub system: bool,
    pub compose_file: PathBuf,
    pub rancher_file: PathBuf,
    pub readme: Option<PathBuf>,
    pub author_name: Option<String>,
    pub author_email: Option<String>,
}

pub async fn execute(args: CatalogArgs) -> Result<()> {
    let config = CatalogPublishConfig::load(CatalogSources {
        repo_url: &args.repo_url,
        branch: Some(&args.branch),
        user: args.user.as_deref(),
        password: args.password.as_deref(),
        cache_root: args.cache_root.as_deref(),
        folder_name: &args.folder_name,
        system: args.system,
        compose_file: Some(&args.compose_file),
        rancher_file: Some(&args.rancher_file),
        readme_file: args.readme.as_deref(),
        author_name: args.author_name.as_deref(),
        author_email: args.author_email.as_deref(),
    })?;

    ui::print_header(&format!("Catalog publish: {}", config.folder_name));
    info!("   Repository: {}", redact_url(&config.repo_url));
    info!("   Branch: {}", config.branch);
    info!("   Cache: {}", config.cache_root.display());

    let published = CatalogPublisher::new(&config)
        .publish()
        .await
        .with_context(|| format!("Failed to publish template {}", config.folder_name))?;

    ui::print_success(&format!(
        "Published {} version {} ({})",
        config.folder_name,
        published.revision,
        published.path.display()
    ));
    Ok(())
}
