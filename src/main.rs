use anyhow::Result;
use clap::Parser;
use tokio::sync::watch;
use tracing::warn;

mod cli;
mod commands;
mod config;
mod domain;
mod error;
mod infrastructure;
mod services;
mod ui;

use cli::{Cli, Commands};
use commands::catalog::CatalogArgs;
use config::{PlatformConfig, ServiceOverrides};

/// Platform endpoint from the global flags
fn platform_config(
    url: Option<String>,
    access_key: Option<String>,
    secret_key: Option<String>,
    environment: Option<String>,
) -> Result<PlatformConfig, error::ConfigError> {
    PlatformConfig::new(
        url.unwrap_or_default(),
        access_key.unwrap_or_default(),
        secret_key.unwrap_or_default(),
        environment,
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging with LOGGING env var support
    // LOGGING=debug,info,warn,error or just LOGGING=debug
    let log_level = std::env::var("LOGGING")
        .or_else(|_| std::env::var("LOG_LEVEL"))
        .unwrap_or_else(|_| {
            if cli.verbose {
                "debug".to_string()
            } else {
                "info".to_string()
            }
        });

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(false)
        .init();

    // Ctrl-C stops every poll loop at its next sleep
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling in-flight upgrades");
            let _ = shutdown_tx.send(true);
        }
    });

    let Cli {
        command,
        url,
        access_key,
        secret_key,
        environment,
        ..
    } = cli;

    match command {
        Commands::Service {
            selectors,
            batch_size,
            interval,
            start_first,
            image,
            tag,
            config,
        } => {
            let platform = platform_config(url, access_key, secret_key, environment)?;
            commands::service::execute(
                platform,
                ServiceOverrides {
                    selectors,
                    image,
                    tag,
                    batch_size,
                    interval,
                    start_first,
                },
                config,
                shutdown_rx,
            )
            .await?;
        }
        Commands::Stack {
            stack_name,
            to_latest,
            compose_file,
            rancher_file,
            env_file,
            external_id,
        } => {
            let platform = platform_config(url, access_key, secret_key, environment)?;
            commands::stack::execute(
                platform,
                stack_name,
                to_latest,
                compose_file,
                rancher_file,
                env_file,
                external_id,
                shutdown_rx,
            )
            .await?;
        }
        Commands::Catalog {
            repo_url,
            branch,
            user,
            password,
            cache_root,
            folder_name,
            system,
            compose_file,
            rancher_file,
            readme,
            author_name,
            author_email,
        } => {
            commands::catalog::execute(CatalogArgs {
                repo_url,
                branch,
                user,
                password,
                cache_root,
                folder_name,
                system,
                compose_file,
                rancher_file,
                readme,
                author_name,
                author_email,
            })
            .await?;
        }
    }

    Ok(())
}
