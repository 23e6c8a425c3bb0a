//! CLI definitions for upgrader
//!
//! This module contains all CLI argument parsing structures using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "upgrader",
    version,
    about = "Rolling upgrades for platform services, stacks and catalog templates",
    long_about = "Upgrades services by label selector, moves catalog stacks to their newest\ntemplate revision, and publishes new template revisions to a catalog repository."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Platform API endpoint URL
    #[arg(long, global = true, env = "CATTLE_URL")]
    pub url: Option<String>,

    /// Platform API access key
    #[arg(long, global = true, env = "CATTLE_ACCESS_KEY", hide_env_values = true)]
    pub access_key: Option<String>,

    /// Platform API secret key
    #[arg(long, global = true, env = "CATTLE_SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,

    /// Environment (project) id
    #[arg(long = "env", global = true, env = "ENVIRONMENT_ID")]
    pub environment: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upgrade every service whose launch configuration matches a selector
    Service {
        /// Label selector KEY=VALUE (can be specified multiple times)
        #[arg(long = "selector")]
        selectors: Vec<String>,

        /// Instances upgraded per batch [default: 1]
        #[arg(long = "batchsize")]
        batch_size: Option<u64>,

        /// Seconds between batches [default: 2]
        #[arg(long)]
        interval: Option<u64>,

        /// Start new containers before stopping old ones
        #[arg(long = "startfirst")]
        start_first: bool,

        /// Image to upgrade matching containers to [default: nginx:latest]
        #[arg(long)]
        image: Option<String>,

        /// Replace the image tag
        #[arg(long)]
        tag: Option<String>,

        /// YAML or JSON file with serviceSelector, image, tag, batchSize, interval, startFirst
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Upgrade one stack, optionally to its newest catalog revision
    Stack {
        /// Stack name to upgrade
        #[arg(long = "stackname", required = true)]
        stack_name: String,

        /// Upgrade to the latest catalog version
        #[arg(long = "tolatest")]
        to_latest: bool,

        /// docker-compose file for the stack upgrade
        #[arg(long)]
        compose_file: Option<PathBuf>,

        /// rancher-compose file for the stack upgrade
        #[arg(long)]
        rancher_file: Option<PathBuf>,

        /// KEY=VALUE answers file for the catalog template
        #[arg(long)]
        env_file: Option<PathBuf>,

        /// Pin a template revision instead of resolving the latest
        #[arg(long)]
        external_id: Option<String>,
    },

    /// Publish a new catalog template revision and push it
    Catalog {
        /// Git URL of the catalog repository
        #[arg(long = "repourl", required = true)]
        repo_url: String,

        /// Catalog repository branch
        #[arg(long, default_value = "master")]
        branch: String,

        /// Git username
        #[arg(long)]
        user: Option<String>,

        /// Git password
        #[arg(long, env = "GIT_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Cache directory for catalog checkouts
        #[arg(long = "cacheroot")]
        cache_root: Option<PathBuf>,

        /// Catalog template folder name
        #[arg(long = "foldername", required = true)]
        folder_name: String,

        /// Publish as a system (infra) template
        #[arg(long)]
        system: bool,

        /// docker-compose file path
        #[arg(long, default_value = "./docker-compose.yml")]
        compose_file: PathBuf,

        /// rancher-compose file path
        #[arg(long, default_value = "./rancher-compose.yml")]
        rancher_file: PathBuf,

        /// README file path
        #[arg(long)]
        readme: Option<PathBuf>,

        /// Commit author name
        #[arg(long)]
        author_name: Option<String>,

        /// Commit author email
        #[arg(long)]
        author_email: Option<String>,
    },
}
