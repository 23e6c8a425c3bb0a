//! Catalog publisher - appends a numbered template revision to a catalog
//! repository and pushes it.
//!
//! Revision directories are numbered `0, 1, 2, ...` under
//! `templates/<folder>` (or `infra-templates/<folder>` for system
//! templates). Creating the directory, writing files and pushing are not
//! transactional: a failed push leaves the new directory behind and the
//! next run numbers past it.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::CatalogPublishConfig;
use crate::error::{GitError, UpgradeError};
use crate::infrastructure::GitClient;

pub const DOCKER_COMPOSE_FILE: &str = "docker-compose.yml";
pub const RANCHER_COMPOSE_FILE: &str = "rancher-compose.yml";
pub const README_FILE: &str = "README.md";

/// A revision that was written and pushed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedRevision {
    pub revision: i64,
    pub path: PathBuf,
    /// Checkout HEAD before the revision was committed
    pub base_commit: String,
}

/// Local checkout location for one repository and branch
pub fn cache_path(cache_root: &Path, repo_url: &str, branch: &str) -> PathBuf {
    let digest = md5::compute(format!("{}{}", repo_url, branch).as_bytes());
    cache_root.join(format!("{:x}", digest))
}

/// Storage directory of a template inside a checkout
pub fn template_dir(checkout: &Path, folder: &str, system: bool) -> PathBuf {
    let root = if system { "infra-templates" } else { "templates" };
    checkout.join(root).join(folder)
}

/// Highest numeric revision directory in `dir`, or -1 when there is none.
///
/// Non-numeric names and plain files are ignored.
pub async fn latest_version(dir: &Path) -> Result<i64, UpgradeError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| UpgradeError::io(dir, e))?;

    let mut latest: i64 = -1;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| UpgradeError::io(dir, e))?
    {
        let is_dir = entry
            .file_type()
            .await
            .map_err(|e| UpgradeError::io(entry.path(), e))?
            .is_dir();
        if !is_dir {
            continue;
        }
        if let Some(revision) = entry.file_name().to_str().and_then(|n| n.parse::<i64>().ok()) {
            latest = latest.max(revision);
        }
    }

    Ok(latest)
}

/// URL to push to, with credentials embedded for `https://` remotes.
///
/// Other transports are returned as-is. An `https://` remote without
/// both credentials is rejected.
pub fn push_url(
    repo_url: &str,
    user: Option<&str>,
    password: Option<&str>,
) -> Result<String, GitError> {
    let Some(rest) = repo_url.strip_prefix("https://") else {
        return Ok(repo_url.to_string());
    };

    match (user.filter(|u| !u.is_empty()), password.filter(|p| !p.is_empty())) {
        (Some(user), Some(password)) => Ok(format!(
            "https://{}:{}@{}",
            urlencoding::encode(user),
            urlencoding::encode(password),
            rest
        )),
        _ => Err(GitError::MissingCredentials {
            url: repo_url.to_string(),
        }),
    }
}

pub struct CatalogPublisher<'a> {
    config: &'a CatalogPublishConfig,
}

impl<'a> CatalogPublisher<'a> {
    pub fn new(config: &'a CatalogPublishConfig) -> Self {
        Self { config }
    }

    /// Clone or refresh the cached checkout. Returns its path and HEAD.
    pub async fn prepare_checkout(&self) -> Result<(PathBuf, String), UpgradeError> {
        let config = self.config;
        let checkout = cache_path(&config.cache_root, &config.repo_url, &config.branch);
        tokio::fs::create_dir_all(&checkout)
            .await
            .map_err(|e| UpgradeError::io(&checkout, e))?;

        if checkout.join(".git").exists() {
            debug!("Updating cached checkout {}", checkout.display());
            GitClient::in_dir(&checkout).update(&config.branch).await?;
        } else {
            debug!("Cloning into {}", checkout.display());
            GitClient::new()
                .clone_branch(&config.repo_url, &config.branch, &checkout)
                .await?;
        }

        let commit = GitClient::in_dir(&checkout).head_commit().await?;
        info!("catalog checkout at {}", commit);
        Ok((checkout, commit))
    }

    /// Allocate the next revision under `dir` and write its files
    pub async fn write_revision(&self, dir: &Path) -> Result<(i64, PathBuf), UpgradeError> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| UpgradeError::io(dir, e))?;

        let revision = latest_version(dir).await? + 1;
        let revision_dir = dir.join(revision.to_string());
        tokio::fs::create_dir(&revision_dir)
            .await
            .map_err(|e| UpgradeError::io(&revision_dir, e))?;

        let mut files = vec![
            (DOCKER_COMPOSE_FILE, &self.config.docker_compose),
            (RANCHER_COMPOSE_FILE, &self.config.rancher_compose),
        ];
        if !self.config.readme.is_empty() {
            files.push((README_FILE, &self.config.readme));
        }

        for (name, content) in files {
            let path = revision_dir.join(name);
            tokio::fs::write(&path, content)
                .await
                .map_err(|e| UpgradeError::io(&path, e))?;
        }

        Ok((revision, revision_dir))
    }

    /// Publish a new revision and push it to the configured branch
    pub async fn publish(&self) -> Result<PublishedRevision, UpgradeError> {
        let config = self.config;
        let remote = push_url(
            &config.repo_url,
            config.user.as_deref(),
            config.password.as_deref(),
        )?;

        let (checkout, base_commit) = self.prepare_checkout().await?;
        let dir = template_dir(&checkout, &config.folder_name, config.system);
        let (revision, revision_dir) = self.write_revision(&dir).await?;
        info!(
            "prepared {} version {} at {}",
            config.folder_name,
            revision,
            revision_dir.display()
        );

        // git runs inside the checkout
        let staged = revision_dir.strip_prefix(&checkout).unwrap_or(revision_dir.as_path());
        let git = GitClient::in_dir(&checkout);
        git.add(&[staged]).await?;
        git.commit(
            &format!("Add {} version {}", config.folder_name, revision),
            &config.author,
        )
        .await?;
        git.push(&remote, &config.branch).await?;
        info!("pushed {} version {} to {}", config.folder_name, revision, config.branch);

        Ok(PublishedRevision {
            revision,
            path: revision_dir,
            base_commit,
        })
    }
}
