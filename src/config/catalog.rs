//! Catalog publish configuration.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::infrastructure::GitAuthor;

pub const DEFAULT_BRANCH: &str = "master";

/// Everything a catalog publish run needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogPublishConfig {
    pub repo_url: String,
    pub branch: String,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Directory holding cached checkouts
    pub cache_root: PathBuf,
    pub folder_name: String,
    /// Publish under `infra-templates/` instead of `templates/`
    pub system: bool,
    pub docker_compose: String,
    pub rancher_compose: String,
    pub readme: String,
    pub author: GitAuthor,
}

/// Raw catalog flags before files are read
#[derive(Debug, Clone, Default)]
pub struct CatalogSources<'a> {
    pub repo_url: &'a str,
    pub branch: Option<&'a str>,
    pub user: Option<&'a str>,
    pub password: Option<&'a str>,
    pub cache_root: Option<&'a Path>,
    pub folder_name: &'a str,
    pub system: bool,
    pub compose_file: Option<&'a Path>,
    pub rancher_file: Option<&'a Path>,
    pub readme_file: Option<&'a Path>,
    pub author_name: Option<&'a str>,
    pub author_email: Option<&'a str>,
}

impl CatalogPublishConfig {
    pub fn load(sources: CatalogSources<'_>) -> Result<Self, ConfigError> {
        super::require("repourl", sources.repo_url)?;
        super::require("foldername", sources.folder_name)?;
        if sources.folder_name.contains('/') || sources.folder_name == ".." {
            return Err(ConfigError::InvalidValue {
                field: "foldername".to_string(),
                value: sources.folder_name.to_string(),
            });
        }

        let branch = sources
            .branch
            .filter(|b| !b.is_empty())
            .unwrap_or(DEFAULT_BRANCH)
            .to_string();

        let cache_root = sources
            .cache_root
            .map(Path::to_path_buf)
            .unwrap_or_else(|| std::env::temp_dir().join("upgrader-catalog"));

        let read = |path: Option<&Path>| -> Result<String, ConfigError> {
            path.map(super::read_file).transpose().map(Option::unwrap_or_default)
        };

        let mut author = GitAuthor::default();
        if let Some(name) = sources.author_name.filter(|n| !n.is_empty()) {
            author.name = name.to_string();
        }
        if let Some(email) = sources.author_email.filter(|e| !e.is_empty()) {
            author.email = email.to_string();
        }

        Ok(Self {
            repo_url: sources.repo_url.to_string(),
            branch,
            user: sources.user.map(str::to_string),
            password: sources.password.map(str::to_string),
            cache_root,
            folder_name: sources.folder_name.to_string(),
            system: sources.system,
            docker_compose: read(sources.compose_file)?,
            rancher_compose: read(sources.rancher_file)?,
            readme: read(sources.readme_file)?,
            author,
        })
    }
}
