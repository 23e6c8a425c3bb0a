//! Template resolver - moves a catalog stack to its newest revision
//!
//! Works against the project-scoped catalog index. The project id comes
//! from an identity probe that runs at most once per resolver.

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::StackUpgradeConfig;
use crate::domain::template::{compose_files, latest_upgrade_link, trim_external_id};
use crate::domain::{Stack, StackUpgrade, CATALOG_SCHEME};
use crate::error::{TemplateError, UpgradeError};
use crate::infrastructure::Catalog;

/// What a stack should be upgraded to
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The stack already runs the resolved revision
    AlreadyLatest { external_id: String },
    Upgrade(StackUpgrade),
}

pub struct TemplateResolver<'a> {
    catalog: &'a dyn Catalog,
    project_id: Option<String>,
}

impl<'a> TemplateResolver<'a> {
    pub fn new(catalog: &'a dyn Catalog) -> Self {
        Self {
            catalog,
            project_id: None,
        }
    }

    async fn project_id(&mut self) -> Result<String, UpgradeError> {
        if let Some(ref id) = self.project_id {
            return Ok(id.clone());
        }
        let id = self.catalog.project_id().await?;
        debug!("Catalog requests scoped to project {}", id);
        self.project_id = Some(id.clone());
        Ok(id)
    }

    /// Ask the catalog to re-index its template repositories
    pub async fn refresh(&mut self) -> Result<(), UpgradeError> {
        let project_id = self.project_id().await?;
        info!("refreshing catalog templates...");
        self.catalog.refresh_templates(&project_id).await?;
        Ok(())
    }

    /// Newest revision reachable from `current`.
    ///
    /// `current` is returned unchanged when its revision object lists no
    /// upgrade candidates; otherwise the winner is returned in
    /// `catalog://` form.
    pub async fn latest_external_id(&mut self, current: &str) -> Result<String, UpgradeError> {
        let project_id = self.project_id().await?;
        let version = self.catalog.template_version(&project_id, current).await?;

        match latest_upgrade_link(&version.upgrade_version_links)? {
            Some(latest) => Ok(format!("{}{}", CATALOG_SCHEME, latest)),
            None => Ok(current.to_string()),
        }
    }

    /// Compose documents of the revision addressed by `external_id`
    async fn revision_files(&mut self, external_id: &str) -> Result<Map<String, Value>, UpgradeError> {
        let project_id = self.project_id().await?;
        let version = self.catalog.template_version(&project_id, external_id).await?;
        Ok(version.files)
    }

    /// Decide the upgrade input that moves `stack` to its newest revision.
    ///
    /// A pinned external id in `request` skips resolution and compose
    /// extraction, but the catalog is still refreshed. Caller compose
    /// documents always win over the template's files.
    pub async fn resolve(
        &mut self,
        stack: &Stack,
        request: &StackUpgradeConfig,
    ) -> Result<Resolution, UpgradeError> {
        if stack.external_id.is_empty() {
            return Err(TemplateError::NotFromCatalog {
                stack: stack.name.clone(),
            }
            .into());
        }

        self.refresh().await?;

        let mut upgrade = request.to_upgrade();

        if upgrade.external_id.is_empty() {
            let latest = self.latest_external_id(&stack.external_id).await?;
            if latest == stack.external_id {
                return Ok(Resolution::AlreadyLatest { external_id: latest });
            }

            let files = self.revision_files(&latest).await?;
            let compose = compose_files(&files);
            if upgrade.docker_compose.is_empty() {
                upgrade.docker_compose = compose.docker_compose.unwrap_or_default();
            }
            if upgrade.rancher_compose.is_empty() {
                upgrade.rancher_compose = compose.rancher_compose.unwrap_or_default();
            }

            if upgrade.environment.is_none() && stack.environment.is_some() {
                info!("using previous environment.");
                upgrade.environment = stack.environment.clone();
            }

            debug!(
                "stack {} resolves {} -> {}",
                stack.name,
                trim_external_id(&stack.external_id),
                trim_external_id(&latest)
            );
            upgrade.external_id = latest;
        }

        if upgrade.external_id == stack.external_id {
            return Ok(Resolution::AlreadyLatest {
                external_id: upgrade.external_id,
            });
        }

        Ok(Resolution::Upgrade(upgrade))
    }
}
