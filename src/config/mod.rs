//! # Configuration records
//!
//! Every subcommand resolves its flags, environment variables and optional
//! files into one validated record before any network call is made:
//!
//! 1. **Platform** - endpoint, credentials, project scope, timeouts
//! 2. **Service** - label selector, target image, batch policy
//! 3. **Stack** - stack name, compose documents, environment, catalog mode
//! 4. **Catalog** - repository, branch, credentials, template folder
//!
//! Records are plain data; the core never reads flags or files itself.

mod catalog;
mod platform;
mod service;
mod stack;

use std::path::Path;

use crate::error::ConfigError;

pub use catalog::{CatalogPublishConfig, CatalogSources};
pub use platform::PlatformConfig;
pub use service::{ServiceOverrides, ServiceUpgradeConfig, ServiceUpgradeFile};
pub use stack::StackUpgradeConfig;

/// Read a whole file referenced by a flag
pub(crate) fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::FileUnreadable {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Reject an empty required value
pub(crate) fn require(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingField {
            field: field.to_string(),
        });
    }
    Ok(())
}
