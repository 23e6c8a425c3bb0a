//! Platform endpoint configuration.

use std::time::Duration;

use crate::error::ConfigError;

/// Whole-request timeout for platform calls
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the platform API lives and how to authenticate against it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformConfig {
    /// API endpoint, e.g. `http://rancher:8080/v2-beta`
    pub url: String,
    pub access_key: String,
    pub secret_key: String,
    /// Environment (project) id collections are scoped to
    pub project_id: Option<String>,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl PlatformConfig {
    pub fn new(
        url: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        project_id: Option<String>,
    ) -> Result<Self, ConfigError> {
        let url = url.into();
        super::require("url", &url)?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "url".to_string(),
                value: url,
            });
        }

        Ok(Self {
            url,
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            project_id: project_id.filter(|p| !p.is_empty()),
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        })
    }
}
