//! Service upgrade configuration.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use crate::domain::{BatchPolicy, LabelSelector};
use crate::error::ConfigError;

pub const DEFAULT_IMAGE: &str = "nginx:latest";
pub const DEFAULT_BATCH_SIZE: u64 = 1;
pub const DEFAULT_INTERVAL_SECS: u64 = 2;

const IMAGE_TAG_PATTERN: &str = r"^[\w][\w.-]*$";

static IMAGE_TAG: OnceLock<Regex> = OnceLock::new();

fn image_tag_pattern() -> &'static Regex {
    IMAGE_TAG.get_or_init(|| Regex::new(IMAGE_TAG_PATTERN).expect("image tag pattern compiles"))
}

/// Check a docker image tag (`latest`, `1.2.3-rc.1`)
pub fn validate_image_tag(tag: &str) -> Result<(), ConfigError> {
    let valid = image_tag_pattern().is_match(tag) && tag.len() <= 128;
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidImageTag {
            tag: tag.to_string(),
        })
    }
}

/// Split `image` into repository and tag. The tag is `None` when absent.
fn split_tag(image: &str) -> (&str, Option<&str>) {
    let name_start = image.rfind('/').map_or(0, |i| i + 1);
    match image[name_start..].rfind(':') {
        Some(i) => (&image[..name_start + i], Some(&image[name_start + i + 1..])),
        None => (image, None),
    }
}

/// Replace the tag of `image` with `tag`
pub fn with_tag(image: &str, tag: &str) -> Result<String, ConfigError> {
    validate_image_tag(tag)?;
    let (repository, _) = split_tag(image);
    Ok(format!("{}:{}", repository, tag))
}

/// Parse repeated `KEY=VALUE` selector flags.
///
/// Each entry must contain exactly one `=`. Later duplicates win.
pub fn parse_selectors<S: AsRef<str>>(entries: &[S]) -> Result<BTreeMap<String, String>, ConfigError> {
    let mut selector = BTreeMap::new();
    for entry in entries {
        let entry = entry.as_ref();
        let parts: Vec<&str> = entry.split('=').collect();
        let [key, value] = parts.as_slice() else {
            return Err(ConfigError::InvalidSelector {
                input: entry.to_string(),
            });
        };
        selector.insert(key.to_string(), value.to_string());
    }
    Ok(selector)
}

/// Optional service upgrade file (YAML or JSON)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceUpgradeFile {
    #[serde(default)]
    pub service_selector: BTreeMap<String, String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub batch_size: Option<u64>,
    /// Seconds between batches
    #[serde(default)]
    pub interval: Option<u64>,
    #[serde(default)]
    pub start_first: Option<bool>,
}

impl ServiceUpgradeFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = super::read_file(path)?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            message: format!("{}: {}", path.display(), e),
        })
    }
}

/// Values given on the command line; each one overrides the file
#[derive(Debug, Clone, Default)]
pub struct ServiceOverrides {
    pub selectors: Vec<String>,
    pub image: Option<String>,
    pub tag: Option<String>,
    pub batch_size: Option<u64>,
    pub interval: Option<u64>,
    pub start_first: bool,
}

/// Everything a service upgrade run needs
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceUpgradeConfig {
    pub selector: LabelSelector,
    /// Image reference the matched launch configurations move to
    pub image: String,
    pub batch: BatchPolicy,
}

impl ServiceUpgradeConfig {
    /// Merge flags over an optional file and validate the result
    pub fn resolve(
        overrides: ServiceOverrides,
        file: Option<ServiceUpgradeFile>,
    ) -> Result<Self, ConfigError> {
        let file = file.unwrap_or_default();

        let mut labels = file.service_selector;
        labels.extend(parse_selectors(&overrides.selectors)?);
        if labels.is_empty() {
            return Err(ConfigError::MissingField {
                field: "selector".to_string(),
            });
        }

        let mut image = overrides
            .image
            .or(file.image)
            .unwrap_or_else(|| DEFAULT_IMAGE.to_string());
        super::require("image", &image)?;
        match overrides.tag.or(file.tag) {
            Some(tag) => image = with_tag(&image, &tag)?,
            None => {
                if let (_, Some(tag)) = split_tag(&image) {
                    validate_image_tag(tag)?;
                }
            }
        }

        let batch = BatchPolicy::new(
            overrides
                .batch_size
                .or(file.batch_size)
                .unwrap_or(DEFAULT_BATCH_SIZE),
            overrides
                .interval
                .or(file.interval)
                .unwrap_or(DEFAULT_INTERVAL_SECS),
            overrides.start_first || file.start_first.unwrap_or(false),
        )?;

        Ok(Self {
            selector: LabelSelector::new(labels),
            image,
            batch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overrides(selectors: &[&str]) -> ServiceOverrides {
        ServiceOverrides {
            selectors: selectors.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_selectors() {
        let selector = parse_selectors(&["app=web", "tier=front"]).unwrap();
        assert_eq!(selector["app"], "web");
        assert_eq!(selector["tier"], "front");
    }

    #[test]
    fn test_parse_selectors_arity() {
        for bad in ["app", "a=b=c"] {
            let err = parse_selectors(&[bad]).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidSelector { ref input } if input == bad));
        }
    }

    #[test]
    fn test_image_tag_pattern_compiles() {
        assert!(Regex::new(IMAGE_TAG_PATTERN).is_ok());
        assert!(image_tag_pattern().is_match("latest"));
    }

    #[test]
    fn test_image_tag_full_match() {
        assert!(validate_image_tag("latest").is_ok());
        assert!(validate_image_tag("1.2.3-rc.1").is_ok());
        assert!(validate_image_tag("v2_build").is_ok());
        assert!(validate_image_tag("-bad").is_err());
        assert!(validate_image_tag("1.0/evil").is_err());
        assert!(validate_image_tag("").is_err());
    }

    #[test]
    fn test_with_tag_keeps_registry_port() {
        assert_eq!(with_tag("registry:5000/web:1", "2").unwrap(), "registry:5000/web:2");
        assert_eq!(with_tag("registry:5000/web", "2").unwrap(), "registry:5000/web:2");
        assert_eq!(with_tag("nginx", "1.25").unwrap(), "nginx:1.25");
    }

    #[test]
    fn test_defaults() {
        let config = ServiceUpgradeConfig::resolve(overrides(&["app=web"]), None).unwrap();
        assert_eq!(config.image, DEFAULT_IMAGE);
        assert_eq!(config.batch.batch_size(), 1);
        assert_eq!(config.batch.interval_millis(), 2000);
        assert!(!config.batch.start_first());
    }

    #[test]
    fn test_flags_override_file() {
        let file: ServiceUpgradeFile = serde_yaml::from_str(
            "serviceSelector:\n  app: web\n  env: prod\nimage: registry/web:1\ntag: \"7\"\nbatchSize: 3\ninterval: 10\nstartFirst: true\n",
        )
        .unwrap();
        let mut flags = overrides(&["env=staging"]);
        flags.batch_size = Some(5);

        let config = ServiceUpgradeConfig::resolve(flags, Some(file)).unwrap();
        assert_eq!(config.selector.to_string(), "app=web,env=staging");
        assert_eq!(config.image, "registry/web:7");
        assert_eq!(config.batch.batch_size(), 5);
        assert_eq!(config.batch.interval_secs(), 10);
        assert!(config.batch.start_first());
    }

    #[test]
    fn test_selector_required() {
        assert!(matches!(
            ServiceUpgradeConfig::resolve(overrides(&[]), None),
            Err(ConfigError::MissingField { .. })
        ));
    }

    #[test]
    fn test_invalid_inline_tag_rejected() {
        let mut flags = overrides(&["app=web"]);
        flags.image = Some("web:-1".to_string());
        assert!(matches!(
            ServiceUpgradeConfig::resolve(flags, None),
            Err(ConfigError::InvalidImageTag { .. })
        ));
    }

    #[test]
    fn test_zero_batch_rejected() {
        let mut flags = overrides(&["app=web"]);
        flags.batch_size = Some(0);
        assert!(ServiceUpgradeConfig::resolve(flags, None).is_err());
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upgrade.yml");
        std::fs::write(&path, "{\"serviceSelector\": {\"app\": \"web\"}, \"batchSize\": 2}").unwrap();

        let file = ServiceUpgradeFile::load(&path).unwrap();
        assert_eq!(file.batch_size, Some(2));
        assert_eq!(file.service_selector["app"], "web");
    }
}
