//! Platform resource representations
//!
//! These mirror the orchestration platform's JSON resources. Only the
//! fields the upgrade flow reads are typed; launch configurations keep
//! every other field in `extra` so a modified copy round-trips intact.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Label forced onto a matched launch configuration so hosts re-pull the image
pub const PULL_IMAGE_LABEL: &str = "io.rancher.container.pull_image";

/// Lifecycle state a target reports once an upgrade is ready to finalize
pub const UPGRADED_STATE: &str = "upgraded";

/// Treat an explicit JSON `null` the same as a missing field.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Platform-reported transition flag
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Option<String>")]
pub enum Transitioning {
    /// No operation in flight (`no`)
    #[default]
    Settled,
    /// Mid-operation (`yes`)
    Pending,
    /// The last operation failed (`error`)
    Error,
    /// Anything else the platform may report
    Unknown(String),
}

impl From<Option<String>> for Transitioning {
    fn from(value: Option<String>) -> Self {
        match value.as_deref() {
            None | Some("") | Some("no") => Self::Settled,
            Some("yes") => Self::Pending,
            Some("error") => Self::Error,
            Some(other) => Self::Unknown(other.to_string()),
        }
    }
}

impl Transitioning {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Links and actions every platform resource carries
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceLinks {
    #[serde(default, deserialize_with = "nullable")]
    pub links: HashMap<String, String>,
    #[serde(default, deserialize_with = "nullable")]
    pub actions: HashMap<String, String>,
}

/// Container image, labels and runtime settings for one container role
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_uuid: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub labels: Map<String, Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LaunchConfig {
    /// Point this configuration at `image` and force an image pull on upgrade
    pub fn retarget(&mut self, image: &str) {
        self.image_uuid = Some(format!("docker:{}", image));
        self.labels.insert(
            PULL_IMAGE_LABEL.to_string(),
            Value::String("always".to_string()),
        );
    }
}

/// A managed workload instance
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,

    #[serde(default, deserialize_with = "nullable")]
    pub name: String,

    #[serde(default, deserialize_with = "nullable")]
    pub state: String,

    #[serde(default)]
    pub transitioning: Transitioning,

    #[serde(default, deserialize_with = "nullable")]
    pub transitioning_message: String,

    #[serde(default)]
    pub launch_config: Option<LaunchConfig>,

    #[serde(default, deserialize_with = "nullable")]
    pub secondary_launch_configs: Vec<LaunchConfig>,

    #[serde(flatten)]
    pub resource: ResourceLinks,
}

/// A named collection of services deployed together
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stack {
    pub id: String,

    #[serde(default, deserialize_with = "nullable")]
    pub name: String,

    #[serde(default, deserialize_with = "nullable")]
    pub state: String,

    #[serde(default)]
    pub transitioning: Transitioning,

    #[serde(default, deserialize_with = "nullable")]
    pub transitioning_message: String,

    #[serde(default, deserialize_with = "nullable")]
    pub external_id: String,

    #[serde(default)]
    pub environment: Option<Map<String, Value>>,

    #[serde(flatten)]
    pub resource: ResourceLinks,
}

/// Stack upgrade action input
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StackUpgrade {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub docker_compose: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub rancher_compose: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub external_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<Map<String, Value>>,
}

/// Catalog template revision object
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateVersion {
    /// Candidate newer revisions, keyed by version label, valued by URL
    #[serde(default, deserialize_with = "nullable")]
    pub upgrade_version_links: Map<String, Value>,

    #[serde(default, deserialize_with = "nullable")]
    pub files: Map<String, Value>,
}

/// Paged collection wrapper returned by list endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct Collection<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,

    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub next: Option<String>,
}

/// A resource that moves through the upgrade state machine
pub trait Upgradable {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn state(&self) -> &str;
    fn transitioning(&self) -> &Transitioning;
    fn transitioning_message(&self) -> &str;
}

impl Upgradable for Service {
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn state(&self) -> &str {
        &self.state
    }
    fn transitioning(&self) -> &Transitioning {
        &self.transitioning
    }
    fn transitioning_message(&self) -> &str {
        &self.transitioning_message
    }
}

impl Upgradable for Stack {
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn state(&self) -> &str {
        &self.state
    }
    fn transitioning(&self) -> &Transitioning {
        &self.transitioning
    }
    fn transitioning_message(&self) -> &str {
        &self.transitioning_message
    }
}
