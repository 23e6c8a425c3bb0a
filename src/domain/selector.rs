//! Label selector matching for launch configurations

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::model::{LaunchConfig, Service};

/// Required label key/value pairs, compared case-insensitively
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    labels: BTreeMap<String, String>,
}

fn fold_eq(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

impl LabelSelector {
    pub fn new(labels: BTreeMap<String, String>) -> Self {
        Self { labels }
    }

    /// True when every selector pair is present in `labels`.
    ///
    /// Keys and values are compared case-insensitively. Non-string label
    /// values never match. An empty selector matches nothing.
    pub fn matches(&self, labels: &Map<String, Value>) -> bool {
        if self.labels.is_empty() {
            return false;
        }

        self.labels.iter().all(|(key, value)| {
            labels.iter().any(|(k, v)| {
                fold_eq(k, key) && v.as_str().is_some_and(|v| fold_eq(v, value))
            })
        })
    }
}

impl std::fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .labels
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        write!(f, "{}", parts.join(","))
    }
}

/// Launch configurations of one service rewritten to the new image.
///
/// There is no "nothing matched" variant: such services are skipped
/// before a strategy is ever built.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchedConfigs {
    Primary(LaunchConfig),
    Secondary(Vec<LaunchConfig>),
    Both(LaunchConfig, Vec<LaunchConfig>),
}

#[cfg(test)]
impl MatchedConfigs {
    pub fn primary(&self) -> Option<&LaunchConfig> {
        match self {
            Self::Primary(p) | Self::Both(p, _) => Some(p),
            Self::Secondary(_) => None,
        }
    }

    pub fn secondaries(&self) -> &[LaunchConfig] {
        match self {
            Self::Secondary(s) | Self::Both(_, s) => s,
            Self::Primary(_) => &[],
        }
    }
}

/// Match `service`'s launch configurations against `selector`.
///
/// Matched configurations are cloned and retargeted to `image`; the
/// service itself is never modified. Returns `None` when neither the
/// primary nor any secondary configuration matches.
pub fn match_service(
    service: &Service,
    selector: &LabelSelector,
    image: &str,
) -> Option<MatchedConfigs> {
    let primary = service
        .launch_config
        .as_ref()
        .filter(|launch| selector.matches(&launch.labels))
        .map(|launch| {
            let mut launch = launch.clone();
            launch.retarget(image);
            launch
        });

    let secondaries: Vec<LaunchConfig> = service
        .secondary_launch_configs
        .iter()
        .filter(|launch| selector.matches(&launch.labels))
        .map(|launch| {
            let mut launch = launch.clone();
            launch.retarget(image);
            launch
        })
        .collect();

    match (primary, secondaries.is_empty()) {
        (Some(p), true) => Some(MatchedConfigs::Primary(p)),
        (Some(p), false) => Some(MatchedConfigs::Both(p, secondaries)),
        (None, false) => Some(MatchedConfigs::Secondary(secondaries)),
        (None, true) => None,
    }
}
