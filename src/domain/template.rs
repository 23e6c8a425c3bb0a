//! Catalog template identifiers
//!
//! An external identifier addresses one template revision:
//! `catalog:template[:revision]`, where the template segment may be
//! `base*template`. Stacks store it with a `catalog://` prefix.

use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::TemplateError;

/// Prefix used for external identifiers handed back to the platform
pub const CATALOG_SCHEME: &str = "catalog://";

/// Parsed template-URL-path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplatePath {
    pub catalog: String,
    pub template: String,
    pub template_base: String,
    /// Revision or version segment, empty when absent
    pub revision: String,
}

impl TemplatePath {
    /// Revision as an integer, if one is present.
    pub fn revision_number(&self) -> Option<Result<i64, TemplateError>> {
        if self.revision.is_empty() {
            return None;
        }
        Some(self.revision.parse().map_err(|_| TemplateError::InvalidRevision {
            id: self.to_string(),
            value: self.revision.clone(),
        }))
    }
}

impl FromStr for TemplatePath {
    type Err = TemplateError;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let invalid = || TemplateError::InvalidPath {
            path: path.to_string(),
        };

        let segments: Vec<&str> = path.split(':').collect();
        let (catalog, template, revision) = match segments.as_slice() {
            [catalog, template] => (*catalog, *template, ""),
            [catalog, template, revision] => (*catalog, *template, *revision),
            _ => return Err(invalid()),
        };

        let (template_base, template) = match template.split('*').collect::<Vec<_>>().as_slice() {
            [template] => ("", *template),
            [base, template] => (*base, *template),
            _ => return Err(invalid()),
        };

        Ok(Self {
            catalog: catalog.to_string(),
            template: template.to_string(),
            template_base: template_base.to_string(),
            revision: revision.to_string(),
        })
    }
}

impl std::fmt::Display for TemplatePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:", self.catalog)?;
        if !self.template_base.is_empty() {
            write!(f, "{}*", self.template_base)?;
        }
        write!(f, "{}", self.template)?;
        if !self.revision.is_empty() {
            write!(f, ":{}", self.revision)?;
        }
        Ok(())
    }
}

/// Final `/`-separated segment of an identifier or link
pub fn trim_external_id(external_id: &str) -> &str {
    match external_id.rfind('/') {
        Some(idx) => &external_id[idx + 1..],
        None => external_id,
    }
}

/// Pick the upgrade link with the greatest revision.
///
/// Returns the trimmed identifier of the winner, or `None` when there are
/// no candidates. Comparison is strict so the first maximum seen wins.
/// `links` iterates in sorted label order, so a tie goes to the
/// alphabetically first version label, not the first one on the wire.
pub fn latest_upgrade_link(links: &Map<String, Value>) -> Result<Option<String>, TemplateError> {
    let mut best: Option<(i64, String)> = None;

    for link in links.values() {
        let Some(link) = link.as_str() else {
            continue;
        };
        let id = trim_external_id(link);
        let path: TemplatePath = id.parse()?;
        let revision = path
            .revision_number()
            .unwrap_or_else(|| {
                Err(TemplateError::InvalidRevision {
                    id: id.to_string(),
                    value: String::new(),
                })
            })?;

        if best.as_ref().map_or(true, |(max, _)| revision > *max) {
            best = Some((revision, id.to_string()));
        }
    }

    Ok(best.map(|(_, id)| id))
}

/// Compose documents found in a template revision's file set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposeFiles {
    pub docker_compose: Option<String>,
    pub rancher_compose: Option<String>,
}

/// Extract `docker-compose*` and `rancher-compose*` entries from `files`
pub fn compose_files(files: &Map<String, Value>) -> ComposeFiles {
    let mut compose = ComposeFiles::default();
    for (name, content) in files {
        let Some(content) = content.as_str() else {
            continue;
        };
        if name.starts_with("docker-compose") && compose.docker_compose.is_none() {
            compose.docker_compose = Some(content.to_string());
        } else if name.starts_with("rancher-compose") && compose.rancher_compose.is_none() {
            compose.rancher_compose = Some(content.to_string());
        }
    }
    compose
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_with_revision() {
        let path: TemplatePath = "cat:tmpl:5".parse().unwrap();
        assert_eq!(path.catalog, "cat");
        assert_eq!(path.template, "tmpl");
        assert_eq!(path.template_base, "");
        assert_eq!(path.revision, "5");
    }

    #[test]
    fn test_parse_with_base() {
        let path: TemplatePath = "cat:base*tmpl".parse().unwrap();
        assert_eq!(path.catalog, "cat");
        assert_eq!(path.template_base, "base");
        assert_eq!(path.template, "tmpl");
        assert_eq!(path.revision, "");
        assert!(path.revision_number().is_none());
    }

    #[test]
    fn test_parse_rejects_bad_arity() {
        assert!("a:b:c:d".parse::<TemplatePath>().is_err());
        assert!("nocolon".parse::<TemplatePath>().is_err());
        assert!("cat:a*b*c:1".parse::<TemplatePath>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for id in ["cat:tmpl:5", "cat:base*tmpl", "library:k8s*web:12"] {
            let path: TemplatePath = id.parse().unwrap();
            assert_eq!(path.to_string(), id);
        }
    }

    #[test]
    fn test_trim_external_id() {
        assert_eq!(trim_external_id("catalog://library:web:3"), "library:web:3");
        assert_eq!(
            trim_external_id("http://rancher/v1-catalog/templates/library:web:7"),
            "library:web:7"
        );
        assert_eq!(trim_external_id("library:web:3"), "library:web:3");
    }

    #[test]
    fn test_latest_upgrade_link_picks_max_revision() {
        let links = json!({
            "1.1": "http://rancher/v1-catalog/templates/library:web:4",
            "1.3": "http://rancher/v1-catalog/templates/library:web:10",
            "1.2": "http://rancher/v1-catalog/templates/library:web:9"
        });
        let latest = latest_upgrade_link(links.as_object().unwrap()).unwrap();
        assert_eq!(latest.as_deref(), Some("library:web:10"));
    }

    #[test]
    fn test_latest_upgrade_link_tie_goes_to_first_label() {
        let links = json!({
            "z": "http://rancher/v1-catalog/templates/library:web:5",
            "a": "http://rancher/v1-catalog/templates/mirror:web:5"
        });
        let latest = latest_upgrade_link(links.as_object().unwrap()).unwrap();
        assert_eq!(latest.as_deref(), Some("mirror:web:5"));
    }

    #[test]
    fn test_latest_upgrade_link_accepts_revision_zero() {
        let links = json!({"0.1": "http://rancher/v1-catalog/templates/library:web:0"});
        let latest = latest_upgrade_link(links.as_object().unwrap()).unwrap();
        assert_eq!(latest.as_deref(), Some("library:web:0"));
    }

    #[test]
    fn test_latest_upgrade_link_empty() {
        assert_eq!(latest_upgrade_link(&Map::new()).unwrap(), None);
    }

    #[test]
    fn test_latest_upgrade_link_rejects_unparsable_revision() {
        let links = json!({"x": "http://rancher/v1-catalog/templates/library:web:beta"});
        assert!(matches!(
            latest_upgrade_link(links.as_object().unwrap()),
            Err(TemplateError::InvalidRevision { .. })
        ));

        let links = json!({"x": "http://rancher/v1-catalog/templates/library:web"});
        assert!(latest_upgrade_link(links.as_object().unwrap()).is_err());
    }

    #[test]
    fn test_compose_files_by_prefix() {
        let files = json!({
            "README.md": "# web",
            "docker-compose.yml": "version: '2'",
            "rancher-compose.yml.tpl": "catalog: {}"
        });
        let compose = compose_files(files.as_object().unwrap());
        assert_eq!(compose.docker_compose.as_deref(), Some("version: '2'"));
        assert_eq!(compose.rancher_compose.as_deref(), Some("catalog: {}"));
    }
}
