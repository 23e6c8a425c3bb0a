//! HTTP client for the orchestration platform API
//!
//! Resources are plain JSON documents carrying `links` and `actions`
//! maps. Reloading a resource GETs its `self` link; upgrade and
//! finish-upgrade POST to the matching action URL.
//!
//! The catalog index lives beside the API under `/v1-catalog` on the
//! same host and is scoped by the project id returned in the
//! `X-Api-User-Id` header of an authenticated request to the endpoint.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::PlatformConfig;
use crate::domain::model::{Collection, ResourceLinks};
use crate::domain::template::trim_external_id;
use crate::domain::{Service, ServiceUpgrade, Stack, StackUpgrade, TemplateVersion};
use crate::error::PlatformError;
use crate::infrastructure::platform::{Catalog, Platform};

/// Header carrying the caller's identity on authenticated responses
pub const USER_ID_HEADER: &str = "X-Api-User-Id";

/// Platform API client authenticated with an access/secret key pair
#[derive(Clone)]
pub struct RancherClient {
    client: Client,
    endpoint: String,
    base_url: String,
    access_key: String,
    secret_key: String,
}

impl RancherClient {
    /// Create a client for the configured endpoint and project
    pub fn new(config: &PlatformConfig) -> Result<Self, PlatformError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|source| PlatformError::Connection {
                url: config.url.clone(),
                source,
            })?;

        let endpoint = config.url.trim_end_matches('/').to_string();
        let base_url = match config.project_id.as_deref() {
            Some(project) if !project.is_empty() => format!("{}/projects/{}", endpoint, project),
            _ => endpoint.clone(),
        };

        Ok(Self {
            client,
            endpoint,
            base_url,
            access_key: config.access_key.clone(),
            secret_key: config.secret_key.clone(),
        })
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.basic_auth(&self.access_key, Some(&self.secret_key))
    }

    async fn send(&self, url: &str, builder: RequestBuilder) -> Result<Response, PlatformError> {
        let response = self
            .authed(builder)
            .send()
            .await
            .map_err(|source| PlatformError::Connection {
                url: url.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(PlatformError::Status {
                url: url.to_string(),
                status,
                body,
            });
        }

        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(url: &str, response: Response) -> Result<T, PlatformError> {
        let body = response
            .text()
            .await
            .map_err(|source| PlatformError::Connection {
                url: url.to_string(),
                source,
            })?;

        serde_json::from_str(&body).map_err(|e| PlatformError::Decode {
            url: url.to_string(),
            message: format!("{}: {}", e, body),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, PlatformError> {
        debug!("GET {}", url);
        let response = self.send(url, self.client.get(url)).await?;
        Self::decode(url, response).await
    }

    async fn post_json<B, T>(&self, url: &str, body: Option<&B>) -> Result<T, PlatformError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!("POST {}", url);
        let mut builder = self.client.post(url);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let response = self.send(url, builder).await?;
        Self::decode(url, response).await
    }

    /// List a collection, following pagination links to the end
    async fn list<T: DeserializeOwned>(&self, kind: &str) -> Result<Vec<T>, PlatformError> {
        let mut url = Some(format!("{}/{}", self.base_url, kind));
        let mut items = Vec::new();

        while let Some(next) = url.take() {
            let page: Collection<T> = self.get_json(&next).await?;
            items.extend(page.data);
            url = page.pagination.and_then(|p| p.next).filter(|n| !n.is_empty());
        }

        debug!("Listed {} {}", items.len(), kind);
        Ok(items)
    }

    async fn reload<T: DeserializeOwned>(
        &self,
        links: &ResourceLinks,
        id: &str,
    ) -> Result<T, PlatformError> {
        let url = links
            .links
            .get("self")
            .ok_or_else(|| PlatformError::ActionUnavailable {
                action: "reload".to_string(),
                resource: id.to_string(),
            })?;
        self.get_json(url).await
    }

    async fn action<B, T>(
        &self,
        links: &ResourceLinks,
        id: &str,
        action: &str,
        body: Option<&B>,
    ) -> Result<T, PlatformError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = links
            .actions
            .get(action)
            .ok_or_else(|| PlatformError::ActionUnavailable {
                action: action.to_string(),
                resource: id.to_string(),
            })?;
        self.post_json(url, body).await
    }

    /// `scheme://host[:port]` of the configured endpoint
    fn server_root(&self) -> Result<String, PlatformError> {
        server_root(&self.endpoint)
    }
}

/// `scheme://host[:port]` of `endpoint`
pub fn server_root(endpoint: &str) -> Result<String, PlatformError> {
    let url = Url::parse(endpoint).map_err(|_| PlatformError::InvalidUrl {
        url: endpoint.to_string(),
    })?;
    let host = url.host_str().ok_or_else(|| PlatformError::InvalidUrl {
        url: endpoint.to_string(),
    })?;

    Ok(match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}

#[async_trait]
impl Platform for RancherClient {
    async fn list_services(&self) -> Result<Vec<Service>, PlatformError> {
        self.list("services").await
    }

    async fn list_stacks(&self) -> Result<Vec<Stack>, PlatformError> {
        self.list("stacks").await
    }

    async fn reload_service(&self, service: &Service) -> Result<Service, PlatformError> {
        self.reload(&service.resource, &service.id).await
    }

    async fn reload_stack(&self, stack: &Stack) -> Result<Stack, PlatformError> {
        self.reload(&stack.resource, &stack.id).await
    }

    async fn upgrade_service(
        &self,
        service: &Service,
        input: &ServiceUpgrade,
    ) -> Result<Service, PlatformError> {
        self.action(&service.resource, &service.id, "upgrade", Some(input))
            .await
    }

    async fn finish_upgrade_service(&self, service: &Service) -> Result<Service, PlatformError> {
        self.action::<(), _>(&service.resource, &service.id, "finishupgrade", None)
            .await
    }

    async fn upgrade_stack(
        &self,
        stack: &Stack,
        input: &StackUpgrade,
    ) -> Result<Stack, PlatformError> {
        self.action(&stack.resource, &stack.id, "upgrade", Some(input))
            .await
    }

    async fn finish_upgrade_stack(&self, stack: &Stack) -> Result<Stack, PlatformError> {
        self.action::<(), _>(&stack.resource, &stack.id, "finishupgrade", None)
            .await
    }
}

#[async_trait]
impl Catalog for RancherClient {
    async fn project_id(&self) -> Result<String, PlatformError> {
        let url = self.endpoint.as_str();
        let response = self
            .authed(self.client.get(url))
            .send()
            .await
            .map_err(|source| PlatformError::Connection {
                url: url.to_string(),
                source,
            })?;

        response
            .headers()
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or_else(|| PlatformError::Forbidden {
                url: url.to_string(),
            })
    }

    async fn refresh_templates(&self, project_id: &str) -> Result<(), PlatformError> {
        let url = format!(
            "{}/v1-catalog/templates?action=refresh&projectId={}",
            self.server_root()?,
            project_id
        );
        debug!("POST {}", url);
        self.send(&url, self.client.post(&url)).await?;
        Ok(())
    }

    async fn template_version(
        &self,
        project_id: &str,
        external_id: &str,
    ) -> Result<TemplateVersion, PlatformError> {
        let url = format!(
            "{}/v1-catalog/templates/{}?projectId={}",
            self.server_root()?,
            trim_external_id(external_id),
            project_id
        );
        self.get_json(&url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config(url: &str, project: Option<&str>) -> PlatformConfig {
        PlatformConfig {
            url: url.to_string(),
            access_key: "ak".to_string(),
            secret_key: "sk".to_string(),
            project_id: project.map(str::to_string),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }

    #[test]
    fn test_base_url_scoped_to_project() {
        let client = RancherClient::new(&config("http://rancher:8080/v2-beta/", Some("1a5"))).unwrap();
        assert_eq!(client.base_url, "http://rancher:8080/v2-beta/projects/1a5");

        let client = RancherClient::new(&config("http://rancher:8080/v2-beta", None)).unwrap();
        assert_eq!(client.base_url, "http://rancher:8080/v2-beta");
    }

    #[test]
    fn test_server_root_keeps_port() {
        assert_eq!(
            server_root("http://rancher:8080/v2-beta/projects/1a5").unwrap(),
            "http://rancher:8080"
        );
        assert_eq!(
            server_root("https://rancher.example.com/v2-beta").unwrap(),
            "https://rancher.example.com"
        );
        assert!(server_root("not a url").is_err());
    }

    #[tokio::test]
    async fn test_missing_action_is_reported() {
        let client = RancherClient::new(&config("http://rancher:8080/v2-beta", None)).unwrap();
        let service: Service = serde_json::from_value(serde_json::json!({
            "id": "1s9",
            "actions": {}
        }))
        .unwrap();

        let err = client.finish_upgrade_service(&service).await.unwrap_err();
        assert!(matches!(
            err,
            PlatformError::ActionUnavailable { ref action, ref resource }
                if action == "finishupgrade" && resource == "1s9"
        ));
    }
}
