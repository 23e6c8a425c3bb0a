//! Orchestration platform interface
//!
//! The upgrade services only talk to the platform through these traits so
//! the state machine can be driven by a scripted platform in tests.
//! Implementations must be safe for concurrent use: service upgrades share
//! one client across worker tasks.

use async_trait::async_trait;

use crate::domain::{Service, ServiceUpgrade, Stack, StackUpgrade, TemplateVersion};
use crate::error::PlatformError;

/// Workload resources and their upgrade actions
#[async_trait]
pub trait Platform: Send + Sync {
    async fn list_services(&self) -> Result<Vec<Service>, PlatformError>;

    async fn list_stacks(&self) -> Result<Vec<Stack>, PlatformError>;

    async fn reload_service(&self, service: &Service) -> Result<Service, PlatformError>;

    async fn reload_stack(&self, stack: &Stack) -> Result<Stack, PlatformError>;

    async fn upgrade_service(
        &self,
        service: &Service,
        input: &ServiceUpgrade,
    ) -> Result<Service, PlatformError>;

    async fn finish_upgrade_service(&self, service: &Service) -> Result<Service, PlatformError>;

    async fn upgrade_stack(&self, stack: &Stack, input: &StackUpgrade)
        -> Result<Stack, PlatformError>;

    async fn finish_upgrade_stack(&self, stack: &Stack) -> Result<Stack, PlatformError>;
}

/// Project-scoped catalog template index
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Identity probe: the project id the credentials act for
    async fn project_id(&self) -> Result<String, PlatformError>;

    async fn refresh_templates(&self, project_id: &str) -> Result<(), PlatformError>;

    async fn template_version(
        &self,
        project_id: &str,
        external_id: &str,
    ) -> Result<TemplateVersion, PlatformError>;
}
