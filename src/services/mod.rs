//! Services layer - orchestration logic
//!
//! This module coordinates between domain logic and infrastructure.
//! Services use infrastructure adapters to perform I/O operations.

pub mod catalog_publisher;
pub mod driver;
pub mod service_upgrade;
pub mod stack_upgrade;
pub mod template_resolver;

// Re-export commonly used types
pub use catalog_publisher::CatalogPublisher;
pub use service_upgrade::ServiceUpgrader;
pub use stack_upgrade::StackUpgrader;
