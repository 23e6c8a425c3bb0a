//! Domain layer - pure business logic
//!
//! This module contains business logic with no external I/O.
//! Types and functions here can be unit tested without mocking.

pub mod model;
pub mod selector;
pub mod strategy;
pub mod template;

// Re-export commonly used types
pub use model::{
    Service, Stack, StackUpgrade, TemplateVersion, Transitioning, Upgradable, UPGRADED_STATE,
};
pub use selector::{match_service, LabelSelector};
pub use strategy::{build_strategy, BatchPolicy, ServiceUpgrade};
pub use template::CATALOG_SCHEME;
