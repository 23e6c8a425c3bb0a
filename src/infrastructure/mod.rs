//! Infrastructure layer - external I/O adapters
//!
//! This module contains all code that interacts with external systems:
//! - Orchestration platform API (services, stacks, catalog index)
//! - Git operations on the catalog repository

pub mod git;
pub mod platform;
pub mod rancher;

#[cfg(test)]
pub mod fake;

// Re-export commonly used types
pub use git::{GitAuthor, GitClient};
pub use platform::{Catalog, Platform};
pub use rancher::RancherClient;
