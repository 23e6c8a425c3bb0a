//! Centralized error types for upgrader
//!
//! Uses thiserror for typed errors that can be matched on,
//! while still being compatible with anyhow for propagation at the
//! top-level boundary in `main`.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for upgrade, resolve and publish operations
#[derive(Error, Debug)]
pub enum UpgradeError {
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Git error: {0}")]
    Git(#[from] GitError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Timeout waiting for {target} to finish after {attempts} checks")]
    Timeout { target: String, attempts: u32 },

    #[error("Waiting for {target} failed: {message}")]
    TransitionFailed { target: String, message: String },

    #[error("Waiting for {target} was cancelled")]
    Cancelled { target: String },

    #[error("Upgrade task for {target} aborted: {message}")]
    TaskAborted { target: String, message: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl UpgradeError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Orchestration platform API errors
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Cannot connect to the platform at {url}: {source}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} failed with status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Forbidden: no user identity returned by {url}")]
    Forbidden { url: String },

    #[error("{kind} {name} is not found")]
    NotFound { kind: String, name: String },

    #[error("Action {action} not available on {resource}")]
    ActionUnavailable { action: String, resource: String },

    #[error("Failed to parse response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("Invalid endpoint URL: {url}")]
    InvalidUrl { url: String },
}

/// Catalog template errors
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Invalid template path: {path}. Expected catalog:template[:revision]")]
    InvalidPath { path: String },

    #[error("Invalid revision {value:?} in template {id}")]
    InvalidRevision { id: String, value: String },

    #[error("Stack {stack} is not deployed from catalog")]
    NotFromCatalog { stack: String },
}

/// Git operation errors
#[derive(Error, Debug)]
pub enum GitError {
    #[error("git executable not found in PATH")]
    NotInstalled,

    #[error("Git command failed: {command}: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Username/password for git repo {url} not provided")]
    MissingCredentials { url: String },

    #[error("Failed to read head commit: {0}")]
    HeadCommit(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Parse selector '{input}' fail, needs the form 'FOO=BAR'")]
    InvalidSelector { input: String },

    #[error("Required configuration missing: {field}")]
    MissingField { field: String },

    #[error("Invalid configuration value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Invalid image tag: {tag}")]
    InvalidImageTag { tag: String },

    #[error("Failed to read {path}: {message}")]
    FileUnreadable { path: String, message: String },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },
}
