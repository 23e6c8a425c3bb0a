//! Git operations
//!
//! Handles clone, head commit, staging, committing and pushing for the
//! catalog repository checkout. Uses the system git binary.

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::debug;

use crate::error::GitError;

/// Commit identity used for catalog publishes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitAuthor {
    pub name: String,
    pub email: String,
}

impl Default for GitAuthor {
    fn default() -> Self {
        Self {
            name: "upgrader".to_string(),
            email: "upgrader@localhost".to_string(),
        }
    }
}

/// Client for git operations
pub struct GitClient {
    /// Working directory for git commands
    working_dir: Option<PathBuf>,
}

impl Default for GitClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GitClient {
    /// Create a new git client for current directory
    pub fn new() -> Self {
        Self { working_dir: None }
    }

    /// Create a git client for a specific directory
    pub fn in_dir(path: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: Some(path.into()),
        }
    }

    /// Run git with `args`, returning trimmed stdout.
    ///
    /// `shown` is the argument list used in logs and errors, so callers can
    /// keep credentials out of both.
    async fn run(&self, args: &[&str], shown: &[&str]) -> Result<String, GitError> {
        let git = which::which("git").map_err(|_| GitError::NotInstalled)?;
        let command = format!("git {}", shown.join(" "));
        debug!("Running {}", command);

        let mut cmd = Command::new(git);
        cmd.args(args);
        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }

        let output = cmd.output().await.map_err(|e| GitError::CommandFailed {
            command: command.clone(),
            stderr: e.to_string(),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(GitError::CommandFailed { command, stderr });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Clone a single branch of `url` into `dest`
    pub async fn clone_branch(&self, url: &str, branch: &str, dest: &Path) -> Result<(), GitError> {
        let dest = dest.to_string_lossy();
        let shown_url = redact_url(url);
        self.run(
            &["clone", "--branch", branch, "--single-branch", url, dest.as_ref()],
            &["clone", "--branch", branch, "--single-branch", shown_url.as_str(), dest.as_ref()],
        )
        .await?;
        Ok(())
    }

    /// Bring an existing checkout up to date with `origin/<branch>`.
    ///
    /// Local commits that never reached the remote are dropped from
    /// history, but their files stay on disk as untracked files. Tracked
    /// files are rewritten to the remote's content.
    pub async fn update(&self, branch: &str) -> Result<(), GitError> {
        let args = ["fetch", "origin", branch];
        self.run(&args, &args).await?;

        let remote = format!("origin/{}", branch);
        let args = ["reset", "--mixed", "--quiet", remote.as_str()];
        self.run(&args, &args).await?;

        let args = ["checkout-index", "--all", "--force"];
        self.run(&args, &args).await?;
        Ok(())
    }

    /// Get full SHA of HEAD
    pub async fn head_commit(&self) -> Result<String, GitError> {
        let args = ["rev-parse", "HEAD"];
        let sha = self
            .run(&args, &args)
            .await
            .map_err(|e| GitError::HeadCommit(e.to_string()))?;

        if sha.is_empty() {
            return Err(GitError::HeadCommit("Empty SHA returned".to_string()));
        }
        Ok(sha)
    }

    /// Stage paths for commit
    pub async fn add(&self, paths: &[&Path]) -> Result<(), GitError> {
        let paths: Vec<String> = paths.iter().map(|p| p.to_string_lossy().into_owned()).collect();
        let mut args = vec!["add", "--"];
        args.extend(paths.iter().map(String::as_str));
        self.run(&args, &args).await?;
        Ok(())
    }

    /// Create a commit as `author`
    pub async fn commit(&self, message: &str, author: &GitAuthor) -> Result<(), GitError> {
        let name = format!("user.name={}", author.name);
        let email = format!("user.email={}", author.email);
        let args = ["-c", name.as_str(), "-c", email.as_str(), "commit", "-m", message];
        self.run(&args, &args).await?;
        Ok(())
    }

    /// Push HEAD to `branch` at `url`
    pub async fn push(&self, url: &str, branch: &str) -> Result<(), GitError> {
        let refspec = format!("HEAD:{}", branch);
        let shown_url = redact_url(url);
        self.run(
            &["push", url, refspec.as_str()],
            &["push", shown_url.as_str(), refspec.as_str()],
        )
        .await?;
        Ok(())
    }
}

/// Replace any `user:password@` userinfo in `url` with `***@`
pub fn redact_url(url: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return url.to_string();
    };
    let rest = &url[scheme_end + 3..];
    let authority_end = rest.find('/').unwrap_or(rest.len());
    match rest[..authority_end].rfind('@') {
        Some(at) => format!("{}***{}", &url[..scheme_end + 3], &rest[at..]),
        None => url.to_string(),
    }
}
