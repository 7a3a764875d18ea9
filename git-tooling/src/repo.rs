use std::path::{Path, PathBuf};
use std::process::Command;

use crate::errors::{GitToolingError, Result};

/// Version-control steps the retirement engine needs, one flag at a time.
///
/// Steps never retry and never roll back: a failure leaves whatever branch
/// was already created in place.
pub trait VersionControl {
    /// Check out `trunk`, then create and check out `branch` from it.
    fn start_branch(&self, trunk: &str, branch: &str) -> Result<()>;

    /// Stage every working-tree change and commit it.
    ///
    /// Returns the short hash of the new commit, or `None` when there was
    /// nothing to commit.
    fn commit_all(&self, message: &str) -> Result<Option<String>>;

    fn push(&self, remote: &str, branch: &str) -> Result<()>;
}

/// [`VersionControl`] backed by the `git` executable.
#[derive(Debug, Clone)]
pub struct GitRepo {
    root: PathBuf,
}

impl GitRepo {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn current_branch(&self) -> Result<String> {
        self.run(&["rev-parse", "--abbrev-ref", "HEAD"])
    }

    pub fn head_short_hash(&self) -> Result<String> {
        self.run(&["rev-parse", "--short", "HEAD"])
    }

    /// Exit code 1 from `git diff --cached --quiet` means there are staged
    /// changes.
    fn has_staged_changes(&self) -> Result<bool> {
        let command = "git diff --cached --quiet".to_string();
        let status = Command::new("git")
            .args(["diff", "--cached", "--quiet"])
            .current_dir(&self.root)
            .status()
            .map_err(|source| GitToolingError::Spawn {
                command: command.clone(),
                source,
            })?;
        match status.code() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(GitToolingError::CommandFailed {
                command,
                stderr: format!("exited with {status}"),
            }),
        }
    }

    /// Run `git <args>` in the repo root and return trimmed stdout.
    fn run(&self, args: &[&str]) -> Result<String> {
        let command = format!("git {}", args.join(" "));
        tracing::debug!(%command, cwd = %self.root.display(), "Running git");

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .map_err(|source| GitToolingError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(GitToolingError::CommandFailed { command, stderr });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl VersionControl for GitRepo {
    fn start_branch(&self, trunk: &str, branch: &str) -> Result<()> {
        self.run(&["checkout", trunk])?;
        self.run(&["checkout", "-b", branch])?;
        tracing::info!(%branch, %trunk, "Created branch");
        Ok(())
    }

    fn commit_all(&self, message: &str) -> Result<Option<String>> {
        self.run(&["add", "-A"])?;
        if !self.has_staged_changes()? {
            tracing::info!("No changes staged; skipping commit");
            return Ok(None);
        }
        self.run(&["commit", "-m", message])?;
        let hash = self.head_short_hash()?;
        tracing::info!(commit = %hash, "Committed");
        Ok(Some(hash))
    }

    fn push(&self, remote: &str, branch: &str) -> Result<()> {
        self.run(&["push", "-u", remote, branch])?;
        tracing::info!(%remote, %branch, "Pushed branch");
        Ok(())
    }
}
