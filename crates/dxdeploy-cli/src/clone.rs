//! Cloning a GitHub repository to deploy from.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Name of the directory the repository is cloned into.
pub const CLONE_DIR_NAME: &str = "repository";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubSource {
    pub user: String,
    pub repo: String,
}

impl GithubSource {
    pub fn new(user: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            repo: repo.into(),
        }
    }

    pub fn url(&self) -> String {
        format!("https://github.com/{}/{}", self.user, self.repo)
    }
}

/// A local clone, removed with [`ClonedRepository::remove`].
#[derive(Debug)]
pub struct ClonedRepository {
    path: PathBuf,
}

impl ClonedRepository {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn remove(self) -> Result<()> {
        tokio::fs::remove_dir_all(&self.path)
            .await
            .with_context(|| format!("Failed to remove clone at {}", self.path.display()))?;
        debug!(path = %self.path.display(), "Removed clone");
        Ok(())
    }
}

/// Clones `source` into `<parent>/repository`.
pub async fn clone_repository(source: &GithubSource, parent: &Path) -> Result<ClonedRepository> {
    clone_url(&source.url(), &parent.join(CLONE_DIR_NAME)).await
}

async fn clone_url(url: &str, target: &Path) -> Result<ClonedRepository> {
    if tokio::fs::try_exists(target).await.unwrap_or(false) {
        warn!(path = %target.display(), "Removing stale clone");
        tokio::fs::remove_dir_all(target)
            .await
            .with_context(|| format!("Failed to remove {}", target.display()))?;
    }

    info!(%url, path = %target.display(), "Cloning repository");
    let output = Command::new("git")
        .arg("clone")
        .arg("--quiet")
        .arg(url)
        .arg(target)
        .output()
        .await
        .context("Failed to run git")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "git clone {url} failed (exit code: {:?}): {}",
            output.status.code(),
            stderr.trim()
        );
    }

    Ok(ClonedRepository {
        path: target.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_github_url() {
        let source = GithubSource::new("dav-apps", "dav-backend");
        assert_eq!(source.url(), "https://github.com/dav-apps/dav-backend");
    }

    #[tokio::test]
    async fn test_failed_clone_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("no-such-repository");
        let target = tmp.path().join(CLONE_DIR_NAME);

        let result = clone_url(&missing.to_string_lossy(), &target).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_remove_deletes_clone() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(CLONE_DIR_NAME);
        std::fs::create_dir_all(path.join("nested")).unwrap();
        std::fs::write(path.join("nested/file.json"), "{}").unwrap();

        ClonedRepository { path: path.clone() }.remove().await.unwrap();
        assert!(!path.exists());
    }
}
