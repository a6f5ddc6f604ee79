//! Git integration: revision listing, checkout, and repository state.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::capabilities::{Checkout, RevisionRangeProvider};
use crate::domain::{Result, RevhuntError, Revision, RevisionRange};

/// Run git asynchronously and return trimmed stdout, or the failure as `Err(stderr)`.
async fn run_git(repo_dir: &Path, args: &[&str]) -> Result<std::result::Result<String, String>> {
    debug!(repo = %repo_dir.display(), ?args, "running git");
    let output = tokio::process::Command::new("git")
        .args(args)
        .current_dir(repo_dir)
        .output()
        .await
        .map_err(|e| RevhuntError::Git(format!("failed to run git: {e}")))?;

    if output.status.success() {
        Ok(Ok(String::from_utf8_lossy(&output.stdout).trim().to_string()))
    } else {
        Ok(Err(String::from_utf8_lossy(&output.stderr).trim().to_string()))
    }
}

/// Revision checked out in `repo_dir`.
///
/// Fails with `RevhuntError::Git` when the directory is not a git work tree
/// or has no commits yet.
pub async fn head_revision(repo_dir: &Path) -> Result<Revision> {
    match run_git(repo_dir, &["rev-parse", "--verify", "HEAD"]).await? {
        Ok(sha) if !sha.is_empty() => Ok(Revision::new(sha)),
        Ok(_) => Err(RevhuntError::Git("git rev-parse HEAD returned no revision".to_string())),
        Err(stderr) => Err(RevhuntError::Git(format!(
            "{} is not a git repository with commits: {stderr}",
            repo_dir.display()
        ))),
    }
}

/// Revision listing backed by `git rev-list`.
#[derive(Debug, Clone)]
pub struct GitRevisionRange {
    repo_dir: PathBuf,
}

impl GitRevisionRange {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
        }
    }
}

#[async_trait]
impl RevisionRangeProvider for GitRevisionRange {
    async fn list_revisions(
        &self,
        lower_exclusive: Option<&Revision>,
        upper_inclusive: &Revision,
    ) -> Result<RevisionRange> {
        // Re-validate: revisions built with `Revision::new` skip the option check.
        let upper = Revision::parse(upper_inclusive.as_str())?;
        let exclusion = lower_exclusive
            .map(|lower| Revision::parse(lower.as_str()).map(|rev| format!("^{rev}")))
            .transpose()?;

        let mut args = vec!["rev-list", "--reverse", upper.as_str()];
        if let Some(exclusion) = exclusion.as_deref() {
            args.push(exclusion);
        }

        match run_git(&self.repo_dir, &args).await? {
            Ok(stdout) => RevisionRange::from_lines(&stdout),
            Err(stderr) => Err(RevhuntError::Git(format!("git rev-list failed: {stderr}"))),
        }
    }
}

/// Checkout backed by `git checkout`.
///
/// Leaves the work tree on a detached HEAD; there is no rollback between
/// successive checkouts.
#[derive(Debug, Clone)]
pub struct GitCheckout {
    repo_dir: PathBuf,
}

impl GitCheckout {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
        }
    }

    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }
}

#[async_trait]
impl Checkout for GitCheckout {
    async fn checkout(&self, revision: &Revision) -> Result<()> {
        let target = Revision::parse(revision.as_str())?;
        match run_git(&self.repo_dir, &["checkout", "--quiet", target.as_str()]).await? {
            Ok(_) => Ok(()),
            Err(reason) => Err(RevhuntError::Checkout {
                revision: revision.to_string(),
                reason,
            }),
        }
    }
}
