//! Git operations the workflows need, behind the [`Vcs`] trait so the
//! workflows can run against a fake repository in tests.

use std::{
    fmt,
    path::{Path, PathBuf},
    process::Command,
};
use thiserror::Error;
use tracing::debug;

/// Branches tried, in order, when returning to the production ref
pub const BASE_BRANCHES: &[&str] = &["main", "master"];

#[derive(Debug, Error)]
pub enum GitError {
    #[error("git is not available: {0}")]
    Unavailable(String),
    #[error("{} is not a git repository", .0.display())]
    NotARepository(PathBuf),
    #[error("git ref `{0}` not found")]
    RefNotFound(String),
    #[error("git {command} failed: {stderr}")]
    Command { command: String, stderr: String },
}

/// Where HEAD points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitRef {
    Branch(String),
    /// Short commit id of a detached HEAD
    Detached(String),
    Unknown,
}

impl GitRef {
    #[must_use]
    pub fn branch(&self) -> Option<&str> {
        match self {
            Self::Branch(name) => Some(name.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for GitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Branch(name) => write!(f, "{name}"),
            Self::Detached(commit) => write!(f, "detached at {commit}"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchDeletion {
    Deleted,
    /// The safe delete was rejected (unmerged work) and `-D` was used
    ForceDeleted,
}

pub trait Vcs: Send + Sync {
    /// # Errors
    ///
    /// Fails if git is missing or the working copy is not a repository
    fn ensure_repository(&self) -> Result<(), GitError>;

    /// Never fails, falls back to [`GitRef::Unknown`]
    fn current_ref(&self) -> GitRef;

    /// # Errors
    ///
    /// [`GitError::RefNotFound`] if `target` does not exist
    fn checkout(&self, target: &str) -> Result<(), GitError>;

    /// # Errors
    ///
    /// [`GitError::RefNotFound`] if `commit` does not exist
    fn checkout_detached(&self, commit: &str) -> Result<(), GitError>;

    /// Create `name` from `from` and switch to it
    ///
    /// # Errors
    ///
    /// Fails if the branch exists or `from` is unknown
    fn create_branch(&self, name: &str, from: &str) -> Result<(), GitError>;

    /// Safe delete first, force delete when `force` is set or the safe delete
    /// is rejected
    ///
    /// # Errors
    ///
    /// Fails if the branch does not exist or is checked out
    fn delete_branch(&self, name: &str, force: bool) -> Result<BranchDeletion, GitError>;

    /// # Errors
    ///
    /// Fails when there is no remote or the pull cannot fast-forward
    fn pull(&self) -> Result<(), GitError>;

    /// Branch `origin/HEAD` points to, without the remote prefix
    fn remote_default_branch(&self) -> Option<String>;

    fn has_uncommitted_changes(&self) -> bool;
}

/// Check out the first base branch that exists: `main`, `master`, then the
/// remote default branch. Returns the branch that was checked out.
///
/// # Errors
///
/// Returns the last checkout error if no candidate could be checked out, or
/// immediately if git itself is unavailable
pub fn checkout_base(vcs: &dyn Vcs) -> Result<String, GitError> {
    let mut candidates: Vec<String> = BASE_BRANCHES.iter().map(ToString::to_string).collect();
    if let Some(remote) = vcs.remote_default_branch()
        && !candidates.contains(&remote)
    {
        candidates.push(remote);
    }

    let mut last_error = None;
    for candidate in candidates {
        match vcs.checkout(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e @ GitError::Unavailable(_)) => return Err(e),
            Err(e) => {
                debug!("checkout {candidate} failed: {e}");
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| GitError::RefNotFound(BASE_BRANCHES.join("/"))))
}

/// [`Vcs`] backed by the `git` binary
#[derive(Debug, Clone)]
pub struct GitCli {
    root: PathBuf,
}

impl GitCli {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn run(&self, args: &[&str]) -> Result<String, GitError> {
        debug!("git -C {} {}", self.root.display(), args.join(" "));
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.root)
            .args(args)
            .output()
            .map_err(|e| GitError::Unavailable(e.to_string()))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            Err(GitError::Command {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    /// Turn "unknown ref" style failures into [`GitError::RefNotFound`]
    fn classify(error: GitError, target: &str) -> GitError {
        match error {
            GitError::Command { ref stderr, .. } if is_missing_ref(stderr) => {
                GitError::RefNotFound(target.to_string())
            }
            other => other,
        }
    }
}

fn is_missing_ref(stderr: &str) -> bool {
    const MARKERS: &[&str] = &[
        "did not match any file(s) known to git",
        "invalid reference",
        "reference is not a tree",
        "not a valid object name",
        "not found",
        "unknown revision",
    ];
    MARKERS.iter().any(|marker| stderr.contains(marker))
}

impl Vcs for GitCli {
    fn ensure_repository(&self) -> Result<(), GitError> {
        match self.run(&["rev-parse", "--is-inside-work-tree"]) {
            Ok(_) => Ok(()),
            Err(e @ GitError::Unavailable(_)) => Err(e),
            Err(_) => Err(GitError::NotARepository(self.root.clone())),
        }
    }

    fn current_ref(&self) -> GitRef {
        if let Ok(branch) = self.run(&["symbolic-ref", "--short", "-q", "HEAD"])
            && !branch.is_empty()
        {
            return GitRef::Branch(branch);
        }
        match self.run(&["rev-parse", "--short", "HEAD"]) {
            Ok(commit) if !commit.is_empty() => GitRef::Detached(commit),
            _ => GitRef::Unknown,
        }
    }

    fn checkout(&self, target: &str) -> Result<(), GitError> {
        self.run(&["checkout", "-q", target])
            .map(|_| ())
            .map_err(|e| Self::classify(e, target))
    }

    fn checkout_detached(&self, commit: &str) -> Result<(), GitError> {
        let object = format!("{commit}^{{commit}}");
        match self.run(&["rev-parse", "--verify", "--quiet", &object]) {
            Ok(_) => {}
            Err(e @ GitError::Unavailable(_)) => return Err(e),
            Err(_) => return Err(GitError::RefNotFound(commit.to_string())),
        }
        self.run(&["checkout", "-q", "--detach", commit])
            .map(|_| ())
            .map_err(|e| Self::classify(e, commit))
    }

    fn create_branch(&self, name: &str, from: &str) -> Result<(), GitError> {
        self.run(&["checkout", "-q", "-b", name, from])
            .map(|_| ())
            .map_err(|e| Self::classify(e, from))
    }

    fn delete_branch(&self, name: &str, force: bool) -> Result<BranchDeletion, GitError> {
        if force {
            self.run(&["branch", "-D", name])
                .map_err(|e| Self::classify(e, name))?;
            return Ok(BranchDeletion::ForceDeleted);
        }

        match self.run(&["branch", "-d", name]) {
            Ok(_) => Ok(BranchDeletion::Deleted),
            Err(GitError::Command { stderr, .. }) if stderr.contains("not fully merged") => {
                debug!("safe delete of {name} rejected, forcing");
                self.run(&["branch", "-D", name])?;
                Ok(BranchDeletion::ForceDeleted)
            }
            Err(e) => Err(Self::classify(e, name)),
        }
    }

    fn pull(&self) -> Result<(), GitError> {
        self.run(&["pull", "--ff-only", "-q"]).map(|_| ())
    }

    fn remote_default_branch(&self) -> Option<String> {
        let remote_head = self
            .run(&["symbolic-ref", "--short", "refs/remotes/origin/HEAD"])
            .ok()?;
        remote_head
            .strip_prefix("origin/")
            .map(ToString::to_string)
            .filter(|branch| !branch.is_empty())
    }

    fn has_uncommitted_changes(&self) -> bool {
        self.run(&["status", "--porcelain"])
            .is_ok_and(|status| !status.is_empty())
    }
}
