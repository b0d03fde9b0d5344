//! Naming rules shared by every workflow: branch sanitizing, protected
//! branches and commit identifiers.

use thiserror::Error;

/// Shortest commit identifier accepted, matches `git rev-parse --short`
pub const MIN_COMMIT_ID_LEN: usize = 7;

/// Full SHA-1 length
pub const MAX_COMMIT_ID_LEN: usize = 40;

/// Git branch names the tooling refuses to delete or branch off as features
pub const PROTECTED_BRANCHES: &[&str] = &[
    "main",
    "master",
    "develop",
    "development",
    "dev",
    "production",
    "prod",
    "staging",
];

pub const SNAPSHOT_PREFIX: &str = "prod-";
pub const TEST_BRANCH_PREFIX: &str = "test-";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NameError {
    #[error(
        "commit id `{0}` is too short, at least {min} characters are required (try `git rev-parse --short HEAD`)",
        min = MIN_COMMIT_ID_LEN
    )]
    CommitTooShort(String),
    #[error(
        "commit id `{0}` is too long, at most {max} characters are allowed",
        max = MAX_COMMIT_ID_LEN
    )]
    CommitTooLong(String),
    #[error("commit id `{0}` must only contain hexadecimal characters")]
    CommitNotHex(String),
    #[error("branch `{0}` is protected")]
    Protected(String),
    #[error("branch name is empty")]
    Empty,
}

/// Replace every character that is not an ASCII alphanumeric or a hyphen with
/// a hyphen, the character set Neon accepts for branch names.
#[must_use]
pub fn sanitize_branch_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Protected names are matched case-insensitively so `Main` and `MAIN` are
/// protected as well.
#[must_use]
pub fn is_protected(name: &str) -> bool {
    let name = name.trim();
    PROTECTED_BRANCHES
        .iter()
        .any(|protected| protected.eq_ignore_ascii_case(name))
}

/// Reject empty and protected names for feature branches
///
/// # Errors
///
/// Returns [`NameError::Empty`] or [`NameError::Protected`]
pub fn validate_feature_branch(name: &str) -> Result<&str, NameError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    if is_protected(name) {
        return Err(NameError::Protected(name.to_string()));
    }
    Ok(name)
}

/// Validate the shape of a commit identifier
///
/// # Errors
///
/// Returns an error if the id is shorter than [`MIN_COMMIT_ID_LEN`], longer
/// than a full SHA or contains non hexadecimal characters
pub fn validate_commit_id(commit: &str) -> Result<&str, NameError> {
    let commit = commit.trim();
    if commit.len() < MIN_COMMIT_ID_LEN {
        return Err(NameError::CommitTooShort(commit.to_string()));
    }
    if commit.len() > MAX_COMMIT_ID_LEN {
        return Err(NameError::CommitTooLong(commit.to_string()));
    }
    if !commit.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(NameError::CommitNotHex(commit.to_string()));
    }
    Ok(commit)
}

/// `prod-<commit>`, the snapshot taken from production for a commit
#[must_use]
pub fn snapshot_name(commit: &str) -> String {
    format!("{SNAPSHOT_PREFIX}{commit}")
}

/// `test-<commit>`, the branch a snapshot is restored into
#[must_use]
pub fn test_branch_name(commit: &str) -> String {
    format!("{TEST_BRANCH_PREFIX}{commit}")
}
