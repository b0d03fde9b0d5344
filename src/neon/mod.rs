//! Neon branching API
//!
//! # Module Organization
//!
//! - `models` - API resources and request types
//! - `client` - reqwest implementation of [`BranchProvider`]
//! - `error` - [`ProviderError`]
//!
//! Every call is a single round trip, nothing is retried. Callers decide
//! whether a failure is fatal or only worth a warning.

pub mod client;
pub mod error;
pub mod models;

pub use client::NeonClient;
pub use error::ProviderError;
pub use models::{
    Branch, ConnectionQuery, ConnectionUri, CreateBranch, CreatedBranch, Endpoint,
    RestoreSnapshot, Snapshot,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{collections::HashSet, time::Duration};
use tokio::time::{Instant, sleep};
use tracing::debug;

/// Names tried, in order, before falling back to the default/primary flags
pub const PRODUCTION_NAMES: &[&str] = &["production", "main"];

pub const DEVELOPMENT_NAMES: &[&str] = &["development", "dev", "develop"];

const CONSOLE_URL: &str = "https://console.neon.tech/app/projects";

#[async_trait]
pub trait BranchProvider: Send + Sync {
    async fn list_branches(&self) -> Result<Vec<Branch>, ProviderError>;

    async fn get_branch(&self, branch_id: &str) -> Result<Branch, ProviderError>;

    async fn create_branch(&self, request: &CreateBranch) -> Result<CreatedBranch, ProviderError>;

    /// A missing branch is reported as [`ProviderError::NotFound`]
    async fn delete_branch(&self, branch_id: &str) -> Result<(), ProviderError>;

    async fn list_endpoints(&self, branch_id: &str) -> Result<Vec<Endpoint>, ProviderError>;

    async fn create_snapshot(
        &self,
        branch_id: &str,
        name: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Snapshot, ProviderError>;

    async fn list_snapshots(&self) -> Result<Vec<Snapshot>, ProviderError>;

    async fn restore_snapshot(
        &self,
        snapshot_id: &str,
        request: &RestoreSnapshot,
    ) -> Result<Branch, ProviderError>;

    async fn connection_uri(&self, query: &ConnectionQuery) -> Result<String, ProviderError>;

    /// Exact, case-sensitive name match
    async fn find_snapshot_by_name(&self, name: &str) -> Result<Option<Snapshot>, ProviderError> {
        Ok(self
            .list_snapshots()
            .await?
            .into_iter()
            .find(|snapshot| snapshot.name == name))
    }
}

/// Production branch precedence: named `production`, named `main`, first
/// flagged default, first flagged primary
#[must_use]
pub fn resolve_production_branch(branches: &[Branch]) -> Option<&Branch> {
    PRODUCTION_NAMES
        .iter()
        .find_map(|name| branches.iter().find(|b| b.name == *name))
        .or_else(|| branches.iter().find(|b| b.default))
        .or_else(|| branches.iter().find(|b| b.primary))
}

#[must_use]
pub fn resolve_development_branch(branches: &[Branch]) -> Option<&Branch> {
    DEVELOPMENT_NAMES
        .iter()
        .find_map(|name| branches.iter().find(|b| b.name == *name))
}

/// Provider branch for a git branch: exact name first, then the sanitized
/// name the branch was created with
#[must_use]
pub fn find_feature_branch<'a>(branches: &'a [Branch], git_branch: &str) -> Option<&'a Branch> {
    let sanitized = crate::names::sanitize_branch_name(git_branch);
    branches
        .iter()
        .find(|b| b.name == git_branch)
        .or_else(|| branches.iter().find(|b| b.name == sanitized))
}

/// Ancestors of `branch_id`, nearest first, ending at the root. Stops on a
/// missing parent or a cycle.
#[must_use]
pub fn parent_chain<'a>(branches: &'a [Branch], branch_id: &str) -> Vec<&'a Branch> {
    let mut chain = Vec::new();
    let mut seen = HashSet::from([branch_id.to_string()]);
    let mut current = branches.iter().find(|b| b.id == branch_id);

    while let Some(parent_id) = current.and_then(|b| b.parent_id.as_deref()) {
        if !seen.insert(parent_id.to_string()) {
            break;
        }
        current = branches.iter().find(|b| b.id == parent_id);
        if let Some(parent) = current {
            chain.push(parent);
        }
    }

    chain
}

/// Neon console page of a branch
#[must_use]
pub fn console_url(project_id: &str, branch_id: &str) -> String {
    format!("{CONSOLE_URL}/{project_id}/branches/{branch_id}")
}

/// Endpoint id from a Neon host, `ep-cool-name-123456[-pooler].region.aws.neon.tech`
#[must_use]
pub fn endpoint_id_from_host(host: &str) -> Option<String> {
    let label = host.split('.').next()?;
    let id = label.strip_suffix("-pooler").unwrap_or(label);
    (id.starts_with("ep-") && id.len() > 3).then(|| id.to_string())
}

/// Poll the branch until it is `ready`.
///
/// `init` and other transitional states are retried every `interval` until
/// `timeout`, `error` and `deleting` are fatal.
///
/// # Errors
///
/// Returns [`ProviderError::BranchFailed`], [`ProviderError::NotReady`] or the
/// lookup error
pub async fn wait_until_ready(
    provider: &dyn BranchProvider,
    branch_id: &str,
    timeout: Duration,
    interval: Duration,
) -> Result<Branch, ProviderError> {
    let started = Instant::now();

    loop {
        let branch = provider.get_branch(branch_id).await?;
        match branch.state() {
            "ready" => return Ok(branch),
            "error" | "deleting" | "archived" => {
                return Err(ProviderError::BranchFailed {
                    branch: branch.name.clone(),
                    state: branch.state().to_string(),
                });
            }
            state => {
                if started.elapsed() >= timeout {
                    return Err(ProviderError::NotReady {
                        branch: branch.name.clone(),
                        state: state.to_string(),
                        seconds: timeout.as_secs(),
                    });
                }
                debug!("branch {} is {state}, waiting", branch.name);
                sleep(interval).await;
            }
        }
    }
}
