//! `restore-prod`: back on the production ref with the production
//! connection string.

use anyhow::{Context as _, Result};

use super::{apply_database_url, pull_best_effort, warn_if_dirty};
use crate::{
    config::{EnvUpdate, Lookup, Workspace, production_database_url},
    git::{Vcs, checkout_base},
    report::{Summary, mask_uri, step},
};

/// # Errors
///
/// Fails if `PRODUCTION_DATABASE_URL` is missing, before touching git, or if
/// no base branch can be checked out
pub fn run(
    workspace: &Workspace,
    vcs: &dyn Vcs,
    lookup: &Lookup,
    mode: EnvUpdate,
) -> Result<Summary> {
    let production_url = production_database_url(lookup)?;

    vcs.ensure_repository()?;
    warn_if_dirty(vcs);
    let base = checkout_base(vcs)
        .context("failed to check out main, master or the remote default branch")?;
    step(format!("Checked out {base}"));
    pull_best_effort(vcs);

    let env = apply_database_url(workspace, mode, &production_url, None);

    Ok(Summary::new("Back on production")
        .row("Git branch", base.as_str())
        .row("DATABASE_URL", mask_uri(&production_url))
        .row("Env file", env.describe()))
}
