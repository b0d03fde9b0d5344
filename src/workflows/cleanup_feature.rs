//! `cleanup-feature`: delete the feature's Neon branch and point
//! `DATABASE_URL` back at development.

use anyhow::{Context as _, Result, bail};

use super::{Context, EnvOutcome, apply_database_url, fetch_connection_uri};
use crate::{
    config::DEVELOPMENT_DATABASE_URL,
    git::{BranchDeletion, GitError, GitRef, checkout_base},
    names::{is_protected, validate_feature_branch},
    neon::{Branch, find_feature_branch, resolve_development_branch},
    report::{Summary, step, warning},
};

/// # Errors
///
/// Fails on a protected or missing branch name (before any provider call),
/// when the matching provider branch is the default, primary or protected
/// one, or when the provider cannot be reached
pub async fn run(
    ctx: &Context<'_>,
    branch: Option<&str>,
    delete_git_branch: bool,
) -> Result<Summary> {
    let current = ctx.vcs.current_ref();
    let git_branch = match branch {
        Some(name) => validate_feature_branch(name)?.to_string(),
        None => match current.branch() {
            Some(name) if !is_protected(name) => name.to_string(),
            Some(name) => bail!("refusing to clean up protected branch `{name}`"),
            None => bail!(
                "no branch name given and HEAD is {current}, run `neonsync cleanup-feature <branch-name>`"
            ),
        },
    };

    let branches = ctx
        .provider
        .list_branches()
        .await
        .context("failed to list Neon branches")?;

    let neon_branch = match find_feature_branch(&branches, &git_branch) {
        Some(found) => {
            if found.default || found.primary || found.protected {
                bail!(
                    "refusing to delete Neon branch `{}`, it is the project's default, primary or a protected branch",
                    found.name
                );
            }
            match ctx.provider.delete_branch(&found.id).await {
                Ok(()) => {
                    step(format!("Deleted Neon branch {} ({})", found.name, found.id));
                    found.name.clone()
                }
                Err(e) if e.is_not_found() => {
                    warning(format!("Neon branch {} was already gone", found.name));
                    "already gone".to_string()
                }
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("failed to delete Neon branch {}", found.name));
                }
            }
        }
        None => {
            warning(format!("no Neon branch found for {git_branch}, nothing to delete"));
            "not found".to_string()
        }
    };

    let env = point_at_development(ctx, &branches).await;
    let git_status = tidy_git(ctx, &current, &git_branch, delete_git_branch)
        .context("failed to leave the feature branch before deleting it")?;

    let mut summary = Summary::new("Feature cleaned up")
        .row("Git branch", git_branch.as_str())
        .row("Local branch", git_status)
        .row("Neon branch", neon_branch)
        .row("DATABASE_URL", env.describe());
    if !delete_git_branch {
        summary = summary.next_step(format!(
            "Delete the local branch with `git branch -d {git_branch}` or rerun with -g"
        ));
    }
    Ok(summary)
}

/// `DEVELOPMENT_DATABASE_URL` wins over asking the provider
async fn point_at_development(ctx: &Context<'_>, branches: &[Branch]) -> EnvOutcome {
    let url = match ctx.lookup.get(DEVELOPMENT_DATABASE_URL) {
        Some(url) => Some(url.to_string()),
        None => match resolve_development_branch(branches) {
            Some(development) => fetch_connection_uri(ctx, &development.id).await,
            None => {
                warning("no development branch found");
                None
            }
        },
    };

    if let Some(url) = url {
        apply_database_url(ctx.workspace, ctx.settings.env_update, &url, None)
    } else {
        warning(format!(
            "set {DEVELOPMENT_DATABASE_URL} or point DATABASE_URL in {} at your development database by hand",
            ctx.workspace.env_file.display()
        ));
        EnvOutcome::without_url(ctx.settings.env_update)
    }
}

/// Leave the feature branch if it is checked out and delete it when asked.
/// Returns what happened to the local branch.
fn tidy_git(
    ctx: &Context<'_>,
    current: &GitRef,
    git_branch: &str,
    delete: bool,
) -> Result<String, GitError> {
    if delete {
        ctx.vcs.ensure_repository()?;
    }

    if current.branch() == Some(git_branch) {
        match checkout_base(ctx.vcs) {
            Ok(base) => step(format!("Checked out {base}")),
            Err(e) if delete => return Err(e),
            Err(e) => warning(format!("could not check out the base branch: {e}")),
        }
    }

    if !delete {
        return Ok("kept".to_string());
    }

    let status = match ctx.vcs.delete_branch(git_branch, false) {
        Ok(BranchDeletion::Deleted) => {
            step(format!("Deleted git branch {git_branch}"));
            "deleted"
        }
        Ok(BranchDeletion::ForceDeleted) => {
            warning(format!("{git_branch} had unmerged commits, force deleted it"));
            "force deleted"
        }
        Err(e) => {
            warning(format!("could not delete git branch {git_branch}: {e}"));
            "delete failed"
        }
    };
    Ok(status.to_string())
}
