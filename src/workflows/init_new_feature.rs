//! `init-new-feature`: new git branch plus a Neon branch cloned from
//! production, with `DATABASE_URL` pointing at it.

use anyhow::{Context as _, Result, anyhow, bail};
use chrono::{TimeDelta, Utc};

use super::{
    BRANCH_TTL_DAYS, Context, EnvOutcome, apply_database_url, fetch_connection_uri,
    print_console_instructions, pull_best_effort, warn_if_dirty,
};
use crate::{
    config::ORIGINAL_DATABASE_URL,
    git::checkout_base,
    names::{is_protected, sanitize_branch_name, validate_feature_branch},
    neon::{CreateBranch, resolve_production_branch},
    report::{Summary, format_countdown, step, warning},
};

/// # Errors
///
/// Fails on a protected or missing branch name, git failures, a missing
/// production branch or a rejected branch creation
pub async fn run(ctx: &Context<'_>, branch: Option<&str>) -> Result<Summary> {
    ctx.vcs.ensure_repository()?;

    let current = ctx.vcs.current_ref();
    let git_branch = match branch {
        Some(name) => validate_feature_branch(name)?.to_string(),
        None => match current.branch() {
            Some(name) if !is_protected(name) => name.to_string(),
            Some(name) => bail!(
                "no branch name given and the current branch `{name}` is protected, run `neonsync init-new-feature <branch-name>`"
            ),
            None => bail!(
                "no branch name given and HEAD is {current}, run `neonsync init-new-feature <branch-name>`"
            ),
        },
    };

    if current.branch() == Some(git_branch.as_str()) {
        step(format!("Using current git branch {git_branch}"));
    } else {
        warn_if_dirty(ctx.vcs);
        let base = checkout_base(ctx.vcs).context("failed to check out the base branch")?;
        step(format!("Checked out {base}"));
        pull_best_effort(ctx.vcs);
        ctx.vcs
            .create_branch(&git_branch, &base)
            .with_context(|| format!("failed to create git branch {git_branch}"))?;
        step(format!("Created git branch {git_branch} from {base}"));
    }

    let branches = ctx
        .provider
        .list_branches()
        .await
        .context("failed to list Neon branches")?;
    let production = resolve_production_branch(&branches).ok_or_else(|| {
        anyhow!(
            "no production branch found in Neon project {} (looked for `production`, `main`, then the default branch)",
            ctx.project_id
        )
    })?;
    step(format!("Production branch is {} ({})", production.name, production.id));

    let neon_name = sanitize_branch_name(&git_branch);
    let (branch, uri) = if let Some(existing) = branches.iter().find(|b| b.name == neon_name) {
        warning(format!("Neon branch {neon_name} already exists, reusing it"));
        (existing.clone(), fetch_connection_uri(ctx, &existing.id).await)
    } else {
        let expires_at = Utc::now() + TimeDelta::days(BRANCH_TTL_DAYS);
        let request = CreateBranch::new(&production.id, &neon_name, expires_at, true);
        let created = ctx
            .provider
            .create_branch(&request)
            .await
            .with_context(|| format!("failed to create Neon branch {neon_name}"))?;
        step(format!(
            "Created Neon branch {} ({}) from {}",
            created.branch.name, created.branch.id, production.name
        ));

        let uri = match created.connection_uri(request.pooled) {
            Some(uri) => Some(uri),
            None => fetch_connection_uri(ctx, &created.branch.id).await,
        };
        (created.branch, uri)
    };

    let env = if let Some(uri) = uri {
        apply_database_url(
            ctx.workspace,
            ctx.settings.env_update,
            &uri,
            Some(ORIGINAL_DATABASE_URL),
        )
    } else {
        print_console_instructions(ctx, &branch);
        EnvOutcome::without_url(ctx.settings.env_update)
    };

    Ok(Summary::new("Feature branch ready")
        .row("Git branch", git_branch.as_str())
        .row("Neon branch", branch.name.as_str())
        .row("Branch ID", branch.id.as_str())
        .row("Parent", production.name.as_str())
        .row("Expires", format_countdown(branch.expires_at, Utc::now()))
        .row("DATABASE_URL", env.describe())
        .next_step("Restart your app so it picks up the feature database")
        .next_step(format!(
            "When the feature is merged run `neonsync cleanup-feature {git_branch}`"
        )))
}
