//! `test-commit-id`: restore `prod-<commit>` into `test-<commit>` and point
//! the working copy at that commit and that data.

use anyhow::{Context as _, Result, anyhow, bail};
use chrono::{TimeDelta, Utc};

use super::{
    BRANCH_TTL_DAYS, Context, EnvOutcome, apply_database_url, fetch_connection_uri,
    print_console_instructions, warn_if_dirty,
};
use crate::{
    config::{EnvUpdate, ORIGINAL_DATABASE_URL},
    names::{snapshot_name, test_branch_name, validate_commit_id},
    neon::{RestoreSnapshot, wait_until_ready},
    report::{Summary, format_countdown, step, warning},
};

/// # Errors
///
/// Fails on a malformed commit id, a missing or inactive snapshot, a failed
/// checkout, a rejected restore or a branch that never becomes ready
pub async fn run(ctx: &Context<'_>, commit: &str, checkout: bool) -> Result<Summary> {
    let commit = validate_commit_id(commit)?;
    let snapshot_name = snapshot_name(commit);

    let snapshot = ctx
        .provider
        .find_snapshot_by_name(&snapshot_name)
        .await
        .context("failed to list snapshots")?
        .ok_or_else(|| {
            anyhow!(
                "snapshot `{snapshot_name}` not found, it is created by `neonsync create-snapshot {commit}` when the commit is deployed"
            )
        })?;

    if !snapshot.is_active() {
        bail!(
            "snapshot `{snapshot_name}` is `{}`, only active snapshots can be restored",
            snapshot.status.as_deref().unwrap_or("unknown")
        );
    }
    step(format!("Found snapshot {} ({})", snapshot.name, snapshot.id));

    if checkout {
        ctx.vcs.ensure_repository()?;
        warn_if_dirty(ctx.vcs);
        ctx.vcs.checkout_detached(commit).with_context(|| {
            format!("failed to check out {commit}, fetch it first or pass --no-checkout")
        })?;
        step(format!("Checked out {commit} (detached HEAD)"));
    }

    let branch_name = test_branch_name(commit);
    let branches = ctx
        .provider
        .list_branches()
        .await
        .context("failed to list Neon branches")?;

    let restored = if let Some(existing) = branches.iter().find(|b| b.name == branch_name) {
        warning(format!("Neon branch {branch_name} already exists, reusing it"));
        existing.clone()
    } else {
        let request = RestoreSnapshot {
            name: branch_name.clone(),
            expires_at: Some(Utc::now() + TimeDelta::days(BRANCH_TTL_DAYS)),
            finalize_restore: false,
        };
        let branch = ctx
            .provider
            .restore_snapshot(&snapshot.id, &request)
            .await
            .with_context(|| format!("failed to restore {snapshot_name} into {branch_name}"))?;
        step(format!("Restored {snapshot_name} into {} ({})", branch.name, branch.id));
        branch
    };

    let ready = wait_until_ready(
        ctx.provider,
        &restored.id,
        ctx.settings.ready_timeout,
        ctx.settings.ready_interval,
    )
    .await
    .with_context(|| format!("branch {branch_name} did not become ready"))?;
    step(format!("Branch {} is ready", ready.name));

    let uri = match ctx.settings.env_update {
        EnvUpdate::Auto => fetch_connection_uri(ctx, &ready.id).await,
        EnvUpdate::Manual => None,
    };
    let env = if let Some(uri) = uri {
        apply_database_url(
            ctx.workspace,
            EnvUpdate::Auto,
            &uri,
            Some(ORIGINAL_DATABASE_URL),
        )
    } else {
        print_console_instructions(ctx, &ready);
        EnvOutcome::without_url(ctx.settings.env_update)
    };

    let code = if checkout {
        format!("detached at {commit}")
    } else {
        "unchanged".to_string()
    };

    Ok(Summary::new("Historical data restored")
        .row("Commit", commit)
        .row("Code", code)
        .row("Snapshot", snapshot.name.as_str())
        .row("Neon branch", ready.name.as_str())
        .row("Branch ID", ready.id.as_str())
        .row("Expires", format_countdown(ready.expires_at, Utc::now()))
        .row("DATABASE_URL", env.describe())
        .next_step("Run the app and reproduce the issue")
        .next_step("Run `neonsync restore-prod` to go back to production")
        .next_step(format!(
            "Run `neonsync cleanup-feature {branch_name}` to delete the test branch"
        )))
}
